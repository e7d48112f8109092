//! `{placeholder}` substitution for package names, repository lines and paths

use std::collections::BTreeMap;

use crate::error::{Result, config};

/// Placeholders a template may reference
pub const PLACEHOLDERS: &[&str] = &["version", "name", "codename", "distro", "release", "arch"];

/// Values substituted into templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a placeholder value, replacing any earlier one
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Render one template
    pub fn render(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                config::invalid(format!("unterminated placeholder in '{template}'"))
            })?;
            let key = &after[..close];
            let value = self.get(key).ok_or_else(|| {
                config::invalid(format!("placeholder {{{key}}} has no value in '{template}'"))
            })?;
            out.push_str(value);
            rest = &after[close + 1..];
        }
        out.push_str(rest);

        Ok(out)
    }

    /// Render a list of templates
    pub fn render_all(&self, templates: &[String]) -> Result<Vec<String>> {
        templates.iter().map(|t| self.render(t)).collect()
    }
}

/// Placeholder names referenced by a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                found.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let vars = TemplateVars::new().with("version", "8.3");
        assert_eq!(
            vars.render("php{version}-fpm").unwrap(),
            "php8.3-fpm".to_string()
        );
        assert_eq!(
            vars.render("/usr/bin/php{version} ({version})").unwrap(),
            "/usr/bin/php8.3 (8.3)"
        );
    }

    #[test]
    fn test_render_without_placeholders() {
        let vars = TemplateVars::new();
        assert_eq!(vars.render("nginx").unwrap(), "nginx");
    }

    #[test]
    fn test_render_missing_value_fails() {
        let vars = TemplateVars::new().with("version", "16");
        let err = vars.render("{codename}-pgdg").unwrap_err();
        assert!(err.to_string().contains("codename"));
    }

    #[test]
    fn test_render_unterminated_fails() {
        let vars = TemplateVars::new().with("version", "16");
        assert!(vars.render("postgresql-{version").is_err());
    }

    #[test]
    fn test_with_replaces_value() {
        let vars = TemplateVars::new()
            .with("version", "8.4")
            .with("version", "8.3");
        assert_eq!(vars.get("version"), Some("8.3"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("deb {url} {codename}-pgdg main"),
            vec!["url", "codename"]
        );
        assert!(placeholders("nginx").is_empty());
    }
}
