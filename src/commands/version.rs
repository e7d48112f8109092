//! Version command implementation
//!
//! Besides the build, reports where configuration would be read from and
//! what the effective catalog contains.

use std::path::PathBuf;

use console::Style;

use crate::config::{ConfigOrigin, StackConfig};
use crate::error::Result;

/// Run version command
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let (config, origin) = StackConfig::load(config_path.as_deref())?;
    print!("{}", render(&config, &origin, &StackConfig::search_paths()));
    Ok(())
}

fn render(config: &StackConfig, origin: &ConfigOrigin, search_paths: &[PathBuf]) -> String {
    let heading = Style::new().bold();
    let dim = Style::new().dim();
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };

    let mut out = format!(
        "stackup {} ({profile}, rust >= {})\n\n",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_RUST_VERSION")
    );

    out.push_str(&format!("{}\n", heading.apply_to("Configuration lookup:")));
    for path in search_paths {
        out.push_str(&format!("  {}\n", path.display()));
    }
    out.push_str(&format!("  {}\n\n", dim.apply_to("built-in catalog")));

    out.push_str(&format!("{}\n", heading.apply_to("Active configuration:")));
    out.push_str(&format!("  source: {origin}\n"));
    out.push_str(&format!("  components: {}\n", config.components.len()));
    out.push_str(&format!("  conflict families: {}\n", config.conflicts.len()));
    out.push_str(&format!("  user agent: {}\n", config.http.user_agent));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reports_lookup_and_catalog() {
        let config = StackConfig::builtin().unwrap();
        let paths = vec![PathBuf::from("stackup.yaml")];

        let out = console::strip_ansi_codes(&render(&config, &ConfigOrigin::Builtin, &paths))
            .to_string();

        assert!(out.starts_with(&format!("stackup {}", env!("CARGO_PKG_VERSION"))));
        assert!(out.contains("Configuration lookup:\n  stackup.yaml\n  built-in catalog\n"));
        assert!(out.contains("  source: built-in catalog\n"));
        assert!(out.contains(&format!("  components: {}\n", config.components.len())));
        assert!(out.contains("  user agent: stackup/"));
    }

    #[test]
    fn test_render_names_config_file() {
        let config = StackConfig::from_yaml("components: []", &ConfigOrigin::Builtin).unwrap();
        let origin = ConfigOrigin::File(PathBuf::from("/etc/stackup/stackup.yaml"));

        let out = console::strip_ansi_codes(&render(&config, &origin, &[])).to_string();

        assert!(out.contains("  source: /etc/stackup/stackup.yaml\n"));
        assert!(out.contains("  components: 0\n"));
    }
}
