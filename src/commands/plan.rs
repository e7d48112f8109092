//! Plan command implementation
//!
//! Prints the steps a run would take with the loaded configuration. Nothing
//! is queried or changed on the host.

use std::path::PathBuf;

use console::Style;

use crate::config::{ComponentSpec, ConfigOrigin, StackConfig};
use crate::error::Result;

/// Run plan command
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let (config, origin) = StackConfig::load(config_path.as_deref())?;
    print!("{}", render(&config, &origin));
    Ok(())
}

fn render(config: &StackConfig, origin: &ConfigOrigin) -> String {
    let heading = Style::new().bold().green();
    let dim = Style::new().dim();
    let mut out = format!("{} {origin}\n\n", heading.apply_to("Configuration:"));

    let mut steps: Vec<(String, String)> = vec![
        (
            "Base tooling".to_string(),
            if config.base_packages.is_empty() {
                "refresh package index".to_string()
            } else {
                config.base_packages.join(" ")
            },
        ),
        (
            "OS identification".to_string(),
            config.os_release_path.display().to_string(),
        ),
    ];

    let mut with_repository = 0;
    for spec in &config.components {
        if let Some(repository) = &spec.repository {
            with_repository += 1;
            steps.push((format!("{} repository", spec.name), repository.describe()));
        }
    }
    if with_repository > 0 {
        steps.push((
            "Package index refresh".to_string(),
            "only when a repository was registered".to_string(),
        ));
    }
    for spec in &config.components {
        steps.push((spec.name.clone(), describe_component(spec)));
    }
    if config.cleanup {
        steps.push(("Cleanup".to_string(), "autoremove and clean".to_string()));
    }

    out.push_str(&format!("{}\n", heading.apply_to("Steps:")));
    for (index, (label, detail)) in steps.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {}  {}\n",
            index + 1,
            Style::new().cyan().bold().apply_to(label),
            dim.apply_to(detail)
        ));
    }
    out
}

fn describe_component(spec: &ComponentSpec) -> String {
    let mut parts = vec![
        format!("[{}]", spec.id),
        spec.source.describe(),
        format!("default {}", if spec.default_answer { "yes" } else { "no" }),
    ];
    if let Some(fallback) = &spec.fallback {
        parts.push(format!("fallback {fallback}"));
    }
    if let Some(family) = &spec.conflicts_with {
        parts.push(format!("removes {family}"));
    }
    if spec.guarded {
        parts.push("services held".to_string());
    }
    parts.join(", ")
}
