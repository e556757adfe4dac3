use lp_domain::config::{Config, ConfigSeverity};

/// Print every validation issue; `true` when none is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }

    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    println!(
        "\n{errors} error(s), {} warning(s) in {config_path}",
        issues.len() - errors
    );

    errors == 0
}

/// Render the resolved config (defaults filled in) as TOML.
pub fn render(config: &Config) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
