//! The `examshield show-config` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use examshield_graders::config::{load_config_from, GraderConfig};

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    match &config.grader {
        GraderConfig::Placeholder {
            text_credit,
            image_credit,
        } => println!("Grader: placeholder (text {text_credit}, image {image_credit})"),
        GraderConfig::Remote { base_url, api_key } => println!(
            "Grader: remote at {base_url} (api key {})",
            if api_key.is_empty() { "missing" } else { "set" }
        ),
    }
    println!("Weak topic threshold: {}%", config.weak_topic_threshold);
    println!("Tab-switch ceiling: {}", config.warning_ceiling);
    println!("Tick period: {}ms", config.tick_period_ms);
    println!(
        "Retries: {} (initial delay {}ms)",
        config.retry.max_retries, config.retry.initial_delay_ms
    );

    // Dump with the API key blanked.
    let mut redacted = config.clone();
    if let GraderConfig::Remote { api_key, .. } = &mut redacted.grader {
        if !api_key.is_empty() {
            *api_key = "***".into();
        }
    }
    let toml = toml::to_string_pretty(&redacted).context("failed to serialize config")?;
    println!("\n{toml}");

    Ok(())
}
