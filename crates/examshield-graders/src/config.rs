//! Configuration loading and grader factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examshield_core::integrity::DEFAULT_WARNING_CEILING;
use examshield_core::scorer::DEFAULT_WEAK_TOPIC_THRESHOLD;
use examshield_core::traits::DescriptiveGrader;

use crate::placeholder::{PlaceholderGrader, IMAGE_CREDIT, TEXT_CREDIT};
use crate::remote::{RemoteGrader, RetryPolicy};

/// Environment variable that overrides the remote grader's API key.
pub const GRADER_KEY_ENV: &str = "EXAMSHIELD_GRADER_KEY";

/// Which grader scores descriptive answers.
///
/// Debug output masks the API key.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraderConfig {
    Placeholder {
        #[serde(default = "default_text_credit")]
        text_credit: u32,
        #[serde(default = "default_image_credit")]
        image_credit: u32,
    },
    Remote {
        base_url: String,
        #[serde(default)]
        api_key: String,
    },
}

impl std::fmt::Debug for GraderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraderConfig::Placeholder {
                text_credit,
                image_credit,
            } => f
                .debug_struct("Placeholder")
                .field("text_credit", text_credit)
                .field("image_credit", image_credit)
                .finish(),
            GraderConfig::Remote {
                base_url,
                api_key: _,
            } => f
                .debug_struct("Remote")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .finish(),
        }
    }
}

impl Default for GraderConfig {
    fn default() -> Self {
        GraderConfig::Placeholder {
            text_credit: default_text_credit(),
            image_credit: default_image_credit(),
        }
    }
}

fn default_text_credit() -> u32 {
    TEXT_CREDIT
}
fn default_image_credit() -> u32 {
    IMAGE_CREDIT
}

/// Top-level examshield configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamShieldConfig {
    /// Topics scoring below this percentage are reported as weak.
    #[serde(default = "default_weak_topic_threshold")]
    pub weak_topic_threshold: f64,
    /// Tab switches shown as the limit in integrity warnings.
    #[serde(default = "default_warning_ceiling")]
    pub warning_ceiling: u32,
    /// Real milliseconds per simulated second of the countdown.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default)]
    pub grader: GraderConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_weak_topic_threshold() -> f64 {
    DEFAULT_WEAK_TOPIC_THRESHOLD
}
fn default_warning_ceiling() -> u32 {
    DEFAULT_WARNING_CEILING
}
fn default_tick_period_ms() -> u64 {
    1000
}

impl Default for ExamShieldConfig {
    fn default() -> Self {
        Self {
            grader: GraderConfig::default(),
            weak_topic_threshold: default_weak_topic_threshold(),
            warning_ceiling: default_warning_ceiling(),
            tick_period_ms: default_tick_period_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExamShieldConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(1))
    }
}

/// Resolve `${VAR_NAME}` references from the environment. Unset variables
/// resolve to an empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_grader_config(config: &GraderConfig) -> GraderConfig {
    match config {
        GraderConfig::Remote { base_url, api_key } => GraderConfig::Remote {
            base_url: resolve_env_vars(base_url),
            api_key: resolve_env_vars(api_key),
        },
        other => other.clone(),
    }
}

/// Load configuration from the default locations.
pub fn load_config() -> Result<ExamShieldConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `examshield.toml` in the current directory
/// 2. `~/.config/examshield/config.toml`
///
/// Defaults apply when neither exists. `EXAMSHIELD_GRADER_KEY` overrides the
/// remote grader's API key.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamShieldConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => default_config_paths().into_iter().find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config_str(
                &std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?,
                &path,
            )?
        }
        None => ExamShieldConfig::default(),
    };

    if let Ok(key) = std::env::var(GRADER_KEY_ENV) {
        if let GraderConfig::Remote { api_key, .. } = &mut config.grader {
            *api_key = key;
        }
    }
    config.grader = resolve_grader_config(&config.grader);

    Ok(config)
}

/// Parse config TOML from a string.
pub fn parse_config_str(content: &str, source_path: &Path) -> Result<ExamShieldConfig> {
    let config: ExamShieldConfig = toml::from_str(content)
        .with_context(|| format!("failed to parse config: {}", source_path.display()))?;
    if !(0.0..=100.0).contains(&config.weak_topic_threshold) {
        anyhow::bail!(
            "weak_topic_threshold must be between 0 and 100, got {}",
            config.weak_topic_threshold
        );
    }
    Ok(config)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("examshield.toml")];
    if let Some(dir) = config_dir() {
        paths.push(dir.join("config.toml"));
    }
    paths
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examshield"))
}

/// Create the configured grader.
pub fn create_grader(config: &ExamShieldConfig) -> Result<Arc<dyn DescriptiveGrader>> {
    match &config.grader {
        GraderConfig::Placeholder {
            text_credit,
            image_credit,
        } => Ok(Arc::new(PlaceholderGrader::new(*text_credit, *image_credit))),
        GraderConfig::Remote { base_url, api_key } => {
            if api_key.is_empty() {
                anyhow::bail!("remote grader needs an api_key (or set {GRADER_KEY_ENV})");
            }
            let grader = RemoteGrader::new(api_key, base_url)?.with_retry_policy(config.retry);
            Ok(Arc::new(grader))
        }
    }
}
