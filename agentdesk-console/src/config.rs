//! Configuration loading for the agentdesk console.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use crate::nav::day_index;
use agentdesk_llm::{PlannerSettings, ProviderKind, ProviderSettings};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub source_timeout_ms: u64,
    pub planning_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub pending_refresh_delay_ms: u64,
    pub auth: AuthConfig,
    pub planner: PlannerConfig,
    pub log: LogConfig,
}

/// Where the backend bearer token comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Environment variable holding the bearer token.
    pub token_env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Environment variable holding the planning service API key.
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: i32,
    pub temperature: f32,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or AGENTDESK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Environment variable {var} is not set")]
    MissingSecret { var: String },
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

impl ConsoleConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: ConsoleConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        let timeouts = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("source_timeout_ms", self.source_timeout_ms),
            ("planning_timeout_ms", self.planning_timeout_ms),
            ("action_timeout_ms", self.action_timeout_ms),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(invalid(field, "must be > 0"));
            }
        }
        if self.auth.token_env.trim().is_empty() {
            return Err(invalid("auth.token_env", "must not be empty"));
        }
        if self.planner.model.trim().is_empty() {
            return Err(invalid("planner.model", "must not be empty"));
        }
        if self.planner.api_key_env.trim().is_empty() {
            return Err(invalid("planner.api_key_env", "must not be empty"));
        }
        if let Some(base_url) = &self.planner.base_url {
            if base_url.trim().is_empty() {
                return Err(invalid("planner.base_url", "must not be empty when set"));
            }
        }
        if self.planner.max_tokens <= 0 {
            return Err(invalid("planner.max_tokens", "must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.planner.temperature) {
            return Err(invalid("planner.temperature", "must be within [0, 2]"));
        }
        if self.planner.requests_per_minute == 0 {
            return Err(invalid("planner.requests_per_minute", "must be > 0"));
        }
        if self.log.filter.trim().is_empty() {
            return Err(invalid("log.filter", "must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn pending_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.pending_refresh_delay_ms)
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            max_tokens: self.planner.max_tokens,
            temperature: Some(self.planner.temperature),
            timeout: Duration::from_millis(self.planning_timeout_ms),
        }
    }

    /// Resolve provider settings, reading the API key from the environment.
    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        let var = &self.planner.api_key_env;
        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSecret { var: var.clone() })?;

        Ok(ProviderSettings {
            kind: self.planner.provider,
            model: self.planner.model.clone(),
            api_key: SecretString::from(api_key),
            base_url: self.planner.base_url.clone(),
            requests_per_minute: self.planner.requests_per_minute,
        })
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("AGENTDESK_CONFIG").ok().map(PathBuf::from)
}

/// `--day N`, zero-based; defaults to the first day. Negative values select
/// the first day.
pub fn day_from_args() -> Result<usize, ConfigError> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--day" {
            return parse_day(&args.next().unwrap_or_default());
        }
    }
    Ok(0)
}

fn parse_day(value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .map(day_index)
        .map_err(|_| ConfigError::InvalidValue {
            field: "--day",
            reason: format!("expected a day index, got '{}'", value),
        })
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
api_base_url = "http://localhost:3000"
request_timeout_ms = 10000
source_timeout_ms = 30000
planning_timeout_ms = 30000
action_timeout_ms = 15000
pending_refresh_delay_ms = 500

[auth]
token_env = "AGENTDESK_TOKEN"

[planner]
provider = "anthropic"
model = "claude-3-5-sonnet-20241022"
api_key_env = "AGENTDESK_PLANNER_KEY"
max_tokens = 4096
temperature = 0.2
requests_per_minute = 20

[log]
format = "pretty"
filter = "agentdesk=info"
"#;

    #[test]
    fn test_sample_parses_and_validates() {
        let config = ConsoleConfig::parse(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.planner.provider, ProviderKind::Anthropic);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.source_timeout(), Duration::from_secs(30));
        assert_eq!(config.planner_settings().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let with_extra = SAMPLE.replace("[auth]", "surprise = 1\n\n[auth]");
        assert!(matches!(
            ConsoleConfig::parse(&with_extra),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let without = SAMPLE.replace("action_timeout_ms = 15000\n", "");
        assert!(ConsoleConfig::parse(&without).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ConsoleConfig::parse(SAMPLE).unwrap();
        config.source_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "source_timeout_ms", .. })
        ));
    }

    #[test]
    fn test_temperature_range_enforced() {
        let mut config = ConsoleConfig::parse(SAMPLE).unwrap();
        config.planner.temperature = 2.5;
        assert!(config.validate().is_err());
        config.planner.temperature = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let mut config = ConsoleConfig::parse(SAMPLE).unwrap();
        config.api_base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_env_is_reported() {
        let mut config = ConsoleConfig::parse(SAMPLE).unwrap();
        config.planner.api_key_env = "AGENTDESK_TEST_UNSET_PLANNER_KEY".to_string();
        match config.provider_settings() {
            Err(ConfigError::MissingSecret { var }) => {
                assert_eq!(var, "AGENTDESK_TEST_UNSET_PLANNER_KEY")
            }
            other => panic!("expected MissingSecret, got {:?}", other.map(|s| s.model)),
        }
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ConsoleConfig::from_path(file.path()).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3000");
    }

    #[test]
    fn test_day_argument_clamps_negative() {
        assert_eq!(parse_day("2").unwrap(), 2);
        assert_eq!(parse_day("-1").unwrap(), 0);
        assert_eq!(parse_day(" -40 ").unwrap(), 0);
        assert!(matches!(
            parse_day("monday"),
            Err(ConfigError::InvalidValue { field: "--day", .. })
        ));
    }
}
