//! Configuration loading with env-var overrides.
//!
//! Reads `switchboard.toml` relative to the current working directory when
//! it exists, then applies `SWITCHBOARD_LOG_LEVEL`,
//! `SWITCHBOARD_VALIDATE_REQUESTS` and `SWITCHBOARD_VALIDATE_RESPONSES`
//! env overrides. A host with no config file runs on defaults: `info`
//! logging and both validation toggles on.

use std::{env, fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::ValidationOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Config(String),
}

/// Fully-resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub log_level: String,
    pub validation: ValidationOptions,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            validation: ValidationOptions::default(),
        }
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    dispatch: RawDispatch,
    #[serde(default)]
    validation: RawValidation,
}

#[derive(Deserialize)]
struct RawDispatch {
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawDispatch {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize)]
struct RawValidation {
    /// Defaults to `true`: requests are checked unless explicitly disabled.
    #[serde(default = "default_true")]
    request_models: bool,
    /// Defaults to `true`: responses are checked unless explicitly disabled.
    #[serde(default = "default_true")]
    response_models: bool,
}

impl Default for RawValidation {
    fn default() -> Self {
        Self {
            request_models: true,
            response_models: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Load config from `switchboard.toml`, then apply env-var overrides.
pub fn load() -> Result<CoreConfig, ConfigError> {
    let log_level_override = env::var("SWITCHBOARD_LOG_LEVEL").ok();
    let requests_override = bool_env("SWITCHBOARD_VALIDATE_REQUESTS")?;
    let responses_override = bool_env("SWITCHBOARD_VALIDATE_RESPONSES")?;
    load_from(
        Path::new("switchboard.toml"),
        log_level_override.as_deref(),
        requests_override,
        responses_override,
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    requests_override: Option<bool>,
    responses_override: Option<bool>,
) -> Result<CoreConfig, ConfigError> {
    let parsed = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<RawConfig>(&raw)
            .map_err(|e| ConfigError::Config(format!("parse error in {}: {e}", path.display())))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => RawConfig::default(),
        Err(e) => {
            return Err(ConfigError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    Ok(CoreConfig {
        log_level: log_level_override
            .unwrap_or(&parsed.dispatch.log_level)
            .to_string(),
        validation: ValidationOptions {
            validate_requests: requests_override.unwrap_or(parsed.validation.request_models),
            validate_responses: responses_override.unwrap_or(parsed.validation.response_models),
        },
    })
}

fn bool_env(name: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_bool(name, &value).map(Some),
        Err(_) => Ok(None),
    }
}

/// Accepts `true`/`false`/`1`/`0` in any case; anything else is a config
/// mistake worth failing on.
fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::Config(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_TOML: &str = r#"
[dispatch]
log_level = "debug"

[validation]
request_models = false
response_models = true
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_full_config() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), None, None, None).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert!(!cfg.validation.validate_requests);
        assert!(cfg.validation.validate_responses);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_from(Path::new("/nonexistent/switchboard.toml"), None, None, None).unwrap();
        assert_eq!(cfg, CoreConfig::default());
        assert!(cfg.validation.validate_requests);
        assert!(cfg.validation.validate_responses);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let f = write_toml("");
        let cfg = load_from(f.path(), None, None, None).unwrap();
        assert_eq!(cfg, CoreConfig::default());
    }

    #[test]
    fn overrides_beat_the_file() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), Some("trace"), Some(true), Some(false)).unwrap();
        assert_eq!(cfg.log_level, "trace");
        assert!(cfg.validation.validate_requests);
        assert!(!cfg.validation.validate_responses);
    }

    #[test]
    fn malformed_file_errors() {
        let f = write_toml("[validation]\nrequest_models = \"maybe\"\n");
        let err = load_from(f.path(), None, None, None).unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn bool_values_parse_loosely_but_not_wrongly() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
