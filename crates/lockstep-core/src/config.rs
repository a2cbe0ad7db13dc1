//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_TOLERANCE_SECONDS;

/// Id of the bundled sample lesson.
pub const DEFAULT_LESSON_ID: &str = "lesson_bio";

/// Top-level Lockstep configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum presenter/follower gap that still counts as in focus (default: 30).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_seconds: Option<f64>,

    /// Lesson the session starts on (default: the bundled sample).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lesson: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<id>.json` per lesson.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons_dir: Option<String>,

    /// Catalog index with publish/visibility metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "lockstep_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"));

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).as_ref())
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse config text (JSON5) after env substitution.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let substituted = substitute_env_vars(raw);
        json5::from_str(&substituted).map_err(|e| crate::error::LockstepError::Config(e.to_string()))
    }

    /// Default config file path: `~/.lockstep/config.json`.
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().map(|g| g.port).unwrap_or_else(default_port)
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn tolerance_seconds(&self) -> f64 {
        self.session
            .as_ref()
            .and_then(|s| s.tolerance_seconds)
            .unwrap_or(DEFAULT_TOLERANCE_SECONDS)
    }

    pub fn default_lesson(&self) -> String {
        self.session
            .as_ref()
            .and_then(|s| s.default_lesson.clone())
            .unwrap_or_else(|| DEFAULT_LESSON_ID.to_string())
    }

    /// Lesson directory: `storage.lessons_dir` or `~/.lockstep/lessons/`.
    pub fn lessons_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.lessons_dir.as_deref())
            .map(expand_path)
            .unwrap_or_else(|| data_dir().join("lessons"))
    }

    /// Catalog index: `storage.index_path` or `~/.lockstep/lessons_index.json`.
    pub fn index_path(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.index_path.as_deref())
            .map(expand_path)
            .unwrap_or_else(|| data_dir().join("lessons_index.json"))
    }

    /// Get a config value by dotted path (e.g. "gateway.port", "session.tolerance_seconds").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Set a config value by dotted path.
    pub fn set_path(&mut self, path: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| anyhow::anyhow!("Config serialization error: {e}"))?;

        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(anyhow::anyhow!("Empty path"));
        };

        let mut current = &mut json;
        for segment in parents {
            let object = current
                .as_object_mut()
                .ok_or_else(|| anyhow::anyhow!("'{segment}' is not inside an object"))?;
            let child = object
                .entry(segment.to_string())
                .or_insert_with(|| serde_json::json!({}));
            if child.is_null() {
                *child = serde_json::json!({});
            }
            current = child;
        }
        let object = current
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("Parent of '{last}' is not an object"))?;
        object.insert(last.to_string(), value);

        *self = serde_json::from_value(json)
            .map_err(|e| anyhow::anyhow!("Config deserialization error: {e}"))?;
        Ok(())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
        }

        let tolerance = self.tolerance_seconds();
        if !tolerance.is_finite() || tolerance < 0.0 {
            errors.push(format!("session.tolerance_seconds must be >= 0, got {tolerance}"));
        } else if tolerance == 0.0 {
            warnings.push("session.tolerance_seconds is 0: only simultaneous touches will count".to_string());
        }

        if let Some(logging) = &self.logging {
            if !matches!(logging.format.as_str(), "plain" | "json") {
                warnings.push(format!("Unknown logging.format '{}', using plain", logging.format));
            }
            if !matches!(logging.output.as_str(), "stderr" | "stdout") {
                warnings.push(format!("Unknown logging.output '{}', using stderr", logging.output));
            }
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for Lockstep data: `~/.lockstep/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lockstep")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_LOCKSTEP_DIR", "/srv/lessons") };
        let input = r#"{"storage": {"lessons_dir": "${TEST_LOCKSTEP_DIR}"}}"#;
        let config = Config::parse(input).unwrap();
        assert_eq!(config.lessons_dir(), PathBuf::from("/srv/lessons"));
        unsafe { std::env::remove_var("TEST_LOCKSTEP_DIR") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_LOCKSTEP_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#)); // empty string
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway_port(), 5000);
        assert_eq!(config.gateway_bind(), "0.0.0.0");
        assert_eq!(config.tolerance_seconds(), 30.0);
        assert_eq!(config.default_lesson(), "lesson_bio");
        assert!(config.lessons_dir().ends_with(".lockstep/lessons"));
    }

    #[test]
    fn test_json5_config() {
        let config = Config::parse(
            r#"{
                // comments are allowed
                gateway: { port: 8080, bind: "127.0.0.1" },
                session: { tolerance_seconds: 12.5, default_lesson: "u_1234abcd" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway_port(), 8080);
        assert_eq!(config.gateway_bind(), "127.0.0.1");
        assert_eq!(config.tolerance_seconds(), 12.5);
        assert_eq!(config.default_lesson(), "u_1234abcd");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert!(config.gateway.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.set_path("session.tolerance_seconds", serde_json::json!(45)).unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.tolerance_seconds(), 45.0);
        assert_eq!(loaded.get_path("session.tolerance_seconds"), Some(serde_json::json!(45.0)));
    }

    #[test]
    fn test_set_path_rejects_bad_shape() {
        let mut config = Config::default();
        assert!(config.set_path("", serde_json::json!(1)).is_err());
        assert!(config.set_path("gateway.port", serde_json::json!("not a port")).is_err());
    }

    #[test]
    fn test_set_path_through_scalar_is_an_error() {
        let mut config = Config::parse("{ gateway: { port: 8080 } }").unwrap();
        let err = config.set_path("gateway.port.x", serde_json::json!(1)).unwrap_err();
        assert!(err.to_string().contains("not an object"), "got: {err}");
        assert_eq!(config.gateway_port(), 8080);

        assert!(config.set_path("gateway.port.x.y", serde_json::json!(1)).is_err());
    }

    #[test]
    fn test_set_path_creates_missing_sections() {
        let mut config = Config::default();
        config.set_path("storage.lessons_dir", serde_json::json!("/srv/lessons")).unwrap();
        assert_eq!(config.lessons_dir(), PathBuf::from("/srv/lessons"));
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = Config::parse(r#"{ "logging": {} }"#).unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_validate_negative_tolerance_errors() {
        let config = Config {
            session: Some(SessionConfig {
                tolerance_seconds: Some(-5.0),
                default_lesson: None,
            }),
            ..Config::default()
        };
        let (_warnings, errors) = config.validate();
        assert!(
            errors.iter().any(|e| e.contains("tolerance")),
            "Expected a tolerance error, got: {errors:?}"
        );
    }

    #[test]
    fn test_validate_zero_port_errors() {
        let config = Config {
            gateway: Some(GatewayConfig { port: 0, bind: None }),
            ..Config::default()
        };
        let (_warnings, errors) = config.validate();
        assert!(errors.iter().any(|e| e.contains("port")));
    }
}
