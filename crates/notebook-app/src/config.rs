//! Client configuration from environment variables.

use std::env;
use std::path::PathBuf;

const PROFILES_FILE: &str = ".notebook-profiles.json";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// File holding saved connection profiles.
    pub profiles_path: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `NOTEBOOK_PROFILES`: profiles file (default: `$HOME/.notebook-profiles.json`)
    /// - `LOG_LEVEL`: logging level (default: "warn")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profiles_path = match lookup("NOTEBOOK_PROFILES").filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME")
                    .or_else(|| lookup("USERPROFILE"))
                    .ok_or_else(|| ConfigError::MissingEnvVar("HOME".to_string()))?;
                PathBuf::from(home).join(PROFILES_FILE)
            }
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "warn".to_string());
        if !matches!(
            log_level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            return Err(ConfigError::InvalidValue {
                name: "LOG_LEVEL".to_string(),
                reason: format!("unknown level '{log_level}'"),
            });
        }

        Ok(Self {
            profiles_path,
            log_level,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = ClientConfig::from_lookup(lookup(&[("HOME", "/home/alice")])).unwrap();

        assert_eq!(
            config.profiles_path,
            PathBuf::from("/home/alice/.notebook-profiles.json")
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_explicit_values() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("NOTEBOOK_PROFILES", "/tmp/profiles.json"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.profiles_path, PathBuf::from("/tmp/profiles.json"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_home() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "HOME"));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = ClientConfig::from_lookup(lookup(&[("HOME", "/h"), ("LOG_LEVEL", "loud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
