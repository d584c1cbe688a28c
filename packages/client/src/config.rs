//! Client configuration, populated from environment variables.

use std::time::Duration;

/// Runtime configuration for a portal client.
///
/// Every field has a default, so a client can be started with zero
/// configuration against a local backend.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `WAVEPOOL_API_BASE` | `http://127.0.0.1:8080` | Origin of the portal backend |
/// | `WAVEPOOL_TOKEN_DB` | (absent = in-memory) | Path to the SQLite credential store |
/// | `WAVEPOOL_EXPIRY_MARGIN_SECS` | `5` | Seconds subtracted from token lifetimes |
/// | `WAVEPOOL_VALIDATE_RESPONSES` | `true` | Check 2xx bodies against the route's output schema |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin every route path is appended to.
    /// Example: `"https://portal.example.com"`.
    pub api_base: String,

    /// Path to the SQLite database holding stored credentials.
    /// `None` keeps credentials in memory for the lifetime of the process.
    pub token_db: Option<String>,

    /// Safety margin subtracted from `expires_in` when computing the stored
    /// expiry time.
    pub expiry_margin: Duration,

    /// Validate successful response payloads against the output schema.
    pub validate_responses: bool,
}

/// An environment variable held a value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8080".into(),
            token_db: None,
            expiry_margin: Duration::from_secs(5),
            validate_responses: true,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `api_base`, with every other field defaulted.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base = lookup("WAVEPOOL_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        if url::Url::parse(&api_base).is_err() {
            return Err(ConfigError::Invalid {
                var: "WAVEPOOL_API_BASE",
                expected: "an absolute URL (e.g. http://127.0.0.1:8080)",
                value: api_base,
            });
        }

        let expiry_margin = match lookup("WAVEPOOL_EXPIRY_MARGIN_SECS") {
            Some(v) => Duration::from_secs(v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "WAVEPOOL_EXPIRY_MARGIN_SECS",
                expected: "a whole number of seconds",
                value: v.clone(),
            })?),
            None => defaults.expiry_margin,
        };

        let validate_responses = match lookup("WAVEPOOL_VALIDATE_RESPONSES") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                var: "WAVEPOOL_VALIDATE_RESPONSES",
                expected: "true or false",
                value: v,
            })?,
            None => defaults.validate_responses,
        };

        Ok(Self {
            api_base,
            token_db: lookup("WAVEPOOL_TOKEN_DB").filter(|v| !v.is_empty()),
            expiry_margin,
            validate_responses,
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ClientConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.api_base, "http://127.0.0.1:8080");
        assert!(cfg.token_db.is_none());
        assert_eq!(cfg.expiry_margin, Duration::from_secs(5));
        assert!(cfg.validate_responses);
    }

    #[test]
    fn overrides() {
        let cfg = ClientConfig::from_lookup(env(&[
            ("WAVEPOOL_API_BASE", "https://portal.example.com/"),
            ("WAVEPOOL_TOKEN_DB", "/tmp/tokens.db"),
            ("WAVEPOOL_EXPIRY_MARGIN_SECS", "30"),
            ("WAVEPOOL_VALIDATE_RESPONSES", "off"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base, "https://portal.example.com");
        assert_eq!(cfg.token_db.as_deref(), Some("/tmp/tokens.db"));
        assert_eq!(cfg.expiry_margin, Duration::from_secs(30));
        assert!(!cfg.validate_responses);
    }

    #[test]
    fn rejects_garbage() {
        let err = ClientConfig::from_lookup(env(&[("WAVEPOOL_EXPIRY_MARGIN_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("WAVEPOOL_EXPIRY_MARGIN_SECS"));
        assert!(ClientConfig::from_lookup(env(&[("WAVEPOOL_API_BASE", "not a url")])).is_err());
    }
}
