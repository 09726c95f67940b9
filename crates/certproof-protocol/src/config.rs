//! Protocol configuration from `CERTPROOF_*` environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use certproof_core::CertError;
use certproof_vc::DEFAULT_CREDENTIAL_TYPE;

/// Credential type tag issuers assign and holders filter on.
pub const ENV_CREDENTIAL_TYPE: &str = "CERTPROOF_CREDENTIAL_TYPE";
/// Whether disclosure proofs carry the informational absence proof.
pub const ENV_ATTACH_NON_MEMBERSHIP: &str = "CERTPROOF_ATTACH_NON_MEMBERSHIP";
/// Directory for persisted accumulator state.
pub const ENV_STATE_DIR: &str = "CERTPROOF_STATE_DIR";
/// Whether operations are mirrored to the `metrics` facade.
pub const ENV_METRICS_ENABLED: &str = "CERTPROOF_METRICS_ENABLED";

/// Errors reading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable had an unrecognized value.
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// A variable was set to an empty string.
    #[error("{var} is set but empty")]
    Empty {
        /// Variable name.
        var: &'static str,
    },
}

impl From<ConfigError> for CertError {
    fn from(e: ConfigError) -> Self {
        CertError::Validation(e.to_string())
    }
}

/// Settings shared by the protocol roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Credential type tag.
    #[serde(default = "default_credential_type")]
    pub credential_type: String,
    /// Attach absence proofs to disclosure proofs.
    #[serde(default = "default_true")]
    pub attach_non_membership: bool,
    /// State directory for snapshots.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Mirror operation metrics to the `metrics` facade.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_credential_type() -> String {
    DEFAULT_CREDENTIAL_TYPE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./certproof-state")
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            credential_type: default_credential_type(),
            attach_non_membership: true,
            state_dir: default_state_dir(),
            metrics_enabled: true,
        }
    }
}

impl ProtocolConfig {
    /// Read from the process environment. Unset variables take defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |var: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
                Some(v) => Ok(Some(v.trim().to_string())),
            }
        };
        let flag = |var: &'static str| -> Result<Option<bool>, ConfigError> {
            text(var)?
                .map(|v| match v.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(ConfigError::InvalidBool { var, value: v }),
                })
                .transpose()
        };

        let defaults = Self::default();
        Ok(Self {
            credential_type: text(ENV_CREDENTIAL_TYPE)?.unwrap_or(defaults.credential_type),
            attach_non_membership: flag(ENV_ATTACH_NON_MEMBERSHIP)?
                .unwrap_or(defaults.attach_non_membership),
            state_dir: text(ENV_STATE_DIR)?
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            metrics_enabled: flag(ENV_METRICS_ENABLED)?.unwrap_or(defaults.metrics_enabled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ProtocolConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ProtocolConfig::default());
        assert_eq!(config.credential_type, DEFAULT_CREDENTIAL_TYPE);
        assert!(config.attach_non_membership);
    }

    #[test]
    fn test_overrides() {
        let config = ProtocolConfig::from_lookup(lookup(&[
            (ENV_CREDENTIAL_TYPE, "LanguageCert"),
            (ENV_ATTACH_NON_MEMBERSHIP, "off"),
            (ENV_STATE_DIR, "/var/lib/certproof"),
            (ENV_METRICS_ENABLED, "0"),
        ]))
        .unwrap();
        assert_eq!(config.credential_type, "LanguageCert");
        assert!(!config.attach_non_membership);
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/certproof"));
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            ProtocolConfig::from_lookup(lookup(&[(ENV_METRICS_ENABLED, "maybe")])).unwrap_err(),
            ConfigError::InvalidBool {
                var: ENV_METRICS_ENABLED,
                value: "maybe".into()
            }
        );
        assert!(matches!(
            ProtocolConfig::from_lookup(lookup(&[(ENV_CREDENTIAL_TYPE, " ")])),
            Err(ConfigError::Empty { .. })
        ));
    }
}
