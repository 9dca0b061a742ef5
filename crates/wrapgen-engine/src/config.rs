//! Code generation configuration
//!
//! Settings are read from a TOML document whose keys sit at the top level
//! (there is no enclosing table). Every key is optional; the document below
//! spells out the defaults, except `source_file`, which is unset by default:
//!
//! ```toml
//! enabled = true
//! candidates = ["asm", "asm-shaded", "asm-legacy"]
//! annotate_generated = false
//! debug_info = false
//! source_file = "Generated.java"
//! max_probe_versions = 1024
//! ```
//!
//! `WRAPGEN_ENABLED` and `WRAPGEN_PROVIDERS` (comma-separated) override
//! `enabled` and `candidates` from the environment.

use crate::defaults;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable switching generation on or off
pub const ENV_ENABLED: &str = "WRAPGEN_ENABLED";

/// Environment variable holding a comma-separated candidate list
pub const ENV_PROVIDERS: &str = "WRAPGEN_PROVIDERS";

/// Code generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeGenConfig {
    /// Whether helpers are generated at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Emission library identities, probed in order
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Put a marker annotation carrying the signature on generated helpers
    #[serde(default)]
    pub annotate_generated: bool,

    /// Emit line-number and local-variable tables
    #[serde(default)]
    pub debug_info: bool,

    /// `SourceFile` attribute for generated helpers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Upper bound on helper versions probed per wrapper type
    #[serde(default = "default_max_probe_versions")]
    pub max_probe_versions: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_candidates() -> Vec<String> {
    defaults::CANDIDATES.iter().map(|c| c.to_string()).collect()
}

fn default_max_probe_versions() -> u32 {
    defaults::MAX_PROBE_VERSIONS
}

impl Default for CodeGenConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            candidates: default_candidates(),
            annotate_generated: false,
            debug_info: false,
            source_file: None,
            max_probe_versions: default_max_probe_versions(),
        }
    }
}

impl CodeGenConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CodeGenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(std::env::vars())
    }

    /// Apply `WRAPGEN_*` overrides from `vars`
    pub fn with_overrides(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        for (key, value) in vars {
            match key.as_str() {
                ENV_ENABLED => {
                    self.enabled = parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                }
                ENV_PROVIDERS => {
                    self.candidates = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_probe_versions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_probe_versions".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = CodeGenConfig::default();
        assert!(config.enabled);
        assert_eq!(config.candidates, vec!["asm", "asm-shaded", "asm-legacy"]);
        assert_eq!(config.max_probe_versions, defaults::MAX_PROBE_VERSIONS);
    }

    #[test]
    fn test_partial_toml() {
        let config = CodeGenConfig::from_toml_str(
            r#"
            candidates = ["asm-legacy"]
            source_file = "Helpers.java"
            "#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.candidates, vec!["asm-legacy"]);
        assert_eq!(config.source_file.as_deref(), Some("Helpers.java"));
    }

    #[test]
    fn test_full_toml_top_level_keys() {
        let config = CodeGenConfig::from_toml_str(
            r#"
            enabled = true
            candidates = ["asm", "asm-shaded", "asm-legacy"]
            annotate_generated = false
            debug_info = false
            source_file = "Generated.java"
            max_probe_versions = 1024
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            CodeGenConfig {
                source_file: Some("Generated.java".to_string()),
                ..CodeGenConfig::default()
            }
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CodeGenConfig::from_toml_str("enabled = \"maybe\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CodeGenConfig::from_toml_str("max_probe_versions = 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = CodeGenConfig::default()
            .with_overrides(vars(&[
                (ENV_ENABLED, "off"),
                (ENV_PROVIDERS, "asm-legacy, asm"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.candidates, vec!["asm-legacy", "asm"]);

        let err = CodeGenConfig::default()
            .with_overrides(vars(&[(ENV_ENABLED, "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
