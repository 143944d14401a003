//! Explicit configuration for key generation, PEM protection and issuance.
//!
//! Nothing in the engine reads the environment; callers load an
//! [`IdentityConfig`] (or use the defaults) and pass it in.

use crate::error::{KeyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_VALIDITY_DAYS: u32 = 365;
/// One hundred years; keeps `not_after` far below the year 9999 limit of
/// GeneralizedTime.
pub const MAX_VALIDITY_DAYS: u32 = 36_500;
pub const DEFAULT_RSA_MODULUS_BITS: usize = 2048;
pub const MIN_RSA_MODULUS_BITS: usize = 1024;
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;

/// Settings for the identity engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Validity window of issued and self-issued certificates
    pub validity_days: u32,

    /// Modulus size for freshly generated RSA keys
    pub rsa_modulus_bits: usize,

    /// PBKDF2-SHA256 rounds protecting encrypted PEM exports
    pub pbkdf2_iterations: u32,

    /// Write the derived Auto-ID into the SubjectAltName extension
    pub embed_auto_id: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            validity_days: DEFAULT_VALIDITY_DAYS,
            rsa_modulus_bits: DEFAULT_RSA_MODULUS_BITS,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            embed_auto_id: true,
        }
    }
}

impl IdentityConfig {
    pub fn with_validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    pub fn with_rsa_modulus_bits(mut self, bits: usize) -> Self {
        self.rsa_modulus_bits = bits;
        self
    }

    pub fn with_pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    pub fn with_embedded_auto_id(mut self, embed: bool) -> Self {
        self.embed_auto_id = embed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.validity_days == 0 || self.validity_days > MAX_VALIDITY_DAYS {
            return Err(KeyError::ConfigError(format!(
                "validity_days must be between 1 and {MAX_VALIDITY_DAYS}, got {}",
                self.validity_days
            )));
        }
        if self.rsa_modulus_bits < MIN_RSA_MODULUS_BITS || self.rsa_modulus_bits % 8 != 0 {
            return Err(KeyError::ConfigError(format!(
                "rsa_modulus_bits must be a multiple of 8 and at least {MIN_RSA_MODULUS_BITS}, got {}",
                self.rsa_modulus_bits
            )));
        }
        if self.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(KeyError::ConfigError(format!(
                "pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
                self.pbkdf2_iterations
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IdentityConfig = serde_json::from_str(&content).map_err(|e| {
            KeyError::ConfigError(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| KeyError::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        IdentityConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_weak_settings() {
        let cfg = IdentityConfig::default().with_rsa_modulus_bits(512);
        assert!(matches!(cfg.validate(), Err(KeyError::ConfigError(_))));

        let cfg = IdentityConfig::default().with_validity_days(0);
        assert!(cfg.validate().is_err());

        for days in [MAX_VALIDITY_DAYS + 1, u32::MAX] {
            let cfg = IdentityConfig::default().with_validity_days(days);
            assert!(matches!(cfg.validate(), Err(KeyError::ConfigError(_))), "{days}");
        }
        IdentityConfig::default()
            .with_validity_days(MAX_VALIDITY_DAYS)
            .validate()
            .unwrap();

        let cfg = IdentityConfig::default().with_pbkdf2_iterations(10);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        let cfg = IdentityConfig::default()
            .with_validity_days(30)
            .with_embedded_auto_id(false);
        cfg.save(&path).unwrap();
        assert_eq!(IdentityConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: IdentityConfig = serde_json::from_str(r#"{"validity_days": 10}"#).unwrap();
        assert_eq!(cfg.validity_days, 10);
        assert_eq!(cfg.rsa_modulus_bits, DEFAULT_RSA_MODULUS_BITS);
        assert!(cfg.embed_auto_id);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, r#"{"rsa_modulus_bits": 256}"#).unwrap();
        assert!(matches!(
            IdentityConfig::load(&path),
            Err(KeyError::ConfigError(_))
        ));
    }
}
