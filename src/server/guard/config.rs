use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

/// Hash key configuration for the verification guard.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GuardConfig {
    /// Base64 encoded hash key, may reference environment variables, e.g.
    /// "${TFAGUARD_HASH_KEY}". Takes precedence over `key_path`.
    #[serde(default = "GuardConfig::default_key")]
    pub key: String,

    /// File holding the base64 encoded hash key.
    /// Default: {config_path}/pki/hash.key
    /// If the default file does not exist, a new random key is generated.
    #[serde(default = "GuardConfig::default_key_path")]
    pub key_path: String,

    #[serde(skip)]
    pub generate_if_not_exists: bool,
}

impl CommonConfig for GuardConfig {
    fn default() -> Self {
        Self {
            key: Self::default_key(),
            key_path: Self::default_key_path(),
            generate_if_not_exists: false,
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.key = expandenv("key", &self.key)?;
        if !self.key.is_empty() {
            return Ok(());
        }

        self.key_path = expandenv("key_path", &self.key_path)?;
        if self.key_path.is_empty() {
            self.generate_if_not_exists = true;
            let path = ps.pki_path.join("hash.key");
            self.key_path = format!("{}", path.display());
        }

        Ok(())
    }
}

impl GuardConfig {
    pub fn default_key() -> String {
        String::new()
    }

    pub fn default_key_path() -> String {
        String::new()
    }
}
