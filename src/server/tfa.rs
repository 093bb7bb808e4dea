use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

/// Second factor settings. They only decide whether a login asks for a
/// second factor and what the verification form shows; the access guard
/// ignores them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TfaConfig {
    #[serde(default = "TfaConfig::default_enabled")]
    pub enabled: bool,

    /// Plugin that validates the submitted second factor.
    #[serde(default = "TfaConfig::default_validate_plugin")]
    pub validate_plugin: String,

    /// Extra plugins run on login, e.g. "tfa_trusted_browser".
    #[serde(default = "TfaConfig::default_login_plugins")]
    pub login_plugins: Vec<String>,
}

impl CommonConfig for TfaConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            validate_plugin: Self::default_validate_plugin(),
            login_plugins: Self::default_login_plugins(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.enabled && self.validate_plugin.is_empty() {
            bail!("validate_plugin cannot be empty when tfa is enabled");
        }
        if self.login_plugins.iter().any(|p| p.is_empty()) {
            bail!("login_plugins cannot contain empty names");
        }
        if self.login_plugins.contains(&self.validate_plugin) {
            bail!(
                "plugin '{}' cannot be both validate and login plugin",
                self.validate_plugin
            );
        }
        Ok(())
    }
}

impl TfaConfig {
    pub fn default_enabled() -> bool {
        true
    }

    pub fn default_validate_plugin() -> String {
        String::from("tfa_totp")
    }

    pub fn default_login_plugins() -> Vec<String> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::config::tests::scratch_path_set;

    use super::*;

    #[test]
    fn test_complete() {
        let ps = scratch_path_set("tfa_complete");

        let mut cfg = TfaConfig::default();
        cfg.complete(&ps).unwrap();

        let mut cfg = TfaConfig::default();
        cfg.validate_plugin = String::new();
        assert!(cfg.complete(&ps).is_err());

        // Disabled tfa does not need a plugin
        cfg.enabled = false;
        cfg.complete(&ps).unwrap();

        let mut cfg = TfaConfig::default();
        cfg.login_plugins = vec![String::from("tfa_trusted_browser")];
        cfg.complete(&ps).unwrap();

        cfg.login_plugins.push(String::from("tfa_totp"));
        assert!(cfg.complete(&ps).is_err());

        cfg.login_plugins = vec![String::new()];
        assert!(cfg.complete(&ps).is_err());

        fs::remove_dir_all("_test_paths/tfa_complete").unwrap();
    }
}
