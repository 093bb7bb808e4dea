use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::db::config::DbConfig;
use super::guard::config::GuardConfig;
use super::tfa::TfaConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default = "ServerConfig::default_ssl")]
    pub ssl: bool,

    #[serde(default = "ServerConfig::default_cert_path")]
    pub cert_path: String,

    #[serde(default = "ServerConfig::default_key_path")]
    pub key_path: String,

    #[serde(default = "ServerConfig::default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "ServerConfig::default_workers")]
    pub workers: u64,

    #[serde(default = "DbConfig::default")]
    pub db: DbConfig,

    #[serde(default = "GuardConfig::default")]
    pub guard: GuardConfig,

    #[serde(default = "TfaConfig::default")]
    pub tfa: TfaConfig,
}

impl CommonConfig for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            ssl: Self::default_ssl(),
            cert_path: Self::default_cert_path(),
            key_path: Self::default_key_path(),
            keep_alive_secs: Self::default_keep_alive_secs(),
            workers: Self::default_workers(),
            db: DbConfig::default(),
            guard: GuardConfig::default(),
            tfa: TfaConfig::default(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind cannot be empty");
        }

        self.cert_path = expandenv("cert_path", &self.cert_path)?;
        if self.cert_path.is_empty() {
            let path = ps.pki_path.join("server.crt");
            self.cert_path = format!("{}", path.display());
        }

        self.key_path = expandenv("key_path", &self.key_path)?;
        if self.key_path.is_empty() {
            let path = ps.pki_path.join("server.key");
            self.key_path = format!("{}", path.display());
        }

        self.db.complete(ps).context("db")?;
        self.guard.complete(ps).context("guard")?;
        self.tfa.complete(ps).context("tfa")?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn default_bind() -> String {
        String::from("127.0.0.1:7881")
    }

    pub fn default_ssl() -> bool {
        false
    }

    pub fn default_cert_path() -> String {
        String::new()
    }

    pub fn default_key_path() -> String {
        String::new()
    }

    pub fn default_keep_alive_secs() -> u64 {
        0
    }

    pub fn default_workers() -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::config::tests::scratch_path_set;

    use super::*;

    #[test]
    fn test_load() {
        let ps = scratch_path_set("server_load");
        let path = ps.config_path.join("server.toml");

        // Missing file falls back to defaults
        if path.exists() {
            fs::remove_file(&path).unwrap();
        }
        let cfg: ServerConfig = ps.load_config("server", ServerConfig::default).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:7881");
        assert_eq!(
            cfg.cert_path,
            format!("{}", ps.pki_path.join("server.crt").display())
        );
        assert_eq!(
            cfg.guard.key_path,
            format!("{}", ps.pki_path.join("hash.key").display())
        );
        assert!(cfg.tfa.enabled);

        let toml = r#"
bind = "0.0.0.0:8443"
ssl = true
workers = 4

[guard]
key = "bXVzdGJlc2l4dGVlbmJpdA=="

[tfa]
validate_plugin = "tfa_hotp"
login_plugins = ["tfa_trusted_browser"]
"#;
        fs::write(&path, toml).unwrap();
        let cfg: ServerConfig = ps.load_config("server", ServerConfig::default).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8443");
        assert!(cfg.ssl);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.keep_alive_secs, 0);
        assert_eq!(cfg.guard.key, "bXVzdGJlc2l4dGVlbmJpdA==");
        assert!(!cfg.guard.generate_if_not_exists);
        assert_eq!(cfg.tfa.validate_plugin, "tfa_hotp");
        assert_eq!(cfg.tfa.login_plugins, vec![String::from("tfa_trusted_browser")]);

        fs::write(&path, "bind = \"\"\n").unwrap();
        let result: Result<ServerConfig> = ps.load_config("server", ServerConfig::default);
        assert!(result.is_err());

        fs::write(&path, "[tfa]\nvalidate_plugin = \"\"\n").unwrap();
        let result: Result<ServerConfig> = ps.load_config("server", ServerConfig::default);
        assert!(result.is_err());

        fs::remove_dir_all("_test_paths/server_load").unwrap();
    }
}
