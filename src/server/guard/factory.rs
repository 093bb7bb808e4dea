use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use super::config::GuardConfig;
use super::hash::LoginHasher;
use super::key::HashKey;
use super::{AccessGuard, AccountLookup};

pub struct GuardFactory {
    key: HashKey,
}

impl GuardFactory {
    pub fn new(cfg: &GuardConfig) -> Result<Self> {
        if !cfg.key.is_empty() {
            let key = HashKey::decode(&cfg.key).context("parse hash key from config")?;
            return Ok(Self { key });
        }

        let path = Path::new(&cfg.key_path);
        let key = match fs::read_to_string(path) {
            Ok(data) => HashKey::decode(&data)
                .with_context(|| format!("parse hash key file '{}'", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound && cfg.generate_if_not_exists => {
                info!("Hash key not found, generating a new one to '{}'", path.display());
                let key = HashKey::generate();
                Self::write_key(path, &key)?;
                key
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read hash key file '{}'", path.display()))
            }
        };

        Ok(Self { key })
    }

    pub fn build_hasher(&self) -> LoginHasher {
        LoginHasher::new(&self.key)
    }

    pub fn build_guard<L: AccountLookup>(&self, lookup: Arc<L>) -> AccessGuard<L> {
        AccessGuard::new(self.build_hasher(), lookup)
    }

    fn write_key(path: &Path, key: &HashKey) -> Result<()> {
        fs::write(path, key.encode())
            .with_context(|| format!("write hash key file '{}'", path.display()))?;

        let perm = fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perm) {
            warn!("Set permissions for hash key file failed: {e:#}");
        }
        Ok(())
    }
}
