use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;

use crate::config::CommonConfig;
use crate::server::config::ServerConfig;
use crate::server::db::Database;
use crate::server::factory::ServerFactory;
use crate::server::guard::hash::LoginHasher;
use crate::server::handlers::tfa::verify_path;

use super::{ConfigArgs, RunCommand};

/// Print the verification path currently valid for a user. The path stops
/// working once the user logs in again or changes the password.
#[derive(Args)]
pub struct HashArgs {
    /// User name.
    pub name: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for HashArgs {
    async fn run(&self) -> Result<()> {
        let ps = self.config.build_path_set()?;
        let cfg: ServerConfig = ps.load_config("server", ServerConfig::default)?;
        let factory = ServerFactory::new(cfg)?;
        let hasher = factory.build_hasher();

        let path = current_verify_path(&factory.db(), &hasher, &self.name)?;
        println!("{path}");
        Ok(())
    }
}

fn current_verify_path(db: &Database, hasher: &LoginHasher, name: &str) -> Result<String> {
    let record = db.with_transaction(|tx| {
        if !tx.is_user_exists(name)? {
            bail!("user '{name}' not found");
        }
        tx.get_user(name)
    })?;
    let hash = hasher.derive(&record.snapshot());
    Ok(verify_path(&record.name, &hash))
}

#[cfg(test)]
mod tests {
    use crate::server::db::UserRecord;
    use crate::server::guard::key::HashKey;
    use crate::types::user::PasswordHash;

    use super::*;

    #[test]
    fn test_current_verify_path() {
        let db = Database::new_test();
        let key = HashKey::new(b"mustbesixteenbit".to_vec()).unwrap();
        let hasher = LoginHasher::new(&key);

        let record = UserRecord {
            name: String::from("alice"),
            password: PasswordHash::generate("password"),
            login_time: 1000,
            update_time: 0,
        };
        db.with_transaction(|tx| tx.create_user(&record)).unwrap();

        let path = current_verify_path(&db, &hasher, "alice").unwrap();
        let hash = hasher.derive(&record.snapshot());
        assert_eq!(path, format!("/tfa/alice/{hash}"));

        db.with_transaction(|tx| tx.update_user_login_time("alice", 1001))
            .unwrap();
        assert_ne!(current_verify_path(&db, &hasher, "alice").unwrap(), path);

        assert!(current_verify_path(&db, &hasher, "ghost").is_err());
    }
}
