
use anyhow::{bail, Result};

use crate::types::user::PasswordHash;

use super::{Database, UserRecord};

pub fn run_all_tests(db: &Database) {
    user::run_user_tests(db);

    test_rollback(db);
}

fn test_rollback(db: &Database) {
    let result: Result<()> = db.with_transaction(|tx| {
        tx.create_user(&UserRecord {
            name: String::from("none"),
            password: PasswordHash::generate("test123"),
            login_time: 0,
            update_time: 50,
        })
        .unwrap();

        bail!("rollback");
    });
    assert!(result.is_err());

    db.with_transaction(|tx| {
        assert!(!tx.is_user_exists("none")?);
        Ok(())
    })
    .unwrap();
}
