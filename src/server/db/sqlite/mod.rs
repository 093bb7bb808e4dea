mod user;

pub mod config;
pub mod factory;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::types::user::PasswordHash;

use super::{Connection, Transaction, UserRecord};

/// SQLite-based user store. Supports both file-based and in-memory
/// databases.
pub struct Sqlite {
    conn: RawConnection,
}

/// SQLite transaction for executing database operations
pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl Sqlite {
    /// Opens a SQLite database file. Creates one if it doesn't exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Creates a new in-memory database. Content is lost when the program
    /// exits, use it for testing only.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(db: &RawConnection) -> Result<()> {
        user::create_user_tables(db)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for Sqlite {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        user::create_user(&self.tx, user)
    }

    fn get_user(&self, name: &str) -> Result<UserRecord> {
        user::get_user(&self.tx, name)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        user::list_users(&self.tx)
    }

    fn is_user_exists(&self, name: &str) -> Result<bool> {
        user::is_user_exists(&self.tx, name)
    }

    fn update_user_password(&self, name: &str, password: &PasswordHash) -> Result<()> {
        user::update_user_password(&self.tx, name, password)
    }

    fn update_user_login_time(&self, name: &str, login_time: u64) -> Result<()> {
        user::update_user_login_time(&self.tx, name, login_time)
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        user::delete_user(&self.tx, name)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
