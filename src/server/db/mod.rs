mod sqlite;

#[cfg(test)]
mod tests;

pub mod config;
pub mod factory;

use std::sync::Mutex;

use anyhow::{bail, Result};
use sqlite::{Sqlite, SqliteTransaction};

use crate::now::current_timestamp;
use crate::server::guard::{AccountLookup, AccountRef, AccountSnapshot};
use crate::types::user::{PasswordHash, User};

/// Database connection trait that can create transactions
pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    /// Creates a new transaction from the connection
    fn transaction(&'a mut self) -> Result<T>;
}

/// Database transaction trait that defines all user store operations
pub trait Transaction {
    /// Creates a new user record
    fn create_user(&self, user: &UserRecord) -> Result<()>;
    /// Retrieves a user by name, fails if the user does not exist
    fn get_user(&self, name: &str) -> Result<UserRecord>;
    /// Lists all users, most recently updated first
    fn list_users(&self) -> Result<Vec<UserRecord>>;
    /// Checks if a user exists
    fn is_user_exists(&self, name: &str) -> Result<bool>;
    /// Updates user's password hash and salt
    fn update_user_password(&self, name: &str, password: &PasswordHash) -> Result<()>;
    /// Sets the time of the user's last completed primary login
    fn update_user_login_time(&self, name: &str, login_time: u64) -> Result<()>;
    /// Deletes a user by name
    fn delete_user(&self, name: &str) -> Result<()>;

    /// Commits the transaction
    fn commit(self) -> Result<()>;
    /// Rolls back the transaction
    fn rollback(self) -> Result<()>;
}

/// Record structure for user information
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// User's unique name
    pub name: String,
    /// Password hash and salt
    pub password: PasswordHash,
    /// Last completed primary login, 0 for never
    pub login_time: u64,
    /// Last update timestamp
    pub update_time: u64,
}

impl UserRecord {
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            username: self.name.clone(),
            credential_secret: self.password.hash.clone(),
            last_login: self.login_time,
        }
    }

    /// Login time to record for a login completed now. Never reuses the
    /// previous value, so every login rotates the verification hash even
    /// within the same second.
    pub fn next_login_time(&self) -> u64 {
        current_timestamp().max(self.login_time + 1)
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            name: record.name,
            login_time: record.login_time,
            update_time: record.update_time,
        }
    }
}

/// User store shared by the server and the management commands.
pub struct Database {
    conn: Mutex<UnionConnection>,
}

/// Enum representing different supported database connections
pub enum UnionConnection {
    /// SQLite database connection
    Sqlite(Sqlite),
}

enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        let sqlite = Sqlite::memory().unwrap();
        Self::new(UnionConnection::Sqlite(sqlite))
    }

    /// Executes `f` within a transaction. The transaction is committed when
    /// `f` returns `Ok` and rolled back otherwise; the result of `f` is passed
    /// through unless commit or rollback fails.
    ///
    /// # Example
    /// ```ignore
    /// let exists = db.with_transaction(|tx| tx.is_user_exists("alice"))?;
    /// ```
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock database: {e:#}"),
        };
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

impl AccountLookup for Database {
    fn find_account(&self, account: &AccountRef) -> Result<Option<AccountSnapshot>> {
        self.with_transaction(|tx| {
            if !tx.is_user_exists(account.name())? {
                return Ok(None);
            }
            let record = tx.get_user(account.name())?;
            Ok(Some(record.snapshot()))
        })
    }
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(sqlite) => sqlite.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_user(user),
        }
    }

    fn get_user(&self, name: &str) -> Result<UserRecord> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user(name),
        }
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_users(),
        }
    }

    fn is_user_exists(&self, name: &str) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.is_user_exists(name),
        }
    }

    fn update_user_password(&self, name: &str, password: &PasswordHash) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_user_password(name, password),
        }
    }

    fn update_user_login_time(&self, name: &str, login_time: u64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_user_login_time(name, login_time),
        }
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user(name),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
