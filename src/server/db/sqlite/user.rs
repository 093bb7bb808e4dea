use anyhow::{bail, Result};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::now::current_timestamp;
use crate::server::db::UserRecord;
use crate::types::user::PasswordHash;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    name TEXT PRIMARY KEY NOT NULL,
    password TEXT NOT NULL,
    salt TEXT NOT NULL,
    login_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);
"#;

const SELECT_COLUMNS: &str = "name, password, salt, login_time, update_time";

pub fn create_user_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_user(tx: &Transaction, user: &UserRecord) -> Result<()> {
    let sql = "INSERT INTO user (name, password, salt, login_time, update_time) VALUES (?, ?, ?, ?, ?)";
    debug!("Database create_user: {sql}, {}", user.name);
    tx.execute(
        sql,
        params![
            user.name,
            user.password.hash,
            user.password.salt,
            user.login_time,
            user.update_time,
        ],
    )?;
    Ok(())
}

pub fn get_user(tx: &Transaction, name: &str) -> Result<UserRecord> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM user WHERE name = ?");
    debug!("Database get_user: {sql}, {name}");
    let mut stmt = tx.prepare(&sql)?;
    let record = stmt.query_row(params![name], convert_row).optional()?;
    match record {
        Some(record) => Ok(record),
        None => bail!("user '{name}' not found"),
    }
}

pub fn list_users(tx: &Transaction) -> Result<Vec<UserRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM user ORDER BY update_time DESC, name");
    debug!("Database list_users: {sql}");
    let mut stmt = tx.prepare(&sql)?;
    let users = stmt
        .query_map([], convert_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn is_user_exists(tx: &Transaction, name: &str) -> Result<bool> {
    let mut stmt = tx.prepare("SELECT COUNT(*) FROM user WHERE name = ?")?;
    let count: i64 = stmt.query_row(params![name], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn update_user_password(tx: &Transaction, name: &str, password: &PasswordHash) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE user SET password = ?, salt = ?, update_time = ? WHERE name = ?";
    debug!("Database update_user_password: {sql}, {name}");
    tx.execute(sql, params![password.hash, password.salt, now, name])?;
    Ok(())
}

pub fn update_user_login_time(tx: &Transaction, name: &str, login_time: u64) -> Result<()> {
    let sql = "UPDATE user SET login_time = ? WHERE name = ?";
    debug!("Database update_user_login_time: {sql}, {login_time}, {name}");
    tx.execute(sql, params![login_time, name])?;
    Ok(())
}

pub fn delete_user(tx: &Transaction, name: &str) -> Result<()> {
    let sql = "DELETE FROM user WHERE name = ?";
    debug!("Database delete_user: {sql}, {name}");
    tx.execute(sql, params![name])?;
    Ok(())
}

fn convert_row(row: &Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        name: row.get(0)?,
        password: PasswordHash {
            hash: row.get(1)?,
            salt: row.get(2)?,
        },
        login_time: row.get(3)?,
        update_time: row.get(4)?,
    })
}
