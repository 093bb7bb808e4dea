use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Subcommand};

use crate::config::CommonConfig;
use crate::display::{display_json, display_users};
use crate::now::current_timestamp;
use crate::server::config::ServerConfig;
use crate::server::db::factory::DbFactory;
use crate::server::db::{Database, UserRecord};
use crate::server::guard::AccountRef;
use crate::types::user::{PasswordHash, User};

use super::{ConfigArgs, RunCommand};

/// Manage the users stored in the server database.
#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand)]
pub enum UserCommands {
    Put(PutUserArgs),
    List(ListUsersArgs),
    Delete(DeleteUserArgs),
}

#[async_trait]
impl RunCommand for UserCommand {
    async fn run(&self) -> Result<()> {
        match &self.command {
            UserCommands::Put(args) => args.run().await,
            UserCommands::List(args) => args.run().await,
            UserCommands::Delete(args) => args.run().await,
        }
    }
}

/// Create a user, or reset the password of an existing one. Changing the
/// password invalidates every verification link issued to the user.
#[derive(Args)]
pub struct PutUserArgs {
    /// User name, must be unique.
    pub name: String,

    /// The password used for primary login.
    #[arg(short, long)]
    pub password: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// List users with their last login time.
#[derive(Args)]
pub struct ListUsersArgs {
    /// Print users in JSON format.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Delete a user.
#[derive(Args)]
pub struct DeleteUserArgs {
    pub name: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for PutUserArgs {
    async fn run(&self) -> Result<()> {
        let db = open_db(&self.config)?;
        let created = put_user(&db, &self.name, &self.password)?;
        if created {
            println!("User '{}' created", self.name);
        } else {
            println!("User '{}' updated", self.name);
        }
        Ok(())
    }
}

#[async_trait]
impl RunCommand for ListUsersArgs {
    async fn run(&self) -> Result<()> {
        let db = open_db(&self.config)?;
        let users = list_users(&db)?;
        if self.json {
            return display_json(users);
        }
        display_users(&users);
        Ok(())
    }
}

#[async_trait]
impl RunCommand for DeleteUserArgs {
    async fn run(&self) -> Result<()> {
        let db = open_db(&self.config)?;
        delete_user(&db, &self.name)?;
        println!("User '{}' deleted", self.name);
        Ok(())
    }
}

pub fn open_db(args: &ConfigArgs) -> Result<Arc<Database>> {
    let ps = args.build_path_set()?;
    let cfg: ServerConfig = ps.load_config("server", ServerConfig::default)?;
    DbFactory::new()
        .build_db(&cfg.db)
        .context("init database")
}

/// Returns `true` if the user was created, `false` if the password of an
/// existing user was replaced.
fn put_user(db: &Database, name: &str, password: &str) -> Result<bool> {
    if AccountRef::parse(name).is_none() {
        bail!(
            "invalid user name '{name}', must be 1-{} characters of letters, digits and '._~@-'",
            AccountRef::MAX_LENGTH
        );
    }
    if password.is_empty() {
        bail!("password cannot be empty");
    }

    let password = PasswordHash::generate(password);
    db.with_transaction(|tx| {
        if tx.is_user_exists(name)? {
            tx.update_user_password(name, &password)?;
            return Ok(false);
        }

        tx.create_user(&UserRecord {
            name: name.to_string(),
            password,
            login_time: 0,
            update_time: current_timestamp(),
        })?;
        Ok(true)
    })
}

fn list_users(db: &Database) -> Result<Vec<User>> {
    let records = db.with_transaction(|tx| tx.list_users())?;
    Ok(records.into_iter().map(User::from).collect())
}

fn delete_user(db: &Database, name: &str) -> Result<()> {
    db.with_transaction(|tx| {
        if !tx.is_user_exists(name)? {
            bail!("user '{name}' not found");
        }
        tx.delete_user(name)
    })
}
