mod config;
mod hash;
mod serve;
mod user;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};

use crate::config::PathSet;
use crate::logs;
use crate::server::restful::RestfulServer;

#[async_trait]
pub trait RunCommand {
    async fn run(&self) -> Result<()>;
}

/// Commands that start a long running server. The server is built inside
/// the command and run by [`App::run`], since actix futures are not `Send`.
#[async_trait]
pub trait ServerCommand {
    async fn build_server(&self) -> Result<RestfulServer>;
}

#[derive(Parser)]
#[command(author, version = env!("TFAGUARD_VERSION"), about)]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Config(config::ShowConfigArgs),
    Hash(hash::HashArgs),
    Serve(serve::ServeArgs),
    User(user::UserCommand),
}

impl App {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Config(args) => args.run().await,
            Commands::Hash(args) => args.run().await,
            Commands::Serve(args) => {
                let srv = args.build_server().await?;
                srv.run().await
            }
            Commands::User(args) => args.run().await,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The config directory, holding server.toml and the pki directory.
    /// Default: $TFAGUARD_CONFIG, /etc/tfaguard (root) or ~/.config/tfaguard
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// The data directory, holding the user database.
    /// Default: $TFAGUARD_DATA, /var/lib/tfaguard (root) or ~/.local/share/tfaguard
    #[arg(long)]
    pub data_path: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn build_path_set(&self) -> Result<PathSet> {
        PathSet::new(self.config_path.clone(), self.data_path.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// The log level, one of "error", "warn", "info" and "debug".
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl LogArgs {
    pub fn init(&self) -> Result<()> {
        logs::init(&self.log_level)
    }
}
