use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use crate::config::CommonConfig;
use crate::display::display_json;
use crate::server::config::ServerConfig;

use super::{ConfigArgs, RunCommand};

/// Display the server configuration in JSON format, with defaults filled in.
#[derive(Args)]
pub struct ShowConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for ShowConfigArgs {
    async fn run(&self) -> Result<()> {
        let ps = self.config.build_path_set()?;
        let mut cfg = ps.load_config("server", ServerConfig::default)?;
        if !cfg.guard.key.is_empty() {
            cfg.guard.key = String::from("<redacted>");
        }
        display_json(cfg)
    }
}
