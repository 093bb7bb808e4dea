use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use crate::config::CommonConfig;
use crate::server::config::ServerConfig;
use crate::server::factory::ServerFactory;
use crate::server::restful::RestfulServer;

use super::{ConfigArgs, LogArgs, ServerCommand};

/// Start the HTTP/HTTPS server serving primary login and the guarded second
/// factor verification form.
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

#[async_trait]
impl ServerCommand for ServeArgs {
    async fn build_server(&self) -> Result<RestfulServer> {
        self.log.init()?;
        let ps = self.config.build_path_set()?;
        let cfg: ServerConfig = ps.load_config("server", ServerConfig::default)?;
        let factory = ServerFactory::new(cfg)?;

        factory.build_server()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_build_server() {
        let base = PathBuf::from("_test_paths/serve_build");
        let args = ServeArgs {
            config: ConfigArgs {
                config_path: Some(base.join("config")),
                data_path: Some(base.join("data")),
            },
            log: LogArgs {
                log_level: String::from("error"),
            },
        };

        let fut = args.build_server();
        assert_send(&fut);
        fut.await.unwrap();
        assert!(base.join("config/pki/hash.key").exists());
        assert!(base.join("data/users.db").exists());

        fs::remove_dir_all(&base).unwrap();
    }
}
