use std::sync::Arc;

use anyhow::{Context, Result};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslMethod};

use super::config::ServerConfig;
use super::db::factory::DbFactory;
use super::db::Database;
use super::guard::factory::GuardFactory;
use super::guard::hash::LoginHasher;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::tfa::TfaHandler;
use super::restful::{RestfulContext, RestfulServer};

pub struct ServerFactory {
    db: Arc<Database>,
    guard_factory: GuardFactory,
    cfg: ServerConfig,
}

impl ServerFactory {
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let db_factory = DbFactory::new();
        let db = db_factory.build_db(&cfg.db).context("init database")?;
        let guard_factory = GuardFactory::new(&cfg.guard).context("init hash key")?;
        Ok(Self {
            db,
            guard_factory,
            cfg,
        })
    }

    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    pub fn build_hasher(&self) -> LoginHasher {
        self.guard_factory.build_hasher()
    }

    pub fn build_server(&self) -> Result<RestfulServer> {
        let ssl = self.build_ssl()?;
        let ctx = self.build_context()?;

        let mut srv = RestfulServer::new(self.cfg.bind.clone(), ssl, ctx);
        if self.cfg.keep_alive_secs > 0 {
            srv.set_keep_alive_secs(self.cfg.keep_alive_secs);
        }
        if self.cfg.workers > 0 {
            srv.set_workers(self.cfg.workers);
        }

        Ok(srv)
    }

    pub fn build_ssl(&self) -> Result<Option<SslAcceptorBuilder>> {
        if !self.cfg.ssl {
            return Ok(None);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&self.cfg.key_path, openssl::ssl::SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&self.cfg.cert_path)
            .context("load ssl cert file")?;

        Ok(Some(builder))
    }

    pub fn build_context(&self) -> Result<Arc<RestfulContext>> {
        let healthz_handler = HealthzHandler::new();

        let login_handler =
            LoginHandler::new(self.db.clone(), self.build_hasher(), self.cfg.tfa.clone());

        let guard = self.guard_factory.build_guard(self.db.clone());
        let tfa_handler = TfaHandler::new(guard, self.cfg.tfa.clone());

        let ctx = RestfulContext {
            healthz_handler,
            login_handler,
            tfa_handler,
        };
        Ok(Arc::new(ctx))
    }
}
