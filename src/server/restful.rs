use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::web::{self, Bytes, Data, PayloadConfig, ServiceConfig};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::types::response::CommonResponse;

use super::db::Database;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::tfa::{TfaHandler, TFA_PATH};
use super::handlers::Handler;
use super::response::Response;

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,
}

pub struct RestfulContext {
    pub healthz_handler: HealthzHandler,
    pub login_handler: LoginHandler,
    pub tfa_handler: TfaHandler<Database>,
}

impl RestfulServer {
    const HEALTHZ_PATH: &str = "/healthz";
    const LOGIN_PATH: &str = "/login";

    /// Passwords are the only request bodies the server accepts.
    const PAYLOAD_LIMIT: usize = 4096;

    pub fn new(bind: String, ssl: Option<SslAcceptorBuilder>, ctx: Arc<RestfulContext>) -> Self {
        Self {
            ssl,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub async fn run(mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut srv = HttpServer::new(move || {
            App::new()
                .app_data(Data::new(ctx.clone()))
                .configure(Self::routes)
                .default_service(web::route().to(Self::default_handler))
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL). THIS IS DANGEROUS, DO NOT USE IN PRODUCTION");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        if let Err(e) = sd_notify::notify(true, &[NotifyState::Ready]) {
            warn!("Notify systemd failed: {e:#}");
        }
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    fn routes(cfg: &mut ServiceConfig) {
        cfg.app_data(PayloadConfig::new(Self::PAYLOAD_LIMIT))
            .service(web::resource(Self::HEALTHZ_PATH).route(web::get().to(Self::handle_healthz)))
            .service(
                web::scope(Self::LOGIN_PATH)
                    .route("/{path:.*}", web::post().to(Self::handle_login)),
            )
            .service(web::scope(TFA_PATH).route("/{path:.*}", web::get().to(Self::handle_tfa)));
    }

    async fn handle_healthz(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        let body = Self::parse_body(body);

        ctx.healthz_handler.handle("", req, body).into()
    }

    async fn handle_login(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        let path = match Self::parse_path(&req) {
            Some(path) => path,
            None => return Response::bad_request("User name is required").into(),
        };
        let body = Self::parse_body(body);

        ctx.login_handler.handle(&path, req, body).into()
    }

    async fn handle_tfa(req: HttpRequest, ctx: Data<Arc<RestfulContext>>) -> HttpResponse {
        let path = match Self::parse_path(&req) {
            Some(path) => path,
            None => return Response::forbidden().into(),
        };

        ctx.tfa_handler.handle(&path, req, None).into()
    }

    async fn default_handler(req: HttpRequest) -> HttpResponse {
        let path = req.uri().path().to_string();
        let method = req.method().as_str().to_string();
        let message = format!("No route to {method} {path}");
        let ret = CommonResponse {
            code: StatusCode::NOT_FOUND.into(),
            message: Some(message),
        };
        HttpResponse::NotFound().json(ret)
    }

    /// Returns the `{path}` tail of the matched route. The router has already
    /// percent-decoded it, except for `%2F`, `%25` and `%2B`.
    fn parse_path(req: &HttpRequest) -> Option<String> {
        let path = req.match_info().query("path");
        let path = path.trim_matches('/');
        if path.is_empty() {
            return None;
        }

        Some(String::from(path))
    }

    fn parse_body(body: Option<Bytes>) -> Option<Vec<u8>> {
        body.map(|b| b.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::{self, TestRequest};

    use crate::config::CommonConfig;
    use crate::server::db::UserRecord;
    use crate::server::guard::AccessGuard;
    use crate::server::handlers::login::tests::{test_db, test_hasher};
    use crate::server::tfa::TfaConfig;
    use crate::types::response::ResourceResponse;
    use crate::types::tfa::{LoginResponse, TfaFormResponse};
    use crate::types::user::PasswordHash;

    use super::*;

    fn test_context() -> Arc<RestfulContext> {
        let db = test_db();
        db.with_transaction(|tx| {
            tx.create_user(&UserRecord {
                name: String::from("a.b-c_d~e@x"),
                password: PasswordHash::generate("dotted_password"),
                login_time: 0,
                update_time: 0,
            })
        })
        .unwrap();

        let tfa = TfaConfig::default();
        Arc::new(RestfulContext {
            healthz_handler: HealthzHandler::new(),
            login_handler: LoginHandler::new(db.clone(), test_hasher(), tfa.clone()),
            tfa_handler: TfaHandler::new(AccessGuard::new(test_hasher(), db), tfa),
        })
    }

    fn test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(Data::new(test_context()))
            .configure(RestfulServer::routes)
            .default_service(web::route().to(RestfulServer::default_handler))
    }

    #[actix_web::test]
    async fn test_login_and_form() {
        let app = test::init_service(test_app()).await;

        for (name, password) in [("alice", "alice_password"), ("a.b-c_d~e@x", "dotted_password")] {
            let req = TestRequest::post()
                .uri(&format!("/login/{name}"))
                .set_payload(password)
                .to_request();
            let resp: ResourceResponse<LoginResponse> =
                test::call_and_read_body_json(&app, req).await;
            let path = resp.data.unwrap().verify_path.unwrap();

            // The returned path routes back to the same account unchanged
            let req = TestRequest::get().uri(&path).to_request();
            let resp: ResourceResponse<TfaFormResponse> =
                test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp.code, 200);
            assert_eq!(resp.data.unwrap().user, name);
        }

        let req = TestRequest::get().uri("/healthz").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_route_errors() {
        let app = test::init_service(test_app()).await;

        let cases = [
            ("POST", "/login/", StatusCode::BAD_REQUEST),
            ("POST", "/login/%C3%A9lise", StatusCode::BAD_REQUEST),
            ("POST", "/login/a%3Fb", StatusCode::BAD_REQUEST),
            ("POST", "/login/ghost", StatusCode::UNAUTHORIZED),
            ("GET", "/tfa/", StatusCode::FORBIDDEN),
            ("GET", "/tfa/alice", StatusCode::FORBIDDEN),
            ("GET", "/tfa/%C3%A9lise/abc", StatusCode::FORBIDDEN),
            ("GET", "/tfa/ghost/abc", StatusCode::FORBIDDEN),
            ("GET", "/login/alice", StatusCode::NOT_FOUND),
            ("GET", "/none", StatusCode::NOT_FOUND),
        ];

        for (method, uri, expect) in cases {
            let req = match method {
                "POST" => TestRequest::post().set_payload("password"),
                _ => TestRequest::get(),
            };
            let req = req.uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expect, "{method} {uri}");
        }
    }
}
