use actix_web::HttpRequest;
use log::error;

use crate::server::guard::{AccessGuard, AccountLookup, AccountRef, Decision};
use crate::server::response::{self, Response};
use crate::server::tfa::TfaConfig;
use crate::types::tfa::TfaFormResponse;

use super::Handler;

pub const TFA_PATH: &str = "/tfa";

/// Path of the verification form for `user`, guarded by `hash`.
pub fn verify_path(user: &str, hash: &str) -> String {
    format!("{TFA_PATH}/{user}/{hash}")
}

/// Serves the second factor verification form. Every request passes the
/// access guard first; nothing about the account is produced on deny.
pub struct TfaHandler<L: AccountLookup> {
    guard: AccessGuard<L>,
    tfa: TfaConfig,
}

impl<L: AccountLookup> TfaHandler<L> {
    pub fn new(guard: AccessGuard<L>, tfa: TfaConfig) -> Self {
        Self { guard, tfa }
    }
}

impl<L: AccountLookup> Handler for TfaHandler<L> {
    fn handle(&self, path: &str, _req: HttpRequest, _body: Option<Vec<u8>>) -> Response {
        // Missing hash or malformed user names can never match an account
        let (user, hash) = match path.split_once('/') {
            Some(parts) => parts,
            None => return Response::forbidden(),
        };
        let account = match AccountRef::parse(user) {
            Some(account) => account,
            None => return Response::forbidden(),
        };

        match self.guard.check(&account, hash) {
            Ok(Decision::Allow) => {}
            Ok(Decision::Deny) => return Response::forbidden(),
            Err(e) => {
                error!("Failed to check verification hash: {e:#}");
                return Response::error(response::GUARD_ERROR);
            }
        }

        Response::json(TfaFormResponse {
            user: account.name().to_string(),
            validate_plugin: self.tfa.validate_plugin.clone(),
            login_plugins: self.tfa.login_plugins.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    use crate::config::CommonConfig;
    use crate::server::db::Database;
    use crate::server::guard::tests::test_guard;
    use crate::server::guard::AccountSnapshot;
    use crate::server::handlers::login::tests::{login, test_db, test_hasher};
    use crate::server::handlers::login::LoginHandler;
    use crate::server::handlers::tests::{read_data, read_error};
    use crate::types::tfa::LoginResponse;
    use crate::types::user::PasswordHash;

    use super::*;

    fn get_form<L: AccountLookup>(handler: &TfaHandler<L>, path: &str) -> Response {
        let path = path.strip_prefix(TFA_PATH).unwrap().trim_matches('/');
        let req = TestRequest::default().to_http_request();
        handler.handle(path, req, None)
    }

    fn assert_denied(resp: Response) {
        let (status, message) = read_error(resp);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "Access denied");
    }

    fn build_handlers(db: Arc<Database>, tfa: TfaConfig) -> (LoginHandler, TfaHandler<Database>) {
        let login = LoginHandler::new(db.clone(), test_hasher(), tfa.clone());
        let guard = AccessGuard::new(test_hasher(), db);
        (login, TfaHandler::new(guard, tfa))
    }

    #[test]
    fn test_verify_path() {
        assert_eq!(verify_path("alice", "abc"), "/tfa/alice/abc");
    }

    #[test]
    fn test_form() {
        let mut tfa = TfaConfig::default();
        tfa.login_plugins = vec![String::from("tfa_trusted_browser")];
        let (login_handler, tfa_handler) = build_handlers(test_db(), tfa);

        let resp: LoginResponse = read_data(login(&login_handler, "alice", "alice_password"));
        let path = resp.verify_path.unwrap();

        let form: TfaFormResponse = read_data(get_form(&tfa_handler, &path));
        assert_eq!(
            form,
            TfaFormResponse {
                user: String::from("alice"),
                validate_plugin: String::from("tfa_totp"),
                login_plugins: vec![String::from("tfa_trusted_browser")],
            }
        );

        // The link can be opened any number of times until the next login
        let again: TfaFormResponse = read_data(get_form(&tfa_handler, &path));
        assert_eq!(again, form);
    }

    #[test]
    fn test_invalidated_by_login() {
        let (login_handler, tfa_handler) = build_handlers(test_db(), TfaConfig::default());

        let first: LoginResponse = read_data(login(&login_handler, "alice", "alice_password"));
        let first = first.verify_path.unwrap();
        let _: TfaFormResponse = read_data(get_form(&tfa_handler, &first));

        let second: LoginResponse = read_data(login(&login_handler, "alice", "alice_password"));
        let second = second.verify_path.unwrap();

        assert_denied(get_form(&tfa_handler, &first));
        let _: TfaFormResponse = read_data(get_form(&tfa_handler, &second));
    }

    #[test]
    fn test_password_change() {
        let db = test_db();
        let (login_handler, tfa_handler) = build_handlers(db.clone(), TfaConfig::default());

        let resp: LoginResponse = read_data(login(&login_handler, "alice", "alice_password"));
        let path = resp.verify_path.unwrap();

        db.with_transaction(|tx| {
            let password = PasswordHash::generate("new_password");
            tx.update_user_password("alice", &password)
        })
        .unwrap();

        assert_denied(get_form(&tfa_handler, &path));
    }

    #[test]
    fn test_denied() {
        let (login_handler, tfa_handler) = build_handlers(test_db(), TfaConfig::default());
        let resp: LoginResponse = read_data(login(&login_handler, "alice", "alice_password"));
        let path = resp.verify_path.unwrap();
        let hash = path.rsplit('/').next().unwrap();

        assert_denied(get_form(&tfa_handler, "/tfa/ghost-user-does-not-exist/anything"));
        assert_denied(get_form(&tfa_handler, &verify_path("ghost-user-does-not-exist", hash)));
        assert_denied(get_form(&tfa_handler, "/tfa/alice/anything"));
        assert_denied(get_form(&tfa_handler, "/tfa/alice"));
        assert_denied(get_form(&tfa_handler, "/tfa/alice/"));
        assert_denied(get_form(&tfa_handler, &format!("{path}/extra")));
        // Decoded names outside the account charset
        assert_denied(get_form(&tfa_handler, &format!("/tfa/ali ce/{hash}")));
        assert_denied(get_form(&tfa_handler, &format!("/tfa/élise/{hash}")));
    }

    #[test]
    fn test_lookup_error() {
        let (guard, lookup) = test_guard();
        let alice = AccountSnapshot {
            username: String::from("alice"),
            credential_secret: String::from("h1"),
            last_login: 1000,
        };
        let hash = guard.hasher().derive(&alice);
        lookup.put(alice);

        let handler = TfaHandler::new(guard, TfaConfig::default());
        let path = verify_path("alice", &hash);
        let _: TfaFormResponse = read_data(get_form(&handler, &path));

        lookup.set_fail(true);
        let (status, message) = read_error(get_form(&handler, &path));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("alice"));
    }
}
