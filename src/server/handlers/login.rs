use std::sync::Arc;

use actix_web::HttpRequest;
use anyhow::Result;
use log::{error, info};

use crate::server::db::{Database, UserRecord};
use crate::server::guard::hash::LoginHasher;
use crate::server::guard::AccountRef;
use crate::server::response::{self, Response};
use crate::server::tfa::TfaConfig;
use crate::types::tfa::LoginResponse;

use super::tfa::verify_path;
use super::Handler;

pub struct LoginHandler {
    db: Arc<Database>,
    hasher: LoginHasher,
    tfa: TfaConfig,
}

impl LoginHandler {
    pub fn new(db: Arc<Database>, hasher: LoginHasher, tfa: TfaConfig) -> Self {
        Self { db, hasher, tfa }
    }

    /// Verifies the password and records the login. Returns the updated
    /// record, or `None` if the user does not exist or the password is
    /// wrong.
    fn login(&self, account: &AccountRef, password: &str) -> Result<Option<UserRecord>> {
        self.db.with_transaction(|tx| {
            if !tx.is_user_exists(account.name())? {
                return Ok(None);
            }

            let mut record = tx.get_user(account.name())?;
            if !record.password.verify(password) {
                return Ok(None);
            }

            let login_time = record.next_login_time();
            tx.update_user_login_time(&record.name, login_time)?;
            record.login_time = login_time;

            Ok(Some(record))
        })
    }
}

impl Handler for LoginHandler {
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let account = match AccountRef::parse(path) {
            Some(account) => account,
            None => return Response::bad_request("Invalid user name"),
        };

        let password = match body {
            Some(body) if !body.is_empty() => match String::from_utf8(body) {
                Ok(password) => password,
                Err(_) => {
                    return Response::bad_request("Invalid password");
                }
            },
            _ => {
                return Response::bad_request("Password is required");
            }
        };

        let record = match self.login(&account, &password) {
            Ok(Some(record)) => record,
            Ok(None) => return Response::unauthenticated(response::AUTHN_ERROR),
            Err(e) => {
                error!("Failed to login user '{}': {e:#}", account.name());
                return Response::error(response::DATABASE_ERROR);
            }
        };

        let client_ip = req
            .connection_info()
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        info!("User '{}' logged in, from '{client_ip}'", record.name);

        let verify_path = if self.tfa.enabled {
            let hash = self.hasher.derive(&record.snapshot());
            Some(verify_path(&record.name, &hash))
        } else {
            None
        };

        Response::json(LoginResponse {
            user: record.name,
            tfa_required: self.tfa.enabled,
            verify_path,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    use crate::config::CommonConfig;
    use crate::server::guard::key::HashKey;
    use crate::server::handlers::tests::{read_data, read_error};
    use crate::types::user::PasswordHash;

    use super::*;

    pub fn test_hasher() -> LoginHasher {
        let key = HashKey::new(b"mustbesixteenbit".to_vec()).unwrap();
        LoginHasher::new(&key)
    }

    pub fn test_db() -> Arc<Database> {
        let db = Database::new_test();
        db.with_transaction(|tx| {
            tx.create_user(&UserRecord {
                name: String::from("alice"),
                password: PasswordHash::generate("alice_password"),
                login_time: 0,
                update_time: 0,
            })
        })
        .unwrap();
        Arc::new(db)
    }

    pub fn login(handler: &LoginHandler, name: &str, password: &str) -> Response {
        let req = TestRequest::default().to_http_request();
        handler.handle(name, req, Some(password.as_bytes().to_vec()))
    }

    fn login_time(db: &Database, name: &str) -> u64 {
        db.with_transaction(|tx| tx.get_user(name)).unwrap().login_time
    }

    #[test]
    fn test_login() {
        let db = test_db();
        let handler = LoginHandler::new(db.clone(), test_hasher(), TfaConfig::default());

        let resp: LoginResponse = read_data(login(&handler, "alice", "alice_password"));
        assert_eq!(resp.user, "alice");
        assert!(resp.tfa_required);

        let record = db.with_transaction(|tx| tx.get_user("alice")).unwrap();
        assert!(record.login_time > 0);
        let hash = test_hasher().derive(&record.snapshot());
        assert_eq!(resp.verify_path, Some(format!("/tfa/alice/{hash}")));

        // Logging in again in the same second still issues a new path
        let second: LoginResponse = read_data(login(&handler, "alice", "alice_password"));
        assert!(login_time(&db, "alice") > record.login_time);
        assert_ne!(second.verify_path, resp.verify_path);
    }

    #[test]
    fn test_login_failed() {
        let db = test_db();
        let handler = LoginHandler::new(db.clone(), test_hasher(), TfaConfig::default());

        let (status, wrong_password) = read_error(login(&handler, "alice", "wrong"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(login_time(&db, "alice"), 0);

        // Unknown users get exactly the same answer
        let (status, unknown_user) = read_error(login(&handler, "ghost", "alice_password"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_user);

        let req = TestRequest::default().to_http_request();
        let (status, _) = read_error(handler.handle("alice", req, None));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = TestRequest::default().to_http_request();
        let (status, _) = read_error(handler.handle("alice", req, Some(vec![0xff, 0xfe])));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = read_error(login(&handler, "ali ce", "alice_password"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_login_tfa_disabled() {
        let db = test_db();
        let mut tfa = TfaConfig::default();
        tfa.enabled = false;
        let handler = LoginHandler::new(db.clone(), test_hasher(), tfa);

        let resp: LoginResponse = read_data(login(&handler, "alice", "alice_password"));
        assert!(!resp.tfa_required);
        assert_eq!(resp.verify_path, None);

        // The login is still recorded
        assert!(login_time(&db, "alice") > 0);
    }
}
