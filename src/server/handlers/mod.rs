use actix_web::HttpRequest;

use super::response::Response;

pub mod healthz;
pub mod login;
pub mod tfa;

pub trait Handler {
    /// Handles a routed request. `path` is the part of the uri after the
    /// route prefix, with surrounding slashes removed.
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response;
}
