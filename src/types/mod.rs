pub mod healthz;
pub mod response;
pub mod tfa;
pub mod user;
