pub mod handlers;
mod response;

pub mod config;
pub mod db;
pub mod factory;
pub mod guard;
pub mod restful;
pub mod tfa;
