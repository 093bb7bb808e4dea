pub mod cmd;
pub mod config;
pub mod dirs;
pub mod display;
pub mod logs;
pub mod now;
pub mod server;
pub mod time;
pub mod types;
