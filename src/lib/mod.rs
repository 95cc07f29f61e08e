extern crate tracing;

pub mod auth;
pub mod cli;
pub mod files;
pub mod logger;
pub mod server;
pub mod settings;
pub mod storage;
pub mod system;
