pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod model;

pub mod database;
pub mod server;
pub mod store;
