pub mod auth;
pub mod config;
pub mod database;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod store;
pub mod utils;

pub use database::Database;
