pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod security;
pub mod server;
pub mod types;

#[cfg(test)]
pub mod testing;
