pub mod access;
pub mod auth;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod tenancy;

#[cfg(test)]
pub mod testing;
