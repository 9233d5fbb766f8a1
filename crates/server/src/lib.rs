pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod state;
pub mod validation;
