pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod response;
pub mod state;
