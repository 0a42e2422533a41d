// Common library shared by the API server and the integration tests

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mailer;
pub mod models;
pub mod pagination;
pub mod rate_limit;
