//! Redator Gateway - HTTP surface for the article pipeline

pub mod server;

pub use server::{router, start_server, ApiError, AppState, GenerateRequest};
