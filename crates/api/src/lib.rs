//! HTTP API: webhook endpoints, request metadata extraction and service wiring.

pub mod app;
pub mod context;
pub mod middleware;
