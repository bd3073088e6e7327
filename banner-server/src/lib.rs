//! HTTP adapter crate: configuration, logging/metrics middleware, token
//! middleware, route handlers, and the `axum::Router` that wires them to
//! `banner-service`, `banner-sql`, `banner-cache`, and `banner-sweeper`.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
