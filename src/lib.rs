//! Construction-bid engine: artifact classification and project bundling,
//! a price catalog reconciled against a remote store, and a bid estimator,
//! served over HTTP with axum.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
