//! # Axum Helpers
//!
//! Shared building blocks for the workspace's Axum services.
//!
//! ## Modules
//!
//! - **[`server`]**: Server setup, common middleware, graceful shutdown
//! - **[`errors`]**: JSON error envelope and fallback handlers

pub mod errors;
pub mod server;

pub use errors::ErrorResponse;
pub use server::{
    ShutdownCoordinator, create_app, create_production_app, shutdown_signal, with_common_layers,
};
