//! Server infrastructure module.
//!
//! This module provides:
//! - Application bootstrap with the shared middleware stack
//! - Graceful shutdown coordination with a bounded cleanup phase
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, with_common_layers};
//! use core_config::server::ServerConfig;
//!
//! let app = with_common_layers(domain_router);
//! create_production_app(app, &ServerConfig::default(), timeout, cleanup).await?;
//! ```

pub mod app;
pub mod shutdown;

pub use app::{create_app, create_production_app, with_common_layers};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
