mod client;
mod config;

pub use client::WeaviateDatabase;
pub use config::WeaviateConfig;
