mod client;
mod config;

pub use client::MilvusDatabase;
pub use config::MilvusConfig;
