//! Two thin HTTP services over external providers:
//!
//! - `stock-service`: NSE equity quotes, optionally analyzed by a Groq-hosted model
//! - `transcript-service`: YouTube caption tracks, optionally summarized by a Groq-hosted model
//!
//! Provider adapters sit behind traits so the handlers can be driven with mocks.

pub mod analysis_service;
pub mod api;
pub mod config;
pub mod data_structures;
pub mod groq;
pub mod nse;
pub mod youtube;

#[cfg(test)]
mod test_support;

/// Installs the fmt subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
