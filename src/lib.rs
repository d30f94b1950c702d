//! Rollcall - a self-hosted Slack agent that mentions every member of a
//! channel and sends paced bulk messages on behalf of its administrators.
//!
//! # Architecture
//!
//! The crate is split into:
//! - `core`: configuration, authorization, and the shared data model
//! - `messaging`: the backend-neutral [`messaging::MessagingClient`] trait
//! - `engine`: the single-flight controller, pacer, and bulk executors
//! - `commands`: parsing and routing of inbound commands
//! - `slack`: the Slack Web API client and Socket Mode listener
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rollcall::commands::{Router, RouterSettings};
//! use rollcall::core::config::AppConfig;
//! use rollcall::engine::Controller;
//! use rollcall::messaging::MessagingClient;
//! use rollcall::slack::SlackClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     rollcall::setup_logging(false);
//!
//!     let config = AppConfig::from_env()?;
//!     let client = Arc::new(SlackClient::new(config.slack_user_token.clone()));
//!     let self_id = client.current_user_id().await?;
//!
//!     let controller = Controller::new(config.allow_parallel_commands);
//!     let router = Arc::new(Router::new(
//!         client,
//!         Arc::clone(&controller),
//!         RouterSettings::from_config(&config, self_id),
//!     ));
//!
//!     rollcall::slack::serve(&config.slack_app_token, router).await?;
//!     controller.shutdown();
//!     Ok(())
//! }
//! ```
// Module declarations
pub mod commands;
pub mod core;
pub mod engine;
pub mod errors;
pub mod messaging;
pub mod slack;

pub use errors::BotError;

/// Configure structured logging with JSON format.
///
/// `debug` lowers the level filter from INFO to DEBUG. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// rollcall::setup_logging(false);
/// ```
pub fn setup_logging(debug: bool) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(level)
        .try_init();
}
