#![allow(clippy::uninlined_format_args)]

use std::process::ExitCode;
use std::sync::Arc;

use rollcall::commands::{Router, RouterSettings};
use rollcall::core::config::AppConfig;
use rollcall::engine::Controller;
use rollcall::messaging::MessagingClient;
use rollcall::slack::{self, SlackClient};
use tracing::{error, info};

const COMMAND_HELP: &[&str] = &[
    "/tagall [text] - mention every member",
    "/spam<N> <text> - send <text> N times",
    "/stoptag, /stopspam - stop the running command",
    "/ping, /id, /stats - diagnostics",
];

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            rollcall::setup_logging(false);
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    rollcall::setup_logging(config.debug_mode);

    info!("Starting rollcall");
    for line in config.summary_lines() {
        info!("{}", line);
    }
    for line in COMMAND_HELP {
        info!("Command: {}", line);
    }

    let client = Arc::new(SlackClient::new(config.slack_user_token.clone()));
    let self_id = match client.current_user_id().await {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to resolve own account: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Signed in as {}", self_id);

    let controller = Controller::new(config.allow_parallel_commands);
    let router = Arc::new(Router::new(
        client,
        Arc::clone(&controller),
        RouterSettings::from_config(&config, self_id),
    ));

    let result = slack::serve(&config.slack_app_token, router).await;

    info!("Shutting down");
    controller.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Listener error: {}", e);
            ExitCode::FAILURE
        }
    }
}
