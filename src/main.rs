// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::cli_args::HomArgs;
use crate::config::Config;
use crate::guard::ActionGuard;
use crate::panel::PanelTracker;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bot;
mod cli_args;
mod config;
mod error;
mod guard;
mod panel;
mod support_tree;
mod ticket;
mod transcript;

/// constants generated in build.rs
pub mod constants {
    include!(env!("CONSTANTS_PATH"));
}

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    // a missing .env file is normal
    dotenvy::dotenv().ok();
    let cli_args = HomArgs::parse();
    match cli_args.command {
        #[allow(clippy::print_stdout, clippy::print_stderr)]
        Some(cli_args::Command::CheckConfig) => match Config::load(cli_args.config.as_deref()) {
            Ok(config) => {
                for guild in &config.guilds {
                    println!(
                        "guild {}: sticky channel {}, ticket category {}, moderator role {}, log channel {}, questions channel {}, patreon channel {}",
                        guild.guild_id,
                        guild.sticky_channel,
                        guild.ticket_category,
                        guild.moderator_role,
                        guild.log_channel,
                        guild.questions_channel,
                        guild.patreon_channel
                    );
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("invalid configuration: {e}");
                ExitCode::FAILURE
            }
        },
        None => {
            // Init logging
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .or_else(|_| EnvFilter::try_new("info,hom=debug,serenity::gateway::shard=error"))
                        .expect("Failed to create EnvFilter"),
                )
                .init();

            info!(
                "starting {} {} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                constants::GIT_COMMIT_HASH
            );

            let config = match Config::load(cli_args.config.as_deref()) {
                Ok(config) => Arc::new(config),
                Err(e) => {
                    error!("invalid configuration: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let Some(discord_token) = cli_args.discord_token else {
                error!("discord token must be provided either via --discord-token or the DISCORD_TOKEN environment variable");
                return ExitCode::FAILURE;
            };

            let guard = Arc::new(ActionGuard::default());
            let panels = Arc::new(PanelTracker::default());
            let (ready_sender, ready_receiver) = watch::channel(None);

            let bot_config = config.clone();
            let bot_guard = guard.clone();
            let result = Toplevel::new(async move |subsystem| {
                subsystem.start(SubsystemBuilder::new("Discord bot", move |handle| {
                    bot_subsystem(handle, discord_token, bot_config, bot_guard, ready_sender)
                }));
                subsystem.start(SubsystemBuilder::new("Support panel", move |handle| {
                    bot::tasks::panel_subsystem(handle, config, panels, ready_receiver)
                }));
                subsystem.start(SubsystemBuilder::new("Guard sweeper", move |handle| {
                    bot::tasks::guard_sweeper_subsystem(handle, guard)
                }));
            })
            .catch_signals()
            .handle_shutdown_requests(Duration::from_millis(1000))
            .await;

            match result {
                Ok(()) => {
                    info!("shut down cleanly");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("shutting down after an error: {:?}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn bot_subsystem(
    subsystem: SubsystemHandle,
    discord_token: String,
    config: Arc<Config>,
    guard: Arc<ActionGuard>,
    ready: bot::ReadySender,
) -> Result<(), Error> {
    tokio::select! {
        _ = subsystem.on_shutdown_requested() => {
            info!("shutdown requested");
            Ok(())
        },
        result = bot::run_bot(discord_token, config, guard, ready) => {
            subsystem.request_shutdown();
            result
        }
    }
}
