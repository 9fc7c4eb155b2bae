// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

mod commands;
mod components;
mod discord;
mod error_handler;
mod event_handler;
pub mod tasks;
pub mod util;

use crate::bot::error_handler::error_handler;
use crate::bot::event_handler::event_handler;
use crate::config::{Config, GuildConfig};
use crate::error::HomError;
use crate::guard::ActionGuard;
use commands::*;
use poise::{Command, PrefixFrameworkOptions, serenity_prelude as serenity};
use serenity::{GatewayIntents, GuildId};
use std::sync::{Arc, LazyLock};
use tokio::sync::watch;
use tracing::debug;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// commands to be installed into every configured guild
static GUILD_COMMANDS: LazyLock<Vec<Command<Data, Error>>> =
    LazyLock::new(|| vec![support(), support_redirect(), awaiting_response()]);

/// A handle to the running bot, published once the framework is set up
pub type ReadySender = watch::Sender<Option<serenity::Context>>;
pub type ReadyReceiver = watch::Receiver<Option<serenity::Context>>;

/// User data, which is stored and accessible in all command invocations
pub(crate) struct Data {
    config: Arc<Config>,
    guard: Arc<ActionGuard>,
}

impl Data {
    /// Settings for a guild. Interactions from guilds that are not configured are a deployment error.
    fn guild_config(&self, guild_id: Option<GuildId>) -> Result<&GuildConfig, HomError> {
        let guild_id = guild_id.ok_or_else(|| HomError::new("expected to be in a guild"))?;
        self.config
            .guild(guild_id)
            .ok_or_else(|| HomError::config(format!("guild {guild_id} is not configured")))
    }
}

pub async fn run_bot(
    discord_token: String,
    config: Arc<Config>,
    guard: Arc<ActionGuard>,
    ready: ReadySender,
) -> Result<(), Error> {
    // message content is needed for transcripts
    let intents = GatewayIntents::GUILDS
        .union(GatewayIntents::GUILD_MESSAGES)
        .union(GatewayIntents::MESSAGE_CONTENT);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // all commands must appear in this list otherwise poise won't recognize interactions for them
            commands: vec![support(), support_redirect(), awaiting_response()],
            event_handler: |ctx, event, framework, data| Box::pin(event_handler(ctx, event, framework, data)),
            on_error: |e| Box::pin(error_handler(e)),
            initialize_owners: false,
            prefix_options: PrefixFrameworkOptions {
                // the defaults on this make it do things even with no prefix commands configured
                prefix: None,
                mention_as_prefix: false,
                ignore_bots: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready_event, _framework| {
            Box::pin(async move {
                debug!("framework setup as {}", ready_event.user.name);
                ready.send_replace(Some(ctx.clone()));
                debug!("framework setup complete");
                Ok(Data { config, guard })
            })
        })
        .build();

    debug!("framework built");

    let mut client = serenity::ClientBuilder::new(discord_token, intents)
        .framework(framework)
        .await?;

    debug!("client built. Starting…");

    // client.start() does NOT do sharding, which is fine for the handful of guilds this bot serves
    client.start().await?;

    Ok(())
}
