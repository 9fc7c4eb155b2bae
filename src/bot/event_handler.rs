// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::bot::components::handle_component;
use crate::bot::util::set_guild_commands;
use crate::bot::{Data, Error};
use poise::serenity_prelude::{FullEvent, Interaction};
use poise::{FrameworkContext, serenity_prelude as serenity};
use tracing::{debug, error, info, warn};

/// Outer event handler layer for error handling. See [`event_handler_inner`] for the actual event handler implementation.
pub async fn event_handler<'a>(
    context: &'a serenity::Context,
    event: &'a FullEvent,
    framework_context: FrameworkContext<'a, Data, Error>,
    data: &'a Data,
) -> Result<(), Error> {
    let result = event_handler_inner(context, event, framework_context, data).await;
    if let Err(e) = &result {
        error!("Unhandled error in event handler: {:?}", e)
    }
    result
}

/// Inner event handler layer. See [`event_handler`] for the error handling layer.
async fn event_handler_inner<'a>(
    context: &'a serenity::Context,
    event: &'a FullEvent,
    _framework_context: FrameworkContext<'a, Data, Error>,
    data: &'a Data,
) -> Result<(), Error> {
    match event {
        FullEvent::GuildCreate { guild, is_new } => {
            // is_new == Some(false) when we're just restarting the bot
            if !matches!(is_new, Some(false)) {
                info!("GuildCreate guild={} is_new={:?}", guild.id.get(), is_new);
            }

            if data.config.guild(guild.id).is_some() {
                if let Err(e) = set_guild_commands(&context.http, guild.id).await {
                    error!("Error setting guild commands for guild {}: {:?}", guild.id.get(), e);
                }
            } else {
                warn!("guild {} ({}) is not configured, ignoring it", guild.id.get(), guild.name);
            }
        }
        FullEvent::CacheReady { guilds } => {
            debug!("cache ready! {} guilds.", guilds.len());
        }
        FullEvent::Ratelimit { data } => {
            warn!("Ratelimit event: {:?}", data);
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component_interaction),
        } => {
            handle_component(context, data, component_interaction).await?;
        }
        _ => {}
    }
    Ok(())
}
