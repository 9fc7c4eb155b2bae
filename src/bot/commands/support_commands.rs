// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::bot::components::panel_rows;
use crate::bot::discord::panel_embed;
use crate::bot::util::{check_moderator, guild_config, set_guild_commands, success_reply};
use crate::bot::{Context, Error};
use crate::constants;
use crate::error::HomError;
use poise::CreateReply;
use poise::serenity_prelude::{ChannelId, Colour, CreateEmbed, CreateMessage};

/// Support panel administration
#[poise::command(
    slash_command,
    guild_only,
    subcommands("sync", "send", "version"),
    subcommand_required,
    check = "check_moderator",
    install_context = "Guild",
    interaction_context = "Guild"
)]
pub(in crate::bot) async fn support(_context: Context<'_>) -> Result<(), Error> {
    // parent of the subcommands below, never invoked directly
    Ok(())
}

/// Re-register the bot's commands in this server
#[poise::command(slash_command, guild_only, check = "check_moderator")]
async fn sync(context: Context<'_>) -> Result<(), Error> {
    context.defer_ephemeral().await?;
    let guild_id = context
        .guild_id()
        .ok_or_else(|| HomError::new("expected to be in a guild"))?;
    set_guild_commands(context.http(), guild_id).await?;
    context.send(success_reply("Sync", "Sync completed.")).await?;
    Ok(())
}

/// Send the support panel to a channel
#[poise::command(slash_command, guild_only, check = "check_moderator")]
async fn send(
    context: Context<'_>,
    #[description = "Channel to send the support panel to"]
    #[channel_types("Text")]
    channel: ChannelId,
) -> Result<(), Error> {
    context.defer_ephemeral().await?;
    let config = guild_config(&context)?;
    let message = CreateMessage::default()
        .embed(panel_embed(context.serenity_context(), config))
        .components(panel_rows());
    let message = channel.send_message(context.serenity_context(), message).await?;
    context
        .send(success_reply("Support panel", format!("Done! {}", message.link())))
        .await?;
    Ok(())
}

/// Show the bot's version
#[poise::command(slash_command, guild_only, check = "check_moderator")]
async fn version(context: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::default()
        .title("Version Check")
        .description(constants::DISCORD_BOT_VERSION)
        .color(Colour::BLUE);
    context.send(CreateReply::default().ephemeral(true).embed(embed)).await?;
    Ok(())
}
