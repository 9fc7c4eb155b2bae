// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::bot::commands::util::moderator_guard;
use crate::bot::components::close_row;
use crate::bot::discord::GuildHost;
use crate::bot::util::{cached_guild_channel, guild_config};
use crate::bot::{Context, Error};
use crate::error::HomError;
use crate::guard::{DENIED, GuardKey, Location};
use crate::ticket::{INSIDE_TICKET_MESSAGE, TicketHost as _};
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, CreateMessage, Mentionable as _};

/// Point a user at the support panel instead of answering them in place
#[poise::command(
    context_menu_command = "Support Redirect",
    guild_only,
    install_context = "Guild",
    interaction_context = "Guild"
)]
pub(in crate::bot) async fn support_redirect(context: Context<'_>, message: serenity::Message) -> Result<(), Error> {
    context.defer_ephemeral().await?;
    let config = guild_config(&context)?;
    let location = Location::OutsideTicket("Please continue using this channel to assist the user.");
    if moderator_guard(context, config, location, GuardKey::SupportRedirect(message.id))
        .await?
        .is_none()
    {
        return Ok(());
    }

    let sticky_channel = config.sticky_channel;
    if cached_guild_channel(context.cache(), config.guild_id, sticky_channel).is_none() {
        return Err(HomError::config("The support channel is missing from the server.").into());
    }

    message
        .reply(
            context.serenity_context(),
            format!(
                "{} To allow us to assist you as soon as possible, please check out {}",
                message.author.mention(),
                sticky_channel.mention()
            ),
        )
        .await?;
    let content = format!(
        "{} has been redirected to {}.",
        message.author.mention(),
        sticky_channel.mention()
    );
    context.send(CreateReply::default().ephemeral(true).content(content)).await?;
    Ok(())
}

/// Ask the owner of a ticket whether they still need help
#[poise::command(
    context_menu_command = "Awaiting Response",
    guild_only,
    install_context = "Guild",
    interaction_context = "Guild"
)]
pub(in crate::bot) async fn awaiting_response(context: Context<'_>, _message: serenity::Message) -> Result<(), Error> {
    context.defer_ephemeral().await?;
    let config = guild_config(&context)?;
    let location = Location::InsideTicket(INSIDE_TICKET_MESSAGE);
    let key = GuardKey::AwaitingResponse(context.channel_id());
    let Some(channel) = moderator_guard(context, config, location, key).await? else {
        return Ok(());
    };

    let host = GuildHost::new(context.serenity_context(), config);
    let Some(owner) = host.ticket_owner(channel.id).await? else {
        context
            .send(
                CreateReply::default()
                    .ephemeral(true)
                    .content(format!("{DENIED} Could not determine ticket owner.")),
            )
            .await?;
        return Ok(());
    };

    context
        .send(
            CreateReply::default()
                .ephemeral(true)
                .content("Pinging user to check the channel."),
        )
        .await?;
    let message = CreateMessage::default()
        .content(format!(
            "Hey {}, just checking to see if you still need assistance.\n\n\
            *If you no longer need assistance or the question/concern was resolved, feel free to close the ticket.*",
            owner.id.mention()
        ))
        .components(vec![close_row()]);
    channel.id.send_message(context.serenity_context(), message).await?;
    Ok(())
}
