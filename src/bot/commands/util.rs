// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Utils used by bot commands.

use crate::bot::util::guild_channel;
use crate::bot::{Context, Error};
use crate::config::GuildConfig;
use crate::guard::{GuardCheck, GuardKey, Location};
use poise::CreateReply;
use poise::serenity_prelude::{GuildChannel, RoleId};

/// Run the moderator guard for an action taken in the channel the command was used in.
///
/// Returns the channel if the action may proceed. Denials are answered here.
pub(super) async fn moderator_guard(
    context: Context<'_>,
    config: &GuildConfig,
    location: Location,
    key: GuardKey,
) -> Result<Option<GuildChannel>, Error> {
    let channel = guild_channel(context.serenity_context(), config.guild_id, context.channel_id()).await?;
    let member = context.author_member().await;
    let actor_roles: &[RoleId] = member.as_deref().map(|member| member.roles.as_slice()).unwrap_or_default();
    let check = GuardCheck {
        actor_roles,
        required_role: Some(config.moderator_role),
        channel_category: channel.parent_id,
        ticket_category: config.ticket_category,
        location,
        key,
    };
    match context.data().guard.check(&check) {
        Ok(()) => Ok(Some(channel)),
        Err(denial) => {
            context
                .send(CreateReply::default().ephemeral(true).content(denial.to_string()))
                .await?;
            Ok(None)
        }
    }
}
