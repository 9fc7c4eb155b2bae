// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Buttons: building them, and handling presses of every button the bot has ever sent.

use crate::bot::discord::{GuildHost, ticket_settings};
use crate::bot::util::{channel_url, guild_channel, member_display_name};
use crate::bot::{Data, Error};
use crate::error::SafeDisplay;
use crate::support_tree::{self, NodeAction, ROOT, SupportNode};
use crate::ticket::{self, CloseOutcome, CloseRequest, TicketOutcome, TicketRequest};
use poise::serenity_prelude as serenity;
use serenity::{
    ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, RoleId,
};
use tracing::debug;

// discord component ids
pub(in crate::bot) const CLOSE_BUTTON_ID: &str = "persistent_view:message_close";
pub(in crate::bot) const CLOSE_CHANNEL_BUTTON_ID: &str = "persistent_view:message_close_channel";

/// Discord allows at most this many buttons in one action row
const BUTTONS_PER_ROW: usize = 5;

const LOCK: char = '🔒';
const CROSS: char = '❌';

fn tree_button(node: &SupportNode) -> CreateButton {
    CreateButton::new(node.id).label(node.label).style(ButtonStyle::Success)
}

/// The root buttons shown under the support panel, wrapped over as many rows as they need
pub fn panel_rows() -> Vec<CreateActionRow> {
    ROOT.chunks(BUTTONS_PER_ROW)
        .map(|roots| {
            let buttons = roots
                .iter()
                .filter_map(|root| support_tree::node(root.id))
                .map(tree_button)
                .collect();
            CreateActionRow::Buttons(buttons)
        })
        .collect()
}

/// The "Close" button shown in tickets
pub fn close_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CLOSE_BUTTON_ID)
            .label("Close")
            .emoji(LOCK)
            .style(ButtonStyle::Primary),
    ])
}

/// The moderator-only "Close Channel" button shown once a ticket was closed
pub fn close_channel_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CLOSE_CHANNEL_BUTTON_ID)
            .label("Close Channel")
            .emoji(CROSS)
            .style(ButtonStyle::Primary),
    ])
}

/// Handle a button press. Presses of buttons the bot does not know are ignored.
pub async fn handle_component(
    context: &serenity::Context,
    data: &Data,
    interaction: &ComponentInteraction,
) -> Result<(), Error> {
    match interaction.data.custom_id.as_str() {
        CLOSE_BUTTON_ID => close(context, data, interaction, false).await,
        CLOSE_CHANNEL_BUTTON_ID => close(context, data, interaction, true).await,
        custom_id => match support_tree::node(custom_id) {
            Some(node) => tree_node(context, data, interaction, node).await,
            None => {
                debug!("ignoring unknown component {}", custom_id);
                Ok(())
            }
        },
    }
}

async fn tree_node(
    context: &serenity::Context,
    data: &Data,
    interaction: &ComponentInteraction,
    node: &'static SupportNode,
) -> Result<(), Error> {
    match node.action {
        NodeAction::Menu { prompt, children } => {
            let buttons = children
                .iter()
                .filter_map(|id| support_tree::node(id))
                .map(tree_button)
                .collect();
            let message = CreateInteractionResponseMessage::new()
                .ephemeral(true)
                .content(prompt)
                .components(vec![CreateActionRow::Buttons(buttons)]);
            interaction
                .create_response(context, CreateInteractionResponse::Message(message))
                .await?;
            Ok(())
        }
        NodeAction::Ticket { example_image, .. } => {
            interaction.defer_ephemeral(context).await?;

            let config = data.guild_config(interaction.guild_id)?;
            let guild_id = config.guild_id;
            let request = TicketRequest {
                requester: interaction.user.id,
                requester_name: member_display_name(interaction.member.as_ref(), &interaction.user),
                topic: node.topic(),
                instructions: node.ticket_instructions(config.patreon_channel).unwrap_or_default(),
                example_image: example_image.map(str::to_string),
            };
            let host = GuildHost::new(context, config);
            let settings = ticket_settings(context, config);

            let (content, result) = match ticket::open_ticket(&host, &data.guard, &settings, request).await {
                Ok(TicketOutcome::Created(channel)) => (
                    format!(
                        ":envelope:  We have created a support ticket for you, click [here](<{}>) to view.",
                        channel_url(guild_id, channel)
                    ),
                    Ok(()),
                ),
                Ok(TicketOutcome::Existing(channel)) => (
                    format!(
                        ":envelope:  Click [here](<{}>) to view your open ticket.",
                        channel_url(guild_id, channel)
                    ),
                    Ok(()),
                ),
                Ok(TicketOutcome::Denied(denial)) => (denial.to_string(), Ok(())),
                Err(e) if e.is_config() => (e.safe_display().to_string(), Err(e)),
                Err(e) => ("An unexpected error has occurred while opening your ticket.".to_string(), Err(e)),
            };
            let followup = CreateInteractionResponseFollowup::new().ephemeral(true).content(content);
            interaction.create_followup(context, followup).await?;
            result.map_err(Into::into)
        }
    }
}

/// Both close buttons. `delete_channel` is the moderator-only "Close Channel" variant.
async fn close(
    context: &serenity::Context,
    data: &Data,
    interaction: &ComponentInteraction,
    delete_channel: bool,
) -> Result<(), Error> {
    interaction.defer_ephemeral(context).await?;

    let config = data.guild_config(interaction.guild_id)?;
    let channel = guild_channel(context, config.guild_id, interaction.channel_id).await?;
    let actor_roles: &[RoleId] = interaction
        .member
        .as_ref()
        .map(|member| member.roles.as_slice())
        .unwrap_or_default();
    let request = CloseRequest {
        channel: channel.id,
        channel_name: channel.name.clone(),
        channel_topic: channel.topic.clone(),
        channel_category: channel.parent_id,
        actor: interaction.user.id,
        actor_name: member_display_name(interaction.member.as_ref(), &interaction.user),
        actor_roles,
    };
    let host = GuildHost::new(context, config);
    let settings = ticket_settings(context, config);

    let outcome = if delete_channel {
        ticket::close_ticket(&host, &data.guard, &settings, request).await?
    } else {
        ticket::leave_ticket(&host, &data.guard, &settings, request).await?
    };
    match outcome {
        CloseOutcome::Denied(denial) => {
            let followup = CreateInteractionResponseFollowup::new()
                .ephemeral(true)
                .content(denial.to_string());
            interaction.create_followup(context, followup).await?;
        }
        CloseOutcome::Left => {
            let followup = CreateInteractionResponseFollowup::new()
                .ephemeral(true)
                .content("You have closed the ticket.");
            interaction.create_followup(context, followup).await?;
        }
        CloseOutcome::Deleted { owner } => {
            // the channel is gone along with the deferred response, so there is nobody left to tell
            debug!("ticket {} for {:?} closed by {}", channel.id, owner, interaction.user.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_close_ids_do_not_collide_with_tree() {
        assert!(support_tree::node(CLOSE_BUTTON_ID).is_none());
        assert!(support_tree::node(CLOSE_CHANNEL_BUTTON_ID).is_none());
    }

    #[test]
    fn test_panel_rows() {
        let rows = panel_rows();
        assert_eq!(rows.len(), ROOT.len().div_ceil(BUTTONS_PER_ROW));
        let mut total = 0;
        for row in &rows {
            let CreateActionRow::Buttons(buttons) = row else {
                panic!("expected a row of buttons");
            };
            assert!(!buttons.is_empty());
            assert!(buttons.len() <= BUTTONS_PER_ROW);
            total += buttons.len();
        }
        assert_eq!(total, ROOT.len());
    }
}
