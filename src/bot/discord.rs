// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Serenity-backed implementations of the ticket, transcript and panel seams.

use crate::bot::components::{close_channel_row, close_row, panel_rows};
use crate::bot::util::{cached_guild_channel, member_display_name};
use crate::config::GuildConfig;
use crate::error::HomError;
use crate::panel::{PANEL_TITLE, PanelCandidate, PanelChannel};
use crate::support_tree;
use crate::ticket::{LogEntry, NewTicketChannel, TicketChannelInfo, TicketGreeting, TicketHost, TicketOwner, TicketSettings};
use crate::transcript::{HistorySource, TranscriptEntry};
use poise::serenity_prelude as serenity;
use serenity::{
    ChannelId, ChannelType, Colour, CreateAttachment, CreateChannel, CreateEmbed, CreateEmbedFooter, CreateMessage,
    GetMessages, GuildChannel, GuildId, Mentionable, Message, MessageId, PermissionOverwriteType, RoleId, User, UserId,
};
use tracing::debug;

const TICKET_FOOTER: &str =
    "This channel is only visible to you and our moderators. If your question has been answered, feel free to close the ticket.";

const PANEL_FOOTER: &str =
    "As a reminder, all moderators and admins in this server volunteer to help in their free time.\nWe appreciate your patience.";

/// Values that are the same for every ticket in a guild
pub fn ticket_settings(context: &serenity::Context, config: &GuildConfig) -> TicketSettings {
    let (bot_user, bot_name) = {
        let current_user = context.cache.current_user();
        (current_user.id, current_user.name.clone())
    };
    TicketSettings {
        everyone_role: RoleId::new(config.guild_id.get()),
        ticket_category: config.ticket_category,
        moderator_role: config.moderator_role,
        bot_user,
        bot_name,
    }
}

/// The support panel embed
pub fn panel_embed(context: &serenity::Context, config: &GuildConfig) -> CreateEmbed {
    let questions_exist = cached_guild_channel(&context.cache, config.guild_id, config.questions_channel).is_some();
    let questions = if questions_exist {
        format!(
            "\n\nIf you'd like to ask a quick question, you may do so in the {} channel.",
            config.questions_channel.mention()
        )
    } else {
        String::new()
    };
    CreateEmbed::default()
        .title(PANEL_TITLE)
        .color(Colour::DARK_BLUE)
        .description(format!(
            "Select a support category below to request assistance.\n\n{}{}",
            support_tree::synopsis(),
            questions
        ))
        .footer(CreateEmbedFooter::new(PANEL_FOOTER))
}

/// One configured guild, as seen by the ticket workflow
pub struct GuildHost<'a> {
    context: &'a serenity::Context,
    config: &'a GuildConfig,
}

impl<'a> GuildHost<'a> {
    pub fn new(context: &'a serenity::Context, config: &'a GuildConfig) -> Self {
        Self { context, config }
    }

    fn guild_id(&self) -> GuildId {
        self.config.guild_id
    }

    /// Display name of a user in this guild, falling back to their global name if they left
    async fn display_name(&self, user: &User) -> String {
        match self.guild_id().member(self.context, user.id).await {
            Ok(member) => member_display_name(Some(&member), user),
            Err(e) => {
                debug!("could not get member {} in {}: {:?}", user.id, self.guild_id(), e);
                member_display_name(None, user)
            }
        }
    }
}

impl From<&GuildChannel> for TicketChannelInfo {
    fn from(channel: &GuildChannel) -> Self {
        Self {
            id: channel.id,
            parent_id: channel.parent_id,
            permission_overwrites: channel.permission_overwrites.clone(),
        }
    }
}

/// Messages read over HTTP carry no member data, so nicknames are filled in later by [`HistorySource::member_nick`]
fn transcript_entry(context: &serenity::Context, message: &Message) -> TranscriptEntry {
    TranscriptEntry {
        id: message.id,
        created_at: message.timestamp.unix_timestamp(),
        author_id: message.author.id,
        author_name: message.author.display_name().to_string(),
        content: message.content_safe(&context.cache),
    }
}

impl TicketHost for GuildHost<'_> {
    async fn channels(&self) -> Result<Vec<TicketChannelInfo>, HomError> {
        let cached: Option<Vec<TicketChannelInfo>> = self
            .context
            .cache
            .guild(self.guild_id())
            .map(|guild| guild.channels.values().map(TicketChannelInfo::from).collect());
        match cached {
            Some(channels) => Ok(channels),
            None => {
                let channels = self.guild_id().channels(self.context).await?;
                Ok(channels.values().map(TicketChannelInfo::from).collect())
            }
        }
    }

    async fn role_exists(&self, role: RoleId) -> Result<bool, HomError> {
        let cached = self
            .context
            .cache
            .guild(self.guild_id())
            .map(|guild| guild.roles.contains_key(&role));
        match cached {
            Some(exists) => Ok(exists),
            None => Ok(self.guild_id().roles(self.context).await?.contains_key(&role)),
        }
    }

    async fn create_channel(&self, channel: NewTicketChannel) -> Result<ChannelId, HomError> {
        let builder = CreateChannel::new(channel.name)
            .kind(ChannelType::Text)
            .category(channel.category)
            .topic(channel.topic)
            .permissions(channel.permission_overwrites)
            .audit_log_reason(&channel.audit_log_reason);
        let created = self.guild_id().create_channel(self.context, builder).await?;
        Ok(created.id)
    }

    async fn send_greeting(&self, channel: ChannelId, greeting: TicketGreeting) -> Result<(), HomError> {
        let mut embed = CreateEmbed::default()
            .title(greeting.title)
            .description(greeting.instructions)
            .footer(CreateEmbedFooter::new(TICKET_FOOTER));
        if let Some(example_image) = greeting.example_image {
            embed = embed.image(example_image);
        }
        let message = CreateMessage::default()
            .content(greeting.requester.mention().to_string())
            .embed(embed)
            .components(vec![close_row()]);
        channel.send_message(self.context, message).await?;
        Ok(())
    }

    async fn ticket_owner(&self, channel: ChannelId) -> Result<Option<TicketOwner>, HomError> {
        let oldest = channel
            .messages(self.context, GetMessages::new().after(MessageId::new(1)).limit(1))
            .await?;
        let Some(user) = oldest.into_iter().next().and_then(|message| message.mentions.into_iter().next()) else {
            return Ok(None);
        };
        let name = self.display_name(&user).await;
        Ok(Some(TicketOwner { id: user.id, name }))
    }

    async fn remove_member(&self, channel: ChannelId, user: UserId) -> Result<(), HomError> {
        channel
            .delete_permission(self.context, PermissionOverwriteType::Member(user))
            .await?;
        Ok(())
    }

    async fn send_close_notice(&self, channel: ChannelId, user: UserId) -> Result<(), HomError> {
        let embed = CreateEmbed::default().description(format!("{} has closed the ticket.", user.mention()));
        let message = CreateMessage::default()
            .embed(embed)
            .components(vec![close_channel_row()]);
        channel.send_message(self.context, message).await?;
        Ok(())
    }

    async fn send_log(&self, entry: LogEntry) -> Result<(), HomError> {
        let embed = CreateEmbed::default()
            .description(entry.content)
            .footer(CreateEmbedFooter::new(format!("Mod: {}", entry.moderator_name)));
        let mut message = CreateMessage::default().embed(embed);
        if let Some(transcript) = entry.transcript {
            message = message.add_file(CreateAttachment::bytes(
                transcript.content.into_bytes(),
                transcript.file_name,
            ));
        }
        self.config.log_channel.send_message(self.context, message).await?;
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), HomError> {
        channel.delete(self.context).await?;
        Ok(())
    }
}

impl HistorySource for GuildHost<'_> {
    async fn history_page(
        &self,
        channel: ChannelId,
        after: MessageId,
        limit: u8,
    ) -> Result<Vec<TranscriptEntry>, HomError> {
        let messages = channel
            .messages(self.context, GetMessages::new().after(after).limit(limit))
            .await?;
        Ok(messages
            .iter()
            .map(|message| transcript_entry(self.context, message))
            .collect())
    }

    async fn member_nick(&self, user: UserId) -> Option<String> {
        // checks the cache before asking Discord
        match self.guild_id().member(self.context, user).await {
            Ok(member) => member.nick,
            Err(e) => {
                debug!("could not get member {} in {}: {:?}", user, self.guild_id(), e);
                None
            }
        }
    }
}

/// The sticky channel of one configured guild
pub struct DiscordPanelChannel<'a> {
    context: &'a serenity::Context,
    config: &'a GuildConfig,
    bot_user: UserId,
}

impl<'a> DiscordPanelChannel<'a> {
    pub fn new(context: &'a serenity::Context, config: &'a GuildConfig) -> Self {
        let bot_user = context.cache.current_user().id;
        Self {
            context,
            config,
            bot_user,
        }
    }
}

impl PanelChannel for DiscordPanelChannel<'_> {
    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> Result<Vec<PanelCandidate>, HomError> {
        let messages = channel.messages(self.context, GetMessages::new().limit(limit)).await?;
        Ok(messages
            .into_iter()
            .map(|message| PanelCandidate {
                id: message.id,
                from_bot: message.author.id == self.bot_user,
                embed_title: message.embeds.into_iter().next().and_then(|embed| embed.title),
            })
            .collect())
    }

    async fn send_panel(&self, channel: ChannelId) -> Result<MessageId, HomError> {
        let message = CreateMessage::default()
            .embed(panel_embed(self.context, self.config))
            .components(panel_rows());
        let message = channel.send_message(self.context, message).await?;
        Ok(message.id)
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<(), HomError> {
        channel.delete_message(self.context, message).await?;
        Ok(())
    }
}
