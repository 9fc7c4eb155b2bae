// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Opening and closing private support tickets.
//!
//! Everything here talks to Discord through [`TicketHost`], so the workflow can be driven by a fake guild in tests.

use crate::error::HomError;
use crate::guard::{ActionGuard, Denial, GuardCheck, GuardKey, Location};
use crate::transcript::{self, HistorySource};
use poise::serenity_prelude::{
    ChannelId, Mentionable, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use regex::Regex;
use std::fmt::Write as _;
use std::future::Future;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Shown when a ticket-only action is used outside of the ticket category
pub const INSIDE_TICKET_MESSAGE: &str = "This option can only be used within a help channel.";

pub const MISSING_MOD_ROLE_MESSAGE: &str = "The moderator role is missing from the server.";

/// Shown to non-moderators pressing "Close Channel"
pub const DELETE_CHANNEL_DENIED_MESSAGE: &str = "You do not have the required permissions to delete the channel.";

/// Channel names are built from at most this many characters of the requester's display name
const CHANNEL_NAME_CHARS: usize = 15;

static GLOBAL_CHANNEL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{N}_-]+").expect("Failed to compile GLOBAL_CHANNEL_NAME_REGEX")
});

thread_local! {
    // trick to avoid a subtle performance edge case: https://docs.rs/regex/latest/regex/index.html#sharing-a-regex-across-threads-can-result-in-contention
    static CHANNEL_NAME_REGEX: Regex = GLOBAL_CHANNEL_NAME_REGEX.clone();
}

/// A channel as seen by the ticket lookup
#[derive(Clone, Debug)]
pub struct TicketChannelInfo {
    pub id: ChannelId,
    pub parent_id: Option<ChannelId>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

/// Everything needed to create a ticket channel
#[derive(Clone, Debug)]
pub struct NewTicketChannel {
    pub name: String,
    pub category: ChannelId,
    pub topic: String,
    pub audit_log_reason: String,
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

/// First message in a fresh ticket
#[derive(Clone, Debug)]
pub struct TicketGreeting {
    pub requester: UserId,
    pub title: String,
    pub instructions: String,
    pub example_image: Option<String>,
}

/// A message for the moderator log channel
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub content: String,
    /// Who performed the logged action. Shown in the footer.
    pub moderator_name: String,
    pub transcript: Option<TranscriptFile>,
}

#[derive(Clone, Debug)]
pub struct TranscriptFile {
    pub file_name: String,
    pub content: String,
}

/// The user a ticket was opened for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketOwner {
    pub id: UserId,
    pub name: String,
}

/// The guild operations tickets need
pub trait TicketHost: Sync {
    /// Every channel in the guild. Only the ones under the ticket category matter.
    fn channels(&self) -> impl Future<Output = Result<Vec<TicketChannelInfo>, HomError>> + Send;

    fn role_exists(&self, role: RoleId) -> impl Future<Output = Result<bool, HomError>> + Send;

    fn create_channel(&self, channel: NewTicketChannel) -> impl Future<Output = Result<ChannelId, HomError>> + Send;

    fn send_greeting(
        &self,
        channel: ChannelId,
        greeting: TicketGreeting,
    ) -> impl Future<Output = Result<(), HomError>> + Send;

    /// The first user mentioned in the oldest message of the channel, which is always the bot's greeting
    fn ticket_owner(&self, channel: ChannelId) -> impl Future<Output = Result<Option<TicketOwner>, HomError>> + Send;

    /// Remove a member's permission overwrite, taking away their access to the channel
    fn remove_member(&self, channel: ChannelId, user: UserId) -> impl Future<Output = Result<(), HomError>> + Send;

    /// Post the public "has closed the ticket" notice with a button to delete the channel
    fn send_close_notice(&self, channel: ChannelId, user: UserId)
    -> impl Future<Output = Result<(), HomError>> + Send;

    fn send_log(&self, entry: LogEntry) -> impl Future<Output = Result<(), HomError>> + Send;

    fn delete_channel(&self, channel: ChannelId) -> impl Future<Output = Result<(), HomError>> + Send;
}

/// Guild-wide values that stay the same for every ticket
#[derive(Clone, Debug)]
pub struct TicketSettings {
    /// The @everyone role. Its id is always the guild id.
    pub everyone_role: RoleId,
    pub ticket_category: ChannelId,
    pub moderator_role: RoleId,
    pub bot_user: UserId,
    pub bot_name: String,
}

/// A user asking for help from a support tree button
#[derive(Clone, Debug)]
pub struct TicketRequest {
    pub requester: UserId,
    pub requester_name: String,
    /// Channel topic and greeting title, e.g. `Groups → Verify my group`
    pub topic: String,
    pub instructions: String,
    pub example_image: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TicketOutcome {
    Created(ChannelId),
    /// The requester already had a ticket open
    Existing(ChannelId),
    Denied(Denial),
}

/// Someone pressing a close button inside a channel
#[derive(Clone, Debug)]
pub struct CloseRequest<'a> {
    pub channel: ChannelId,
    pub channel_name: String,
    pub channel_topic: Option<String>,
    pub channel_category: Option<ChannelId>,
    pub actor: UserId,
    pub actor_name: String,
    pub actor_roles: &'a [RoleId],
}

#[derive(Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The actor lost access to the ticket and a close notice was posted
    Left,
    /// The channel is gone and its transcript was logged
    Deleted { owner: Option<TicketOwner> },
    Denied(Denial),
}

/// Permission overwrites for a new ticket channel.
///
/// Nobody but the requester, the moderators and the bot can see the channel. The default role keeps the text
/// permissions so that anyone who is later added to the channel can participate without further setup.
pub fn ticket_overwrites(
    everyone_role: RoleId,
    requester: UserId,
    moderator_role: RoleId,
    bot_user: UserId,
) -> Vec<PermissionOverwrite> {
    let visible = |kind| PermissionOverwrite {
        allow: Permissions::VIEW_CHANNEL,
        deny: Permissions::empty(),
        kind,
    };
    vec![
        PermissionOverwrite {
            allow: Permissions::READ_MESSAGE_HISTORY
                | Permissions::ATTACH_FILES
                | Permissions::ADD_REACTIONS
                | Permissions::EMBED_LINKS,
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(everyone_role),
        },
        visible(PermissionOverwriteType::Member(requester)),
        visible(PermissionOverwriteType::Role(moderator_role)),
        visible(PermissionOverwriteType::Member(bot_user)),
    ]
}

/// Find a channel under the ticket category that `user` was explicitly allowed to see
pub fn find_ticket_channel(
    channels: &[TicketChannelInfo],
    ticket_category: ChannelId,
    user: UserId,
) -> Option<ChannelId> {
    channels
        .iter()
        .filter(|channel| channel.parent_id == Some(ticket_category))
        .find(|channel| {
            channel.permission_overwrites.iter().any(|overwrite| {
                matches!(overwrite.kind, PermissionOverwriteType::Member(id) if id == user)
                    && overwrite.allow.contains(Permissions::VIEW_CHANNEL)
            })
        })
        .map(|channel| channel.id)
}

/// Ticket channel name for a requester, e.g. `help-zezima`
pub fn channel_name(display_name: &str) -> String {
    let prefix: String = display_name.chars().take(CHANNEL_NAME_CHARS).collect();
    let prefix = prefix.to_lowercase();
    let sanitized = CHANNEL_NAME_REGEX.with(|regex| regex.replace_all(&prefix, "-").into_owned());
    let sanitized = sanitized.trim_matches('-');
    if sanitized.is_empty() {
        "help-ticket".to_string()
    } else {
        format!("help-{sanitized}")
    }
}

/// Open a ticket for a user, or point them at the one they already have.
pub async fn open_ticket<H: TicketHost>(
    host: &H,
    guard: &ActionGuard,
    settings: &TicketSettings,
    request: TicketRequest,
) -> Result<TicketOutcome, HomError> {
    let channels = host.channels().await?;
    if let Some(existing) = find_ticket_channel(&channels, settings.ticket_category, request.requester) {
        debug!("{} already has ticket {}", request.requester, existing);
        return Ok(TicketOutcome::Existing(existing));
    }

    if let Err(denial) = guard.try_acquire(GuardKey::TicketRequest(request.requester)) {
        return Ok(TicketOutcome::Denied(denial));
    }

    if !host.role_exists(settings.moderator_role).await? {
        return Err(HomError::config(MISSING_MOD_ROLE_MESSAGE));
    }

    let new_channel = NewTicketChannel {
        name: channel_name(&request.requester_name),
        category: settings.ticket_category,
        topic: request.topic.clone(),
        audit_log_reason: format!("{} ({}) has opened a ticket.", request.requester_name, request.requester),
        permission_overwrites: ticket_overwrites(
            settings.everyone_role,
            request.requester,
            settings.moderator_role,
            settings.bot_user,
        ),
    };
    let channel = host.create_channel(new_channel).await?;
    info!("opened ticket {} for {}", channel, request.requester);

    let greeting = TicketGreeting {
        requester: request.requester,
        title: request.topic.clone(),
        instructions: request.instructions,
        example_image: request.example_image,
    };
    host.send_greeting(channel, greeting).await?;

    let log = LogEntry {
        content: format!(
            "({}) Ticket opened for user:\n``{}`` - {}",
            request.topic,
            request.requester_name,
            request.requester.mention()
        ),
        moderator_name: settings.bot_name.clone(),
        transcript: None,
    };
    host.send_log(log).await?;

    Ok(TicketOutcome::Created(channel))
}

/// The "Close" button: the person pressing it loses access and moderators get a button to delete the channel.
pub async fn leave_ticket<H: TicketHost>(
    host: &H,
    guard: &ActionGuard,
    settings: &TicketSettings,
    request: CloseRequest<'_>,
) -> Result<CloseOutcome, HomError> {
    let check = GuardCheck {
        actor_roles: request.actor_roles,
        required_role: None,
        channel_category: request.channel_category,
        ticket_category: settings.ticket_category,
        location: Location::InsideTicket(INSIDE_TICKET_MESSAGE),
        key: GuardKey::CloseTicket(request.channel),
    };
    if let Err(denial) = guard.check(&check) {
        return Ok(CloseOutcome::Denied(denial));
    }

    host.remove_member(request.channel, request.actor).await?;
    host.send_close_notice(request.channel, request.actor).await?;
    Ok(CloseOutcome::Left)
}

/// The moderator-only "Close Channel" button: log the transcript then delete the channel.
pub async fn close_ticket<H: TicketHost + HistorySource>(
    host: &H,
    guard: &ActionGuard,
    settings: &TicketSettings,
    request: CloseRequest<'_>,
) -> Result<CloseOutcome, HomError> {
    let check = GuardCheck {
        actor_roles: request.actor_roles,
        required_role: Some(settings.moderator_role),
        channel_category: request.channel_category,
        ticket_category: settings.ticket_category,
        location: Location::InsideTicket(INSIDE_TICKET_MESSAGE),
        key: GuardKey::CloseChannel(request.channel),
    };
    match guard.check(&check) {
        Ok(()) => {}
        Err(Denial::NotAuthorized) => return Ok(CloseOutcome::Denied(Denial::Forbidden(DELETE_CHANNEL_DENIED_MESSAGE))),
        Err(denial) => return Ok(CloseOutcome::Denied(denial)),
    }

    let owner = host.ticket_owner(request.channel).await?;
    let topic = request.channel_topic.as_deref().unwrap_or_default();
    let mut content = format!("({topic}) Ticket channel closed for user:\n");
    if let Some(owner) = &owner {
        let _ = write!(content, "{} - {}", owner.name, owner.id.mention());
    }

    let transcript = transcript::archive(host, request.channel).await;
    let file_name = transcript::transcript_file_name(&request.channel_name, &jiff::Zoned::now());
    let log = LogEntry {
        content,
        moderator_name: request.actor_name,
        transcript: Some(TranscriptFile {
            file_name,
            content: transcript,
        }),
    };
    host.send_log(log).await?;
    host.delete_channel(request.channel).await?;
    info!("closed ticket {} for {:?}", request.channel, owner);

    Ok(CloseOutcome::Deleted { owner })
}
