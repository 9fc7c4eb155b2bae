// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Keeps the support panel as the newest message in each sticky channel.
//!
//! Every cycle the channel lands in one of three states. If the newest message is the tracked panel nothing happens.
//! If the channel is empty a panel is sent. Otherwise the panel has been buried: every panel the bot can see is deleted
//! and a new one is sent at the bottom, so at most one panel is ever visible.

use crate::error::HomError;
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, MessageId};
use std::future::Future;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Title of the panel embed. Also used to recognize panels sent by a previous run of the bot.
pub const PANEL_TITLE: &str = "Need help from one of our moderators?";

/// How often every sticky channel is checked
pub const PANEL_INTERVAL: Duration = Duration::from_secs(5);

/// How many of the newest messages are inspected each cycle
pub const RECENT_WINDOW: u8 = 50;

/// A message in a sticky channel, reduced to what is needed to recognize panels
#[derive(Clone, Debug)]
pub struct PanelCandidate {
    pub id: MessageId,
    /// Whether the bot itself sent the message
    pub from_bot: bool,
    /// Title of the first embed, if any
    pub embed_title: Option<String>,
}

impl PanelCandidate {
    pub fn is_panel(&self) -> bool {
        self.from_bot && self.embed_title.as_deref() == Some(PANEL_TITLE)
    }
}

/// A channel the panel can be maintained in
pub trait PanelChannel: Sync {
    /// Up to `limit` of the newest messages, in any order
    fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> impl Future<Output = Result<Vec<PanelCandidate>, HomError>> + Send;

    /// Send a fresh panel and return its id
    fn send_panel(&self, channel: ChannelId) -> impl Future<Output = Result<MessageId, HomError>> + Send;

    fn delete_message(&self, channel: ChannelId, message: MessageId)
    -> impl Future<Output = Result<(), HomError>> + Send;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PanelState {
    /// The channel has no messages at all
    NoPanel,
    /// The tracked panel is the newest message
    Current(MessageId),
    /// Something was posted after the panel, or the tracked panel is gone
    Stale { tracked: Option<MessageId> },
}

/// Work out the state of a channel. `recent` must be sorted newest first.
pub fn classify(tracked: Option<MessageId>, recent: &[PanelCandidate]) -> PanelState {
    match recent.first() {
        None => PanelState::NoPanel,
        Some(newest) if Some(newest.id) == tracked => PanelState::Current(newest.id),
        Some(_) => PanelState::Stale { tracked },
    }
}

/// The panel message currently sent in each sticky channel. Only lives in memory: a new process adopts the panel left
/// behind by the previous one.
#[derive(Default)]
pub struct PanelTracker {
    panels: DashMap<ChannelId, MessageId, ahash::RandomState>,
}

impl PanelTracker {
    pub fn tracked(&self, channel: ChannelId) -> Option<MessageId> {
        self.panels.get(&channel).map(|entry| *entry.value())
    }

    /// Run one maintenance cycle for a channel. Returns the state the channel was found in.
    pub async fn maintain<C: PanelChannel>(&self, host: &C, channel: ChannelId) -> Result<PanelState, HomError> {
        let mut recent = host.recent_messages(channel, RECENT_WINDOW).await?;
        recent.sort_unstable_by(|a, b| b.id.cmp(&a.id));

        let tracked = match self.tracked(channel) {
            Some(tracked) => Some(tracked),
            None => {
                let adopted = recent.iter().find(|message| message.is_panel()).map(|message| message.id);
                if let Some(adopted) = adopted {
                    debug!("adopting existing panel {} in {}", adopted, channel);
                    self.panels.insert(channel, adopted);
                }
                adopted
            }
        };

        let state = classify(tracked, &recent);
        match state {
            PanelState::Current(_) => {}
            PanelState::NoPanel => {
                let panel = host.send_panel(channel).await?;
                self.panels.insert(channel, panel);
                debug!("sent panel {} into empty channel {}", panel, channel);
            }
            PanelState::Stale { tracked } => {
                let mut stale: Vec<MessageId> = recent
                    .iter()
                    .filter(|message| message.is_panel())
                    .map(|message| message.id)
                    .collect();
                if let Some(tracked) = tracked
                    && !stale.contains(&tracked)
                {
                    stale.push(tracked);
                }
                for message in stale {
                    // it may already have been deleted by a moderator
                    if let Err(e) = host.delete_message(channel, message).await {
                        warn!("could not delete old panel {} in {}: {:?}", message, channel, e);
                    }
                }
                let panel = host.send_panel(channel).await?;
                self.panels.insert(channel, panel);
                debug!("replaced panel in {} with {}", channel, panel);
            }
        }
        Ok(state)
    }
}
