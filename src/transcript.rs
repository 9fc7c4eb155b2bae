// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Plain-text archive of a ticket channel's full message history

use crate::error::HomError;
use jiff::{Timestamp, Zoned};
use poise::serenity_prelude::{ChannelId, MessageId, UserId};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use tracing::{debug, error};

/// Discord will not return more than this many messages per request
pub const PAGE_SIZE: u8 = 100;

/// One message as it appears in a transcript
#[derive(Clone, Debug)]
pub struct TranscriptEntry {
    pub id: MessageId,
    /// Creation time in unix seconds
    pub created_at: i64,
    pub author_id: UserId,
    /// Global display name. Replaced by the server nickname while archiving if the author has one.
    pub author_name: String,
    /// Message content with mentions already replaced by readable names
    pub content: String,
}

/// Anything that can page through a channel's history
pub trait HistorySource: Sync {
    /// Up to `limit` messages created after `after`, in any order
    fn history_page(
        &self,
        channel: ChannelId,
        after: MessageId,
        limit: u8,
    ) -> impl Future<Output = Result<Vec<TranscriptEntry>, HomError>> + Send;

    /// The user's nickname in the guild, or None if they have none or are no longer a member
    fn member_nick(&self, user: UserId) -> impl Future<Output = Option<String>> + Send;
}

/// Nicknames already looked up during one archive run
type NickCache = HashMap<UserId, Option<String>, ahash::RandomState>;

/// Replace each entry's author name with the author's server nickname. Each author is looked up at most once per cache.
async fn resolve_author_names<S: HistorySource>(source: &S, nicks: &mut NickCache, page: &mut [TranscriptEntry]) {
    for entry in page {
        let nick = match nicks.get(&entry.author_id) {
            Some(nick) => nick.clone(),
            None => {
                let nick = source.member_nick(entry.author_id).await;
                nicks.insert(entry.author_id, nick.clone());
                nick
            }
        };
        if let Some(nick) = nick {
            entry.author_name = nick;
        }
    }
}

/// Read the entire history of `channel` oldest-first and render it as text.
///
/// Only one page is requested at a time. If any page fails the text accumulated so far is returned and the error is
/// logged, so a closing ticket always gets whatever could be saved.
pub async fn archive<S: HistorySource>(source: &S, channel: ChannelId) -> String {
    let mut transcript = String::new();
    let mut cursor = MessageId::new(1);
    let mut message_count: usize = 0;
    let mut nicks = NickCache::default();
    loop {
        let mut page = match source.history_page(channel, cursor, PAGE_SIZE).await {
            Ok(page) => page,
            Err(e) => {
                error!("Error reading history of {} after {} messages: {:?}", channel, message_count, e);
                break;
            }
        };
        page.sort_unstable_by_key(|entry| entry.id);
        let Some(last) = page.last() else {
            break;
        };
        cursor = last.id;
        let full_page = page.len() >= PAGE_SIZE as usize;
        message_count += page.len();
        resolve_author_names(source, &mut nicks, &mut page).await;
        for entry in &page {
            write_entry(&mut transcript, entry);
        }
        if !full_page {
            break;
        }
    }
    debug!("archived {} messages from {}", message_count, channel);
    transcript
}

/// Append one message block to the transcript
pub fn write_entry(transcript: &mut String, entry: &TranscriptEntry) {
    let date = Timestamp::from_second(entry.created_at)
        .map(|timestamp| timestamp.strftime("%b %d, %Y at %I:%M%p").to_string())
        .unwrap_or_default();
    // writing to a String cannot fail
    let _ = write!(
        transcript,
        "{} <t:{}:F>\n{} - {}\n{}\n\n",
        date,
        entry.created_at,
        author_name(&entry.author_name),
        entry.author_id,
        entry.content
    );
}

/// Names are often of the form `name / rsn`; only the part before the first slash is kept
fn author_name(display_name: &str) -> &str {
    display_name.split('/').next().unwrap_or_default().trim()
}

/// File name the transcript is attached as, e.g. `help-zezima_2024_01_31_13h_05m_09s.txt`
pub fn transcript_file_name(channel_name: &str, now: &Zoned) -> String {
    format!("{}{}.txt", channel_name, now.strftime("_%Y_%m_%d_%Hh_%Mm_%Ss"))
}
