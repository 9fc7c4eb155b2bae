// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Utils used by bot commands and component handlers.

use crate::bot::{Context, Error, GUILD_COMMANDS};
use crate::config::GuildConfig;
use crate::error::HomError;
use crate::guard::Denial;
use poise::{CreateReply, serenity_prelude as serenity};
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serenity::{Cache, CacheHttp, ChannelId, Colour, CreateEmbed, GuildChannel, GuildId, Http, Member, User};
use std::cell::RefCell;

/// Set (or reset) the bot's commands for one guild.
///
/// There is a global rate limit of 200 application command creates per day, per guild.
pub async fn set_guild_commands(http: impl AsRef<Http>, guild_id: GuildId) -> Result<(), Error> {
    let commands = poise::builtins::create_application_commands(GUILD_COMMANDS.as_slice());
    guild_id.set_commands(http.as_ref(), commands).await?;
    Ok(())
}

/// Settings for the guild a command was used in
pub(super) fn guild_config<'a>(context: &Context<'a>) -> Result<&'a GuildConfig, HomError> {
    context.data().guild_config(context.guild_id())
}

/// Command check: the caller must hold the guild's moderator role. Denials are answered here, so a failed check
/// needs no further reporting.
pub(super) async fn check_moderator(context: Context<'_>) -> Result<bool, Error> {
    let config = guild_config(&context)?;
    let is_moderator = context
        .author_member()
        .await
        .is_some_and(|member| member.roles.contains(&config.moderator_role));
    if !is_moderator {
        context
            .send(CreateReply::default().ephemeral(true).content(Denial::NotAuthorized.to_string()))
            .await?;
    }
    Ok(is_moderator)
}

/// A channel of a guild, if both are in the cache
pub fn cached_guild_channel(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> Option<GuildChannel> {
    cache
        .guild(guild_id)
        .and_then(|guild| guild.channels.get(&channel_id).cloned())
}

/// Look up a guild channel, preferring the cache
pub async fn guild_channel(
    cache_http: impl CacheHttp,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<GuildChannel, HomError> {
    if let Some(channel) = cache_http
        .cache()
        .and_then(|cache| cached_guild_channel(cache, guild_id, channel_id))
    {
        return Ok(channel);
    }
    channel_id
        .to_channel(cache_http)
        .await?
        .guild()
        .ok_or_else(|| HomError::new("expected a guild channel"))
}

/// Name a user is shown as in a guild: their nickname if they have one
pub fn member_display_name(member: Option<&Member>, user: &User) -> String {
    member
        .and_then(|member| member.nick.clone())
        .unwrap_or_else(|| user.display_name().to_string())
}

/// Link to a channel that works as a markdown link target
pub fn channel_url(guild_id: GuildId, channel_id: ChannelId) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}")
}

/// Create a simple success reply
pub fn success_reply(title: impl Into<String>, message: impl Into<String>) -> CreateReply {
    let embed = CreateEmbed::default()
        .title(title)
        .description(message)
        .color(Colour::DARK_GREEN);
    CreateReply::default().ephemeral(true).embed(embed)
}

/// Create a simple error reply
pub fn error_reply(title: impl Into<String>, message: impl Into<String>) -> CreateReply {
    let embed = CreateEmbed::default()
        .title(title)
        .description(message)
        .color(Colour::RED);
    CreateReply::default().ephemeral(true).embed(embed)
}

/// Seed a new StdRng from OS entropy
fn new_seeded_rng() -> StdRng {
    StdRng::from_os_rng()
}

thread_local! {
    /// Provides a local instance of StdRng for each thread
    static RNG: RefCell<StdRng> = RefCell::new(new_seeded_rng());
}

/// Generate a random nonce from a thread-local RNG
pub fn generate_nonce<T>() -> T
where
    StandardUniform: Distribution<T>,
{
    RNG.with_borrow_mut(|rng| rng.random())
}

#[cfg(test)]
mod test {
    use super::*;

    /// Generate some nonces just to make sure there's no panics or anything from the RefCell mutability.
    #[test]
    fn test_generate_nonce() {
        std::hint::black_box(generate_nonce::<u64>());
        std::hint::black_box(generate_nonce::<u64>());
        std::hint::black_box(generate_nonce::<u64>());
    }

    #[test]
    fn test_cached_guild_channel_misses_unknown_guild() {
        let cache = Cache::new();
        assert!(cached_guild_channel(&cache, GuildId::new(1), ChannelId::new(2)).is_none());
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(
            channel_url(GuildId::new(1), ChannelId::new(2)),
            "https://discord.com/channels/1/2"
        );
    }
}
