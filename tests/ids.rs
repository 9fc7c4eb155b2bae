// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Tests that serenity's id types read out of TOML the way the config file format relies on

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Ids {
    guild: GuildId,
    channel: ChannelId,
    role: RoleId,
}

#[test]
fn test_integer_ids() {
    let ids: Ids = toml::from_str("guild = 1\nchannel = 2\nrole = 3").expect("failed to parse ids");
    assert_eq!(ids.guild, GuildId::new(1));
    assert_eq!(ids.channel, ChannelId::new(2));
    assert_eq!(ids.role, RoleId::new(3));
}

#[test]
fn test_string_ids() {
    let ids: Ids = toml::from_str("guild = \"1\"\nchannel = \"2\"\nrole = \"3\"").expect("failed to parse ids");
    assert_eq!(ids.guild, GuildId::new(1));
    assert_eq!(ids.role, RoleId::new(3));
}

/// Real snowflakes are larger than what fits in an i32
#[test]
fn test_large_id() {
    let ids: Ids = toml::from_str("guild = 1066071066071066071\nchannel = \"1066071066071066072\"\nrole = 3")
        .expect("failed to parse ids");
    assert_eq!(ids.guild.get(), 1_066_071_066_071_066_071);
    assert_eq!(ids.channel.get(), 1_066_071_066_071_066_072);
}

#[test]
fn test_zero_id_rejected() {
    let result: Result<Ids, _> = toml::from_str("guild = 0\nchannel = 2\nrole = 3");
    assert!(result.is_err());
}

#[test]
fn test_negative_id_rejected() {
    let result: Result<Ids, _> = toml::from_str("guild = -1\nchannel = 2\nrole = 3");
    assert!(result.is_err());
}
