// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Deployment configuration. Either a TOML file with one `[[guild]]` table per guild, or a single guild read from
//! environment variables.

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU64;
use std::path::Path;

pub const GUILD_ID_VAR: &str = "GUILD_ID";
pub const STICKY_CHANNEL_VAR: &str = "STICKY_CHANNEL";
pub const TICKET_CATEGORY_VAR: &str = "TICKET_CATEGORY";
pub const MOD_ROLE_VAR: &str = "MOD_ROLE";
pub const MOD_LOG_CHANNEL_VAR: &str = "MOD_LOG_CHANNEL";
pub const QUESTIONS_CHANNEL_VAR: &str = "QUESTIONS_CHANNEL";
pub const PATREON_CHANNEL_VAR: &str = "PATREON_CHANNEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("setting `{name}` must be a non-zero Discord ID, got \"{value}\"")]
    InvalidId { name: &'static str, value: String },
    #[error("no guilds configured")]
    NoGuilds,
    #[error("guild {0} is configured more than once")]
    DuplicateGuild(GuildId),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "guild")]
    pub guilds: Vec<GuildConfig>,
}

/// Everything the bot needs to know about one guild
#[derive(Debug, Clone, Deserialize)]
pub struct GuildConfig {
    pub guild_id: GuildId,
    /// Channel holding the always-present support panel
    pub sticky_channel: ChannelId,
    /// Category that ticket channels are created under
    pub ticket_category: ChannelId,
    pub moderator_role: RoleId,
    /// Channel receiving ticket open/close logs and transcripts
    pub log_channel: ChannelId,
    pub questions_channel: ChannelId,
    /// Channel the Patreon ticket instructions point at
    pub patreon_channel: ChannelId,
}

impl Config {
    /// Load configuration from a TOML file if a path is given, otherwise from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml_str(&content)
            }
            None => Self::from_env(|name| std::env::var(name).ok()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()
    }

    /// Read a single guild from environment variables. `lookup` is `std::env::var` outside of tests.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let id = |name: &'static str| -> Result<NonZeroU64, ConfigError> {
            let value = lookup(name).ok_or(ConfigError::Missing(name))?;
            value
                .trim()
                .parse::<NonZeroU64>()
                .map_err(|_| ConfigError::InvalidId { name, value })
        };
        let guild = GuildConfig {
            guild_id: GuildId::new(id(GUILD_ID_VAR)?.get()),
            sticky_channel: ChannelId::new(id(STICKY_CHANNEL_VAR)?.get()),
            ticket_category: ChannelId::new(id(TICKET_CATEGORY_VAR)?.get()),
            moderator_role: RoleId::new(id(MOD_ROLE_VAR)?.get()),
            log_channel: ChannelId::new(id(MOD_LOG_CHANNEL_VAR)?.get()),
            questions_channel: ChannelId::new(id(QUESTIONS_CHANNEL_VAR)?.get()),
            patreon_channel: ChannelId::new(id(PATREON_CHANNEL_VAR)?.get()),
        };
        Config { guilds: vec![guild] }.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.guilds.is_empty() {
            return Err(ConfigError::NoGuilds);
        }
        let mut seen = HashSet::with_hasher(ahash::RandomState::default());
        for guild in &self.guilds {
            if !seen.insert(guild.guild_id) {
                return Err(ConfigError::DuplicateGuild(guild.guild_id));
            }
        }
        Ok(self)
    }

    /// Settings for a guild, or None if the bot was never configured for it
    pub fn guild(&self, guild_id: GuildId) -> Option<&GuildConfig> {
        self.guilds.iter().find(|guild| guild.guild_id == guild_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (GUILD_ID_VAR, "100".to_string()),
            (STICKY_CHANNEL_VAR, "101".to_string()),
            (TICKET_CATEGORY_VAR, "102".to_string()),
            (MOD_ROLE_VAR, "103".to_string()),
            (MOD_LOG_CHANNEL_VAR, "104".to_string()),
            (QUESTIONS_CHANNEL_VAR, " 105 ".to_string()),
            (PATREON_CHANNEL_VAR, "106".to_string()),
        ])
    }

    #[test]
    fn test_env_config() {
        let env = full_env();
        let config = Config::from_env(|name| env.get(name).cloned()).expect("config should load");
        assert_eq!(config.guilds.len(), 1);
        let guild = config.guild(GuildId::new(100)).expect("guild should be configured");
        assert_eq!(guild.sticky_channel, ChannelId::new(101));
        assert_eq!(guild.ticket_category, ChannelId::new(102));
        assert_eq!(guild.moderator_role, RoleId::new(103));
        assert_eq!(guild.log_channel, ChannelId::new(104));
        assert_eq!(guild.questions_channel, ChannelId::new(105));
        assert_eq!(guild.patreon_channel, ChannelId::new(106));
        assert!(config.guild(GuildId::new(999)).is_none());
    }

    #[test]
    fn test_env_config_missing_setting() {
        let mut env = full_env();
        env.remove(MOD_ROLE_VAR);
        let error = Config::from_env(|name| env.get(name).cloned()).expect_err("config should not load");
        assert!(matches!(error, ConfigError::Missing(MOD_ROLE_VAR)));
        assert_eq!(error.to_string(), "missing required setting `MOD_ROLE`");
    }

    #[test]
    fn test_env_config_missing_patreon_channel() {
        let mut env = full_env();
        env.remove(PATREON_CHANNEL_VAR);
        let error = Config::from_env(|name| env.get(name).cloned()).expect_err("config should not load");
        assert_eq!(error.to_string(), "missing required setting `PATREON_CHANNEL`");
    }

    #[test]
    fn test_env_config_zero_id() {
        let mut env = full_env();
        env.insert(TICKET_CATEGORY_VAR, "0".to_string());
        let error = Config::from_env(|name| env.get(name).cloned()).expect_err("config should not load");
        assert!(matches!(error, ConfigError::InvalidId { name: TICKET_CATEGORY_VAR, .. }));
    }

    #[test]
    fn test_env_config_garbage_id() {
        let mut env = full_env();
        env.insert(GUILD_ID_VAR, "wom".to_string());
        let error = Config::from_env(|name| env.get(name).cloned()).expect_err("config should not load");
        assert!(matches!(error, ConfigError::InvalidId { name: GUILD_ID_VAR, .. }));
    }

    #[test]
    fn test_toml_config() {
        let config = Config::from_toml_str(
            r#"
            [[guild]]
            guild_id = 1
            sticky_channel = 2
            ticket_category = 3
            moderator_role = 4
            log_channel = 5
            questions_channel = 6
            patreon_channel = 7

            [[guild]]
            guild_id = "11"
            sticky_channel = "12"
            ticket_category = "13"
            moderator_role = "14"
            log_channel = "15"
            questions_channel = "16"
            patreon_channel = "17"
            "#,
        )
        .expect("config should load");
        assert_eq!(config.guilds.len(), 2);
        assert_eq!(
            config.guild(GuildId::new(11)).map(|guild| guild.moderator_role),
            Some(RoleId::new(14))
        );
        assert_eq!(
            config.guild(GuildId::new(1)).map(|guild| guild.patreon_channel),
            Some(ChannelId::new(7))
        );
    }

    #[test]
    fn test_toml_config_duplicate_guild() {
        let guild = r#"
            [[guild]]
            guild_id = 1
            sticky_channel = 2
            ticket_category = 3
            moderator_role = 4
            log_channel = 5
            questions_channel = 6
            patreon_channel = 7
            "#;
        let error = Config::from_toml_str(&format!("{guild}{guild}")).expect_err("config should not load");
        assert!(matches!(error, ConfigError::DuplicateGuild(id) if id == GuildId::new(1)));
    }

    #[test]
    fn test_toml_config_no_guilds() {
        let error = Config::from_toml_str("guild = []").expect_err("config should not load");
        assert!(matches!(error, ConfigError::NoGuilds));
    }

    #[test]
    fn test_toml_config_missing_field() {
        let error = Config::from_toml_str(
            r#"
            [[guild]]
            guild_id = 1
            "#,
        )
        .expect_err("config should not load");
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
