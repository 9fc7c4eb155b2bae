// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::constants::CLAP_VERSION;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Discord bot that handles support tickets.
/// If ran with no subcommands the bot will start.
#[derive(Parser)]
#[command(version = CLAP_VERSION, long_about, author)]
pub struct HomArgs {
    /// TOML file with one `[[guild]]` table per guild. If absent, a single guild is read from the environment.
    #[arg(long, env = "HOM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Discord token. Depending on execution environment it may not be secure to pass secrets as a command-line argument.
    /// Instead, you may provide it with the `DISCORD_TOKEN` environment variable.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the configuration, print a summary, and exit
    CheckConfig,
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn test_cli_is_valid() {
        HomArgs::command().debug_assert();
    }

    #[test]
    fn test_check_config() {
        let args = HomArgs::try_parse_from(["hom", "--config", "guilds.toml", "check-config"]).expect("parse failed");
        assert_eq!(args.config, Some(PathBuf::from("guilds.toml")));
        assert!(matches!(args.command, Some(Command::CheckConfig)));
    }
}
