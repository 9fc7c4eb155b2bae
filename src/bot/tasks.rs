// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Periodic background work, run as graceful-shutdown subsystems next to the bot itself.

use crate::bot::discord::DiscordPanelChannel;
use crate::bot::{Error, ReadyReceiver};
use crate::config::Config;
use crate::guard::ActionGuard;
use crate::panel::{PANEL_INTERVAL, PanelTracker};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;
use tracing::{debug, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Keep the support panel at the bottom of every configured sticky channel.
pub async fn panel_subsystem(
    subsystem: SubsystemHandle,
    config: Arc<Config>,
    panels: Arc<PanelTracker>,
    mut ready: ReadyReceiver,
) -> Result<(), Error> {
    let context = tokio::select! {
        _ = subsystem.on_shutdown_requested() => return Ok(()),
        context = wait_for_ready(&mut ready) => context?,
    };
    info!("maintaining support panels in {} guilds", config.guilds.len());

    let mut interval = tokio::time::interval(PANEL_INTERVAL);
    // a slow cycle must not be followed by a burst of catch-up cycles
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = subsystem.on_shutdown_requested() => return Ok(()),
            _ = interval.tick() => maintain_panels(&context, &config, &panels).await,
        }
    }
}

async fn wait_for_ready(ready: &mut ReadyReceiver) -> Result<serenity::Context, Error> {
    let context = ready.wait_for(Option::is_some).await?;
    Option::clone(&context).ok_or_else(|| "bot readiness was signalled without a context".into())
}

async fn maintain_panels(context: &serenity::Context, config: &Config, panels: &PanelTracker) {
    for guild in &config.guilds {
        let channel = DiscordPanelChannel::new(context, guild);
        if let Err(e) = panels.maintain(&channel, guild.sticky_channel).await {
            warn!(
                "could not maintain support panel in guild {} channel {}: {:?}",
                guild.guild_id, guild.sticky_channel, e
            );
        }
    }
}

/// Drop expired guard entries so the guard map does not grow forever.
pub async fn guard_sweeper_subsystem(subsystem: SubsystemHandle, guard: Arc<ActionGuard>) -> Result<(), Error> {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = subsystem.on_shutdown_requested() => return Ok(()),
            _ = interval.tick() => {
                let removed = guard.sweep();
                if removed != 0 {
                    debug!("swept {} expired guard entries, {} remain", removed, guard.len());
                }
            }
        }
    }
}
