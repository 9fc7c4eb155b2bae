// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! Checks run before any moderator or ticket action has side effects.
//!
//! Checks are applied in order and stop at the first failure: role membership, then location (inside or outside the
//! ticket category), then a short-lived duplicate-action lock. The lock is what keeps two moderators (or one
//! moderator double-clicking) from pinging the same user twice or logging the same ticket close twice.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use poise::serenity_prelude::{ChannelId, MessageId, RoleId, UserId};
use std::fmt::{Display, Formatter};
use tokio::time::{Duration, Instant};

/// How long a guarded action stays locked after it was allowed. Currently 5 seconds.
pub const GUARD_INTERVAL: Duration = Duration::from_secs(5);

/// Prefix for every denial shown to a user
pub const DENIED: &str = "❌";

/// Identity a duplicate-action lock is held for. Each action has its own variant so that, for example, pinging a
/// ticket owner does not block closing the same ticket.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GuardKey {
    /// A user opening a ticket from the support panel
    TicketRequest(UserId),
    /// The "Awaiting Response" ping inside a ticket channel
    AwaitingResponse(ChannelId),
    /// The "Support Redirect" reply to a single message
    SupportRedirect(MessageId),
    /// The "Close" button inside a ticket channel
    CloseTicket(ChannelId),
    /// The moderator-only "Close Channel" button
    CloseChannel(ChannelId),
}

/// Where an action may be used relative to the ticket category
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Location {
    /// Only inside a ticket channel. The message is shown when used elsewhere.
    InsideTicket(&'static str),
    /// Only outside of the ticket category. The message is shown when used in a ticket.
    OutsideTicket(&'static str),
}

impl Location {
    fn permits(&self, channel_category: Option<ChannelId>, ticket_category: ChannelId) -> Result<(), Denial> {
        let in_ticket = channel_category == Some(ticket_category);
        match self {
            Location::InsideTicket(message) if !in_ticket => Err(Denial::WrongLocation(*message)),
            Location::OutsideTicket(message) if in_ticket => Err(Denial::WrongLocation(*message)),
            _ => Ok(()),
        }
    }
}

/// Reason an action was refused. The Display impl is the message shown (ephemerally) to the actor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Denial {
    NotAuthorized,
    /// Not allowed, with a message specific to the action
    Forbidden(&'static str),
    WrongLocation(&'static str),
    /// The action is locked. `interval` is how long locks last, `remaining` the time left until this one unlocks.
    Duplicate { interval: Duration, remaining: Duration },
}

impl Display for Denial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::NotAuthorized => write!(f, "{DENIED} You are not allowed to do that."),
            Denial::Forbidden(message) | Denial::WrongLocation(message) => write!(f, "{DENIED} {message}"),
            Denial::Duplicate { interval, remaining } => {
                let seconds = remaining.as_millis().div_ceil(1000);
                let plural = if seconds == 1 { "" } else { "s" };
                write!(
                    f,
                    "{DENIED} This was already done in the past {} seconds. Please wait `{seconds}` more second{plural}.",
                    interval.as_secs()
                )
            }
        }
    }
}

/// Everything needed to decide if an action is allowed right now
#[derive(Clone, Debug)]
pub struct GuardCheck<'a> {
    /// Roles held by the member performing the action
    pub actor_roles: &'a [RoleId],
    /// If set, the actor must hold this role
    pub required_role: Option<RoleId>,
    /// Parent category of the channel the action was used in
    pub channel_category: Option<ChannelId>,
    pub ticket_category: ChannelId,
    pub location: Location,
    pub key: GuardKey,
}

/// In-memory store of duplicate-action locks. Never persisted: a restart clears every lock.
pub struct ActionGuard {
    interval: Duration,
    locks: DashMap<GuardKey, Instant, ahash::RandomState>,
}

impl Default for ActionGuard {
    fn default() -> Self {
        Self::new(GUARD_INTERVAL)
    }
}

impl ActionGuard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            locks: Default::default(),
        }
    }

    /// Run every check for an action. On success the action's lock is now held.
    pub fn check(&self, check: &GuardCheck<'_>) -> Result<(), Denial> {
        if let Some(required_role) = check.required_role
            && !check.actor_roles.contains(&required_role)
        {
            return Err(Denial::NotAuthorized);
        }
        check.location.permits(check.channel_category, check.ticket_category)?;
        self.try_acquire(check.key)
    }

    /// Take the lock for `key` unless someone else holds it.
    ///
    /// The check and the set happen under the same map shard lock, so two concurrent callers can never both succeed.
    pub fn try_acquire(&self, key: GuardKey) -> Result<(), Denial> {
        let now = Instant::now();
        let release_at = now + self.interval;
        match self.locks.entry(key) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_duration_since(now);
                if remaining.is_zero() {
                    // expired but not yet swept
                    entry.insert(release_at);
                    Ok(())
                } else {
                    Err(Denial::Duplicate {
                        interval: self.interval,
                        remaining,
                    })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(release_at);
                Ok(())
            }
        }
    }

    /// Drop expired locks. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.locks.len();
        self.locks.retain(|_, release_at| *release_at > now);
        before.saturating_sub(self.locks.len())
    }

    /// Number of locks currently stored, including expired ones that have not been swept
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MODERATOR: RoleId = RoleId::new(10);
    const TICKETS: ChannelId = ChannelId::new(20);
    const GENERAL: ChannelId = ChannelId::new(30);
    const INSIDE: Location = Location::InsideTicket("This option can only be used within a help channel.");
    const OUTSIDE: Location = Location::OutsideTicket("Please continue using this channel to assist the user.");

    fn check<'a>(roles: &'a [RoleId], category: Option<ChannelId>, location: Location, key: GuardKey) -> GuardCheck<'a> {
        GuardCheck {
            actor_roles: roles,
            required_role: Some(MODERATOR),
            channel_category: category,
            ticket_category: TICKETS,
            location,
            key,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_expires_after_interval() {
        let guard = ActionGuard::default();
        let key = GuardKey::AwaitingResponse(ChannelId::new(1));

        assert_eq!(guard.try_acquire(key), Ok(()));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(matches!(guard.try_acquire(key), Err(Denial::Duplicate { remaining, .. }) if remaining == Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(guard.try_acquire(key), Ok(()));

        // and the lock was renewed by that last call
        assert!(matches!(guard.try_acquire(key), Err(Denial::Duplicate { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let guard = ActionGuard::default();
        let channel = ChannelId::new(1);
        assert_eq!(guard.try_acquire(GuardKey::AwaitingResponse(channel)), Ok(()));
        assert_eq!(guard.try_acquire(GuardKey::CloseChannel(channel)), Ok(()));
        assert_eq!(guard.try_acquire(GuardKey::TicketRequest(UserId::new(1))), Ok(()));
        assert_eq!(guard.try_acquire(GuardKey::TicketRequest(UserId::new(2))), Ok(()));
        assert_eq!(guard.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_only_removes_expired() {
        let guard = ActionGuard::default();
        guard.try_acquire(GuardKey::CloseTicket(ChannelId::new(1))).expect("first lock should be free");
        tokio::time::advance(Duration::from_secs(3)).await;
        guard.try_acquire(GuardKey::CloseTicket(ChannelId::new(2))).expect("second lock should be free");
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.len(), 1);
        assert!(guard.try_acquire(GuardKey::CloseTicket(ChannelId::new(2))).is_err());
        assert!(guard.try_acquire(GuardKey::CloseTicket(ChannelId::new(1))).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_role_is_checked_first() {
        let guard = ActionGuard::default();
        let key = GuardKey::AwaitingResponse(ChannelId::new(1));
        // wrong location too, but the role failure wins
        let result = guard.check(&check(&[], Some(GENERAL), INSIDE, key));
        assert_eq!(result, Err(Denial::NotAuthorized));
        // a denied check must not take the lock
        assert_eq!(guard.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_inside_ticket() {
        let guard = ActionGuard::default();
        let roles = [RoleId::new(5), MODERATOR];
        let key = GuardKey::AwaitingResponse(ChannelId::new(1));

        let result = guard.check(&check(&roles, Some(GENERAL), INSIDE, key));
        assert!(matches!(result, Err(Denial::WrongLocation(_))));
        let result = guard.check(&check(&roles, None, INSIDE, key));
        assert!(matches!(result, Err(Denial::WrongLocation(_))));
        assert_eq!(guard.len(), 0);

        assert_eq!(guard.check(&check(&roles, Some(TICKETS), INSIDE, key)), Ok(()));
        assert!(matches!(
            guard.check(&check(&roles, Some(TICKETS), INSIDE, key)),
            Err(Denial::Duplicate { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_outside_ticket() {
        let guard = ActionGuard::default();
        let roles = [MODERATOR];

        let key = GuardKey::SupportRedirect(MessageId::new(1));
        let result = guard.check(&check(&roles, Some(TICKETS), OUTSIDE, key));
        assert_eq!(
            result.map_err(|denial| denial.to_string()),
            Err("❌ Please continue using this channel to assist the user.".to_string())
        );

        assert_eq!(guard.check(&check(&roles, Some(GENERAL), OUTSIDE, key)), Ok(()));
        let key = GuardKey::SupportRedirect(MessageId::new(2));
        assert_eq!(guard.check(&check(&roles, None, OUTSIDE, key)), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_required_role() {
        let guard = ActionGuard::default();
        let mut check = check(&[], Some(TICKETS), INSIDE, GuardKey::CloseTicket(ChannelId::new(1)));
        check.required_role = None;
        assert_eq!(guard.check(&check), Ok(()));
    }

    #[test]
    fn test_duplicate_message_rounds_up() {
        let denial = Denial::Duplicate {
            interval: GUARD_INTERVAL,
            remaining: Duration::from_millis(4_200),
        };
        assert_eq!(
            denial.to_string(),
            "❌ This was already done in the past 5 seconds. Please wait `5` more seconds."
        );
        let denial = Denial::Duplicate {
            interval: GUARD_INTERVAL,
            remaining: Duration::from_millis(300),
        };
        assert_eq!(
            denial.to_string(),
            "❌ This was already done in the past 5 seconds. Please wait `1` more second."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_message_uses_configured_interval() {
        let guard = ActionGuard::new(Duration::from_secs(1));
        let key = GuardKey::CloseTicket(ChannelId::new(1));
        assert_eq!(guard.try_acquire(key), Ok(()));
        let denial = guard.try_acquire(key).expect_err("second close should be denied");
        assert_eq!(
            denial.to_string(),
            "❌ This was already done in the past 1 seconds. Please wait `1` more second."
        );
    }

    #[test]
    fn test_forbidden_message() {
        assert_eq!(Denial::Forbidden("No.").to_string(), "❌ No.");
    }
}
