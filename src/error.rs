// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use poise::serenity_prelude as serenity;
use serenity::Error as SerenityError;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
#[allow(unused)] // these are debug printed frequently
pub enum HomError {
    Message(String),
    /// The guild is set up wrong: a configured role or channel does not resolve. These are deployment bugs, not user errors.
    Config(String),
    Serenity(SerenityError),
}

impl Display for HomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HomError::Message(message) => f.write_str(message.as_str()),
            HomError::Config(message) => write!(f, "Configuration error: {message}"),
            HomError::Serenity(_) => write!(f, "Discord API error"),
        }
    }
}

/// mark the normal Display impl as being safe
impl<'a> SafeDisplay<'a, &'a Self> for HomError {
    fn safe_display(&'a self) -> &'a Self {
        self
    }
}

impl From<SerenityError> for HomError {
    fn from(e: SerenityError) -> Self {
        Self::Serenity(e)
    }
}

impl std::error::Error for HomError {}

impl HomError {
    /// `message` is a message that is safe to display to a user
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self::Message(message.into())
    }

    /// `message` is a message that is safe to display to a user
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, HomError::Config(_))
    }
}

/// A type with an alternate Display implementation that is safe to display to untrusted users
pub trait SafeDisplay<'a, T>
where
    T: Display,
{
    fn safe_display(&'a self) -> T;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = HomError::config("The moderator role is missing from the server.");
        assert!(error.is_config());
        assert_eq!(
            error.safe_display().to_string(),
            "Configuration error: The moderator role is missing from the server."
        );
    }

    #[test]
    fn test_message_error_display() {
        let error = HomError::new("expected to be in a guild");
        assert!(!error.is_config());
        assert_eq!(error.to_string(), "expected to be in a guild");
    }
}
