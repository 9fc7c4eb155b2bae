// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

use crate::bot::util::{error_reply, generate_nonce};
use crate::bot::{Context, Data, Error};
use crate::error::{HomError, SafeDisplay};
use poise::{FrameworkError, serenity_prelude as serenity};
use std::fmt::Debug;
use tracing::error;

enum SomeContext<'a> {
    Serenity(&'a serenity::Context),
    Framework(Context<'a>),
}

struct PoiseError<'a> {
    title: &'static str,
    diagnostic: Option<String>,
    /// Text safe to show the user instead of the generic "unexpected error" message
    user_message: Option<String>,
    context: SomeContext<'a>,
}

impl<'a> PoiseError<'a> {
    fn new_cmd(title: &'static str, context: Context<'a>) -> Option<Self> {
        Some(Self {
            title,
            diagnostic: None,
            user_message: None,
            context: SomeContext::Framework(context),
        })
    }

    fn debug<T: Debug>(title: &'static str, context: &'a serenity::Context, diagnostic: T) -> Option<Self> {
        Some(Self {
            title,
            diagnostic: Some(format!("{:?}", diagnostic)),
            user_message: None,
            context: SomeContext::Serenity(context),
        })
    }

    fn debug_cmd<T: Debug>(title: &'static str, context: Context<'a>, diagnostic: T) -> Option<Self> {
        Some(Self {
            title,
            diagnostic: Some(format!("{:?}", diagnostic)),
            user_message: None,
            context: SomeContext::Framework(context),
        })
    }

    /// A command failed. Configuration problems are explained to the user as well as logged.
    fn command(context: Context<'a>, error: Error) -> Option<Self> {
        let user_message = error
            .downcast_ref::<HomError>()
            .filter(|error| error.is_config())
            .map(|error| error.safe_display().to_string());
        Some(Self {
            title: "Command",
            diagnostic: Some(format!("{:?}", error)),
            user_message,
            context: SomeContext::Framework(context),
        })
    }
}

/// Error handler to add extra, custom logging for Poise/Serenity errors.
pub async fn error_handler(error: FrameworkError<'_, Data, Error>) {
    let error: Option<PoiseError> = match error {
        FrameworkError::Setup { ctx, error, .. } => PoiseError::debug("Setup", ctx, error),
        FrameworkError::EventHandler { ctx, error, .. } => PoiseError::debug("Event handler", ctx, error),
        FrameworkError::Command { ctx, error, .. } => PoiseError::command(ctx, error),
        FrameworkError::SubcommandRequired { ctx, .. } => PoiseError::new_cmd("Subcommand required", ctx),
        FrameworkError::CommandPanic { ctx, payload, .. } => {
            // this is a really weird one, so don't do ANYTHING beyond logging it
            error!("Command panic in {}: {:?}", ctx.command().name, payload);
            None
        }
        FrameworkError::CommandCheckFailed { error: None, .. } => {
            // the check already told the user why
            None
        }
        FrameworkError::CommandCheckFailed {
            ctx, error: Some(error), ..
        } => PoiseError::command(ctx, error),
        FrameworkError::ArgumentParse { ctx, input, error, .. } => {
            PoiseError::debug_cmd("Argument parse", ctx, (input, error))
        }
        FrameworkError::GuildOnly { ctx, .. } => PoiseError::new_cmd("Guild only", ctx),
        FrameworkError::UnknownInteraction { ctx, interaction, .. } => {
            PoiseError::debug("Unknown interaction", ctx, interaction)
        }
        error => {
            // nothing this bot registers can produce the remaining variants, so let poise deal with them
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {:?}", e);
            }
            None
        }
    };
    if let Some(error) = error {
        match error.context {
            SomeContext::Serenity(_context) => {
                if let Some(diagnostic) = error.diagnostic {
                    error!("{} error: {}", error.title, diagnostic);
                } else {
                    error!("{} error", error.title);
                }
            }
            SomeContext::Framework(context) => {
                let nonce: u64 = generate_nonce();
                let nonce = format!("{:016X}", nonce);
                let user = context.author();

                if let Some(diagnostic) = error.diagnostic {
                    error!(
                        "NONCE[{}] {} error encountered in {}: Caused by {:?}. {}",
                        nonce,
                        error.title,
                        context.command().name,
                        user,
                        diagnostic
                    );
                } else {
                    error!(
                        "NONCE[{}] {} error encountered in {}. Caused by {:?}.",
                        nonce,
                        error.title,
                        context.command().name,
                        user
                    );
                }

                let message = match error.user_message {
                    Some(user_message) => format!("{user_message}\n\nError code: `{nonce}`"),
                    None => format!(
                        "An unexpected error has occurred. Please report this to a moderator with error code `{}`",
                        nonce
                    ),
                };
                let result = context.send(error_reply(format!("{} Error", error.title), message)).await;
                if let Err(e) = result {
                    error!("Error sending error message: {:?}", e);
                }
            }
        }
    };
}
