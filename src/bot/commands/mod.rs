// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

mod moderator_commands;
mod support_commands;
mod util;

pub(super) use moderator_commands::*;
pub(super) use support_commands::*;
