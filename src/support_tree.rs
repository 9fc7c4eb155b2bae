// This file is part of hom. Copyright © 2025 hom contributors.
// hom is licensed under the GNU AGPL v3.0 or any later version. See LICENSE file for full text.

//! The support panel's decision tree as a single table.
//!
//! Every button the bot has ever sent is keyed by its custom id, and those messages live on in Discord forever, so the
//! ids in this table must never change. Labels and instructions can be edited freely.

use poise::serenity_prelude::{ChannelId, Mentionable as _};
use std::fmt::Write as _;

pub const ARROW: &str = "→";

/// Appended to every set of ticket instructions
pub const FOOTER: &str = "As a reminder, all moderators and admins in this server volunteer to assist in their free time. \
    We appreciate your patience.\u{200b}\n\u{200b}";

/// Prompt shown above every sub-menu
const MENU_PROMPT: &str = "What do you need assistance with?";

const OTHER_INSTRUCTIONS: &str = "Explain what you require assistance with below.";

/// Replaced by a mention of the guild's patreon channel when instructions are shown
const PATREON_CHANNEL: &str = "{patreon_channel}";

const GROUP_EXAMPLE: &str = "https://cdn.discordapp.com/attachments/696219254076342312/1200157429283962880/group.jpg";
const PLAYER_EXAMPLE: &str = "https://cdn.discordapp.com/attachments/696219254076342312/1200157428981977229/player.jpg";

const GROUPS: &str = "Groups";
const COMPETITIONS: &str = "Competitions";
const NAME_CHANGES: &str = "Name Changes";

/// A top-level button on the support panel
#[derive(Debug)]
pub struct RootEntry {
    pub id: &'static str,
    /// One-line description shown in the panel embed
    pub summary: &'static str,
}

/// Top-level buttons on the support panel, in display order
pub const ROOT: &[RootEntry] = &[
    RootEntry {
        id: "persistent_view:groups_instructions",
        summary: "Assistance on group related things",
    },
    RootEntry {
        id: "persistent_view:competitions_instructions",
        summary: "Assistance on competition related things",
    },
    RootEntry {
        id: "persistent_view:names_instructions",
        summary: "Help with name related things",
    },
    RootEntry {
        id: "persistent_view:patreon",
        summary: "Claim or ask about Patreon benefits",
    },
    RootEntry {
        id: "persistent_view:api_key",
        summary: "Request an API key for development",
    },
    RootEntry {
        id: "persistent_view:other_instructions",
        summary: "Request assistance for all other inquiries",
    },
];

#[derive(Debug)]
pub struct SupportNode {
    /// Discord component custom id. Must stay stable forever.
    pub id: &'static str,
    pub label: &'static str,
    pub action: NodeAction,
}

#[derive(Debug)]
pub enum NodeAction {
    /// Privately show another row of buttons
    Menu {
        prompt: &'static str,
        children: &'static [&'static str],
    },
    /// Open a ticket
    Ticket {
        /// Label of the menu this button lives in, used to build the channel topic
        parent_label: Option<&'static str>,
        instructions: &'static str,
        example_image: Option<&'static str>,
    },
}

pub static NODES: &[SupportNode] = &[
    SupportNode {
        id: "persistent_view:groups_instructions",
        label: GROUPS,
        action: NodeAction::Menu {
            prompt: MENU_PROMPT,
            children: &[
                "persistent_view:group_verify",
                "persistent_view:group_reset_code",
                "persistent_view:group_remove",
                "persistent_view:group_other",
            ],
        },
    },
    SupportNode {
        id: "persistent_view:competitions_instructions",
        label: COMPETITIONS,
        action: NodeAction::Menu {
            prompt: MENU_PROMPT,
            children: &[
                "persistent_view:competition_reset_code",
                "persistent_view:competition_remove",
                "persistent_view:competition_other",
            ],
        },
    },
    SupportNode {
        id: "persistent_view:names_instructions",
        label: NAME_CHANGES,
        action: NodeAction::Menu {
            prompt: MENU_PROMPT,
            children: &[
                "persistent_view:names_approve",
                "persistent_view:names_delete",
                "persistent_view:names_other",
            ],
        },
    },
    SupportNode {
        id: "persistent_view:patreon",
        label: "Patreon",
        action: NodeAction::Ticket {
            parent_label: None,
            instructions: "If you are interested in claiming or signing up for patreon benefits, check out {patreon_channel} \
                for more information.\n\nIf you've already signed up, **thanks so much for your support**! It means a lot to \
                us that you enjoy using Wise Old Man. Feel free to ask any questions you have here.",
            example_image: None,
        },
    },
    SupportNode {
        id: "persistent_view:api_key",
        label: "API Key",
        action: NodeAction::Ticket {
            parent_label: None,
            instructions: "If you'd like to get an API Key, please tell us your project's name and we'll create you a new API key.",
            example_image: None,
        },
    },
    SupportNode {
        id: "persistent_view:other_instructions",
        label: "Other",
        action: NodeAction::Ticket {
            parent_label: None,
            instructions: OTHER_INSTRUCTIONS,
            example_image: None,
        },
    },
    // groups
    SupportNode {
        id: "persistent_view:group_verify",
        label: "Verify my group",
        action: NodeAction::Ticket {
            parent_label: Some(GROUPS),
            instructions: "To verify your group, please provide a screenshot to prove ownership. We have attached an example \
                of what we need to see below. The screenshot must contain:\n\n\
                - Your Wise Old Man group ID (found in that group's page URL), your Discord ID, and today's date typed into \
                your in-game chatbox.\n\
                - Your Clan tab open showing your username and rank. For clans, you must be Owner or Deputy Owner to verify \
                the group. For the old clan chat, you must be Owner or General (gold star).",
            example_image: Some(GROUP_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:group_reset_code",
        label: "Reset my verification code",
        action: NodeAction::Ticket {
            parent_label: Some(GROUPS),
            instructions: "To reset your verification code, please provide a screenshot to prove ownership. We have attached \
                an example of what we need to see below. The screenshot must contain:\n\n\
                - Your Wise Old Man group ID (found in that group's page URL), your Discord ID, and today's date typed into \
                your in-game chatbox.\n\
                - Your Clan tab open showing your username and rank. For clans, you must be Owner or Deputy Owner to verify \
                the group. For the old clan chat, you must be Owner or General (gold star).\n\n\
                Keep in mind that verification codes should be secret, they can be used to edit or delete a group, so please \
                be mindful of who you choose to share it with.",
            example_image: Some(GROUP_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:group_remove",
        label: "Remove me from a group",
        action: NodeAction::Ticket {
            parent_label: Some(GROUPS),
            instructions: "To remove yourself from a group, please provide us with a screenshot containing:\n\n\
                - Your in-game username\n- Your Discord username/ID\n- Today's date",
            example_image: Some(PLAYER_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:group_other",
        label: "Other",
        action: NodeAction::Ticket {
            parent_label: Some(GROUPS),
            instructions: OTHER_INSTRUCTIONS,
            example_image: None,
        },
    },
    // competitions
    SupportNode {
        id: "persistent_view:competition_reset_code",
        label: "Reset my verification code",
        action: NodeAction::Ticket {
            parent_label: Some(COMPETITIONS),
            instructions: "To reset your verification code, please provide us with a screenshot containing:\n\n\
                - Your in-game username\n- Your Discord username/ID\n- Today's date\n\n\
                Keep in mind that verification codes should be secret, they can be used to edit or delete a competition, so \
                please be mindful of who you choose to share it with.\n\n\
                Note: If this competition was created through a group, then the verification code is the same as your \
                group's verification code.",
            example_image: Some(PLAYER_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:competition_remove",
        label: "Remove me from a competition",
        action: NodeAction::Ticket {
            parent_label: Some(COMPETITIONS),
            instructions: "To remove yourself from a competition, please provide us with a screenshot containing:\n\n\
                - Your in-game username\n- Your Discord username/ID\n- Today's date",
            example_image: Some(PLAYER_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:competition_other",
        label: "Other",
        action: NodeAction::Ticket {
            parent_label: Some(COMPETITIONS),
            instructions: OTHER_INSTRUCTIONS,
            example_image: None,
        },
    },
    // name changes
    SupportNode {
        id: "persistent_view:names_approve",
        label: "Approve a pending name change",
        action: NodeAction::Ticket {
            parent_label: Some(NAME_CHANGES),
            instructions: "Some name changes get skipped, as they can't be auto-approved by our system and require manual \
                approval.\n\nIf yours hasn't been auto-approved, please tell us the name change ID and we'll manually review \
                it for you.\n\nNote: If you'd like to know why your name change has been skipped you can visit our website at \
                https://wiseoldman.net/names and hover your cursor over your name change's ℹ️ icon.",
            example_image: None,
        },
    },
    SupportNode {
        id: "persistent_view:names_delete",
        label: "Delete name change history",
        action: NodeAction::Ticket {
            parent_label: Some(NAME_CHANGES),
            instructions: "To request a name change history deletion, please provide us with:\n\n\
                - Your in-game username\n- Your Discord username/ID\n- Today's date",
            example_image: Some(PLAYER_EXAMPLE),
        },
    },
    SupportNode {
        id: "persistent_view:names_other",
        label: "Other",
        action: NodeAction::Ticket {
            parent_label: Some(NAME_CHANGES),
            instructions: OTHER_INSTRUCTIONS,
            example_image: None,
        },
    },
];

/// Look up a node by its component custom id
pub fn node(id: &str) -> Option<&'static SupportNode> {
    NODES.iter().find(|node| node.id == id)
}

impl SupportNode {
    /// Channel topic for tickets opened from this node, e.g. `Groups → Verify my group`
    pub fn topic(&self) -> String {
        match self.action {
            NodeAction::Ticket {
                parent_label: Some(parent_label),
                ..
            } => format!("{parent_label} {ARROW} {}", self.label),
            _ => self.label.to_string(),
        }
    }

    /// Full instructions shown in a new ticket, or None for menus
    pub fn ticket_instructions(&self, patreon_channel: ChannelId) -> Option<String> {
        match self.action {
            NodeAction::Ticket { instructions, .. } => {
                let instructions = instructions.replace(PATREON_CHANNEL, &patreon_channel.mention().to_string());
                Some(format!("{instructions}\n\n{FOOTER}"))
            }
            NodeAction::Menu { .. } => None,
        }
    }
}

/// Overview of every category for the panel embed, e.g.
///
/// ```text
/// **Groups** → Assistance on group related things
/// - Verify my group
/// ```
pub fn synopsis() -> String {
    let mut synopsis = String::new();
    for root in ROOT {
        let Some(node) = node(root.id) else {
            continue;
        };
        if !synopsis.is_empty() {
            synopsis.push_str("\n\n");
        }
        let _ = write!(synopsis, "**{}** {ARROW} {}", node.label, root.summary);
        if let NodeAction::Menu { children, .. } = node.action {
            for child in children.iter().filter_map(|id| self::node(id)) {
                let _ = write!(synopsis, "\n- {}", child.label);
            }
        }
    }
    synopsis
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    /// Discord caps custom ids at 100 characters
    const CUSTOM_ID_LIMIT: usize = 100;
    /// Discord caps button labels at 80 characters
    const BUTTON_LABEL_LIMIT: usize = 80;
    /// Discord allows at most 5 buttons in a single action row
    const BUTTONS_PER_ROW: usize = 5;
    const PATREON: ChannelId = ChannelId::new(77);

    fn is_root(node: &SupportNode) -> bool {
        ROOT.iter().any(|root| root.id == node.id)
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids = HashSet::new();
        for node in NODES {
            assert!(ids.insert(node.id), "duplicate node id {}", node.id);
        }
    }

    #[test]
    fn test_every_reference_resolves() {
        for root in ROOT {
            assert!(node(root.id).is_some(), "missing root node {}", root.id);
        }
        for node in NODES {
            if let NodeAction::Menu { children, .. } = node.action {
                assert!(!children.is_empty(), "menu {} has no children", node.id);
                assert!(children.len() <= BUTTONS_PER_ROW);
                for child in children {
                    let child = super::node(child).unwrap_or_else(|| panic!("missing child node {child}"));
                    assert!(!is_root(child), "{} is both a root and a child", child.id);
                }
            }
        }
    }

    #[test]
    fn test_discord_limits() {
        for node in NODES {
            assert!(node.id.starts_with("persistent_view:"));
            assert!(node.id.chars().count() <= CUSTOM_ID_LIMIT);
            assert!(node.label.chars().count() <= BUTTON_LABEL_LIMIT);
        }
        // the panel lays its root buttons out over several rows, and Discord allows 5 rows per message
        assert!(ROOT.len() <= BUTTONS_PER_ROW * 5);
    }

    #[test]
    fn test_topic() {
        let node = node("persistent_view:group_verify").expect("node should exist");
        assert_eq!(node.topic(), "Groups → Verify my group");
        let node = super::node("persistent_view:api_key").expect("node should exist");
        assert_eq!(node.topic(), "API Key");
    }

    #[test]
    fn test_ticket_instructions() {
        let node = node("persistent_view:other_instructions").expect("node should exist");
        let instructions = node.ticket_instructions(PATREON).expect("should be a ticket node");
        assert!(instructions.starts_with(OTHER_INSTRUCTIONS));
        assert!(instructions.ends_with(FOOTER));

        let menu = super::node("persistent_view:groups_instructions").expect("node should exist");
        assert!(menu.ticket_instructions(PATREON).is_none());
    }

    #[test]
    fn test_patreon_instructions_mention_channel() {
        let node = node("persistent_view:patreon").expect("node should exist");
        assert_eq!(node.topic(), "Patreon");
        let instructions = node.ticket_instructions(PATREON).expect("should be a ticket node");
        assert!(instructions.starts_with(
            "If you are interested in claiming or signing up for patreon benefits, check out <#77> for more information."
        ));
        assert!(!instructions.contains(PATREON_CHANNEL));
        assert!(instructions.ends_with(FOOTER));
    }

    #[test]
    fn test_no_stray_placeholders() {
        for node in NODES {
            if let Some(instructions) = node.ticket_instructions(PATREON) {
                assert!(!instructions.contains('{'), "{} has an unreplaced placeholder", node.id);
            }
        }
    }

    #[test]
    fn test_synopsis() {
        let synopsis = synopsis();
        assert!(synopsis.starts_with("**Groups** → Assistance on group related things\n- Verify my group\n"));
        assert!(synopsis.contains("\n- Other\n\n**Patreon** → Claim or ask about Patreon benefits\n\n**API Key**"));
        assert!(synopsis.contains("\n\n**API Key** → Request an API key for development\n\n"));
        assert!(synopsis.ends_with("**Other** → Request assistance for all other inquiries"));
    }

    /// these ids are embedded in messages that already exist, so they can never be renamed
    #[test]
    fn test_stable_ids() {
        for id in [
            "persistent_view:groups_instructions",
            "persistent_view:group_verify",
            "persistent_view:names_approve",
            "persistent_view:api_key",
            "persistent_view:patreon",
        ] {
            assert!(node(id).is_some(), "{id} must keep existing");
        }
    }
}
