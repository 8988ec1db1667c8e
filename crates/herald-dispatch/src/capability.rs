//! Workspace capabilities required of actors and of the bot itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A permission a member (or the bot agent) may hold inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Administrator,
    ManageWorkspace,
    ManageSurfaces,
    ManageRoles,
    ManageMessages,
    KickMembers,
    BanMembers,
    ModerateMembers,
    SendMessages,
    EmbedLinks,
    AttachFiles,
    AddReactions,
    ReadHistory,
    MentionEveryone,
    Connect,
    Speak,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Capability::Administrator => "Administrator",
            Capability::ManageWorkspace => "Manage Server",
            Capability::ManageSurfaces => "Manage Channels",
            Capability::ManageRoles => "Manage Roles",
            Capability::ManageMessages => "Manage Messages",
            Capability::KickMembers => "Kick Members",
            Capability::BanMembers => "Ban Members",
            Capability::ModerateMembers => "Timeout Members",
            Capability::SendMessages => "Send Messages",
            Capability::EmbedLinks => "Embed Links",
            Capability::AttachFiles => "Attach Files",
            Capability::AddReactions => "Add Reactions",
            Capability::ReadHistory => "Read Message History",
            Capability::MentionEveryone => "Mention Everyone",
            Capability::Connect => "Connect",
            Capability::Speak => "Speak",
        };
        f.write_str(label)
    }
}

/// Ordered set of capabilities. Ordering keeps refusal messages stable.
pub type CapabilitySet = BTreeSet<Capability>;

/// Render a capability set as a comma separated list.
pub fn describe(set: &CapabilitySet) -> String {
    set.iter()
        .map(Capability::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_is_sorted_and_joined() {
        let set: CapabilitySet = [Capability::BanMembers, Capability::ManageMessages]
            .into_iter()
            .collect();
        assert_eq!(describe(&set), "Manage Messages, Ban Members");
    }

    #[test]
    fn test_describe_empty() {
        assert_eq!(describe(&CapabilitySet::new()), "");
    }

    #[test]
    fn test_capability_serde() {
        let json = serde_json::to_string(&Capability::ManageSurfaces).unwrap();
        assert_eq!(json, "\"manage_surfaces\"");
    }
}
