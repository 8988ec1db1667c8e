//! Cooldown scopes and key derivation.
//!
//! Each scope is described by a row in `SCOPE_RULES`: the context parts
//! its key is built from, the scope to fall back to when a part is
//! missing, and the phrase used in refusal messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::invocation::Invocation;

/// Granularity at which an action's rate limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    /// One cooldown per actor, wherever they invoke.
    #[default]
    User,
    /// One cooldown per surface.
    Channel,
    /// One cooldown per actor per surface.
    UserChannel,
    /// One cooldown per workspace.
    Guild,
    /// One cooldown per actor per workspace.
    UserGuild,
    /// One cooldown per shard.
    Shard,
    /// One cooldown per actor per shard.
    UserShard,
    /// A single cooldown shared by everyone.
    Global,
}

/// Context component a cooldown key is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPart {
    Actor,
    Surface,
    Workspace,
    Shard,
}

struct ScopeRule {
    scope: CooldownScope,
    parts: &'static [KeyPart],
    fallback: Option<CooldownScope>,
    phrase: &'static str,
}

const SCOPE_RULES: &[ScopeRule] = &[
    ScopeRule {
        scope: CooldownScope::User,
        parts: &[KeyPart::Actor],
        fallback: None,
        phrase: "",
    },
    ScopeRule {
        scope: CooldownScope::Channel,
        parts: &[KeyPart::Surface],
        fallback: None,
        phrase: "in this channel",
    },
    ScopeRule {
        scope: CooldownScope::UserChannel,
        parts: &[KeyPart::Actor, KeyPart::Surface],
        fallback: None,
        phrase: "in this channel",
    },
    ScopeRule {
        scope: CooldownScope::Guild,
        parts: &[KeyPart::Workspace],
        fallback: Some(CooldownScope::Channel),
        phrase: "in this server",
    },
    ScopeRule {
        scope: CooldownScope::UserGuild,
        parts: &[KeyPart::Actor, KeyPart::Workspace],
        fallback: Some(CooldownScope::UserChannel),
        phrase: "in this server",
    },
    ScopeRule {
        scope: CooldownScope::Shard,
        parts: &[KeyPart::Shard],
        fallback: Some(CooldownScope::Global),
        phrase: "on this shard",
    },
    ScopeRule {
        scope: CooldownScope::UserShard,
        parts: &[KeyPart::Actor, KeyPart::Shard],
        fallback: Some(CooldownScope::User),
        phrase: "on this shard",
    },
    ScopeRule {
        scope: CooldownScope::Global,
        parts: &[],
        fallback: None,
        phrase: "globally",
    },
];

impl CooldownScope {
    pub const ALL: [CooldownScope; 8] = [
        CooldownScope::User,
        CooldownScope::Channel,
        CooldownScope::UserChannel,
        CooldownScope::Guild,
        CooldownScope::UserGuild,
        CooldownScope::Shard,
        CooldownScope::UserShard,
        CooldownScope::Global,
    ];

    fn rule(self) -> &'static ScopeRule {
        // Every variant has exactly one row.
        SCOPE_RULES
            .iter()
            .find(|rule| rule.scope == self)
            .unwrap_or(&SCOPE_RULES[SCOPE_RULES.len() - 1])
    }

    /// Scope used instead of this one when its context is unavailable.
    pub fn fallback(self) -> Option<CooldownScope> {
        self.rule().fallback
    }

    /// Phrase appended to refusal messages, e.g. "in this server".
    pub fn phrase(self) -> &'static str {
        self.rule().phrase
    }

    /// Derive the cooldown key for `action` under this scope.
    ///
    /// When the invocation lacks a context part this scope needs (no
    /// workspace in a direct conversation, no shard on an unsharded
    /// client), the fallback scope is used instead.
    pub fn key_for(self, action: &str, invocation: &Invocation) -> CooldownKey {
        let mut effective = self;
        while !parts_available(effective.rule().parts, invocation) {
            match effective.fallback() {
                Some(next) => effective = next,
                None => break,
            }
        }

        let mut key = String::from(action);
        let parts = effective.rule().parts;
        if parts.is_empty() {
            key.push_str("|globally");
        }
        for part in parts {
            match part {
                KeyPart::Actor => key.push_str(&format!("|U:{}", invocation.actor)),
                KeyPart::Surface => key.push_str(&format!("|C:{}", invocation.surface)),
                KeyPart::Workspace => {
                    if let Some(workspace) = invocation.workspace {
                        key.push_str(&format!("|G:{}", workspace));
                    }
                }
                KeyPart::Shard => {
                    if let Some(shard) = invocation.shard {
                        key.push_str(&format!("|S:{}", shard.id));
                    }
                }
            }
        }

        CooldownKey {
            key,
            requested: self,
            effective,
        }
    }
}

fn parts_available(parts: &[KeyPart], invocation: &Invocation) -> bool {
    parts.iter().all(|part| match part {
        KeyPart::Actor | KeyPart::Surface => true,
        KeyPart::Workspace => invocation.workspace.is_some(),
        KeyPart::Shard => invocation.shard.is_some(),
    })
}

impl fmt::Display for CooldownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CooldownScope::User => write!(f, "user"),
            CooldownScope::Channel => write!(f, "channel"),
            CooldownScope::UserChannel => write!(f, "user_channel"),
            CooldownScope::Guild => write!(f, "guild"),
            CooldownScope::UserGuild => write!(f, "user_guild"),
            CooldownScope::Shard => write!(f, "shard"),
            CooldownScope::UserShard => write!(f, "user_shard"),
            CooldownScope::Global => write!(f, "global"),
        }
    }
}

/// A derived cooldown key together with the scope that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownKey {
    pub key: String,
    /// Scope configured on the action.
    pub requested: CooldownScope,
    /// Scope actually used after fallbacks.
    pub effective: CooldownScope,
}

impl CooldownKey {
    pub fn fell_back(&self) -> bool {
        self.requested != self.effective
    }

    /// Refusal text for an invocation that is still cooling down.
    ///
    /// When the key fell back to a wider scope the message says why.
    pub fn refusal_message(&self, remaining_secs: u64) -> String {
        let unit = if remaining_secs == 1 { "second" } else { "seconds" };
        let mut message = String::from("That command is on cooldown");
        let phrase = self.effective.phrase();
        if !phrase.is_empty() {
            message.push(' ');
            message.push_str(phrase);
        }
        if let Some(reason) = self.fallback_reason() {
            message.push(' ');
            message.push_str(reason);
        }
        message.push_str(&format!(". Try again in {} {}.", remaining_secs, unit));
        message
    }

    fn fallback_reason(&self) -> Option<&'static str> {
        if !self.fell_back() {
            return None;
        }
        let needs = self.requested.rule().parts;
        if needs.contains(&KeyPart::Workspace) {
            Some("since there is no server here")
        } else if needs.contains(&KeyPart::Shard) {
            Some("since the client is not sharded")
        } else {
            None
        }
    }
}
