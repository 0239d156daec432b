use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time::WallTime;

/// What the avatar is asked to do.
///
/// NOTE: `Action::Idle` is the avatar's resting emission. It is unrelated to
/// `CompanionState::Idle`, which describes the *user*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Idle,
    Approach,
    Retreat,
    InviteChat,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Idle,
        Action::Approach,
        Action::Retreat,
        Action::InviteChat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Idle => "IDLE",
            Action::Approach => "APPROACH",
            Action::Retreat => "RETREAT",
            Action::InviteChat => "INVITE_CHAT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Surprised,
    Relaxed,
    Curious,
    Sleepy,
    Shy,
    Thinking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleKind {
    Text,
    Thinking,
}

/// A single instruction for the action sink. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommand {
    pub id: Uuid,
    pub ts: WallTime,
    pub action: Action,
    pub expression: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble_kind: Option<BubbleKind>,
    pub bubble: Option<String>,
    pub duration_ms: u64,
    /// Set for manual triggers that bypassed the policy gate.
    #[serde(default)]
    pub forced: bool,
}
