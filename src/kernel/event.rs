use serde::{Deserialize, Serialize};

use super::action::{Action, Expression};
use super::time::WallTime;
use crate::error::InputError;

/// Everything the reactor consumes flows through this one enum, so samples,
/// interactions and triggers share a single FIFO order.
#[derive(Debug, Clone)]
pub enum Event {
    Sample(Sample),
    Interaction(UserInteraction),
    Trigger(ManualTrigger),
}

/// One observation from the activity sample source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub ts: WallTime,
    pub active_app: String,
    #[serde(default)]
    pub active_title: Option<String>,
    pub idle_sec: f64,
}

impl Sample {
    pub fn new(ts: WallTime, active_app: &str, idle_sec: f64) -> Self {
        Self {
            ts,
            active_app: active_app.to_string(),
            active_title: None,
            idle_sec,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.active_title = Some(title.to_string());
        self
    }

    /// Structural checks that the type system cannot express.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.active_app.trim().is_empty() {
            return Err(InputError::Empty("activeApp"));
        }
        if !self.idle_sec.is_finite() || self.idle_sec < 0.0 {
            return Err(InputError::InvalidNumber("idleSec"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    ClickPet,
    OpenChat,
    CloseChat,
    IgnoredAction { action: Action },
}

impl InteractionKind {
    pub fn label(&self) -> &'static str {
        match self {
            InteractionKind::ClickPet => "CLICK_PET",
            InteractionKind::OpenChat => "OPEN_CHAT",
            InteractionKind::CloseChat => "CLOSE_CHAT",
            InteractionKind::IgnoredAction { .. } => "IGNORED_ACTION",
        }
    }
}

/// Feedback from a UI surface. The only input that mutates the policy
/// engine's adaptive state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserInteraction {
    pub ts: WallTime,
    pub kind: InteractionKind,
}

impl UserInteraction {
    pub fn new(ts: WallTime, kind: InteractionKind) -> Self {
        Self { ts, kind }
    }
}

/// Operator/UI-forced action. Bypasses the policy gate but still counts
/// against cooldowns and the daily cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualTrigger {
    pub action: Action,
    pub expression: Option<Expression>,
}

impl ManualTrigger {
    pub fn new(action: Action) -> Self {
        Self { action, expression: None }
    }
}
