use serde::{Deserialize, Serialize};

use crate::kernel::action::Action;
use crate::kernel::classifier::CompanionState;
use crate::kernel::event::InteractionKind;
use crate::kernel::policy::SuppressReason;
use crate::kernel::time::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StateTransition {
        from: CompanionState,
        to: CompanionState,
        tick: Tick,
    },

    ActionEmitted {
        action: Action,
        forced: bool,
        tick: Tick,
    },

    ActionSuppressed {
        action: Action,
        reason: SuppressReason,
    },

    Interaction {
        kind: InteractionLabel,
        /// False when the engine treated the event as a no-op.
        applied: bool,
    },

    DayRollover {
        tick: Tick,
    },

    InputDropped {
        reason: DropReason,
    },
}

/// Content-free mirror of `InteractionKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionLabel {
    ClickPet,
    OpenChat,
    CloseChat,
    IgnoredAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    MalformedSample,
    OutOfOrderSample,
}

impl From<&InteractionKind> for InteractionLabel {
    fn from(kind: &InteractionKind) -> Self {
        match kind {
            InteractionKind::ClickPet => InteractionLabel::ClickPet,
            InteractionKind::OpenChat => InteractionLabel::OpenChat,
            InteractionKind::CloseChat => InteractionLabel::CloseChat,
            InteractionKind::IgnoredAction { .. } => InteractionLabel::IgnoredAction, // Action STRIPPED
        }
    }
}
