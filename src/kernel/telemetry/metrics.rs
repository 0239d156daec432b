use std::collections::{HashMap, VecDeque};

use super::event::{DropReason, InteractionLabel, TelemetryEvent};
use crate::kernel::action::Action;
use crate::kernel::policy::SuppressReason;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub transitions: u64,
    pub emission_stats: EmissionStats,
    pub suppression_stats: SuppressionStats,
    pub interaction_stats: InteractionStats,
    pub day_rollovers: u64,
    pub dropped_inputs: HashMap<DropReason, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct EmissionStats {
    pub automatic: u64,
    pub forced: u64,
    pub per_action: HashMap<Action, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SuppressionStats {
    pub chat_open: u64,
    pub cooldown: u64,
    pub daily_cap: u64,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionStats {
    pub per_kind: HashMap<InteractionLabel, u64>,
    pub no_ops: u64,
    /// Ignored actions per emission, across the recorded window.
    pub ignore_ratio: f64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::StateTransition { .. } => snap.transitions += 1,
            TelemetryEvent::ActionEmitted { action, forced, .. } => {
                if *forced {
                    snap.emission_stats.forced += 1;
                } else {
                    snap.emission_stats.automatic += 1;
                }
                *snap.emission_stats.per_action.entry(*action).or_insert(0) += 1;
            }
            TelemetryEvent::ActionSuppressed { reason, .. } => match reason {
                SuppressReason::ChatOpen => snap.suppression_stats.chat_open += 1,
                SuppressReason::Cooldown => snap.suppression_stats.cooldown += 1,
                SuppressReason::DailyCap => snap.suppression_stats.daily_cap += 1,
            },
            TelemetryEvent::Interaction { kind, applied } => {
                *snap.interaction_stats.per_kind.entry(*kind).or_insert(0) += 1;
                if !applied {
                    snap.interaction_stats.no_ops += 1;
                }
            }
            TelemetryEvent::DayRollover { .. } => snap.day_rollovers += 1,
            TelemetryEvent::InputDropped { reason } => {
                *snap.dropped_inputs.entry(*reason).or_insert(0) += 1;
            }
        }
    }

    let emitted = snap.emission_stats.automatic + snap.emission_stats.forced;
    if emitted > 0 {
        let ignored = snap
            .interaction_stats
            .per_kind
            .get(&InteractionLabel::IgnoredAction)
            .copied()
            .unwrap_or(0);
        snap.interaction_stats.ignore_ratio = ignored as f64 / emitted as f64;
    }

    snap
}
