use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::action::{Action, ActionCommand, BubbleKind, Expression};
use super::classifier::CompanionState;
use super::event::{InteractionKind, ManualTrigger, UserInteraction};
use super::time::{day_key, WallTime};
use crate::config::PolicyConfig;

/// Adaptive state. Owned by exactly one `PolicyEngine` and mutated only
/// through its entry points. Lives in memory for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyState {
    pub last_emitted_at: HashMap<Action, WallTime>,
    pub daily_count: u32,
    pub day_key: Option<NaiveDate>,
    pub ignore_streak: u32,
    pub chat_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuppressReason {
    ChatOpen,
    Cooldown,
    DailyCap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Emit(ActionCommand),
    /// The state maps to the resting `Action::Idle`; nothing to send.
    Steady,
    Suppressed { action: Action, reason: SuppressReason },
}

/// Maps the user's state to the avatar's candidate reaction.
pub fn candidate_for(state: CompanionState) -> Action {
    match state {
        CompanionState::Focus => Action::Idle,
        CompanionState::Idle => Action::Approach,
        CompanionState::Fragmented => Action::Retreat,
        CompanionState::SocialCheckLoop => Action::InviteChat,
    }
}

/// Round-robin over each pool, skipping any entry identical to the previous
/// bubble of the same action.
#[derive(Debug, Default)]
struct BubbleRotation {
    cursors: HashMap<(Action, bool), usize>,
    last: HashMap<Action, String>,
}

impl BubbleRotation {
    fn pick(&mut self, action: Action, pool: &[String], night: bool) -> Option<String> {
        if pool.is_empty() {
            return None;
        }
        let cursor = self.cursors.entry((action, night)).or_insert(0);
        for _ in 0..pool.len() {
            let candidate = &pool[*cursor % pool.len()];
            *cursor = (*cursor + 1) % pool.len();
            if self.last.get(&action) != Some(candidate) {
                self.last.insert(action, candidate.clone());
                return Some(candidate.clone());
            }
        }
        // Only the previous text is available: omit the bubble this time and
        // allow it again on the next emission.
        self.last.remove(&action);
        None
    }
}

pub struct PolicyEngine {
    config: PolicyConfig,
    state: PolicyState,
    bubbles: BubbleRotation,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            state: PolicyState::default(),
            bubbles: BubbleRotation::default(),
        }
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    /// `backoff_factor ^ streak`, capped. Never below 1, never decreasing in `streak`.
    pub fn backoff_multiplier(&self, streak: u32) -> f64 {
        let exponent = i32::try_from(streak).unwrap_or(i32::MAX);
        self.config
            .backoff_factor
            .powi(exponent)
            .min(self.config.backoff_cap)
            .max(1.0)
    }

    pub fn effective_cooldown(&self, action: Action) -> Duration {
        let base_ms = self.config.actions.get(action).cooldown_secs as f64 * 1000.0;
        let scaled = base_ms * self.backoff_multiplier(self.state.ignore_streak);
        Duration::try_milliseconds(scaled.round() as i64).unwrap_or(Duration::MAX)
    }

    /// Time left before `action` may be emitted again, or `None` if it is free.
    /// A `now` earlier than the last emission keeps the cooldown closed.
    pub fn cooldown_remaining(&self, action: Action, now: WallTime) -> Option<Duration> {
        let last = self.state.last_emitted_at.get(&action)?;
        let elapsed = now.signed_duration_since(*last);
        let required = self.effective_cooldown(action);
        if elapsed < required {
            // A far-backward clock can push the difference out of range.
            Some(required.checked_sub(&elapsed).unwrap_or(Duration::MAX))
        } else {
            None
        }
    }

    /// Resets the daily counter when `now` falls on a later local day than
    /// the stored key. Returns true on a rollover. A backward clock never resets.
    pub fn roll_day(&mut self, now: WallTime) -> bool {
        let today = day_key(now);
        match self.state.day_key {
            None => {
                self.state.day_key = Some(today);
                false
            }
            Some(stored) if today > stored => {
                debug!("Day rollover {} -> {}, resetting daily count {}", stored, today, self.state.daily_count);
                self.state.day_key = Some(today);
                self.state.daily_count = 0;
                true
            }
            Some(_) => false,
        }
    }

    /// One gated decision for the current tick.
    pub fn evaluate(&mut self, companion: CompanionState, now: WallTime, is_night: bool) -> Decision {
        self.roll_day(now);
        let action = candidate_for(companion);

        // 1. Focus maps to the resting no-op
        if action == Action::Idle {
            return Decision::Steady;
        }

        // 2. Chat window owns the avatar while open
        if self.state.chat_open {
            return Decision::Suppressed { action, reason: SuppressReason::ChatOpen };
        }

        // 3. Gates
        if let Some(remaining) = self.cooldown_remaining(action, now) {
            debug!("{} on cooldown for another {}ms", action.label(), remaining.num_milliseconds());
            return Decision::Suppressed { action, reason: SuppressReason::Cooldown };
        }
        if self.state.daily_count >= self.config.daily_max {
            return Decision::Suppressed { action, reason: SuppressReason::DailyCap };
        }

        // 4. Emit
        let command = self.build(action, None, now, is_night, false);
        self.record_emission(action, now);
        Decision::Emit(command)
    }

    /// Manual trigger: skips the gates, still charges cooldown and quota.
    pub fn force(&mut self, trigger: &ManualTrigger, now: WallTime, is_night: bool) -> ActionCommand {
        self.roll_day(now);
        let command = self.build(trigger.action, trigger.expression, now, is_night, true);
        self.record_emission(trigger.action, now);
        command
    }

    /// Applies user feedback. Returns false when the event was a no-op.
    pub fn handle_interaction(&mut self, interaction: &UserInteraction) -> bool {
        match interaction.kind {
            InteractionKind::IgnoredAction { action } => {
                if !self.state.last_emitted_at.contains_key(&action) {
                    debug!("Ignoring IGNORED_ACTION for never-emitted {}", action.label());
                    return false;
                }
                self.state.ignore_streak = self.state.ignore_streak.saturating_add(1);
            }
            InteractionKind::ClickPet => {
                self.state.ignore_streak = 0;
            }
            InteractionKind::OpenChat => {
                self.state.chat_open = true;
                self.state.ignore_streak = 0;
            }
            InteractionKind::CloseChat => {
                self.state.chat_open = false;
            }
        }
        true
    }

    fn build(
        &mut self,
        action: Action,
        expression: Option<Expression>,
        now: WallTime,
        is_night: bool,
        forced: bool,
    ) -> ActionCommand {
        let profile = self.config.actions.get(action);
        let use_night = is_night && !profile.night_bubbles.is_empty();
        let pool = if use_night { &profile.night_bubbles } else { &profile.bubbles };
        let bubble = self.bubbles.pick(action, pool, use_night);

        ActionCommand {
            id: Uuid::new_v4(),
            ts: now,
            action,
            expression: expression.unwrap_or(profile.expression),
            bubble_kind: bubble
                .as_ref()
                .map(|_| profile.bubble_kind.unwrap_or(BubbleKind::Text)),
            bubble,
            duration_ms: profile.duration_ms,
            forced,
        }
    }

    fn record_emission(&mut self, action: Action, now: WallTime) {
        // Never move the anchor backwards.
        self.state
            .last_emitted_at
            .entry(action)
            .and_modify(|t| *t = (*t).max(now))
            .or_insert(now);
        self.state.daily_count = self.state.daily_count.saturating_add(1);
    }
}
