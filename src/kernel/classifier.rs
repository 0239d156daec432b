use serde::{Deserialize, Serialize};

use super::aggregator::AggregateSignal;
use crate::config::ClassifierConfig;

/// The user's attentional state. Exactly one holds per tick.
///
/// NOTE: `CompanionState::Idle` describes the user; `Action::Idle` is an
/// avatar emission. They only share a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanionState {
    Focus,
    Idle,
    Fragmented,
    SocialCheckLoop,
}

impl Default for CompanionState {
    fn default() -> Self {
        Self::Focus
    }
}

/// One row of the priority table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Repeated social-app checking while also thrashing between apps.
    SocialCheckLoop,
    /// Rapid context switching without the social signature.
    Fragmented,
    /// No input for longer than the idle threshold.
    Idle,
}

/// Evaluated top to bottom; the first matching rule decides the state.
/// `Focus` is the fallback when nothing matches.
pub const RULES: [Rule; 3] = [Rule::SocialCheckLoop, Rule::Fragmented, Rule::Idle];

impl Rule {
    pub fn matches(&self, signal: &AggregateSignal, config: &ClassifierConfig) -> bool {
        match self {
            Rule::SocialCheckLoop => {
                signal.social_hits_3m > config.social_loop_hits
                    && signal.switch_rate_2m > config.social_loop_switches
            }
            Rule::Fragmented => signal.switch_rate_2m > config.fragmented_switches,
            Rule::Idle => signal.idle_sec > config.idle_threshold_secs,
        }
    }

    pub fn state(&self) -> CompanionState {
        match self {
            Rule::SocialCheckLoop => CompanionState::SocialCheckLoop,
            Rule::Fragmented => CompanionState::Fragmented,
            Rule::Idle => CompanionState::Idle,
        }
    }
}

/// Pure function: (Signal, Config) -> State. No memory between calls;
/// flapping is absorbed downstream by cooldowns.
pub fn classify(signal: &AggregateSignal, config: &ClassifierConfig) -> CompanionState {
    RULES
        .iter()
        .find(|rule| rule.matches(signal, config))
        .map(Rule::state)
        .unwrap_or(CompanionState::Focus)
}
