use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kernel::action::{Action, BubbleKind, Expression};
use crate::kernel::time::DEFAULT_TICK_MS;

/// Upper bound for window sizes and cooldowns: one year.
pub const MAX_SPAN_SECS: u64 = 365 * 24 * 60 * 60;
/// Upper bound for the backoff multiplier cap.
pub const MAX_BACKOFF_CAP: f64 = 1_000.0;

/// Everything the kernel needs, consumed once at construction.
/// Changing it mid-run means building a new `Reactor`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub tick: TickConfig,
    pub sensing: SensingConfig,
    pub classifier: ClassifierConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub interval_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { interval_ms: DEFAULT_TICK_MS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensingConfig {
    /// Matched case-insensitively as substrings of the foreground app id.
    pub social_apps: Vec<String>,
    pub switch_window_secs: u64,
    pub social_window_secs: u64,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            social_apps: vec![
                "wechat".into(),
                "qq".into(),
                "telegram".into(),
                "discord".into(),
                "slack".into(),
                "twitter".into(),
                "weibo".into(),
                "bilibili".into(),
                "douyin".into(),
                "tiktok".into(),
            ],
            switch_window_secs: 120,
            social_window_secs: 180,
            night_start_hour: 23,
            night_end_hour: 6,
        }
    }
}

/// Thresholds are raw counts per window, not per-minute rates.
/// A rule fires when its signal strictly exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub social_loop_hits: u32,
    pub social_loop_switches: u32,
    pub fragmented_switches: u32,
    pub idle_threshold_secs: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            social_loop_hits: 10,
            social_loop_switches: 6,
            fragmented_switches: 5,
            idle_threshold_secs: 180.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub daily_max: u32,
    /// Cooldown multiplier is `backoff_factor ^ ignore_streak`, capped at `backoff_cap`.
    pub backoff_factor: f64,
    pub backoff_cap: f64,
    pub actions: ActionProfiles,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            daily_max: 12,
            backoff_factor: 2.0,
            backoff_cap: 8.0,
            actions: ActionProfiles::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionProfiles {
    pub idle: ActionProfile,
    pub approach: ActionProfile,
    pub retreat: ActionProfile,
    pub invite_chat: ActionProfile,
}

impl ActionProfiles {
    pub fn get(&self, action: Action) -> &ActionProfile {
        match action {
            Action::Idle => &self.idle,
            Action::Approach => &self.approach,
            Action::Retreat => &self.retreat,
            Action::InviteChat => &self.invite_chat,
        }
    }
}

impl Default for ActionProfiles {
    fn default() -> Self {
        Self {
            idle: ActionProfile::default(),
            approach: ActionProfile {
                cooldown_secs: 600,
                expression: Expression::Happy,
                bubble_kind: Some(BubbleKind::Text),
                duration_ms: 6_000,
                bubbles: strings(&[
                    "Still there? I saved you a spot.",
                    "Hey, welcome back.",
                    "Taking a break? Good call.",
                ]),
                night_bubbles: strings(&[
                    "It's getting late. Bed soon?",
                    "Quiet night, huh.",
                ]),
            },
            retreat: ActionProfile {
                cooldown_secs: 300,
                expression: Expression::Shy,
                bubble_kind: Some(BubbleKind::Thinking),
                duration_ms: 4_000,
                bubbles: strings(&[
                    "I'll give you some space.",
                    "Lots going on. I'll stay out of the way.",
                ]),
                night_bubbles: Vec::new(),
            },
            invite_chat: ActionProfile {
                cooldown_secs: 900,
                expression: Expression::Curious,
                bubble_kind: Some(BubbleKind::Text),
                duration_ms: 8_000,
                bubbles: strings(&[
                    "Want to talk instead of scrolling?",
                    "Looking for something? Ask me.",
                    "I'm here if you want to chat.",
                ]),
                night_bubbles: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionProfile {
    pub cooldown_secs: u64,
    pub expression: Expression,
    pub bubble_kind: Option<BubbleKind>,
    pub duration_ms: u64,
    pub bubbles: Vec<String>,
    /// Preferred over `bubbles` during night hours when non-empty.
    pub night_bubbles: Vec<String>,
}

impl Default for ActionProfile {
    fn default() -> Self {
        Self {
            cooldown_secs: 0,
            expression: Expression::Neutral,
            bubble_kind: None,
            duration_ms: 0,
            bubbles: Vec::new(),
            night_bubbles: Vec::new(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl CompanionConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CompanionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.interval_ms == 0 {
            return Err(ConfigError::invalid("tick.interval_ms", "must be greater than zero"));
        }

        let s = &self.sensing;
        if s.switch_window_secs == 0 {
            return Err(ConfigError::invalid("sensing.switch_window_secs", "must be greater than zero"));
        }
        if s.social_window_secs == 0 {
            return Err(ConfigError::invalid("sensing.social_window_secs", "must be greater than zero"));
        }
        if s.switch_window_secs > MAX_SPAN_SECS {
            return Err(ConfigError::invalid("sensing.switch_window_secs", "must not exceed one year"));
        }
        if s.social_window_secs > MAX_SPAN_SECS {
            return Err(ConfigError::invalid("sensing.social_window_secs", "must not exceed one year"));
        }
        if s.night_start_hour > 23 || s.night_end_hour > 23 {
            return Err(ConfigError::invalid("sensing.night_*_hour", "hours must be in 0..=23"));
        }
        if s.social_apps.iter().any(|app| app.trim().is_empty()) {
            // An empty pattern would match every app.
            return Err(ConfigError::invalid("sensing.social_apps", "identifiers must not be empty"));
        }

        let c = &self.classifier;
        if !c.idle_threshold_secs.is_finite() || c.idle_threshold_secs < 0.0 {
            return Err(ConfigError::invalid(
                "classifier.idle_threshold_secs",
                "must be a finite, non-negative number",
            ));
        }

        let p = &self.policy;
        if !p.backoff_factor.is_finite() || p.backoff_factor < 1.0 {
            return Err(ConfigError::invalid("policy.backoff_factor", "must be finite and >= 1.0"));
        }
        if !p.backoff_cap.is_finite() || !(1.0..=MAX_BACKOFF_CAP).contains(&p.backoff_cap) {
            return Err(ConfigError::invalid("policy.backoff_cap", "must be in 1.0..=1000.0"));
        }

        for action in Action::ALL {
            if p.actions.get(action).cooldown_secs > MAX_SPAN_SECS {
                let field = format!("policy.actions.{}.cooldown_secs", action.label().to_lowercase());
                return Err(ConfigError::invalid(field, "must not exceed one year"));
            }
        }

        // Every action the classifier can reach needs something to say.
        for action in [Action::Approach, Action::Retreat, Action::InviteChat] {
            let profile = p.actions.get(action);
            let field = format!("policy.actions.{}.bubbles", action.label().to_lowercase());
            if profile.bubbles.is_empty() {
                return Err(ConfigError::invalid(field, "bubble pool is empty"));
            }
            if profile
                .bubbles
                .iter()
                .chain(profile.night_bubbles.iter())
                .any(|b| b.trim().is_empty())
            {
                return Err(ConfigError::invalid(field, "bubble text must not be blank"));
            }
        }

        Ok(())
    }
}
