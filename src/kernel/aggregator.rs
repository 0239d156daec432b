use std::collections::VecDeque;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::event::Sample;
use super::time::{is_night, WallTime};
use crate::config::SensingConfig;
use crate::error::InputError;

/// Signals derived from the rolling windows. Recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSignal {
    /// Number of foreground-app transitions in the switch window (a count,
    /// not a per-minute rate).
    pub switch_rate_2m: u32,
    /// Number of social-app samples in the social window.
    pub social_hits_3m: u32,
    pub idle_sec: f64,
    pub is_night: bool,
}

/// Why `ingest` refused a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejected {
    Malformed(InputError),
    /// Older than the newest sample already ingested.
    OutOfOrder,
}

/// Retained per sample. Transition and social flags are fixed at ingest so
/// eviction never changes how a surviving sample is counted.
#[derive(Debug, Clone)]
struct Entry {
    ts: WallTime,
    switched: bool,
    social: bool,
    idle_sec: f64,
}

#[derive(Debug)]
pub struct RollingAggregator {
    entries: VecDeque<Entry>,
    social_patterns: Vec<String>,
    switch_window: Duration,
    social_window: Duration,
    night_start_hour: u32,
    night_end_hour: u32,
    /// Last app seen, kept across eviction so the first retained sample after
    /// a gap still knows whether it was a switch.
    last_app: Option<String>,
    last_ts: Option<WallTime>,
}

impl RollingAggregator {
    pub fn new(config: &SensingConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            social_patterns: config
                .social_apps
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            switch_window: Duration::seconds(config.switch_window_secs as i64),
            social_window: Duration::seconds(config.social_window_secs as i64),
            night_start_hour: config.night_start_hour,
            night_end_hour: config.night_end_hour,
            last_app: None,
            last_ts: None,
        }
    }

    /// Appends a sample. Samples must arrive in non-decreasing `ts` order;
    /// anything older than the newest accepted sample is dropped so window
    /// boundaries only ever move forward.
    pub fn ingest(&mut self, sample: &Sample) -> Result<(), Rejected> {
        sample.validate().map_err(Rejected::Malformed)?;

        if let Some(last) = self.last_ts {
            if sample.ts < last {
                warn!("Dropping out-of-order sample: {} < {}", sample.ts, last);
                return Err(Rejected::OutOfOrder);
            }
        }

        let app = sample.active_app.trim().to_lowercase();
        let switched = matches!(&self.last_app, Some(prev) if *prev != app);
        let social = self.is_social(&app);

        self.entries.push_back(Entry {
            ts: sample.ts,
            switched,
            social,
            idle_sec: sample.idle_sec,
        });
        self.last_app = Some(app);
        self.last_ts = Some(sample.ts);
        Ok(())
    }

    fn is_social(&self, app: &str) -> bool {
        self.social_patterns.iter().any(|p| app.contains(p.as_str()))
    }

    /// Signals for the trailing windows ending at `now`. Evicts samples older
    /// than the larger window as a side effect.
    pub fn snapshot(&mut self, now: WallTime) -> AggregateSignal {
        self.evict(now);

        let switch_from = window_start(now, self.switch_window);
        let social_from = window_start(now, self.social_window);

        let mut signal = AggregateSignal {
            is_night: is_night(now, self.night_start_hour, self.night_end_hour),
            ..AggregateSignal::default()
        };

        for entry in self.entries.iter().filter(|e| e.ts <= now) {
            if entry.switched && entry.ts >= switch_from {
                signal.switch_rate_2m += 1;
            }
            if entry.social && entry.ts >= social_from {
                signal.social_hits_3m += 1;
            }
            // Entries are chronological, so the last one visited is the newest.
            signal.idle_sec = entry.idle_sec;
        }

        signal
    }

    fn evict(&mut self, now: WallTime) {
        let horizon = window_start(now, self.switch_window.max(self.social_window));
        while let Some(front) = self.entries.front() {
            if front.ts < horizon {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `now - window`, clamped to the earliest representable instant.
fn window_start(now: WallTime, window: Duration) -> WallTime {
    now.checked_sub_signed(window).unwrap_or(NaiveDateTime::MIN)
}
