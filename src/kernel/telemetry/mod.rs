//! Kernel telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a write-only side-effect layer. Decision logic (aggregator,
//! classifier, policy engine) must never read it.
//!
//! # PRIVACY INVARIANT
//! Events never contain user content: no app identifiers, window titles or
//! bubble text. Only enums, ticks and counts.

pub mod event;
pub mod metrics;
pub mod recorder;
