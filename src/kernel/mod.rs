pub mod action;
pub mod aggregator;
pub mod classifier;
pub mod event;
pub mod policy;
pub mod reactor;
pub mod scheduler;
pub mod telemetry;
pub mod time;
pub mod wire;
