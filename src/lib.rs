pub mod config;
pub mod error;
pub mod kernel;

// Re-export specific items for convenient access
pub use config::CompanionConfig;
pub use kernel::reactor::{Reactor, SideEffect};
