//! Publish session orchestration module.

mod session;
mod stats;

pub use session::{PublishSession, SessionConfig};
pub use stats::PublishStats;
