//! Managed thread/run conversations.

pub mod assistant;
pub mod run;

pub use assistant::AssistantSession;
pub use run::{DeltaSink, RunLimits, RunSession, RunState};
