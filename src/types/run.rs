//! Run lifecycle types for the managed-thread variant.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backend-reported run status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// The backend will not do any more work on this run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Failed | Self::Completed | Self::Incomplete | Self::Expired
        )
    }

    /// The run blocks new messages on its thread.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::RequiresAction)
    }
}

/// Minimal view of a run returned by run listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub id: String,
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_backend_status_strings() {
        assert_eq!(RunStatus::from_str("requires_action").unwrap(), RunStatus::RequiresAction);
        assert_eq!(RunStatus::from_str("in_progress").unwrap(), RunStatus::InProgress);
        assert!(RunStatus::from_str("exploded").is_err());
        assert_eq!(RunStatus::Cancelling.to_string(), "cancelling");
    }

    #[test]
    fn terminal_and_active_are_disjoint() {
        for status in [
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::RequiresAction,
            RunStatus::Cancelling,
            RunStatus::Cancelled,
            RunStatus::Failed,
            RunStatus::Completed,
            RunStatus::Incomplete,
            RunStatus::Expired,
        ] {
            assert!(!(status.is_terminal() && status.is_active()), "{status}");
        }
        assert!(!RunStatus::Cancelling.is_terminal());
        assert!(!RunStatus::Cancelling.is_active());
    }
}
