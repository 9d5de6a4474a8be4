//! Status enums for production entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of a production batch.
///
/// Never stored as caller intent: it is re-derived from the batch timestamps on
/// every save (see [`BatchStatus::from_timestamps`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "production.batch_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No moulding time recorded yet.
    #[default]
    NotStarted,
    /// Moulding started, unloading not recorded.
    InProgress,
    /// Unloading recorded.
    Completed,
}

impl BatchStatus {
    /// Derive the status from the presence of the two batch timestamps.
    ///
    /// An unloading time alone is enough to count the batch as completed.
    #[must_use]
    pub const fn from_timestamps(
        moulding_time: Option<&DateTime<Utc>>,
        unloading_time: Option<&DateTime<Utc>>,
    ) -> Self {
        match (moulding_time, unloading_time) {
            (_, Some(_)) => Self::Completed,
            (Some(_), None) => Self::InProgress,
            (None, None) => Self::NotStarted,
        }
    }

    /// Whether the batch has finished.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid batch status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_timestamps() {
        let now = Utc::now();
        assert_eq!(
            BatchStatus::from_timestamps(None, None),
            BatchStatus::NotStarted
        );
        assert_eq!(
            BatchStatus::from_timestamps(Some(&now), None),
            BatchStatus::InProgress
        );
        assert_eq!(
            BatchStatus::from_timestamps(Some(&now), Some(&now)),
            BatchStatus::Completed
        );
        assert_eq!(
            BatchStatus::from_timestamps(None, Some(&now)),
            BatchStatus::Completed
        );
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            BatchStatus::NotStarted,
            BatchStatus::InProgress,
            BatchStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<BatchStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&BatchStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
