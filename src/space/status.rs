/// Work unit status definitions for tracking harvest progress
///
/// This module defines all possible statuses a work unit can be in during
/// a harvest, plus the classification of failures.
use std::fmt;

/// Represents the current status of a work unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkStatus {
    // ===== Active Statuses =====
    /// Unit is waiting to be dispatched
    Pending,

    /// Unit has been dispatched and its extraction is in flight
    InFlight,

    /// Unit failed retryably and is waiting out its backoff delay
    Retrying,

    // ===== Terminal Statuses =====
    /// Unit completed and its record was stored
    Done,

    /// Unit failed terminally (non-retryable, or attempts exhausted)
    Failed,
}

impl WorkStatus {
    /// Returns true if this is a terminal status (no further processing)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this is an active status (unit may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_flight" => Some(Self::InFlight),
            "retrying" => Some(Self::Retrying),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InFlight,
            Self::Retrying,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Classification of an extraction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request exceeded its deadline
    Timeout,

    /// The source has no record for this identifier (including soft 404s)
    NotFound,

    /// Network or server-side trouble that may clear up on retry
    Transient,
}

impl FailureKind {
    /// Returns true if a unit with this failure may be attempted again
    ///
    /// A missing record is a fact about the source, not a fault; retrying
    /// it would only waste the request budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Converts the failure kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Transient => "transient",
        }
    }

    /// Parses a failure kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(Self::Timeout),
            "not_found" => Some(Self::NotFound),
            "transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
