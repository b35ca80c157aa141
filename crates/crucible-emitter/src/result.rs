//! Per-emission outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an emission concluded.
///
/// Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum EmitStatus {
    /// Every matching listener ran
    Ok,
    /// A listener returned `false`; later listeners were skipped
    Incomplete,
    /// No pattern matched the event
    NotFound,
}

impl EmitStatus {
    /// Numeric status code (200, 309 or 404).
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Incomplete => 309,
            Self::NotFound => 404,
        }
    }

    /// Short human-readable description.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Incomplete => "Incomplete",
            Self::NotFound => "Not Found",
        }
    }
}

impl From<EmitStatus> for u16 {
    fn from(status: EmitStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for EmitStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            309 => Ok(Self::Incomplete),
            404 => Ok(Self::NotFound),
            other => Err(format!("unknown emit status code {}", other)),
        }
    }
}

impl fmt::Display for EmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.message())
    }
}

/// What happened during one call to
/// [`EventEmitter::emit`](crate::EventEmitter::emit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitResult {
    /// Outcome
    pub status: EmitStatus,

    /// The emitted event name
    pub event: String,

    /// Listeners invoked, including one that stopped the emission
    pub listeners_run: usize,
}

impl EmitResult {
    pub(crate) fn ok(event: impl Into<String>, listeners_run: usize) -> Self {
        Self {
            status: EmitStatus::Ok,
            event: event.into(),
            listeners_run,
        }
    }

    pub(crate) fn incomplete(event: impl Into<String>, listeners_run: usize) -> Self {
        Self {
            status: EmitStatus::Incomplete,
            event: event.into(),
            listeners_run,
        }
    }

    pub(crate) fn not_found(event: impl Into<String>) -> Self {
        Self {
            status: EmitStatus::NotFound,
            event: event.into(),
            listeners_run: 0,
        }
    }

    /// Numeric status code.
    pub fn code(&self) -> u16 {
        self.status.code()
    }

    /// Status description.
    pub fn message(&self) -> &'static str {
        self.status.message()
    }

    /// Check if every matching listener ran.
    pub fn is_ok(&self) -> bool {
        self.status == EmitStatus::Ok
    }

    /// Check if a listener stopped the emission early.
    pub fn is_incomplete(&self) -> bool {
        self.status == EmitStatus::Incomplete
    }

    /// Check if nothing matched.
    pub fn is_not_found(&self) -> bool {
        self.status == EmitStatus::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(EmitStatus::Ok.code(), 200);
        assert_eq!(EmitStatus::Incomplete.code(), 309);
        assert_eq!(EmitStatus::NotFound.code(), 404);
        assert_eq!(EmitStatus::NotFound.to_string(), "404 Not Found");
    }

    #[test]
    fn test_result_constructors() {
        let ok = EmitResult::ok("ping", 2);
        assert!(ok.is_ok());
        assert_eq!(ok.code(), 200);
        assert_eq!(ok.listeners_run, 2);

        let stopped = EmitResult::incomplete("ping", 1);
        assert!(stopped.is_incomplete());
        assert_eq!(stopped.message(), "Incomplete");

        let missing = EmitResult::not_found("ping");
        assert!(missing.is_not_found());
        assert_eq!(missing.listeners_run, 0);
    }

    #[test]
    fn test_result_serializes_numeric_code() {
        let value = serde_json::to_value(EmitResult::incomplete("ping", 1)).unwrap();
        assert_eq!(
            value,
            json!({"status": 309, "event": "ping", "listeners_run": 1})
        );

        let parsed: EmitResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.status, EmitStatus::Incomplete);

        assert!(serde_json::from_value::<EmitStatus>(json!(500)).is_err());
    }
}
