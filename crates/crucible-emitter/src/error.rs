//! Error types for emission.
//!
//! Only failures are errors here. An emission nobody listens to, or one a
//! listener cut short, completes normally with an
//! [`EmitStatus`](crate::EmitStatus) describing it.

use thiserror::Error;

/// Errors returned by an emission.
#[derive(Error, Debug)]
pub enum EmitError {
    /// A listener returned an error; the remaining listeners were skipped
    #[error("listener for '{pattern}' failed while handling '{event}'")]
    Listener {
        event: String,
        pattern: String,
        #[source]
        source: anyhow::Error,
    },

    /// Composed emitters nested deeper than the configured limit
    #[error("emitter composition for '{event}' exceeded depth {limit}")]
    UseDepthExceeded { event: String, limit: usize },
}

impl EmitError {
    /// Event name the failing emission was for.
    pub fn event(&self) -> &str {
        match self {
            Self::Listener { event, .. } | Self::UseDepthExceeded { event, .. } => event,
        }
    }
}

/// Result type for emission.
pub type EmitOutcome = Result<crate::EmitResult, EmitError>;
