//! Pattern-matching event emitter for Crucible
//!
//! Listeners register against literal event names or regular expressions and
//! run, one at a time, in priority order whenever a matching name is emitted.
//! Regex capture groups are exposed to listeners as parameters, emitters can
//! be composed into one another, and every emission reports how it ended.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crucible_emitter::{EventEmitter, Listener, Pattern};
//!
//! let emitter = EventEmitter::<String>::new();
//!
//! // Literal pattern
//! emitter.on("note:created", Listener::new(|path| async move {
//!     tracing::info!("created {path}");
//! }));
//!
//! // Regex pattern with a capture, run first
//! let router = emitter.clone();
//! emitter.on_with_priority(
//!     Pattern::parse_delimited(r"/^GET\s\/notes\/(.*)$/i")?,
//!     Listener::new(move |_| {
//!         let router = router.clone();
//!         async move {
//!             let id = router.event().and_then(|e| e.parameter(0).map(str::to_owned));
//!             tracing::info!(?id, "fetching note");
//!         }
//!     }),
//!     10,
//! );
//!
//! let result = emitter.emit("GET /notes/42", String::new()).await?;
//! assert_eq!(result.code(), 200);
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod pattern;
mod registry;
pub mod result;

pub use config::{ConfigError, EmitterConfig};
pub use emitter::{CurrentEvent, Emitting, EventEmitter};
pub use error::{EmitError, EmitOutcome};
pub use listener::{Flow, IntoFlow, Listener, ListenerResult};
pub use pattern::{Match, Pattern, PatternError};
pub use result::{EmitResult, EmitStatus};
