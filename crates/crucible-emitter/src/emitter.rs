//! The event emitter: registration, matching, composition and dispatch.
//!
//! ## Ordering
//!
//! Every listener whose pattern matches the emitted name runs exactly once
//! per emission, one at a time:
//!
//! 1. higher `priority` first
//! 2. equal priorities in registration order
//!
//! Listeners of composed emitters (see [`EventEmitter::use_emitter`]) are
//! merged into the same ordering, as if they were registered directly.
//!
//! ## Eager start
//!
//! [`EventEmitter::emit`] matches and orders listeners immediately, then
//! runs the first listener up to its first suspension point before
//! returning. The remaining listeners run as the returned [`Emitting`] is
//! awaited; the driver yields to the scheduler between listeners, so nothing
//! past the first listener runs until then.
//!
//! ## Current event
//!
//! [`EventEmitter::event`] exposes the match of the most recently started
//! listener. It is a single shared field, not a stack: a nested emission
//! overwrites it for the rest of the outer listener, and an interleaved
//! emission can overwrite it under a suspended listener. Listeners that need
//! their own match reliably should use [`Listener::with_match`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crucible_emitter::{EventEmitter, Listener, Pattern};
//!
//! let emitter = EventEmitter::<u32>::new();
//! emitter
//!     .on("ping", Listener::new(|n| async move { println!("ping {n}") }))
//!     .on_with_priority(
//!         Pattern::regex("^p(i|o)ng$")?,
//!         Listener::from_fn(|_| false),
//!         5,
//!     );
//!
//! let result = emitter.emit("ping", 1).await?;
//! assert_eq!(result.code(), 309);
//! ```

use crate::config::EmitterConfig;
use crate::error::{EmitError, EmitOutcome};
use crate::listener::{Flow, Listener};
use crate::pattern::{Match, Pattern};
use crate::registry::{Entry, Registry};
use crate::result::EmitResult;
use futures::future::{self, BoxFuture, Either, FutureExt, Ready};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tracing::{debug, trace, warn};

/// Match information for the listener currently executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentEvent {
    /// The emitted event name
    pub event: String,

    /// Key of the pattern that matched
    pub pattern: String,

    /// Captured groups of the match
    pub parameters: Vec<Option<String>>,
}

impl CurrentEvent {
    fn new(event: &str, matched: Match) -> Self {
        Self {
            event: event.to_string(),
            pattern: matched.pattern,
            parameters: matched.parameters,
        }
    }

    /// Captured group `index` (0-based).
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).and_then(|p| p.as_deref())
    }
}

/// A listener selected for one emission.
struct Candidate<A> {
    matched: Match,
    entry: Entry<A>,
    /// Emitter the listener is registered on
    owner: EventEmitter<A>,
}

struct Inner<A> {
    config: EmitterConfig,
    registry: Mutex<Registry<A>>,
    used: Mutex<Vec<EventEmitter<A>>>,
    current: RwLock<Option<CurrentEvent>>,
}

/// Pattern-matching event emitter.
///
/// `EventEmitter` is a handle; clones share the same registry, composed
/// emitters and current-event field. `A` is the argument every listener
/// receives (a clone per listener).
pub struct EventEmitter<A> {
    inner: Arc<Inner<A>>,
}

impl<A> EventEmitter<A>
where
    A: Clone + Send + 'static,
{
    /// Create an emitter with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create an emitter with the given configuration.
    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Mutex::new(Registry::default()),
                used: Mutex::new(Vec::new()),
                current: RwLock::new(None),
            }),
        }
    }

    /// Register `listener` at the configured default priority.
    pub fn on(&self, pattern: impl Into<Pattern>, listener: Listener<A>) -> &Self {
        self.on_with_priority(pattern, listener, self.inner.config.default_priority)
    }

    /// Register `listener` at `priority` (higher runs earlier).
    ///
    /// Registering the same listener twice stores and runs it twice.
    pub fn on_with_priority(
        &self,
        pattern: impl Into<Pattern>,
        listener: Listener<A>,
        priority: i32,
    ) -> &Self {
        let pattern = pattern.into();
        trace!(
            emitter = self.label(),
            pattern = %pattern,
            priority,
            "Registering listener"
        );
        self.inner.registry.lock().insert(pattern, listener, priority);
        self
    }

    /// Remove the first registration of `listener` under `pattern`.
    ///
    /// Unknown patterns and listeners are ignored.
    pub fn unbind(&self, pattern: impl Into<Pattern>, listener: &Listener<A>) -> &Self {
        let pattern = pattern.into();
        let removed = self.inner.registry.lock().remove(pattern.key(), listener);
        trace!(emitter = self.label(), pattern = %pattern, removed, "Unbinding listener");
        self
    }

    /// Remove every listener registered under `pattern`.
    pub fn clear(&self, pattern: impl Into<Pattern>) -> &Self {
        let pattern = pattern.into();
        let removed = self.inner.registry.lock().clear(pattern.key());
        trace!(emitter = self.label(), pattern = %pattern, removed, "Clearing pattern");
        self
    }

    /// Remove every pattern from this emitter.
    ///
    /// Composed emitters keep their own listeners.
    pub fn clear_all(&self) -> &Self {
        self.inner.registry.lock().clear_all();
        trace!(emitter = self.label(), "Cleared all patterns");
        self
    }

    /// Test `event` against this emitter's own patterns.
    ///
    /// Composed emitters are not consulted and the current event is left
    /// alone.
    pub fn matches(&self, event: &str) -> HashMap<String, Match> {
        self.inner.registry.lock().matches(event)
    }

    /// Compose `other` into this emitter.
    ///
    /// `other`'s listeners (and those of emitters it uses) take part in this
    /// emitter's emissions. Cycles are not detected; an emitter that reaches
    /// itself recurses without bound unless
    /// [`EmitterConfig::max_use_depth`] is set.
    pub fn use_emitter(&self, other: &EventEmitter<A>) -> &Self {
        debug!(
            emitter = self.label(),
            used = other.label(),
            "Composing emitter"
        );
        self.inner.used.lock().push(other.clone());
        self
    }

    /// Emit `event`, handing `args` to every matching listener.
    ///
    /// The first listener starts before this returns; await the result to
    /// run the rest. Dropping the returned [`Emitting`] abandons the
    /// listeners that have not started.
    pub fn emit(&self, event: impl Into<String>, args: A) -> Emitting {
        let event = event.into();

        let mut candidates = Vec::new();
        let limit = self.inner.config.max_use_depth;
        if let Err(err) = self.collect(&event, 0, limit, &mut candidates) {
            warn!(emitter = self.label(), event = %event, error = %err, "Emission aborted");
            return Emitting::ready(Err(err));
        }

        if candidates.is_empty() {
            debug!(emitter = self.label(), event = %event, "No listeners matched");
            return Emitting::ready(Ok(EmitResult::not_found(event)));
        }

        candidates.sort_by_key(|c| (Reverse(c.entry.priority), c.entry.sequence));
        debug!(
            emitter = self.label(),
            event = %event,
            listeners = candidates.len(),
            "Dispatching event"
        );

        let dispatch = self.clone().dispatch(event.clone(), args, candidates).boxed();
        Emitting::start(event, dispatch)
    }

    /// Gather matching listeners from this emitter and, depth-first, from
    /// every emitter it uses.
    fn collect(
        &self,
        event: &str,
        depth: usize,
        limit: Option<usize>,
        candidates: &mut Vec<Candidate<A>>,
    ) -> Result<(), EmitError> {
        if let Some(limit) = limit {
            if depth > limit {
                return Err(EmitError::UseDepthExceeded {
                    event: event.to_string(),
                    limit,
                });
            }
        }

        let entries = self.inner.registry.lock().matching_entries(event);
        candidates.extend(entries.into_iter().map(|(matched, entry)| Candidate {
            matched,
            entry,
            owner: self.clone(),
        }));

        // Snapshot so the lock is not held while recursing into an emitter
        // that may be this one.
        let used = self.inner.used.lock().clone();
        for other in &used {
            other.collect(event, depth + 1, limit, candidates)?;
        }
        Ok(())
    }

    async fn dispatch(
        self,
        event: String,
        args: A,
        candidates: Vec<Candidate<A>>,
    ) -> EmitOutcome {
        let mut listeners_run = 0;

        for candidate in candidates {
            if listeners_run > 0 {
                tokio::task::yield_now().await;
            }

            let current = CurrentEvent::new(&event, candidate.matched);
            self.set_current(&current);
            if !candidate.owner.ptr_eq(&self) {
                candidate.owner.set_current(&current);
            }

            trace!(
                emitter = self.label(),
                event = %event,
                pattern = %current.pattern,
                priority = candidate.entry.priority,
                "Invoking listener"
            );
            let pattern = current.pattern.clone();
            let invocation = candidate.entry.listener.call(current, args.clone());
            let outcome = invocation.await;
            listeners_run += 1;

            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    debug!(
                        emitter = self.label(),
                        event = %event,
                        pattern = %pattern,
                        listeners_run,
                        "Listener stopped emission"
                    );
                    return Ok(EmitResult::incomplete(event, listeners_run));
                }
                Err(source) => {
                    warn!(
                        emitter = self.label(),
                        event = %event,
                        pattern = %pattern,
                        error = %source,
                        "Listener failed"
                    );
                    return Err(EmitError::Listener {
                        event,
                        pattern,
                        source,
                    });
                }
            }
        }

        debug!(
            emitter = self.label(),
            event = %event,
            listeners_run,
            "Emission complete"
        );
        Ok(EmitResult::ok(event, listeners_run))
    }
}

impl<A> EventEmitter<A> {
    /// Match of the most recently started listener, if any has run.
    pub fn event(&self) -> Option<CurrentEvent> {
        self.inner.current.read().clone()
    }

    fn set_current(&self, current: &CurrentEvent) {
        *self.inner.current.write() = Some(current.clone());
    }

    /// Sorted keys of this emitter's own patterns.
    pub fn pattern_keys(&self) -> Vec<String> {
        self.inner.registry.lock().keys()
    }

    /// Number of listeners registered under `pattern` on this emitter.
    pub fn listener_count(&self, pattern: impl Into<Pattern>) -> usize {
        self.inner.registry.lock().listener_count(pattern.into().key())
    }

    /// Check if this emitter has no patterns of its own.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.lock().is_empty()
    }

    /// Number of composed emitters.
    pub fn used_count(&self) -> usize {
        self.inner.used.lock().len()
    }

    /// Configuration this emitter was built with.
    pub fn config(&self) -> &EmitterConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same emitter.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn label(&self) -> &str {
        self.inner.config.label()
    }
}

impl<A> Clone for EventEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> Default for EventEmitter<A>
where
    A: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventEmitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("name", &self.inner.config.name)
            .field("patterns", &self.pattern_keys())
            .field("used", &self.used_count())
            .finish()
    }
}

/// An emission in progress.
///
/// Resolves to the [`EmitResult`] once every listener has run, or to the
/// error of the first listener that failed. Dropping it before then abandons
/// the listeners that have not started.
#[must_use = "listeners after the first only run when the emission is awaited"]
pub struct Emitting {
    state: Either<Ready<EmitOutcome>, BoxFuture<'static, EmitOutcome>>,
    /// Event name while listeners are still pending
    pending: Option<String>,
}

impl Emitting {
    fn ready(outcome: EmitOutcome) -> Self {
        Self {
            state: Either::Left(future::ready(outcome)),
            pending: None,
        }
    }

    /// Poll `dispatch` once so the first listener starts synchronously.
    ///
    /// The no-op waker is fine: whatever suspended will be polled again,
    /// with a real waker, when the `Emitting` itself is polled.
    fn start(event: String, mut dispatch: BoxFuture<'static, EmitOutcome>) -> Self {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        match dispatch.as_mut().poll(&mut cx) {
            Poll::Ready(outcome) => Self::ready(outcome),
            Poll::Pending => Self {
                state: Either::Right(dispatch),
                pending: Some(event),
            },
        }
    }

    /// Whether every listener has run (or the emission failed).
    pub fn is_finished(&self) -> bool {
        self.pending.is_none()
    }

    /// Finish the emission on the tokio runtime without awaiting it here.
    ///
    /// Must be called from within a tokio runtime.
    pub fn detach(self) -> tokio::task::JoinHandle<EmitOutcome> {
        tokio::spawn(self)
    }
}

impl Future for Emitting {
    type Output = EmitOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = ready!(this.state.poll_unpin(cx));
        this.pending = None;
        Poll::Ready(outcome)
    }
}

impl Drop for Emitting {
    fn drop(&mut self) {
        if let Some(event) = self.pending.take() {
            debug!(event = %event, "Emission dropped before its listeners finished");
        }
    }
}

impl fmt::Debug for Emitting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (&self.state, self.is_finished()) {
            (Either::Left(_), _) => "ready",
            (Either::Right(_), false) => "running",
            (Either::Right(_), true) => "finished",
        };
        f.debug_struct("Emitting").field("state", &state).finish()
    }
}
