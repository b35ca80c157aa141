//! Listener callbacks and their flow control.
//!
//! A [`Listener`] wraps a callback behind an `Arc`, so cloning a listener
//! yields a handle to the *same* callback. Handle identity is what
//! [`EventEmitter::unbind`](crate::EventEmitter::unbind) compares.
//!
//! # Return values
//!
//! Whatever a callback returns is converted through [`IntoFlow`]:
//!
//! | Output | Effect |
//! |--------|--------|
//! | `()` / `true` / `Flow::Continue` | next listener runs |
//! | `false` / `Flow::Stop` | emission stops, status 309 |
//! | `Err(e)` | emission fails with [`EmitError::Listener`](crate::EmitError::Listener) |

use crate::emitter::CurrentEvent;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Whether an emission continues after a listener returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Run the next listener
    #[default]
    Continue,
    /// Skip all remaining listeners
    Stop,
}

impl Flow {
    /// Check if this flow stops the emission.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// Result of a single listener invocation.
pub type ListenerResult = Result<Flow, anyhow::Error>;

/// Conversion from a callback's output into a [`ListenerResult`].
pub trait IntoFlow {
    /// Convert into the flow the emitter acts on.
    fn into_flow(self) -> ListenerResult;
}

impl IntoFlow for () {
    fn into_flow(self) -> ListenerResult {
        Ok(Flow::Continue)
    }
}

impl IntoFlow for bool {
    fn into_flow(self) -> ListenerResult {
        Ok(Flow::from(self))
    }
}

impl IntoFlow for Flow {
    fn into_flow(self) -> ListenerResult {
        Ok(self)
    }
}

impl<T, E> IntoFlow for Result<T, E>
where
    T: IntoFlow,
    E: Into<anyhow::Error>,
{
    fn into_flow(self) -> ListenerResult {
        self.map_err(Into::into)?.into_flow()
    }
}

/// Type-erased listener callback.
pub type ListenerFn<A> =
    dyn Fn(CurrentEvent, A) -> BoxFuture<'static, ListenerResult> + Send + Sync;

/// A callback registered against a pattern.
pub struct Listener<A> {
    callback: Arc<ListenerFn<A>>,
}

impl<A: Send + 'static> Listener<A> {
    /// Create a listener from an async callback.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoFlow,
    {
        Self::with_match(move |_current, args| callback(args))
    }

    /// Create a listener from an async callback that also receives the
    /// match which triggered it.
    ///
    /// Unlike [`EventEmitter::event`](crate::EventEmitter::event), the
    /// `CurrentEvent` handed in here belongs to this invocation alone and is
    /// not overwritten by nested or interleaved emissions.
    pub fn with_match<F, Fut>(callback: F) -> Self
    where
        F: Fn(CurrentEvent, A) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoFlow,
    {
        Self {
            callback: Arc::new(move |current: CurrentEvent, args: A| {
                callback(current, args).map(IntoFlow::into_flow).boxed()
            }),
        }
    }

    /// Create a listener from a synchronous callback.
    pub fn from_fn<F, R>(callback: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        Self {
            callback: Arc::new(move |_current: CurrentEvent, args: A| {
                futures::future::ready(callback(args).into_flow()).boxed()
            }),
        }
    }
}

impl<A> Listener<A> {
    /// Invoke the callback.
    pub(crate) fn call(
        &self,
        current: CurrentEvent,
        args: A,
    ) -> BoxFuture<'static, ListenerResult> {
        (self.callback)(current, args)
    }

    /// Whether both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}
