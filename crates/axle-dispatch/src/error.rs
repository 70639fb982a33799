use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failure of a dispatch operation itself, as opposed to a failure of the
/// dispatched action (see [`ActionError`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No dispatcher instance is currently active: either none was ever
    /// activated, or the instance this handle refers to has been torn down.
    #[error("dispatcher is not initialized (no active instance)")]
    NotInitialized,

    /// The operation is only valid on the dispatcher's main thread.
    ///
    /// Raised by `drain` when called from a producer thread; `dispatch` and
    /// `dispatch_async` never raise it because the thread check selects the
    /// inline fast path instead.
    #[error("operation requires the dispatcher's main thread")]
    NotMainThread,

    /// A blocking `dispatch` completed, but the dispatched function itself
    /// failed; the original failure is re-raised on the calling thread.
    #[error("dispatched action failed: {0}")]
    Action(#[from] ActionError),
}

/// Outcome of a dispatched action that did not run to successful completion.
///
/// Delivered through the item's own [`CompletionSignal`]; a failure in one
/// item never affects sibling items drained in the same batch.
///
/// [`CompletionSignal`]: crate::CompletionSignal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The action panicked while executing on the main thread. The payload is
    /// flattened to its message (panic payloads are not required to be
    /// `Send + Clone`, so the value itself cannot cross the signal).
    #[error("action panicked: {0}")]
    Panicked(String),

    /// The dispatcher was torn down before the action was drained; the item
    /// was dropped without running. See `Dispatcher::deactivate` for the
    /// data-loss contract.
    #[error("action dropped before it ran (dispatcher torn down)")]
    Cancelled,
}

impl ActionError {
    /// Flatten a `catch_unwind` payload into a `Panicked` message.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        ActionError::Panicked(msg)
    }
}
