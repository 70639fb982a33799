//! One-shot completion signaling between a drained work item and its caller.
//!
//! Each enqueued item that wants observation gets a sender/signal pair. The
//! sender travels inside the work item and is consumed on resolution, so a
//! signal reaches exactly one of three terminal states: a value, a captured
//! failure, or `Cancelled` (the item was dropped undrained and its sender
//! with it). The transition is irreversible by construction.

use futures_intrusive::channel::shared::{oneshot_channel, OneshotReceiver, OneshotSender};

use crate::error::ActionError;

pub(crate) type Outcome<T> = Result<T, ActionError>;

/// Producing half; lives inside the queued work item.
///
/// The `Send + 'static` bounds come from the underlying shared channel; the
/// dispatcher's public surface carries the same bounds.
pub(crate) struct CompletionSender<T: Send + 'static> {
    tx: OneshotSender<Outcome<T>>,
}

impl<T: Send + 'static> CompletionSender<T> {
    /// Deliver the outcome. Consumes the sender; a send error only means the
    /// caller dropped its signal without waiting, which is fine.
    pub(crate) fn resolve(self, outcome: Outcome<T>) {
        self.tx.send(outcome).ok();
    }
}

/// Waitable handle for one dispatched item's outcome.
///
/// Obtained from `enqueue_with_completion`, `enqueue_value` or
/// `dispatch_async`. Dropping it without waiting is allowed; the outcome is
/// discarded.
pub struct CompletionSignal<T: Send + 'static> {
    rx: OneshotReceiver<Outcome<T>>,
}

impl<T: Send + 'static> CompletionSignal<T> {
    /// Block the calling thread until the item has run (or was dropped at
    /// teardown), then return its outcome.
    ///
    /// The wait parks the thread; it does not spin. Must not be called from
    /// the dispatcher's main thread for an item that main thread has yet to
    /// drain — that is a self-deadlock. `dispatch`/`dispatch_async` avoid
    /// this by construction via their inline fast path.
    pub fn wait(self) -> Outcome<T> {
        pollster::block_on(self.rx.receive()).unwrap_or(Err(ActionError::Cancelled))
    }

    /// Async variant of [`wait`](Self::wait) for cooperative callers.
    pub async fn wait_async(self) -> Outcome<T> {
        self.rx.receive().await.unwrap_or(Err(ActionError::Cancelled))
    }
}

pub(crate) fn completion_pair<T: Send + 'static>() -> (CompletionSender<T>, CompletionSignal<T>) {
    let (tx, rx) = oneshot_channel();
    (CompletionSender { tx }, CompletionSignal { rx })
}

/// A signal that is already resolved at construction time; used by the
/// main-thread fast path, which never touches the queue.
pub(crate) fn resolved_signal<T: Send + 'static>(outcome: Outcome<T>) -> CompletionSignal<T> {
    let (tx, rx) = completion_pair();
    tx.resolve(outcome);
    rx
}
