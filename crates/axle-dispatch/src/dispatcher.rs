//! The dispatcher proper: active-instance lifecycle, main-thread identity,
//! the enqueue/dispatch surface, and the per-cycle drain.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{ActionError, DispatchError, Result};
use crate::queue::PendingQueue;
use crate::sequence::{Sequence, SequenceRunner};
use crate::signal::{completion_pair, resolved_signal, CompletionSignal};

/// A queued unit of deferred execution. Outcome routing (completion signal
/// resolution, fire-and-forget logging) is baked into the closure when the
/// item is built, so the drain loop runs items uniformly and a panic in one
/// can never escape past its own wrapper.
type WorkItem = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    /// Identity of the one thread allowed to drain; captured at activation
    /// and never rebound for this instance's lifetime.
    main_thread: ThreadId,
    queue: PendingQueue<WorkItem>,
    runner: Box<dyn SequenceRunner>,
    /// Cleared on teardown so handles that outlive the instance fail with
    /// `NotInitialized` instead of feeding a dead queue.
    active: AtomicBool,
}

/// The process-wide active instance. Guarded by the same lock discipline as
/// the queue itself: short critical sections, recovery from poisoning.
static ACTIVE: Mutex<Option<Dispatcher>> = Mutex::new(None);

fn registry() -> MutexGuard<'static, Option<Dispatcher>> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the main-thread work dispatcher.
///
/// Cheap to clone; all clones refer to the same instance. Any thread may call
/// the `enqueue*` and `dispatch*` operations. `drain` is reserved for the
/// main thread the instance was activated on.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Activate the dispatcher, binding the calling thread as its main
    /// thread, and install `runner` as the host facility for resumable
    /// sequences.
    ///
    /// If an instance is already active this is a no-op that returns the
    /// existing handle: the queue is not reset, `runner` is dropped, and the
    /// original main-thread binding stands.
    pub fn activate<R>(runner: R) -> Dispatcher
    where
        R: SequenceRunner + 'static,
    {
        let mut slot = registry();
        if let Some(existing) = slot.as_ref() {
            tracing::debug!("redundant dispatcher activation ignored");
            return existing.clone();
        }
        let dispatcher = Dispatcher {
            inner: Arc::new(Inner {
                main_thread: thread::current().id(),
                queue: PendingQueue::new(),
                runner: Box::new(runner),
                active: AtomicBool::new(true),
            }),
        };
        *slot = Some(dispatcher.clone());
        tracing::debug!(thread = ?dispatcher.inner.main_thread, "dispatcher activated");
        dispatcher
    }

    /// Tear down the active instance, if any.
    ///
    /// Pending items that were never drained are dropped, not executed; each
    /// dropped item's completion signal (if one exists) resolves
    /// [`ActionError::Cancelled`], so blocked waiters unblock rather than
    /// hang. Work enqueued before a teardown is silently lost; callers that
    /// must not lose work have to stop producers first. A later `activate`
    /// starts over with a fresh empty queue.
    pub fn deactivate() {
        let taken = registry().take();
        if let Some(dispatcher) = taken {
            dispatcher.inner.active.store(false, Ordering::Release);
            // Closing under the queue's own lock shuts the window between a
            // producer's liveness check and its push: a racing push is
            // refused and its item dropped, instead of landing in a queue
            // nobody will drain again.
            let dropped = dispatcher.inner.queue.close().len();
            if dropped > 0 {
                tracing::warn!(dropped, "dispatcher torn down with undrained items");
            } else {
                tracing::debug!("dispatcher deactivated");
            }
        }
    }

    /// Look up the active instance. Fails with
    /// [`DispatchError::NotInitialized`] when none is active; never returns a
    /// handle to a torn-down instance.
    pub fn current() -> Result<Dispatcher> {
        registry().clone().ok_or(DispatchError::NotInitialized)
    }

    /// Whether an instance is currently active.
    pub fn exists() -> bool {
        registry().is_some()
    }

    /// Whether the calling thread is this instance's main thread.
    pub fn on_main_thread(&self) -> bool {
        thread::current().id() == self.inner.main_thread
    }

    /// Number of items awaiting the next drain. Diagnostic only; the value
    /// is stale the moment it is read.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.active.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DispatchError::NotInitialized)
        }
    }

    /// The queue itself is the authority on liveness: `ensure_live` is only a
    /// fast early-out, and a teardown between that check and this push closes
    /// the queue first, so the push is refused rather than stranded.
    fn push_item(&self, item: WorkItem) -> Result<()> {
        if self.inner.queue.push(item) {
            Ok(())
        } else {
            Err(DispatchError::NotInitialized)
        }
    }

    /// Schedule a fire-and-forget action on the main thread.
    ///
    /// Returns as soon as the item is queued. There is no completion
    /// observation: if the action panics, the failure is logged and
    /// swallowed. Callers needing visibility use
    /// [`enqueue_with_completion`](Self::enqueue_with_completion) or
    /// [`enqueue_value`](Self::enqueue_value).
    pub fn enqueue<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_live()?;
        self.push_item(Box::new(move || {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
                let err = ActionError::from_panic(payload);
                tracing::warn!(%err, "fire-and-forget action failed");
            }
        }))
    }

    /// Schedule an action and return a signal that resolves once it has run.
    pub fn enqueue_with_completion<F>(&self, f: F) -> Result<CompletionSignal<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_value(move || f())
    }

    /// Schedule a value-returning function; the signal resolves with the
    /// value or the captured failure.
    pub fn enqueue_value<T, F>(&self, f: F) -> Result<CompletionSignal<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_live()?;
        let (tx, rx) = completion_pair();
        self.push_item(Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f)).map_err(ActionError::from_panic);
            tx.resolve(outcome);
        }))?;
        Ok(rx)
    }

    /// Schedule a resumable sequence. The next drain hands it to the host's
    /// [`SequenceRunner`] on the main thread; the dispatcher does not step
    /// it.
    pub fn enqueue_sequence(&self, seq: Sequence) -> Result<()> {
        self.ensure_live()?;
        // Weak, not Arc: the queue lives inside `Inner`, so a strong capture
        // would be a reference cycle keeping an abandoned instance alive.
        let inner = Arc::downgrade(&self.inner);
        self.push_item(Box::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            // The runner is host code; isolate its failures exactly like an
            // action's so the rest of the batch still runs.
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| inner.runner.spawn(seq))) {
                let err = ActionError::from_panic(payload);
                tracing::warn!(%err, "sequence handoff failed");
            }
        }))
    }

    /// Run `f` on the main thread and return its result, blocking the
    /// calling thread until it has executed.
    ///
    /// Called *from* the main thread, `f` runs inline immediately, with no
    /// queuing; queuing and waiting from the main thread would deadlock,
    /// since only that thread drains. From any
    /// other thread, `f` is enqueued and the caller parks until the next
    /// drain runs it. A failure in `f` is re-raised here as
    /// [`DispatchError::Action`].
    pub fn dispatch<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_live()?;
        if self.on_main_thread() {
            return catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| ActionError::from_panic(payload).into());
        }
        let signal = self.enqueue_value(f)?;
        signal.wait().map_err(DispatchError::Action)
    }

    /// Non-blocking variant of [`dispatch`](Self::dispatch): same main-thread
    /// fast path, but returns a pending-or-already-resolved signal
    /// immediately.
    pub fn dispatch_async<T, F>(&self, f: F) -> Result<CompletionSignal<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_live()?;
        if self.on_main_thread() {
            let outcome = catch_unwind(AssertUnwindSafe(f)).map_err(ActionError::from_panic);
            return Ok(resolved_signal(outcome));
        }
        self.enqueue_value(f)
    }

    /// Execute one drain cycle: swap out everything currently pending and run
    /// it in FIFO order. Returns the number of items executed.
    ///
    /// Main thread only. Items enqueued by the batch itself (or by other
    /// threads racing this drain) are left for the next cycle, so a cycle's
    /// duration is bounded by the batch size at call time. Item failures are
    /// contained per item and never abort the remainder of the batch.
    pub fn drain(&self) -> Result<usize> {
        self.ensure_live()?;
        if !self.on_main_thread() {
            return Err(DispatchError::NotMainThread);
        }
        // Lock released before any item runs; see PendingQueue::drain.
        let batch = self.inner.queue.drain();
        let executed = batch.len();
        for item in batch {
            // Every constructor wraps its closure in catch_unwind, so this
            // call cannot unwind past here.
            item();
        }
        Ok(executed)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("main_thread", &self.inner.main_thread)
            .field("active", &self.inner.active.load(Ordering::Relaxed))
            .field("pending", &self.inner.queue.len())
            .finish()
    }
}
