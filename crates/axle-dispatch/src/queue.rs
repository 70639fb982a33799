use std::sync::{Mutex, MutexGuard, PoisonError};

/// Multi-producer pending queue with swap-out drain semantics and a closed
/// terminal state.
///
/// Producers on any thread `push`; the single consumer `drain`s, which takes
/// the entire current contents in one swap under the lock and returns them as
/// an owned snapshot. Items pushed while the consumer is still executing a
/// previous snapshot are only visible to the *next* drain, which bounds each
/// drain to the batch size at call time.
///
/// `close` retires the queue under the same lock that guards pushes: a push
/// that loses the race against a close observes the closed state and drops
/// its item on the spot, so no item can land in a queue nobody will ever
/// drain again. Closing is permanent for this queue instance.
///
/// The lock is held only for the push, the swap, or the close, never while
/// snapshot items execute, so an executing item may itself push without
/// deadlocking.
#[derive(Debug)]
pub struct PendingQueue<T> {
    /// `None` once closed.
    items: Mutex<Option<Vec<T>>>,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Some(Vec::new())),
        }
    }

    /// A panic while an item was mid-push can poison the lock; the queue
    /// contents are plain data, so recover the guard rather than propagate.
    fn lock(&self) -> MutexGuard<'_, Option<Vec<T>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail. Safe from any thread; blocks only for the length
    /// of the critical section. Returns `false` if the queue is closed, in
    /// which case `item` is dropped rather than stored.
    pub fn push(&self, item: T) -> bool {
        match &mut *self.lock() {
            Some(items) => {
                items.push(item);
                true
            }
            None => false,
        }
    }

    /// Swap out and return everything currently pending, oldest first.
    /// Empty once closed.
    pub fn drain(&self) -> Vec<T> {
        match &mut *self.lock() {
            Some(items) => std::mem::take(items),
            None => Vec::new(),
        }
    }

    /// Close the queue, returning whatever was still pending. Later pushes
    /// are refused.
    pub fn close(&self) -> Vec<T> {
        self.lock().take().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
