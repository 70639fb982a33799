//! Frame-loop host adapter for `axle-dispatch`.
//!
//! The dispatcher is deliberately host-agnostic: something must activate it
//! on the main thread, call `drain` once per cycle, and drive resumable
//! sequences across cycles. [`FrameLoop`] is that something for hosts whose
//! main loop is an explicit tick (a frame, a simulation step, a test
//! harness).
//!
//! Lifecycle: `FrameLoop::start` activates the dispatcher with the loop as
//! its sequence runner and binds the calling thread as main; dropping the
//! loop (or calling [`FrameLoop::stop`]) deactivates it, dropping any
//! still-pending work as documented on `Dispatcher::deactivate`. Only one
//! loop should exist at a time, matching the one-active-instance contract of
//! the dispatcher itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axle_dispatch::{Dispatcher, PendingQueue, Result, Sequence, SequenceRunner, Step};

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Runner installed into the dispatcher. `spawn` happens on the main thread
/// during a drain, but the handoff list still crosses from the dispatcher's
/// call frame into the loop's, so it uses the same swap-drain queue the
/// dispatcher does.
struct FrameSequenceSpawner {
    incoming: Arc<PendingQueue<Sequence>>,
}

impl SequenceRunner for FrameSequenceSpawner {
    fn spawn(&self, seq: Sequence) {
        self.incoming.push(seq);
    }
}

/// An explicit per-cycle main loop that owns the dispatcher's lifecycle.
pub struct FrameLoop {
    dispatcher: Dispatcher,
    incoming: Arc<PendingQueue<Sequence>>,
    running: Vec<Sequence>,
    /// Whether this loop performed the activation. A loop started while an
    /// instance was already active shares it but must not tear it down.
    owns_activation: bool,
}

impl FrameLoop {
    /// Activate the dispatcher bound to the calling thread and return the
    /// loop that will drive it.
    pub fn start() -> FrameLoop {
        let already_active = Dispatcher::exists();
        let incoming = Arc::new(PendingQueue::new());
        let dispatcher = Dispatcher::activate(FrameSequenceSpawner {
            incoming: Arc::clone(&incoming),
        });
        if already_active {
            tracing::warn!("FrameLoop started while a dispatcher was already active; sharing it");
        }
        FrameLoop {
            dispatcher,
            incoming,
            running: Vec::new(),
            owns_activation: !already_active,
        }
    }

    /// Handle to the dispatcher this loop drives, for handing to producer
    /// threads.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one host cycle: drain the dispatcher, then step every registered
    /// sequence once, retiring those that report [`Step::Done`].
    ///
    /// Sequences spawned by this tick's drained items take their first step
    /// this tick; sequences enqueued from other threads after the drain, or
    /// by a stepping sequence, begin next tick. Main thread only (the drain
    /// enforces it).
    pub fn tick(&mut self) -> Result<()> {
        self.dispatcher.drain()?;
        self.running.extend(self.incoming.drain());
        // A panicking step retires only its own sequence; the other
        // sequences and the tick itself carry on.
        self.running
            .retain_mut(|seq| match catch_unwind(AssertUnwindSafe(|| seq())) {
                Ok(step) => step == Step::Continue,
                Err(payload) => {
                    tracing::warn!(
                        msg = panic_message(payload.as_ref()),
                        "sequence step panicked; sequence retired"
                    );
                    false
                }
            });
        Ok(())
    }

    /// Run `n` consecutive cycles; test and harness convenience.
    pub fn run_for(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Number of sequences still being stepped (not counting ones spawned
    /// but not yet picked up by a tick).
    pub fn active_sequences(&self) -> usize {
        self.running.len()
    }

    /// Tear down explicitly. Equivalent to dropping the loop; exists so
    /// call sites can make the teardown point visible.
    pub fn stop(self) {}
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.owns_activation {
            Dispatcher::deactivate();
        }
    }
}
