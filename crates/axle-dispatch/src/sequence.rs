//! Resumable multi-step operations.
//!
//! A sequence is an explicit state machine: each call to the step closure
//! performs one increment of work and reports whether more remains. The
//! dispatcher never steps sequences itself; `enqueue_sequence` hands the
//! value to the host's [`SequenceRunner`] exactly once, on the main thread,
//! and the host decides the stepping cadence (typically once per frame, as
//! `axle-frame` does).

/// Result of one step of a resumable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains; step again on a later cycle.
    Continue,
    /// The sequence is finished and may be retired.
    Done,
}

/// A multi-step operation, stepped on the main thread across host cycles.
pub type Sequence = Box<dyn FnMut() -> Step + Send + 'static>;

/// Box a step closure as a [`Sequence`].
pub fn sequence_fn<F>(f: F) -> Sequence
where
    F: FnMut() -> Step + Send + 'static,
{
    Box::new(f)
}

/// Host facility that drives sequences across multiple cycles.
///
/// `spawn` is only ever invoked on the dispatcher's main thread, during a
/// drain. Implementations take ownership; the dispatcher has no further
/// contract with how or when stepping happens.
pub trait SequenceRunner: Send + Sync {
    fn spawn(&self, seq: Sequence);
}

/// Runner that steps a spawned sequence to completion on the spot.
///
/// For headless hosts and tests that have no frame loop. Note this collapses
/// the "across multiple cycles" property: the whole sequence runs inside the
/// drain that spawned it, so a sequence that never returns [`Step::Done`]
/// will hang the main thread.
#[derive(Debug, Default)]
pub struct InlineSequenceRunner;

impl SequenceRunner for InlineSequenceRunner {
    fn spawn(&self, mut seq: Sequence) {
        while seq() == Step::Continue {}
    }
}

#[cfg(test)]
mod tests {
    use super::{sequence_fn, InlineSequenceRunner, SequenceRunner, Step};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn inline_runner_steps_to_completion() {
        let steps = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&steps);
        let seq = sequence_fn(move || {
            if counted.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                Step::Done
            } else {
                Step::Continue
            }
        });
        InlineSequenceRunner.spawn(seq);
        assert_eq!(steps.load(Ordering::SeqCst), 5);
    }
}
