//! Cross-thread work dispatcher for a single designated main thread.
//!
//! Background threads schedule closures (or resumable multi-step sequences)
//! that must execute on one specific thread — the thread that owns the host's
//! main loop — and may optionally block or `await` until the work completes.
//! The dispatcher guarantees *where* and *in what order* work runs; it never
//! runs anything itself outside the owner thread's explicit `drain`.
//!
//! Design:
//! - Producers push into a shared FIFO; `drain` swaps the whole queue out
//!   under the lock and executes the snapshot after releasing it, so items
//!   enqueued mid-batch run next cycle and executing items can enqueue freely.
//! - Exactly one instance is active at a time. Lookup after teardown fails
//!   with a descriptive error rather than handing out a stale reference.
//! - `dispatch` from the main thread itself runs inline; blocking that thread
//!   on work only it can run would self-deadlock.
//! - Per-item failure isolation: a panicking action resolves its own
//!   completion signal with the captured failure and never disturbs sibling
//!   items or the drain loop.
//!
//! The host side (activation around the loop lifecycle, one `drain` per
//! cycle, stepping of resumable sequences) lives in `axle-frame`.

mod dispatcher;
mod error;
mod queue;
mod sequence;
mod signal;

pub use dispatcher::Dispatcher;
pub use error::{ActionError, DispatchError, Result};
pub use queue::PendingQueue;
pub use sequence::{sequence_fn, InlineSequenceRunner, Sequence, SequenceRunner, Step};
pub use signal::CompletionSignal;
