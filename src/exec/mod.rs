//! Background execution core.
//!
//! Long-running operations never run on the UI thread. A view controller
//! builds a [`TaskSpec`], submits it to the shared [`ExecPool`], and gets back
//! a [`TaskHandle`]: a [`CancelToken`] plus a single-consumer stream of
//! [`TaskEvent`]s - zero or more progress reports followed by exactly one
//! terminal [`TaskOutcome`].
//!
//! Guarantees this module upholds:
//! - `submit` never blocks the caller
//! - exactly one terminal event per task, regardless of success, engine
//!   error, engine panic, or cancellation
//! - a task cancelled before it obtains an execution slot terminates
//!   Cancelled without invoking the engine at all
//! - events from one task are delivered in emission order; nothing is
//!   guaranteed across tasks
//! - one engine failure never disturbs other in-flight or future tasks
//!
//! Cancellation is cooperative only: `cancel()` requests, the engine decides
//! when to honor it by polling the token between sub-steps. There is no
//! forced termination and no deadline enforcement here; a caller wanting a
//! timeout cancels the token after its own deadline.
//!
//! Nothing here serializes concurrent operations on the same input file;
//! per-file exclusion, if ever needed, belongs to engines or callers.

pub mod cancel;
pub mod pool;
pub mod task;
pub mod worker;

pub use cancel::CancelToken;
pub use pool::ExecPool;
pub use task::{
    AnalyzeParams, EmbedMethod, EmbedParams, ExtractParams, KdfParams, NeutralizeParams,
    NeutralizeTier, OperationKind, PayloadSource, TaskParams, TaskSpec,
};
pub use worker::{ProgressSink, ProgressUpdate, TaskEvent, TaskHandle, TaskOutcome};
