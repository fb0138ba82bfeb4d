//! The checkpoint/rollback protocol the rewritten code targets.
//!
//! A rewritten class gains one [`FieldRecord`] per managed field, an
//! optional current [`Checkpoint`], and — at the top of an inheritance
//! chain — a [`CheckpointRecord`] remembering superseded checkpoints. The
//! synthesized accessors append to the records before every store; `restore`
//! walks the records backwards to any earlier timestamp.
//!
//! Checkpoints are shared identity values: cloning a [`Checkpoint`] clones a
//! handle, not the state, and identity comparisons use the shared allocation.
//! Everything here is single-threaded by design, matching the batch rewriter.

mod checkpoint;
mod record;

pub use checkpoint::{Checkpoint, Rollbackable, Timestamp};
pub use record::{CheckpointRecord, FieldRecord};
