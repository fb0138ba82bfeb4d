//! The rewrite engine: a single depth-first walk that resolves every
//! sub-expression, fires the rewrite rules, and synthesizes the
//! checkpoint-protocol members for every class being rewritten.
//!
//! All mutable rewrite state lives in a [`RewriteSession`] created per
//! compilation unit; nothing is process-global and nothing survives the
//! session. Handlers are independent rule values held in an ordered
//! registry; each may answer an event with a replacement node, which the
//! walker splices into the parent slot it is currently rebuilding.

mod emitter;
mod error;
mod names;
mod rules;
mod session;
mod tables;
mod walk;

pub use error::TransformError;
pub use names::RUNTIME_PACKAGE;
pub use session::{RewriteOptions, RewriteOutcome, RewriteSession};
pub use tables::{FieldAccessTable, PendingFixups};
