//! The program tree Tempo rewrites.
//!
//! Trees arrive from an external parser as serialized compilation units, are
//! rewritten in place, and leave either re-serialized or rendered to source
//! text by the [`emit`] module. The node set mirrors what the rewrite engine
//! must understand; anything outside it is a parse-side concern.

pub mod ast;
pub mod build;
pub mod emit;
pub mod validate;

pub use ast::*;
pub use validate::{validate, SyntaxError};
