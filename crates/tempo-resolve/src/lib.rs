//! Name and member resolution for the rewrite walk.
//!
//! The resolver reproduces enough of the host language's static semantics to
//! give every sub-expression a type and an owner: a lexical scope stack, the
//! chain of enclosing class declarations, breadth-first member lookup across
//! superclasses and interfaces, and rating-based overload selection. Class
//! metadata comes from a [`ClassMetadataProvider`] — either summaries
//! collected from the trees in the current run or a serialized symbol table
//! for classes outside it — never from reflection.

mod collect;
mod metadata;
mod resolver;
mod scopes;

pub use collect::collect_unit;
pub use metadata::{
    builtin_symbols, ClassKind, ClassMetadataProvider, ClassSummary, FieldSummary, MetadataGraph,
    MethodSummary, SymbolTable, OBJECT, STRING,
};
pub use resolver::{ResolveError, SymbolResolver};
pub use scopes::{ClassContext, ClassContextStack, CrossAnalysisSet, ScopeStack};
