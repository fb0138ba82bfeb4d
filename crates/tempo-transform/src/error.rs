use thiserror::Error;

use tempo_resolve::ResolveError;
use tempo_syntax::SyntaxError;

/// Everything here aborts the current file; partial rewrites are never
/// emitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The tree is not well-formed.
    #[error("malformed input tree: {0}")]
    MalformedTree(#[from] SyntaxError),

    /// A name could not be resolved to a loadable class.
    #[error("class resolution failed: {0}")]
    ClassResolution(String),

    /// A name or overload has no candidate the ordering can decide on. The
    /// input is assumed to compile, so this means the resolver's model of
    /// the language is incomplete for the construct.
    #[error("cannot resolve `{name}` in `{scope}`")]
    UnresolvedName { scope: String, name: String },

    /// A synthesized member collides with a declared one, typically from
    /// rewriting already-rewritten source.
    #[error("generated member `{member}` already exists on `{class}`")]
    DuplicateGeneratedMember { class: String, member: String },

    /// A construct the walker has no handling for.
    #[error("no handling for construct `{0}`")]
    UnknownConstruct(&'static str),
}

impl From<ResolveError> for TransformError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownClass(name) => TransformError::ClassResolution(name),
            ResolveError::UnresolvedName { scope, name } => {
                TransformError::UnresolvedName { scope, name }
            }
            ResolveError::NoSuchMethod { class, name } => TransformError::UnresolvedName {
                scope: class,
                name,
            },
        }
    }
}
