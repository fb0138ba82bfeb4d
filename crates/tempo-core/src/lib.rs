//! Core shared types for Tempo.
//!
//! This crate is intentionally small and dependency-light: the name and
//! modifier vocabulary every other crate speaks, nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for an input compilation unit.
///
/// Inputs arrive as files on disk, so the path string is the identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A simple (undotted) identifier: a variable, field, method or simple type
/// name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name(value.to_string())
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name(value)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dotted package name. The empty segment list is the default package.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName {
    segments: Vec<String>,
}

impl PackageName {
    #[must_use]
    pub fn from_dotted(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::default();
        }
        Self {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// The package with `prefix` prepended, as used by the `--prefix` driver
    /// option.
    #[must_use]
    pub fn prefixed(&self, prefix: &PackageName) -> PackageName {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        PackageName { segments }
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

/// A possibly-qualified dotted name as written in source (`a.b.C`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn new(dotted: impl Into<String>) -> Self {
        Self(dotted.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_simple(&self) -> bool {
        !self.0.contains('.')
    }

    /// The last dotted segment.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(dot) => &self.0[dot + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The binary name of a class: dotted package, `$`-separated nesting
/// (`java.util.HashMap$HashEntry`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The simple name: everything after the last `.` or `$`, with any
    /// leading anonymous-class digits stripped (`Outer$1Local` -> `Local`).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let start = self
            .0
            .rfind(['.', '$'])
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let tail = &self.0[start..];
        let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == tail.len() {
            tail
        } else {
            &tail[digits..]
        }
    }

    /// The binary name of a member class of this class.
    #[must_use]
    pub fn nested(&self, simple: &str) -> TypeName {
        TypeName(format!("{}${simple}", self.0))
    }

    /// The enclosing binary name, if this names a nested class.
    #[must_use]
    pub fn enclosing(&self) -> Option<TypeName> {
        self.0.rfind('$').map(|pos| TypeName(self.0[..pos].to_string()))
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        TypeName(value.to_string())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Member visibility as declared in source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

/// The modifier set Tempo cares about. Rewrite eligibility depends on
/// visibility, `static` and `final`; the rest ride along for emission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_transient: bool,
}

impl Modifiers {
    #[must_use]
    pub fn private() -> Self {
        Modifiers {
            visibility: Visibility::Private,
            ..Modifiers::default()
        }
    }

    #[must_use]
    pub fn public() -> Self {
        Modifiers {
            visibility: Visibility::Public,
            ..Modifiers::default()
        }
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_prefixing() {
        let pkg = PackageName::from_dotted("util.containers");
        let prefix = PackageName::from_dotted("rollback");
        assert_eq!(pkg.prefixed(&prefix).to_dotted(), "rollback.util.containers");
        assert!(PackageName::from_dotted("").is_empty());
    }

    #[test]
    fn type_name_nesting() {
        let outer = TypeName::new("demo.Outer");
        let inner = outer.nested("Inner");
        assert_eq!(inner.as_str(), "demo.Outer$Inner");
        assert_eq!(inner.simple_name(), "Inner");
        assert_eq!(inner.enclosing(), Some(outer));
    }

    #[test]
    fn simple_name_strips_anonymous_digits() {
        assert_eq!(TypeName::new("demo.Outer$1").simple_name(), "1");
        assert_eq!(TypeName::new("demo.Outer$1Local").simple_name(), "Local");
        assert_eq!(QualifiedName::new("a.b.C").simple_name(), "C");
    }
}
