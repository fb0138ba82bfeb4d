//! Class metadata: the capability that replaces reflective class loading.
//!
//! A [`ClassSummary`] reports exactly what rewrite eligibility and member
//! lookup need — declared fields and methods with modifiers, the supertype
//! graph, and nested class names. Summaries come from trees parsed in the
//! same run or from a JSON symbol table shipped alongside pre-built code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tempo_core::{Modifiers, TypeName};
use tempo_types::ClassGraph;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub name: String,
    /// Source-form, fully qualified type name (`int[]`, `java.lang.String`).
    pub ty: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    /// Source-form parameter type names, in order.
    #[serde(default)]
    pub params: Vec<String>,
    pub return_type: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    /// Binary name (`demo.Outer$Inner`).
    pub name: TypeName,
    #[serde(default)]
    pub kind: ClassKind,
    /// `None` for `java.lang.Object` and for interfaces.
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSummary>,
    #[serde(default)]
    pub methods: Vec<MethodSummary>,
    /// Simple names of member classes.
    #[serde(default)]
    pub nested: Vec<String>,
}

impl ClassSummary {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassSummary {
            name: TypeName::new(name),
            kind: ClassKind::Class,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Lookup from binary class name to declared-members summary.
pub trait ClassMetadataProvider {
    fn summary(&self, name: &str) -> Option<&ClassSummary>;
}

/// The serialized symbol table: one flat map of summaries, mergeable so a
/// run can layer external tables under the summaries collected from its own
/// inputs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    classes: HashMap<String, ClassSummary>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn insert(&mut self, summary: ClassSummary) {
        self.classes
            .insert(summary.name.as_str().to_string(), summary);
    }

    /// Later entries win, so merge external tables first and the current
    /// run's own summaries last.
    pub fn merge(&mut self, other: SymbolTable) {
        self.classes.extend(other.classes);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassMetadataProvider for SymbolTable {
    fn summary(&self, name: &str) -> Option<&ClassSummary> {
        self.classes.get(name)
    }
}

/// Adapter giving the type table its supertype view of a provider.
pub struct MetadataGraph<'a>(pub &'a dyn ClassMetadataProvider);

impl ClassGraph for MetadataGraph<'_> {
    fn knows_class(&self, name: &str) -> bool {
        self.0.summary(name).is_some()
    }

    fn superclass_of(&self, name: &str) -> Option<String> {
        let summary = self.0.summary(name)?;
        if summary.kind == ClassKind::Interface || name == OBJECT {
            return None;
        }
        Some(summary.superclass.clone().unwrap_or_else(|| OBJECT.to_string()))
    }

    fn interfaces_of(&self, name: &str) -> Vec<String> {
        self.0
            .summary(name)
            .map(|s| s.interfaces.clone())
            .unwrap_or_default()
    }
}

/// The handful of core classes every run can assume without an external
/// symbol table.
#[must_use]
pub fn builtin_symbols() -> SymbolTable {
    let mut table = SymbolTable::new();

    let mut object = ClassSummary::new(OBJECT);
    object.methods = vec![
        MethodSummary {
            name: "equals".into(),
            params: vec![OBJECT.into()],
            return_type: "boolean".into(),
            modifiers: Modifiers::public(),
        },
        MethodSummary {
            name: "hashCode".into(),
            params: vec![],
            return_type: "int".into(),
            modifiers: Modifiers::public(),
        },
        MethodSummary {
            name: "toString".into(),
            params: vec![],
            return_type: STRING.into(),
            modifiers: Modifiers::public(),
        },
        MethodSummary {
            name: "clone".into(),
            params: vec![],
            return_type: OBJECT.into(),
            modifiers: Modifiers::public(),
        },
    ];
    table.insert(object);

    let mut string = ClassSummary::new(STRING);
    string.superclass = Some(OBJECT.to_string());
    string.methods = vec![
        MethodSummary {
            name: "length".into(),
            params: vec![],
            return_type: "int".into(),
            modifiers: Modifiers::public(),
        },
        MethodSummary {
            name: "charAt".into(),
            params: vec!["int".into()],
            return_type: "char".into(),
            modifiers: Modifiers::public(),
        },
        MethodSummary {
            name: "concat".into(),
            params: vec![STRING.into()],
            return_type: STRING.into(),
            modifiers: Modifiers::public(),
        },
    ];
    table.insert(string);

    for iface in ["java.lang.Cloneable", "java.io.Serializable"] {
        let mut summary = ClassSummary::new(iface);
        summary.kind = ClassKind::Interface;
        table.insert(summary);
    }

    table
}
