//! Per-traversal resolver state: the lexical scope stack, the chain of
//! enclosing class declarations, and the set of cross-analyzed types.

use std::collections::{HashMap, HashSet};

use tempo_core::TypeName;
use tempo_types::TypeId;
use tracing::trace;

/// One lexical scope. A class scope carries the name of the class whose
/// fields it holds; entries in it resolve with that declaring owner.
#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, (TypeId, Option<TypeName>)>,
    class: Option<TypeName>,
}

/// Strict-LIFO stack of lexical scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        ScopeStack::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Push the scope holding a class's (declared and inherited) fields.
    pub fn push_class(&mut self, class: TypeName) {
        self.scopes.push(Scope {
            values: HashMap::new(),
            class: Some(class),
        });
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Declare a local or parameter in the innermost scope.
    pub fn declare(&mut self, name: &str, ty: TypeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.insert(name.to_string(), (ty, None));
        }
    }

    /// Record a field (with its declaring class) in the innermost scope;
    /// used while opening a class scope. First writer wins, so the most
    /// derived declaration shadows inherited ones.
    pub fn declare_field(&mut self, name: &str, ty: TypeId, owner: TypeName) {
        if let Some(scope) = self.scopes.last_mut() {
            scope
                .values
                .entry(name.to_string())
                .or_insert((ty, Some(owner)));
        }
    }

    /// Innermost-out lookup.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(TypeId, Option<TypeName>)> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.values.get(name).cloned())
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// One open class declaration: its binary name, the counter that numbers
/// declarations nested in its method bodies, and the local classes already
/// closed inside it (still referencable by simple name).
#[derive(Debug)]
pub struct ClassContext {
    pub name: TypeName,
    nested_counter: u32,
    local_classes: HashMap<String, TypeName>,
}

impl ClassContext {
    #[must_use]
    pub fn new(name: TypeName) -> Self {
        ClassContext {
            name,
            nested_counter: 0,
            local_classes: HashMap::new(),
        }
    }

    /// The canonical name of the next declaration nested in a method body
    /// of this class: `Outer$N` for an anonymous class, `Outer$NName` for a
    /// local named class.
    pub fn next_nested_name(&mut self, simple: Option<&str>) -> TypeName {
        self.nested_counter += 1;
        let name = match simple {
            Some(simple) => format!("{}${}{simple}", self.name, self.nested_counter),
            None => format!("{}${}", self.name, self.nested_counter),
        };
        trace!(name, "assigned nested declaration name");
        TypeName::new(name)
    }

    pub fn record_local_class(&mut self, simple: &str, binary: TypeName) {
        self.local_classes.insert(simple.to_string(), binary);
    }

    #[must_use]
    pub fn local_class(&self, simple: &str) -> Option<&TypeName> {
        self.local_classes.get(simple)
    }
}

/// The chain of lexically enclosing declarations currently open, outermost
/// first.
#[derive(Debug, Default)]
pub struct ClassContextStack {
    stack: Vec<ClassContext>,
}

impl ClassContextStack {
    #[must_use]
    pub fn new() -> Self {
        ClassContextStack::default()
    }

    pub fn enter(&mut self, name: TypeName) {
        self.stack.push(ClassContext::new(name));
    }

    pub fn leave(&mut self) -> Option<ClassContext> {
        self.stack.pop()
    }

    #[must_use]
    pub fn current(&self) -> Option<&ClassContext> {
        self.stack.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ClassContext> {
        self.stack.last_mut()
    }

    #[must_use]
    pub fn current_class(&self) -> Option<&TypeName> {
        self.stack.last().map(|c| &c.name)
    }

    /// Enclosing contexts from innermost to outermost.
    pub fn innermost_out(&self) -> impl Iterator<Item = &ClassContext> {
        self.stack.iter().rev()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Names of classes whose instances must themselves support rollback
/// because they are reachable from a type already being rewritten.
/// Monotonic within a run.
#[derive(Debug, Default)]
pub struct CrossAnalysisSet {
    names: HashSet<String>,
}

impl CrossAnalysisSet {
    #[must_use]
    pub fn new() -> Self {
        CrossAnalysisSet::default()
    }

    /// Returns `true` when the name was not yet in the set; growth must
    /// re-trigger the deferred fixups keyed by it.
    pub fn add(&mut self, name: &str) -> bool {
        let added = self.names.insert(name.to_string());
        if added {
            trace!(name, "type added to cross-analysis");
        }
        added
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_lookup_is_innermost_out() {
        let mut types = tempo_types::TypeTable::new();
        let int_t = types.intern("int");
        let long_t = types.intern("long");

        let mut scopes = ScopeStack::new();
        scopes.push_class(TypeName::new("demo.C"));
        scopes.declare_field("x", int_t, TypeName::new("demo.C"));
        scopes.push();
        scopes.declare("x", long_t);

        assert_eq!(scopes.lookup("x"), Some((long_t, None)));
        scopes.pop();
        assert_eq!(
            scopes.lookup("x"),
            Some((int_t, Some(TypeName::new("demo.C"))))
        );
    }

    #[test]
    fn inherited_fields_do_not_shadow_declared_ones() {
        let mut types = tempo_types::TypeTable::new();
        let int_t = types.intern("int");
        let long_t = types.intern("long");

        let mut scopes = ScopeStack::new();
        scopes.push_class(TypeName::new("demo.Sub"));
        scopes.declare_field("x", int_t, TypeName::new("demo.Sub"));
        // Recorded later, from the superclass walk.
        scopes.declare_field("x", long_t, TypeName::new("demo.Base"));

        assert_eq!(
            scopes.lookup("x"),
            Some((int_t, Some(TypeName::new("demo.Sub"))))
        );
    }

    #[test]
    fn nested_names_follow_the_canonical_scheme() {
        let mut context = ClassContext::new(TypeName::new("demo.Outer"));
        assert_eq!(context.next_nested_name(None).as_str(), "demo.Outer$1");
        assert_eq!(
            context.next_nested_name(Some("Helper")).as_str(),
            "demo.Outer$2Helper"
        );
        assert_eq!(context.next_nested_name(None).as_str(), "demo.Outer$3");
    }

    #[test]
    fn cross_analysis_growth_is_reported_once() {
        let mut set = CrossAnalysisSet::new();
        assert!(set.add("demo.B"));
        assert!(!set.add("demo.B"));
        assert!(set.contains("demo.B"));
    }
}
