use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::trace;

use crate::name::{dimensions, element_type, from_runtime_name, to_runtime_name};
use crate::{ClassGraph, TypeError, INCOMPATIBLE};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";

/// Index of an interned type in a [`TypeTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The primitive kinds. `Null` doubles as the type of `null` literals and of
/// `void` methods, matching the analyzer this table models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Null,
    Boolean,
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
}

impl PrimitiveKind {
    const ALL: &'static [(&'static str, PrimitiveKind)] = &[
        ("null", PrimitiveKind::Null),
        ("boolean", PrimitiveKind::Boolean),
        ("byte", PrimitiveKind::Byte),
        ("char", PrimitiveKind::Char),
        ("double", PrimitiveKind::Double),
        ("float", PrimitiveKind::Float),
        ("int", PrimitiveKind::Int),
        ("long", PrimitiveKind::Long),
        ("short", PrimitiveKind::Short),
    ];

    #[must_use]
    pub fn by_name(name: &str) -> Option<PrimitiveKind> {
        if name == "void" {
            return Some(PrimitiveKind::Null);
        }
        Self::ALL
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }
}

#[derive(Debug)]
struct TypeData {
    /// Canonical name, run-time form for arrays.
    name: String,
    primitive: Option<PrimitiveKind>,
}

/// The interning table for one rewrite session.
///
/// Created when the session starts and dropped (or [`TypeTable::clear`]ed)
/// with it; nothing here is process-global.
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<TypeData>,
    by_name: HashMap<String, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    #[must_use]
    pub fn new() -> Self {
        let mut table = TypeTable {
            types: Vec::new(),
            by_name: HashMap::new(),
        };
        for (name, _) in PrimitiveKind::ALL {
            table.intern(name);
        }
        table
    }

    /// Drop every type created since construction. Used between independent
    /// runs so stale class names cannot leak from one batch into the next.
    pub fn clear(&mut self) {
        self.types.clear();
        self.by_name.clear();
        for (name, _) in PrimitiveKind::ALL {
            self.intern(name);
        }
    }

    /// Intern a type by name, canonicalizing array spellings first. `void`
    /// maps to the null type.
    pub fn intern(&mut self, name: &str) -> TypeId {
        let canonical = to_runtime_name(name);
        let canonical = if canonical == "void" {
            "null".to_string()
        } else {
            canonical
        };

        if let Some(id) = self.by_name.get(&canonical) {
            return *id;
        }

        let id = TypeId(self.types.len() as u32);
        trace!(name = %canonical, ?id, "interning type");
        self.types.push(TypeData {
            primitive: PrimitiveKind::by_name(&canonical),
            name: canonical.clone(),
        });
        self.by_name.insert(canonical, id);
        id
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(&to_runtime_name(name)).copied()
    }

    /// Canonical (run-time form) name.
    #[must_use]
    pub fn name(&self, id: TypeId) -> &str {
        &self.types[id.idx()].name
    }

    /// Source-form name (`int[]` rather than `[I`).
    #[must_use]
    pub fn display_name(&self, id: TypeId) -> String {
        from_runtime_name(self.name(id))
    }

    #[must_use]
    pub fn primitive_kind(&self, id: TypeId) -> Option<PrimitiveKind> {
        self.types[id.idx()].primitive
    }

    #[must_use]
    pub fn is_primitive(&self, id: TypeId) -> bool {
        self.types[id.idx()].primitive.is_some()
    }

    #[must_use]
    pub fn is_null(&self, id: TypeId) -> bool {
        self.types[id.idx()].primitive == Some(PrimitiveKind::Null)
    }

    #[must_use]
    pub fn is_array(&self, id: TypeId) -> bool {
        self.name(id).starts_with('[')
    }

    #[must_use]
    pub fn is_string(&self, id: TypeId) -> bool {
        self.name(id) == STRING
    }

    #[must_use]
    pub fn dimensions_of(&self, id: TypeId) -> usize {
        dimensions(self.name(id))
    }

    /// Source-form name of the element type of a possibly-array type.
    #[must_use]
    pub fn element_name(&self, id: TypeId) -> String {
        element_type(self.name(id))
    }

    /// Add one array dimension. The null type absorbs dimensions.
    pub fn add_dimension(&mut self, id: TypeId) -> TypeId {
        let data = &self.types[id.idx()];
        if data.primitive == Some(PrimitiveKind::Null) {
            return id;
        }
        let name = if data.primitive.is_some() || data.name.starts_with('[') {
            format!("{}[]", from_runtime_name(&data.name))
        } else {
            format!("{}[]", data.name)
        };
        self.intern(&name)
    }

    /// Remove one array dimension; a non-array type is returned unchanged.
    pub fn remove_dimension(&mut self, id: TypeId) -> Result<TypeId, TypeError> {
        let name = self.name(id).to_string();
        if !name.starts_with('[') {
            return Ok(id);
        }

        let inner = &name[1..];
        if inner.starts_with('[') {
            return Ok(self.intern(inner));
        }
        if let Some(body) = inner.strip_prefix('L') {
            let class = body
                .strip_suffix(';')
                .ok_or_else(|| TypeError::NotAClass(inner.to_string()))?
                .to_string();
            return Ok(self.intern(&class));
        }
        let mut chars = inner.chars();
        if let (Some(code), None) = (chars.next(), chars.next()) {
            let primitive = element_type(&format!("[{code}"));
            if PrimitiveKind::by_name(&primitive).is_some() {
                return Ok(self.intern(&primitive));
            }
        }
        Err(TypeError::NotAClass(inner.to_string()))
    }

    /// Compatibility rating between an actual type and a formal type.
    ///
    /// 0 means identical (or `null` against any object type), a positive
    /// number counts widening or subtyping steps (smaller is more specific),
    /// and [`INCOMPATIBLE`] means the actual type cannot be used where the
    /// formal type is expected.
    pub fn compatibility(
        &self,
        from: TypeId,
        to: TypeId,
        graph: &dyn ClassGraph,
    ) -> Result<i32, TypeError> {
        if from == to {
            return Ok(0);
        }

        if self.is_null(from) && !self.is_primitive(to) {
            return Ok(0);
        }

        if self.is_primitive(from) != self.is_primitive(to) {
            return Ok(INCOMPATIBLE);
        }

        if let (Some(a), Some(b)) = (self.primitive_kind(from), self.primitive_kind(to)) {
            return Ok(widening_rating(a, b));
        }

        // Strip matching array dimensions from both sides. Only names that
        // actually lost a bracket are re-decoded; a plain class name never
        // carries the run-time `L...;` wrapping.
        let mut from_name = self.name(from).to_string();
        let mut to_name = self.name(to).to_string();
        let mut stripped = false;
        while from_name.starts_with('[') && to_name.starts_with('[') {
            from_name.remove(0);
            to_name.remove(0);
            stripped = true;
        }
        if stripped {
            from_name = decode_element(&from_name);
            to_name = decode_element(&to_name);
        }

        // A leftover primitive element on either side means the arrays had
        // different element kinds (`int[]` against `long[]`).
        if PrimitiveKind::by_name(&from_name).is_some() || PrimitiveKind::by_name(&to_name).is_some()
        {
            return Ok(if from_name == to_name { 0 } else { INCOMPATIBLE });
        }

        self.class_distance(&from_name, &to_name, graph)
    }

    /// Breadth-first subtyping walk: each superclass step costs one, every
    /// interface reachable at a step costs the same as that step.
    fn class_distance(
        &self,
        from: &str,
        to: &str,
        graph: &dyn ClassGraph,
    ) -> Result<i32, TypeError> {
        if from == to {
            return Ok(0);
        }

        // A remaining array (unequal dimension counts) behaves as a class
        // whose only supertype is Object.
        let from_is_array = from.starts_with('[');
        if !from_is_array && !graph.knows_class(from) {
            return Err(TypeError::UnknownClass(from.to_string()));
        }

        let mut depth = 0i32;
        let mut current = Some(from.to_string());

        while let Some(class) = current {
            let mut queue: VecDeque<String> = VecDeque::new();
            let mut handled: HashSet<String> = HashSet::new();
            queue.push_back(class.clone());

            while let Some(c) = queue.pop_front() {
                if c == to {
                    return Ok(depth);
                }
                if !handled.insert(c.clone()) {
                    continue;
                }
                for iface in graph.interfaces_of(&c) {
                    if !handled.contains(&iface) {
                        queue.push_back(iface);
                    }
                }
            }

            depth += 1;
            current = if class.starts_with('[') {
                Some(OBJECT.to_string())
            } else if class == OBJECT {
                None
            } else {
                Some(graph.superclass_of(&class).unwrap_or_else(|| OBJECT.to_string()))
            };
        }

        if to == OBJECT {
            Ok(depth)
        } else {
            Ok(INCOMPATIBLE)
        }
    }

    /// The common type of two operand types in an expression, or `None` when
    /// no such type exists and the caller must fail.
    #[must_use]
    pub fn common_type(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if a == b {
            return Some(a);
        }
        if self.is_string(a) {
            return Some(a);
        }
        if self.is_string(b) {
            return Some(b);
        }
        if let (Some(ka), Some(kb)) = (self.primitive_kind(a), self.primitive_kind(b)) {
            if widening_rating(ka, kb) >= 0 {
                return Some(b);
            }
            if widening_rating(kb, ka) >= 0 {
                return Some(a);
            }
        }
        None
    }
}

/// A run-time element name (after `[` stripping) back to a plain class or
/// primitive name.
fn decode_element(name: &str) -> String {
    if let Some(body) = name.strip_prefix('L') {
        return body.trim_end_matches(';').to_string();
    }
    if !name.starts_with('[') {
        let mut chars = name.chars();
        if let (Some(code), None) = (chars.next(), chars.next()) {
            let source = element_type(&format!("[{code}"));
            if PrimitiveKind::by_name(&source).is_some() {
                return source;
            }
        }
    }
    name.to_string()
}

/// The widening lattice, with the deliberate `int` -> `byte`/`short`
/// leniency that lets literal initializers such as `byte b = 1;` pass.
fn widening_rating(from: PrimitiveKind, to: PrimitiveKind) -> i32 {
    use PrimitiveKind::*;
    match (from, to) {
        (Char, Int) => 1,
        (Char, Long) => 2,
        (Char, Float) => 3,
        (Char, Double) => 4,
        (Int, Long) => 1,
        (Int, Float) => 2,
        (Int, Double) => 3,
        (Int, Byte) | (Int, Short) => 4,
        (Long, Double) => 1,
        (Short, Int) => 1,
        (Short, Long) => 2,
        (Short, Float) => 3,
        (Short, Double) => 4,
        (Byte, Short) => 1,
        (Byte, Int) => 2,
        (Byte, Long) => 3,
        (Byte, Float) => 4,
        (Byte, Double) => 5,
        (Float, Double) => 1,
        _ => INCOMPATIBLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestGraph {
        supers: HashMap<String, String>,
        ifaces: HashMap<String, Vec<String>>,
        known: HashSet<String>,
    }

    impl TestGraph {
        fn class(mut self, name: &str, superclass: Option<&str>, ifaces: &[&str]) -> Self {
            self.known.insert(name.to_string());
            if let Some(sc) = superclass {
                self.supers.insert(name.to_string(), sc.to_string());
            }
            self.ifaces.insert(
                name.to_string(),
                ifaces.iter().map(|s| s.to_string()).collect(),
            );
            self
        }
    }

    impl ClassGraph for TestGraph {
        fn knows_class(&self, name: &str) -> bool {
            self.known.contains(name)
        }

        fn superclass_of(&self, name: &str) -> Option<String> {
            self.supers.get(name).cloned()
        }

        fn interfaces_of(&self, name: &str) -> Vec<String> {
            self.ifaces.get(name).cloned().unwrap_or_default()
        }
    }

    fn graph() -> TestGraph {
        TestGraph::default()
            .class(OBJECT, None, &[])
            .class(STRING, Some(OBJECT), &[])
            .class("demo.Base", Some(OBJECT), &["demo.Marker"])
            .class("demo.Derived", Some("demo.Base"), &[])
            .class("demo.Marker", None, &[])
    }

    #[test]
    fn interning_is_canonical() {
        let mut table = TypeTable::new();
        let a = table.intern("int[]");
        let b = table.intern("[I");
        assert_eq!(a, b);
        assert_eq!(table.name(a), "[I");
        assert_eq!(table.display_name(a), "int[]");

        let void = table.intern("void");
        let null = table.intern("null");
        assert_eq!(void, null);
    }

    #[test]
    fn clear_resets_object_types() {
        let mut table = TypeTable::new();
        table.intern("demo.Widget");
        table.clear();
        assert!(table.lookup("demo.Widget").is_none());
        assert!(table.lookup("int").is_some());
    }

    #[test]
    fn dimension_round_trip() {
        let mut table = TypeTable::new();
        let int = table.intern("int");
        let arr = table.add_dimension(int);
        assert_eq!(table.name(arr), "[I");
        assert_eq!(table.remove_dimension(arr).unwrap(), int);

        let s = table.intern(STRING);
        let sarr = table.add_dimension(s);
        assert_eq!(table.name(sarr), "[Ljava.lang.String;");
        assert_eq!(table.remove_dimension(sarr).unwrap(), s);

        let null = table.intern("null");
        assert_eq!(table.add_dimension(null), null);
    }

    #[test]
    fn primitive_ratings_increase_with_lattice_distance() {
        let mut table = TypeTable::new();
        let graph = graph();
        let char_t = table.intern("char");
        let int_t = table.intern("int");
        let long_t = table.intern("long");
        let float_t = table.intern("float");
        let double_t = table.intern("double");
        let boolean_t = table.intern("boolean");
        // Narrowing leniency for literal initializers.
        let byte_t = table.intern("byte");

        let rate = |from, to| table.compatibility(from, to, &graph).unwrap();

        assert_eq!(rate(int_t, int_t), 0);
        let c2i = rate(char_t, int_t);
        let c2l = rate(char_t, long_t);
        let c2f = rate(char_t, float_t);
        let c2d = rate(char_t, double_t);
        assert!(0 < c2i && c2i < c2l && c2l < c2f && c2f < c2d);
        assert_eq!(rate(boolean_t, int_t), INCOMPATIBLE);
        assert_eq!(rate(double_t, float_t), INCOMPATIBLE);

        assert_eq!(rate(int_t, byte_t), 4);
    }

    #[test]
    fn null_is_compatible_with_objects_only() {
        let mut table = TypeTable::new();
        let graph = graph();
        let null = table.intern("null");
        let s = table.intern(STRING);
        let int_t = table.intern("int");

        assert_eq!(table.compatibility(null, s, &graph).unwrap(), 0);
        assert_eq!(table.compatibility(null, int_t, &graph).unwrap(), INCOMPATIBLE);
    }

    #[test]
    fn subtype_distance_counts_superclass_steps() {
        let mut table = TypeTable::new();
        let graph = graph();
        let derived = table.intern("demo.Derived");
        let base = table.intern("demo.Base");
        let marker = table.intern("demo.Marker");
        let object = table.intern(OBJECT);

        assert_eq!(table.compatibility(derived, base, &graph).unwrap(), 1);
        assert_eq!(table.compatibility(derived, object, &graph).unwrap(), 2);
        // The interface is reachable at the Base step.
        assert_eq!(table.compatibility(derived, marker, &graph).unwrap(), 1);
        assert_eq!(table.compatibility(base, derived, &graph).unwrap(), INCOMPATIBLE);
    }

    #[test]
    fn arrays_with_unequal_dimensions() {
        let mut table = TypeTable::new();
        let graph = graph();
        let int_arr = table.intern("int[]");
        let long_arr = table.intern("long[]");
        let object = table.intern(OBJECT);

        assert_eq!(table.compatibility(int_arr, long_arr, &graph).unwrap(), INCOMPATIBLE);
        assert_eq!(table.compatibility(int_arr, object, &graph).unwrap(), 1);
    }

    #[test]
    fn common_types() {
        let mut table = TypeTable::new();
        let int_t = table.intern("int");
        let long_t = table.intern("long");
        let boolean_t = table.intern("boolean");
        let s = table.intern(STRING);

        assert_eq!(table.common_type(int_t, long_t), Some(long_t));
        assert_eq!(table.common_type(long_t, int_t), Some(long_t));
        assert_eq!(table.common_type(int_t, s), Some(s));
        assert_eq!(table.common_type(boolean_t, int_t), None);
        assert_eq!(table.common_type(int_t, int_t), Some(int_t));
    }
}
