use pretty_assertions::assert_eq;
use tempo_core::{Modifiers, TypeName};
use tempo_resolve::{
    builtin_symbols, ClassKind, ClassSummary, FieldSummary, MethodSummary, SymbolResolver,
    SymbolTable,
};
use tempo_types::TypeTable;

fn table() -> SymbolTable {
    let mut symbols = builtin_symbols();

    let mut base = ClassSummary::new("demo.Base");
    base.superclass = Some("java.lang.Object".to_string());
    base.fields.push(FieldSummary {
        name: "inherited".into(),
        ty: "long".into(),
        modifiers: Modifiers::private(),
    });
    base.methods.push(MethodSummary {
        name: "describe".into(),
        params: vec!["int".into()],
        return_type: "java.lang.String".into(),
        modifiers: Modifiers::public(),
    });
    symbols.insert(base);

    let mut sub = ClassSummary::new("demo.Sub");
    sub.superclass = Some("demo.Base".to_string());
    sub.fields.push(FieldSummary {
        name: "own".into(),
        ty: "int".into(),
        modifiers: Modifiers::private(),
    });
    sub.methods.push(MethodSummary {
        name: "describe".into(),
        params: vec!["long".into()],
        return_type: "java.lang.String".into(),
        modifiers: Modifiers::public(),
    });
    sub.nested.push("Helper".to_string());
    symbols.insert(sub);

    let mut helper = ClassSummary::new("demo.Sub$Helper");
    helper.superclass = Some("java.lang.Object".to_string());
    symbols.insert(helper);

    symbols
}

fn resolver_in(symbols: &SymbolTable, types: &mut TypeTable, class: &str) -> SymbolResolver {
    let mut resolver = SymbolResolver::new();
    resolver.classes.enter(TypeName::new(class));
    resolver.open_class_scope(types, symbols, &TypeName::new(class));
    resolver
}

#[test]
fn locals_shadow_fields() {
    let symbols = table();
    let mut types = TypeTable::new();
    let mut resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    let own = resolver
        .resolve_name(&mut types, &symbols, "own", None)
        .expect("resolves")
        .expect("found");
    assert_eq!(types.name(own.ty), "int");
    assert_eq!(own.owner.map(|o| types.name(o).to_string()), Some("demo.Sub".into()));

    resolver.scopes.push();
    let long_t = types.intern("long");
    resolver.scopes.declare("own", long_t);
    let shadowed = resolver
        .resolve_name(&mut types, &symbols, "own", None)
        .expect("resolves")
        .expect("found");
    assert_eq!(shadowed.ty, long_t);
    assert_eq!(shadowed.owner, None);
}

#[test]
fn inherited_fields_resolve_with_their_declaring_class() {
    let symbols = table();
    let mut types = TypeTable::new();
    let resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    let inherited = resolver
        .resolve_name(&mut types, &symbols, "inherited", None)
        .expect("resolves")
        .expect("found");
    assert_eq!(types.name(inherited.ty), "long");
    assert_eq!(
        inherited.owner.map(|o| types.name(o).to_string()),
        Some("demo.Base".into())
    );
}

#[test]
fn simple_names_reach_classes_and_nested_classes() {
    let symbols = table();
    let mut types = TypeTable::new();
    let resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    let helper = resolver
        .lookup_class(&symbols, "Helper")
        .expect("nested class by simple name");
    assert_eq!(helper.as_str(), "demo.Sub$Helper");

    let by_dots = resolver
        .lookup_class(&symbols, "Sub.Helper")
        .expect("nested class by dotted name");
    assert_eq!(by_dots.as_str(), "demo.Sub$Helper");

    let same_package = resolver
        .lookup_class(&symbols, "Base")
        .expect("same-package class");
    assert_eq!(same_package.as_str(), "demo.Base");

    let core = resolver
        .lookup_class(&symbols, "String")
        .expect("java.lang class");
    assert_eq!(core.as_str(), "java.lang.String");
}

#[test]
fn array_length_is_an_int_field() {
    let symbols = table();
    let mut types = TypeTable::new();
    let resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    let length = resolver
        .resolve_from_class(&mut types, &symbols, "int[]", "length")
        .expect("resolves")
        .expect("found");
    assert_eq!(types.name(length.ty), "int");
}

#[test]
fn overload_resolution_prefers_the_tightest_rating() {
    let symbols = table();
    let mut types = TypeTable::new();
    let resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    // An int argument matches Sub.describe(long) at rating 1 and
    // Base.describe(int) at rating 0; the exact match wins even though it
    // sits higher in the hierarchy.
    let int_t = types.intern("int");
    let found = resolver
        .resolve_method(&mut types, &symbols, Some("demo.Sub"), "describe", &[int_t])
        .expect("resolves")
        .expect("found");
    assert_eq!(
        found.owner.map(|o| types.name(o).to_string()),
        Some("demo.Base".into())
    );

    // A long argument only fits describe(long).
    let long_t = types.intern("long");
    let found = resolver
        .resolve_method(&mut types, &symbols, Some("demo.Sub"), "describe", &[long_t])
        .expect("resolves")
        .expect("found");
    assert_eq!(
        found.owner.map(|o| types.name(o).to_string()),
        Some("demo.Sub".into())
    );

    // No candidate takes a boolean.
    let boolean_t = types.intern("boolean");
    let missing = resolver
        .resolve_method(&mut types, &symbols, Some("demo.Sub"), "describe", &[boolean_t])
        .expect("resolves");
    assert!(missing.is_none());
}

#[test]
fn unknown_classes_are_reported() {
    let symbols = table();
    let mut types = TypeTable::new();
    let resolver = resolver_in(&symbols, &mut types, "demo.Sub");

    let err = resolver
        .resolve_from_class(&mut types, &symbols, "demo.Missing", "x")
        .expect_err("unknown class");
    assert_eq!(
        err,
        tempo_resolve::ResolveError::UnknownClass("demo.Missing".into())
    );
}

#[test]
fn enclosing_declarations_are_searched_outward() {
    let symbols = table();
    let mut types = TypeTable::new();
    let mut resolver = SymbolResolver::new();

    resolver.classes.enter(TypeName::new("demo.Sub"));
    resolver.open_class_scope(&mut types, &symbols, &TypeName::new("demo.Sub"));
    resolver.classes.enter(TypeName::new("demo.Sub$Helper"));
    resolver.open_class_scope(&mut types, &symbols, &TypeName::new("demo.Sub$Helper"));

    // Sub's fields stay visible inside Helper through the class-scope
    // stack.
    let own = resolver
        .resolve_name(&mut types, &symbols, "own", None)
        .expect("resolves")
        .expect("found");
    assert_eq!(types.name(own.ty), "int");
}
