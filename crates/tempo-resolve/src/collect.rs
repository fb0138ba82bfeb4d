//! Builds class summaries from the compilation units of the current run.
//!
//! The driver collects every input unit before any rewrite starts, so a
//! class in one file resolves against classes in another without compiled
//! artifacts. Only declarations referencable by name are collected here;
//! local and anonymous classes get their summaries registered by the walker
//! at the point it names them.

use std::collections::HashMap;

use tempo_core::TypeName;
use tempo_syntax::{CompilationUnit, Member, TypeDecl, TypeDeclKind};
use tracing::debug;

use crate::metadata::{ClassKind, ClassSummary, FieldSummary, MethodSummary, OBJECT, STRING};

/// Summaries for every named declaration in `unit`, nested classes under
/// their binary names.
#[must_use]
pub fn collect_unit(unit: &CompilationUnit) -> Vec<ClassSummary> {
    let package = unit
        .package
        .as_ref()
        .map(|p| p.to_dotted())
        .unwrap_or_default();

    let mut imports: HashMap<String, String> = HashMap::new();
    for import in &unit.imports {
        if !import.on_demand {
            imports.insert(
                import.name.simple_name().to_string(),
                import.name.as_str().to_string(),
            );
        }
    }
    for decl in &unit.types {
        let fq = qualify_in_package(&package, decl.name.as_str());
        imports
            .entry(decl.name.as_str().to_string())
            .or_insert(fq);
    }

    let qualifier = Qualifier { imports };

    let mut out = Vec::new();
    for decl in &unit.types {
        let binary = TypeName::new(qualify_in_package(&package, decl.name.as_str()));
        collect_type(decl, binary, &qualifier, &mut Vec::new(), &mut out);
    }
    debug!(count = out.len(), "collected unit summaries");
    out
}

fn qualify_in_package(package: &str, simple: &str) -> String {
    if package.is_empty() {
        simple.to_string()
    } else {
        format!("{package}.{simple}")
    }
}

struct Qualifier {
    imports: HashMap<String, String>,
}

impl Qualifier {
    /// Best-effort qualification of a source type name. Names this pass
    /// cannot pin down stay as written; the resolver reports them if they
    /// ever matter.
    fn qualify(&self, name: &str, enclosing: &[(TypeName, Vec<String>)]) -> String {
        let dims = name.matches("[]").count();
        let element = &name[..name.len() - 2 * dims];

        let qualified = self.qualify_element(element, enclosing);
        let mut out = qualified;
        for _ in 0..dims {
            out.push_str("[]");
        }
        out
    }

    fn qualify_element(&self, element: &str, enclosing: &[(TypeName, Vec<String>)]) -> String {
        if element.contains('.') || is_primitive_name(element) {
            return element.to_string();
        }

        // A sibling nested class of one of the enclosing declarations.
        for (binary, nested) in enclosing.iter().rev() {
            if nested.iter().any(|n| n == element) {
                return binary.nested(element).as_str().to_string();
            }
        }

        if let Some(fq) = self.imports.get(element) {
            return fq.clone();
        }

        match element {
            "Object" => OBJECT.to_string(),
            "String" => STRING.to_string(),
            other => other.to_string(),
        }
    }
}

fn collect_type(
    decl: &TypeDecl,
    binary: TypeName,
    qualifier: &Qualifier,
    enclosing: &mut Vec<(TypeName, Vec<String>)>,
    out: &mut Vec<ClassSummary>,
) {
    let nested_names: Vec<String> = decl
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Nested(nested) => Some(nested.name.as_str().to_string()),
            _ => None,
        })
        .collect();
    enclosing.push((binary.clone(), nested_names.clone()));

    let mut summary = ClassSummary::new(binary.as_str());
    summary.kind = match decl.kind {
        TypeDeclKind::Class => ClassKind::Class,
        TypeDeclKind::Interface => ClassKind::Interface,
    };
    summary.superclass = decl
        .superclass
        .as_ref()
        .map(|s| qualifier.qualify(&s.source_name(), enclosing));
    summary.interfaces = decl
        .interfaces
        .iter()
        .map(|i| qualifier.qualify(&i.source_name(), enclosing))
        .collect();
    summary.nested = nested_names;

    for member in &decl.members {
        match member {
            Member::Field(field) => summary.fields.push(FieldSummary {
                name: field.name.as_str().to_string(),
                ty: qualifier.qualify(&field.ty.source_name(), enclosing),
                modifiers: field.modifiers,
            }),
            Member::Method(method) => summary.methods.push(MethodSummary {
                name: method.name.as_str().to_string(),
                params: method
                    .params
                    .iter()
                    .map(|p| qualifier.qualify(&p.ty.source_name(), enclosing))
                    .collect(),
                return_type: qualifier.qualify(&method.return_type.source_name(), enclosing),
                modifiers: method.modifiers,
            }),
            Member::Nested(nested) => {
                let nested_binary = binary.nested(nested.name.as_str());
                collect_type(nested, nested_binary, qualifier, enclosing, out);
            }
            Member::Constructor(_) | Member::Initializer(_) => {}
        }
    }

    enclosing.pop();
    out.push(summary);
}

fn is_primitive_name(name: &str) -> bool {
    matches!(
        name,
        "boolean" | "byte" | "char" | "double" | "float" | "int" | "long" | "short" | "void"
            | "null"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempo_core::Modifiers;
    use tempo_syntax::{build, TypeRef};

    #[test]
    fn collects_nested_classes_under_binary_names() {
        let inner = build::class("Inner", vec![]);
        let mut outer = build::class(
            "Outer",
            vec![
                build::field(
                    Modifiers::private(),
                    TypeRef::named("Inner"),
                    "inner",
                    None,
                ),
                Member::Nested(inner),
            ],
        );
        outer.superclass = Some(TypeRef::named("Base"));
        let mut unit = build::unit(Some("demo"), vec![outer]);
        unit.imports.push(tempo_syntax::Import {
            name: tempo_core::QualifiedName::new("other.Base"),
            on_demand: false,
        });

        let summaries = collect_unit(&unit);
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["demo.Outer$Inner", "demo.Outer"]);

        let outer = summaries.last().expect("outer summary");
        assert_eq!(outer.superclass.as_deref(), Some("other.Base"));
        assert_eq!(outer.field("inner").expect("field").ty, "demo.Outer$Inner");
        assert_eq!(outer.nested, vec!["Inner".to_string()]);
    }

    #[test]
    fn qualifies_same_unit_types_and_core_names() {
        let a = build::class(
            "A",
            vec![
                build::field(Modifiers::private(), TypeRef::named("B"), "b", None),
                build::field(Modifiers::private(), TypeRef::named("String"), "s", None),
            ],
        );
        let b = build::class("B", vec![]);
        let unit = build::unit(Some("demo"), vec![a, b]);

        let summaries = collect_unit(&unit);
        let a = summaries
            .iter()
            .find(|s| s.name.as_str() == "demo.A")
            .expect("summary for A");
        assert_eq!(a.field("b").expect("field").ty, "demo.B");
        assert_eq!(a.field("s").expect("field").ty, "java.lang.String");
    }
}
