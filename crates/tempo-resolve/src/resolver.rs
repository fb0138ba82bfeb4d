//! Name and method resolution against the scope stack, the enclosing class
//! chain, and the class metadata provider.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::trace;

use tempo_core::TypeName;
use tempo_syntax::CompilationUnit;
use tempo_types::{dimensions, TypeAndOwner, TypeId, TypeTable, INCOMPATIBLE};

use crate::metadata::{ClassMetadataProvider, MetadataGraph, OBJECT};
use crate::scopes::{ClassContextStack, CrossAnalysisSet, ScopeStack};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot resolve class `{0}`")]
    UnknownClass(String),
    #[error("cannot resolve `{name}` in `{scope}`")]
    UnresolvedName { scope: String, name: String },
    #[error("no applicable overload of `{name}` on `{class}`")]
    NoSuchMethod { class: String, name: String },
}

/// Per-traversal resolver state. Created when a unit's walk starts and
/// dropped with it; nothing survives into the next unit.
#[derive(Debug, Default)]
pub struct SymbolResolver {
    pub scopes: ScopeStack,
    pub classes: ClassContextStack,
    pub cross_analysis: CrossAnalysisSet,
    current_package: String,
    imports: HashMap<String, String>,
    on_demand: Vec<String>,
}

impl SymbolResolver {
    #[must_use]
    pub fn new() -> Self {
        SymbolResolver::default()
    }

    /// Record the unit's package and imports before walking its types.
    pub fn begin_unit(&mut self, unit: &CompilationUnit) {
        self.current_package = unit
            .package
            .as_ref()
            .map(|p| p.to_dotted())
            .unwrap_or_default();
        for import in &unit.imports {
            if import.on_demand {
                self.on_demand.push(import.name.as_str().to_string());
            } else {
                self.imports.insert(
                    import.name.simple_name().to_string(),
                    import.name.as_str().to_string(),
                );
            }
        }
    }

    #[must_use]
    pub fn current_package(&self) -> &str {
        &self.current_package
    }

    /// Open the scope holding a class's declared and inherited fields, most
    /// derived declarations first.
    pub fn open_class_scope(
        &mut self,
        types: &mut TypeTable,
        provider: &dyn ClassMetadataProvider,
        class: &TypeName,
    ) {
        self.scopes.push_class(class.clone());
        for ancestor in bfs_ancestry(provider, class.as_str()) {
            let Some(summary) = provider.summary(&ancestor) else {
                continue;
            };
            let owner = TypeName::new(ancestor.clone());
            for field in &summary.fields {
                let ty = types.intern(&field.ty);
                self.scopes.declare_field(field.name.as_str(), ty, owner.clone());
            }
        }
    }

    /// Resolve a (possibly qualified) name. `explicit_owner` is the class of
    /// the receiver for `expr.name` forms; without it the full resolution
    /// order applies: lexical scopes, classes reachable by simple name,
    /// inherited fields, then each still-open enclosing declaration.
    pub fn resolve_name(
        &self,
        types: &mut TypeTable,
        provider: &dyn ClassMetadataProvider,
        name: &str,
        explicit_owner: Option<&str>,
    ) -> Result<Option<TypeAndOwner>, ResolveError> {
        if let Some(owner) = explicit_owner {
            return self.resolve_from_class(types, provider, owner, name);
        }

        if self.classes.is_empty() {
            return Ok(None);
        }

        if let Some((ty, owner)) = self.scopes.lookup(name) {
            let owner = owner.map(|o| types.intern(o.as_str()));
            return Ok(Some(TypeAndOwner { ty, owner }));
        }

        if let Some(class) = self.lookup_class(provider, name) {
            return Ok(Some(TypeAndOwner::unowned(types.intern(class.as_str()))));
        }

        if let Some(current) = self.classes.current_class() {
            let current = current.clone();
            if let Some(found) = self.resolve_from_class(types, provider, current.as_str(), name)? {
                return Ok(Some(found));
            }
        }

        // Still-open enclosing declarations, innermost out.
        for context in self.classes.innermost_out().skip(1) {
            if let Some(found) =
                self.resolve_from_class(types, provider, context.name.as_str(), name)?
            {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// Resolve a field or nested-class name against one class and its
    /// ancestry.
    pub fn resolve_from_class(
        &self,
        types: &mut TypeTable,
        provider: &dyn ClassMetadataProvider,
        class: &str,
        name: &str,
    ) -> Result<Option<TypeAndOwner>, ResolveError> {
        // The only member an array type has is `length`.
        if dimensions(class) > 0 {
            if name == "length" {
                let int_t = types.intern("int");
                let owner = types.intern(class);
                return Ok(Some(TypeAndOwner::owned(int_t, owner)));
            }
            return Ok(None);
        }

        if provider.summary(class).is_none() {
            return Err(ResolveError::UnknownClass(class.to_string()));
        }

        for ancestor in bfs_ancestry(provider, class) {
            let Some(summary) = provider.summary(&ancestor) else {
                continue;
            };
            if let Some(field) = summary.field(name) {
                let ty = types.intern(&field.ty);
                let owner = types.intern(&ancestor);
                return Ok(Some(TypeAndOwner::owned(ty, owner)));
            }
            if summary.nested.iter().any(|n| n == name) {
                let nested = summary.name.nested(name);
                return Ok(Some(TypeAndOwner::unowned(types.intern(nested.as_str()))));
            }
        }

        Ok(None)
    }

    /// Resolve a class reachable by simple (or partially qualified) name
    /// from the current position.
    #[must_use]
    pub fn lookup_class(
        &self,
        provider: &dyn ClassMetadataProvider,
        partial: &str,
    ) -> Option<TypeName> {
        let (simple, rest) = match partial.split_once('.') {
            Some((simple, rest)) => (simple, Some(rest)),
            None => (partial, None),
        };

        let mut result: Option<TypeName> = None;

        // Enclosing declarations, innermost out: the declaration itself,
        // its local classes, then its member classes.
        for context in self.classes.innermost_out() {
            if context.name.simple_name() == simple {
                result = Some(context.name.clone());
                break;
            }
            if let Some(local) = context.local_class(simple) {
                result = Some(local.clone());
                break;
            }
            if let Some(summary) = provider.summary(context.name.as_str()) {
                if summary.nested.iter().any(|n| n == simple) {
                    result = Some(context.name.nested(simple));
                    break;
                }
            }
        }

        // Explicit imports.
        if result.is_none() {
            if let Some(fq) = self.imports.get(simple) {
                result = Some(TypeName::new(fq.clone()));
            }
        }

        // Package-visible and on-demand lookups for the first segment.
        if result.is_none() {
            let mut candidates = Vec::new();
            if !self.current_package.is_empty() {
                candidates.push(format!("{}.{simple}", self.current_package));
            }
            candidates.push(format!("java.lang.{simple}"));
            for package in &self.on_demand {
                candidates.push(format!("{package}.{simple}"));
            }
            result = candidates
                .into_iter()
                .find(|c| provider.summary(c).is_some())
                .map(TypeName::new);
        }

        let resolved = result.and_then(|result| match rest {
            None => provider.summary(result.as_str()).is_some().then_some(result),
            Some(rest) => {
                // `Outer.Inner` written with dots resolves to the binary
                // nested name.
                let binary = format!("{}${}", result, rest.replace('.', "$"));
                provider.summary(&binary).is_some().then(|| TypeName::new(binary))
            }
        });
        if resolved.is_some() {
            return resolved;
        }

        // Fall back to the name exactly as written.
        provider
            .summary(partial)
            .is_some()
            .then(|| TypeName::new(partial.to_string()))
    }

    /// Overload resolution: among same-name, same-arity candidates the
    /// lowest summed compatibility rating wins, first found breaks ties,
    /// and an exact match (total 0) stops the search.
    pub fn resolve_method(
        &self,
        types: &mut TypeTable,
        provider: &dyn ClassMetadataProvider,
        owner: Option<&str>,
        name: &str,
        args: &[TypeId],
    ) -> Result<Option<TypeAndOwner>, ResolveError> {
        let start: Vec<String> = match owner {
            Some(owner) => vec![normalize_owner(owner)],
            None => {
                let mut chain: Vec<String> = Vec::new();
                for context in self.classes.innermost_out() {
                    chain.push(context.name.as_str().to_string());
                }
                chain
            }
        };

        for class in &start {
            if let Some(found) = self.method_in_hierarchy(types, provider, class, name, args)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn method_in_hierarchy(
        &self,
        types: &mut TypeTable,
        provider: &dyn ClassMetadataProvider,
        class: &str,
        name: &str,
        args: &[TypeId],
    ) -> Result<Option<TypeAndOwner>, ResolveError> {
        if provider.summary(class).is_none() {
            return Err(ResolveError::UnknownClass(class.to_string()));
        }

        let mut best: Option<(i32, TypeId, TypeId)> = None;

        'classes: for ancestor in bfs_ancestry(provider, class) {
            let Some(summary) = provider.summary(&ancestor) else {
                continue;
            };
            for method in &summary.methods {
                if method.name != name || method.params.len() != args.len() {
                    continue;
                }

                let mut total = 0i32;
                for (arg, formal) in args.iter().zip(&method.params) {
                    let formal = types.intern(formal);
                    let rating =
                        match types.compatibility(*arg, formal, &MetadataGraph(provider)) {
                            Ok(rating) => rating,
                            Err(tempo_types::TypeError::UnknownClass(c)) => {
                                return Err(ResolveError::UnknownClass(c))
                            }
                            Err(tempo_types::TypeError::NotAClass(c)) => {
                                return Err(ResolveError::UnknownClass(c))
                            }
                        };
                    if rating == INCOMPATIBLE {
                        total = INCOMPATIBLE;
                        break;
                    }
                    total += rating;
                }
                if total == INCOMPATIBLE {
                    continue;
                }

                let better = match &best {
                    None => true,
                    Some((best_total, _, _)) => total < *best_total,
                };
                if better {
                    let return_type = types.intern(&method.return_type);
                    let owner_ty = types.intern(&ancestor);
                    best = Some((total, return_type, owner_ty));
                    if total == 0 {
                        break 'classes;
                    }
                }
            }
        }

        trace!(class, name, found = best.is_some(), "method resolution");
        Ok(best.map(|(_, ty, owner)| TypeAndOwner::owned(ty, owner)))
    }
}

/// Array receivers expose `Object`'s methods.
fn normalize_owner(owner: &str) -> String {
    if dimensions(owner) > 0 {
        OBJECT.to_string()
    } else {
        owner.to_string()
    }
}

/// Breadth-first ancestry: the class itself, then at each level the
/// superclass followed by the interfaces reached so far. Classes the
/// provider does not know expand to `Object` only.
#[must_use]
pub(crate) fn bfs_ancestry(provider: &dyn ClassMetadataProvider, start: &str) -> Vec<String> {
    let mut order = Vec::new();
    let mut handled: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(start.to_string());

    while let Some(class) = queue.pop_front() {
        if !handled.insert(class.clone()) {
            continue;
        }
        order.push(class.clone());

        match provider.summary(&class) {
            Some(summary) => {
                match (&summary.superclass, class.as_str()) {
                    (_, OBJECT) => {}
                    (Some(superclass), _) => queue.push_back(superclass.clone()),
                    (None, _) if summary.kind == crate::metadata::ClassKind::Class => {
                        queue.push_back(OBJECT.to_string());
                    }
                    (None, _) => {}
                }
                for iface in &summary.interfaces {
                    queue.push_back(iface.clone());
                }
            }
            None if class != OBJECT => queue.push_back(OBJECT.to_string()),
            None => {}
        }
    }

    order
}
