//! The per-unit rewrite session: all mutable state of one file's rewrite,
//! created for the unit and dropped with it.

use std::collections::HashMap;

use tempo_core::{PackageName, QualifiedName, TypeName};
use tempo_resolve::{collect_unit, SymbolResolver, SymbolTable};
use tempo_syntax::{
    CompilationUnit, Expr, ExprKind, ForInit, Import, Member, Stmt, TypeDecl, TypeRef,
};
use tempo_types::{TypeAndOwner, TypeId, TypeTable};
use tracing::{debug, info};

use crate::emitter;
use crate::error::TransformError;
use crate::names;
use crate::rules::HandlerRegistry;
use crate::tables::{FieldAccessTable, Fixup, PendingFixups};

/// Per-run configuration threaded through every handler call.
#[derive(Clone, Debug, Default)]
pub struct RewriteOptions {
    /// Rewrite static private fields too (off by default; a static field's
    /// accessor takes the checkpoint as an explicit leading argument).
    pub rewrite_static_fields: bool,
    /// Package prefix applied to the rewritten unit.
    pub package_prefix: Option<PackageName>,
    /// Classes known to be cross-analyzed before the walk starts, normally
    /// every class of every unit in the batch.
    pub known_cross_analyzed: Vec<String>,
}

/// What a finished rewrite reports back to the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Fully qualified names of declarations that gained the protocol.
    pub rewritten_classes: Vec<TypeName>,
    /// The cross-analysis set as of the end of this unit.
    pub cross_analyzed: Vec<String>,
}

/// Shared state the walker and every rule operate on.
pub(crate) struct SessionCore {
    pub types: TypeTable,
    pub resolver: SymbolResolver,
    pub symbols: SymbolTable,
    pub options: RewriteOptions,
    pub tables: HashMap<String, FieldAccessTable>,
    pub fixups: PendingFixups,
    pub construction_sites: usize,
    pub rewritten: Vec<TypeName>,
}

impl SessionCore {
    pub fn add_cross_analyzed(&mut self, name: &str) {
        if self.resolver.cross_analysis.add(name) {
            self.fixups.promote(name);
        }
    }

    pub fn is_rewritten(&self, name: &str) -> bool {
        self.resolver.cross_analysis.contains(name)
    }

    pub fn table_for(&mut self, class: &str) -> &mut FieldAccessTable {
        self.tables.entry(class.to_string()).or_default()
    }

    pub fn resolve_simple(
        &mut self,
        name: &str,
        owner: Option<&str>,
    ) -> Result<Option<TypeAndOwner>, TransformError> {
        Ok(self
            .resolver
            .resolve_name(&mut self.types, &self.symbols, name, owner)?)
    }

    pub fn resolve_from_class(
        &mut self,
        class: &str,
        name: &str,
    ) -> Result<Option<TypeAndOwner>, TransformError> {
        Ok(self
            .resolver
            .resolve_from_class(&mut self.types, &self.symbols, class, name)?)
    }

    pub fn resolve_method(
        &mut self,
        owner: Option<&str>,
        name: &str,
        args: &[TypeId],
    ) -> Result<Option<TypeAndOwner>, TransformError> {
        Ok(self
            .resolver
            .resolve_method(&mut self.types, &self.symbols, owner, name, args)?)
    }

    pub fn open_class_scope(&mut self, class: &TypeName) {
        self.resolver
            .open_class_scope(&mut self.types, &self.symbols, class);
    }

    /// Resolve a source type reference to an interned type.
    pub fn resolve_type_ref(&mut self, ty: &TypeRef) -> Result<TypeId, TransformError> {
        match ty {
            TypeRef::Primitive(name) => Ok(self.types.intern(name)),
            TypeRef::Named(name) => {
                if let Some(class) = self.resolver.lookup_class(&self.symbols, name.as_str()) {
                    return Ok(self.types.intern(class.as_str()));
                }
                // A dotted name not in the provider is a hard failure: the
                // walker cannot classify members of a class it cannot load.
                Err(TransformError::ClassResolution(name.as_str().to_string()))
            }
            TypeRef::Array(elem) => {
                let inner = self.resolve_type_ref(elem)?;
                Ok(self.types.add_dimension(inner))
            }
        }
    }

    /// The source-form type reference for an interned type.
    pub fn type_ref_of(&self, ty: TypeId) -> TypeRef {
        let display = self.types.display_name(ty);
        let dims = display.matches("[]").count();
        let element = &display[..display.len() - 2 * dims];
        let mut out = if tempo_types::PrimitiveKind::by_name(element).is_some() {
            TypeRef::primitive(element)
        } else {
            TypeRef::named(element)
        };
        for _ in 0..dims {
            out = out.array();
        }
        out
    }

    /// Fully qualified element class of a field type, when it is an object
    /// type.
    pub fn element_class_of(&self, ty: &TypeRef) -> Option<String> {
        match ty.element() {
            TypeRef::Named(name) => Some(
                self.resolver
                    .lookup_class(&self.symbols, name.as_str())
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| name.as_str().to_string()),
            ),
            _ => None,
        }
    }
}

/// One compilation unit's rewrite. Nothing in here outlives the unit.
pub struct RewriteSession {
    pub(crate) core: SessionCore,
    pub(crate) handlers: HandlerRegistry,
}

impl RewriteSession {
    #[must_use]
    pub fn new(symbols: SymbolTable, options: RewriteOptions) -> Self {
        let mut resolver = SymbolResolver::new();
        for name in &options.known_cross_analyzed {
            resolver.cross_analysis.add(name);
        }
        RewriteSession {
            core: SessionCore {
                types: TypeTable::new(),
                resolver,
                symbols,
                options,
                tables: HashMap::new(),
                fixups: PendingFixups::new(),
                construction_sites: 0,
                rewritten: Vec::new(),
            },
            handlers: HandlerRegistry::standard(),
        }
    }

    /// Rewrite `unit` in place. Fail-closed: on error the caller discards
    /// the unit, nothing partial is reported.
    pub fn rewrite(&mut self, unit: &mut CompilationUnit) -> Result<RewriteOutcome, TransformError> {
        tempo_syntax::validate(unit)?;

        // The unit's own summaries win over anything stale in the table.
        for summary in collect_unit(unit) {
            self.core.symbols.insert(summary);
        }
        self.core.resolver.begin_unit(unit);

        self.walk_unit(unit)?;
        self.apply_due_fixups(unit);
        self.finish_unit(unit);

        let outcome = RewriteOutcome {
            rewritten_classes: self.core.rewritten.clone(),
            cross_analyzed: self.core.resolver.cross_analysis.iter().map(str::to_string).collect(),
        };
        info!(
            rewritten = outcome.rewritten_classes.len(),
            "unit rewrite finished"
        );
        Ok(outcome)
    }

    /// Grow the cross-analysis set from outside the walk; deferred fixups
    /// keyed by `name` become due and are applied on the next
    /// [`RewriteSession::apply_due_fixups`].
    pub fn add_cross_analyzed(&mut self, name: &str) {
        self.core.add_cross_analyzed(name);
    }

    /// Deferred edits still waiting for `name` to enter the set.
    #[must_use]
    pub fn pending_fixups_for(&self, name: &str) -> usize {
        self.core.fixups.pending_for(name)
    }

    /// Apply every fixup whose key has entered the cross-analysis set.
    pub fn apply_due_fixups(&mut self, unit: &mut CompilationUnit) {
        let due = self.core.fixups.take_due();
        if due.is_empty() {
            return;
        }
        debug!(count = due.len(), "applying deferred fixups");
        for fixup in due {
            match fixup {
                Fixup::AppendCheckpointArg { site } => {
                    let mut counter = 0usize;
                    append_checkpoint_arg(unit, site, &mut counter);
                }
                Fixup::AddRestoreSuperCall { class } => {
                    if let Some(decl) = find_decl(unit, &class, self.core.resolver.current_package())
                    {
                        emitter::demote_to_subclass(&mut decl.members);
                    }
                }
                Fixup::AddAccessorPropagation { class, field } => {
                    if let Some(decl) = find_decl(unit, &class, self.core.resolver.current_package())
                    {
                        emitter::add_accessor_propagation(&mut decl.members, &field);
                    }
                }
            }
        }
    }

    fn finish_unit(&mut self, unit: &mut CompilationUnit) {
        if !self.core.rewritten.is_empty() {
            for ty in [
                names::CHECKPOINT_TYPE,
                names::CHECKPOINT_RECORD_TYPE,
                names::FIELD_RECORD_TYPE,
                names::ROLLBACKABLE_TYPE,
            ] {
                let name = QualifiedName::new(format!("{}.{ty}", names::RUNTIME_PACKAGE));
                if !unit.imports.iter().any(|i| i.name == name) {
                    unit.imports.push(Import {
                        name,
                        on_demand: false,
                    });
                }
            }
        }

        if let Some(prefix) = &self.core.options.package_prefix {
            let package = unit.package.take().unwrap_or_default();
            unit.package = Some(package.prefixed(prefix));
        }
    }
}

/// Find a named declaration (top-level or member-nested) by binary name.
fn find_decl<'a>(
    unit: &'a mut CompilationUnit,
    binary: &str,
    package: &str,
) -> Option<&'a mut TypeDecl> {
    for decl in &mut unit.types {
        let top = if package.is_empty() {
            decl.name.as_str().to_string()
        } else {
            format!("{package}.{}", decl.name)
        };
        if let Some(found) = find_in_decl(decl, &top, binary) {
            return Some(found);
        }
    }
    None
}

fn find_in_decl<'a>(
    decl: &'a mut TypeDecl,
    binary_of_decl: &str,
    target: &str,
) -> Option<&'a mut TypeDecl> {
    if binary_of_decl == target {
        return Some(decl);
    }
    for member in &mut decl.members {
        if let Member::Nested(nested) = member {
            let nested_binary = format!("{binary_of_decl}${}", nested.name);
            if let Some(found) = find_in_decl(nested, &nested_binary, target) {
                return Some(found);
            }
        }
    }
    None
}

/// Mirror of the walker's traversal order, counting construction sites in
/// post-order, used to locate the site a deferred fixup recorded.
/// Synthesized members (names starting with `$`) are skipped, exactly as
/// they were never walked.
fn append_checkpoint_arg(unit: &mut CompilationUnit, target: usize, counter: &mut usize) {
    for decl in &mut unit.types {
        visit_decl(decl, target, counter);
    }
}

fn visit_decl(decl: &mut TypeDecl, target: usize, counter: &mut usize) {
    let order = tempo_syntax::sorted_member_indices(&decl.members);
    for idx in order {
        visit_member(&mut decl.members[idx], target, counter);
    }
}

fn visit_member(member: &mut Member, target: usize, counter: &mut usize) {
    match member {
        Member::Field(field) => {
            if field.name.as_str().starts_with('$') {
                return;
            }
            if let Some(init) = &mut field.init {
                visit_expr(init, target, counter);
            }
        }
        Member::Method(method) => {
            if method.name.as_str().starts_with('$') {
                return;
            }
            if let Some(body) = &mut method.body {
                for stmt in &mut body.stmts {
                    visit_stmt(stmt, target, counter);
                }
            }
        }
        Member::Constructor(ctor) => {
            for stmt in &mut ctor.body.stmts {
                visit_stmt(stmt, target, counter);
            }
        }
        Member::Nested(nested) => visit_decl(nested, target, counter),
        Member::Initializer(init) => {
            for stmt in &mut init.body.stmts {
                visit_stmt(stmt, target, counter);
            }
        }
    }
}

fn visit_stmt(stmt: &mut Stmt, target: usize, counter: &mut usize) {
    match stmt {
        Stmt::Block(block) => {
            for s in &mut block.stmts {
                visit_stmt(s, target, counter);
            }
        }
        Stmt::Local(local) => {
            if let Some(init) = &mut local.init {
                visit_expr(init, target, counter);
            }
        }
        Stmt::Expr(expr) | Stmt::Throw(expr) => visit_expr(expr, target, counter),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visit_expr(cond, target, counter);
            visit_stmt(then_branch, target, counter);
            if let Some(else_branch) = else_branch {
                visit_stmt(else_branch, target, counter);
            }
        }
        Stmt::While { cond, body } => {
            visit_expr(cond, target, counter);
            visit_stmt(body, target, counter);
        }
        Stmt::DoWhile { body, cond } => {
            visit_stmt(body, target, counter);
            visit_expr(cond, target, counter);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for fi in init {
                match fi {
                    ForInit::Local(local) => {
                        if let Some(e) = &mut local.init {
                            visit_expr(e, target, counter);
                        }
                    }
                    ForInit::Expr(e) => visit_expr(e, target, counter),
                }
            }
            if let Some(cond) = cond {
                visit_expr(cond, target, counter);
            }
            for e in update {
                visit_expr(e, target, counter);
            }
            visit_stmt(body, target, counter);
        }
        Stmt::ForEach { iterable, body, .. } => {
            visit_expr(iterable, target, counter);
            visit_stmt(body, target, counter);
        }
        Stmt::Switch { selector, arms } => {
            visit_expr(selector, target, counter);
            for arm in arms {
                for label in arm.labels.iter_mut().flatten() {
                    visit_expr(label, target, counter);
                }
                for s in &mut arm.stmts {
                    visit_stmt(s, target, counter);
                }
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            for s in &mut body.stmts {
                visit_stmt(s, target, counter);
            }
            for catch in catches {
                for s in &mut catch.body.stmts {
                    visit_stmt(s, target, counter);
                }
            }
            if let Some(finally) = finally {
                for s in &mut finally.stmts {
                    visit_stmt(s, target, counter);
                }
            }
        }
        Stmt::Return(expr) => {
            if let Some(expr) = expr {
                visit_expr(expr, target, counter);
            }
        }
        Stmt::Labeled { stmt, .. } => visit_stmt(stmt, target, counter),
        Stmt::ThisConstructorCall(args) | Stmt::SuperConstructorCall(args) => {
            for arg in args {
                visit_expr(arg, target, counter);
            }
        }
        Stmt::LocalType(decl) => visit_decl(decl, target, counter),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => {}
    }
}

fn visit_expr(expr: &mut Expr, target: usize, counter: &mut usize) {
    match &mut expr.kind {
        ExprKind::Name { .. }
        | ExprKind::This { .. }
        | ExprKind::Literal { .. }
        | ExprKind::SuperFieldAccess { .. } => {}
        ExprKind::FieldAccess { object, .. } => visit_expr(object, target, counter),
        ExprKind::ArrayAccess { array, index } => {
            visit_expr(array, target, counter);
            visit_expr(index, target, counter);
        }
        ExprKind::ArrayCreation { dims, init, .. } => {
            for dim in dims {
                visit_expr(dim, target, counter);
            }
            if let Some(values) = init {
                for value in values {
                    visit_expr(value, target, counter);
                }
            }
        }
        ExprKind::ArrayInit { values } => {
            for value in values {
                visit_expr(value, target, counter);
            }
        }
        ExprKind::New { args, body, .. } => {
            for arg in args.iter_mut() {
                visit_expr(arg, target, counter);
            }
            if let Some(members) = body {
                let order = tempo_syntax::sorted_member_indices(members);
                for idx in order {
                    visit_member(&mut members[idx], target, counter);
                }
            }
            // Post-order: this construction site gets the next index.
            if *counter == target && body.is_none() {
                args.push(tempo_syntax::build::name(names::CHECKPOINT_FIELD));
            }
            *counter += 1;
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                visit_expr(receiver, target, counter);
            }
            for arg in args {
                visit_expr(arg, target, counter);
            }
        }
        ExprKind::SuperCall { args, .. } => {
            for arg in args {
                visit_expr(arg, target, counter);
            }
        }
        ExprKind::Assign { lhs, rhs, .. } => {
            visit_expr(lhs, target, counter);
            visit_expr(rhs, target, counter);
        }
        ExprKind::Unary { operand, .. } | ExprKind::IncDec { operand, .. } => {
            visit_expr(operand, target, counter);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, target, counter);
            visit_expr(rhs, target, counter);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            visit_expr(cond, target, counter);
            visit_expr(then_expr, target, counter);
            visit_expr(else_expr, target, counter);
        }
        ExprKind::Cast { expr: inner, .. } | ExprKind::InstanceOf { expr: inner, .. } => {
            visit_expr(inner, target, counter);
        }
        ExprKind::Paren { inner } => visit_expr(inner, target, counter),
    }
}
