//! The rewrite rules and the ordered registry that dispatches walk events
//! to them. Each rule is an independent value; a rule answers an event with
//! an optional replacement node, and the registry splices the replacement
//! into the slot the walker is rebuilding.

use std::collections::HashMap;

use tempo_core::{Name, TypeName, Visibility};
use tempo_resolve::ClassMetadataProvider;
use tempo_syntax::build;
use tempo_syntax::{AssignOp, BinaryOp, Expr, ExprKind, Literal, Member, TypeRef};
use tempo_types::{PrimitiveKind, TypeAndOwner, TypeId};
use tracing::{debug, trace};

use crate::emitter::{self, DeclInfo};
use crate::error::TransformError;
use crate::names;
use crate::session::SessionCore;
use crate::tables::Fixup;

pub(crate) struct HandlerRegistry {
    rules: Vec<Rule>,
}

enum Rule {
    Assignment(AssignmentRule),
    Alias(AliasRule),
    Construction(ConstructionRule),
    Class(ClassRule),
}

impl HandlerRegistry {
    pub fn standard() -> Self {
        HandlerRegistry {
            rules: vec![
                Rule::Assignment(AssignmentRule),
                Rule::Alias(AliasRule),
                Rule::Construction(ConstructionRule),
                Rule::Class(ClassRule),
            ],
        }
    }

    pub fn on_assignment(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<(), TransformError> {
        for rule in &mut self.rules {
            if let Rule::Assignment(rule) = rule {
                if let Some(replacement) = rule.assignment(core, expr)? {
                    *expr = replacement;
                }
            }
        }
        Ok(())
    }

    pub fn on_inc_dec(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<(), TransformError> {
        for rule in &mut self.rules {
            if let Rule::Assignment(rule) = rule {
                if let Some(replacement) = rule.inc_dec(core, expr)? {
                    *expr = replacement;
                }
            }
        }
        Ok(())
    }

    pub fn on_alias_site(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<(), TransformError> {
        for rule in &mut self.rules {
            if let Rule::Alias(rule) = rule {
                if let Some(replacement) = rule.alias(core, expr)? {
                    *expr = replacement;
                }
            }
        }
        Ok(())
    }

    pub fn on_construction(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
        site: usize,
    ) -> Result<(), TransformError> {
        for rule in &mut self.rules {
            if let Rule::Construction(rule) = rule {
                rule.construction(core, expr, site)?;
            }
        }
        Ok(())
    }

    pub fn on_class_exit(
        &mut self,
        core: &mut SessionCore,
        binary: &TypeName,
        members: &mut Vec<Member>,
        interfaces: Option<&mut Vec<TypeRef>>,
    ) -> Result<(), TransformError> {
        let mut interfaces = interfaces;
        for rule in &mut self.rules {
            if let Rule::Class(rule) = rule {
                rule.class_exit(core, binary, members, interfaces.as_deref_mut())?;
            }
        }
        Ok(())
    }
}

/// An eligible mutation target: a private field, directly declared on a
/// class being rewritten, addressed through `arity` leading index
/// expressions.
struct Target {
    field: String,
    owner_class: String,
    owner_id: TypeId,
    arity: usize,
    element_ty: TypeId,
    is_static: bool,
}

/// Read-only eligibility check on a left-hand side (or aliased) expression.
fn eligible_target(core: &SessionCore, expr: &Expr, for_backup: bool) -> Option<Target> {
    let mut arity = 0usize;
    let mut cur = expr.unwrap_parens();
    while let ExprKind::ArrayAccess { array, .. } = &cur.kind {
        arity += 1;
        cur = array.unwrap_parens();
    }

    let field = match &cur.kind {
        ExprKind::Name { name } if name.is_simple() => name.as_str(),
        ExprKind::FieldAccess { name, .. } => name.as_str(),
        // Inherited fields accessed through `super` are never eligible.
        _ => return None,
    };
    let resolved = cur.resolved?;
    let owner_id = resolved.owner?;
    let owner_class = core.types.name(owner_id).to_string();

    if !core.is_rewritten(&owner_class) {
        return None;
    }
    let summary = core.symbols.summary(&owner_class)?;
    let declared = summary.field(field)?;
    if declared.modifiers.visibility != Visibility::Private {
        return None;
    }
    if declared.modifiers.is_static && !core.options.rewrite_static_fields {
        return None;
    }
    // A final field is only mutable at index granularity; a final array is
    // still backup-eligible as a whole.
    if declared.modifiers.is_final && !for_backup && arity == 0 {
        return None;
    }

    Some(Target {
        field: field.to_string(),
        owner_class,
        owner_id,
        arity,
        element_ty: expr.unwrap_parens().resolved?.ty,
        is_static: declared.modifiers.is_static,
    })
}

/// Consume a left-hand side, yielding the receiver and the index
/// expressions in left-to-right order.
fn dissect(expr: Expr, indices: &mut Vec<Expr>) -> Option<Expr> {
    match expr.kind {
        ExprKind::Paren { inner } => dissect(*inner, indices),
        ExprKind::ArrayAccess { array, index } => {
            let receiver = dissect(*array, indices);
            indices.push(*index);
            receiver
        }
        ExprKind::Name { .. } => None,
        ExprKind::FieldAccess { object, .. } => Some(*object),
        _ => None,
    }
}

fn accessor_call(
    receiver: Option<Expr>,
    name: String,
    args: Vec<Expr>,
    resolved: TypeAndOwner,
) -> Expr {
    let mut call = Expr::new(ExprKind::Call {
        receiver: receiver.map(Box::new),
        name: Name::from(name.as_str()),
        args,
    });
    call.resolved = Some(resolved);
    call
}

/// Mutation interception: every eligible assignment-like construct becomes
/// a call to a checkpoint-aware accessor, and the access is recorded so the
/// right overloads are synthesized at class exit.
struct AssignmentRule;

impl AssignmentRule {
    fn assignment(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<Option<Expr>, TransformError> {
        let ExprKind::Assign { op, lhs, .. } = &expr.kind else {
            return Ok(None);
        };
        let op = *op;
        let Some(target) = eligible_target(core, lhs, false) else {
            return Ok(None);
        };

        // `+=` on a textual field is concatenation; it goes through the
        // plain accessor with an explicit concat.
        let string_concat =
            op == AssignOp::Add && core.types.is_string(target.element_ty);

        if op.is_compound() && !string_concat {
            core.table_for(&target.owner_class)
                .record_compound_write(&target.field, target.arity);
        } else {
            core.table_for(&target.owner_class)
                .record_write(&target.field, target.arity);
        }
        trace!(
            class = %target.owner_class,
            field = %target.field,
            arity = target.arity,
            compound = op.is_compound(),
            "intercepted mutation"
        );

        let ExprKind::Assign { lhs, rhs, .. } =
            std::mem::replace(&mut expr.kind, placeholder())
        else {
            return Ok(None);
        };

        let mut indices = Vec::new();
        let receiver = dissect(*lhs, &mut indices);
        let field_read = rebuild_read(&receiver, &target, &indices);

        let mut args = Vec::new();
        if target.is_static {
            args.push(build::name(names::CHECKPOINT_FIELD));
        }
        args.extend(indices);

        let accessor = if op.is_compound() && !string_concat {
            args.push(build::int(names::operator_selector(op)));
            args.push(*rhs);
            names::special_accessor(&target.field)
        } else if string_concat {
            args.push(build::binary(BinaryOp::Add, field_read, *rhs));
            names::assign_accessor(&target.field)
        } else {
            args.push(adjust_rhs(core, target.element_ty, *rhs));
            names::assign_accessor(&target.field)
        };

        Ok(Some(accessor_call(
            receiver,
            accessor,
            args,
            TypeAndOwner::owned(target.element_ty, target.owner_id),
        )))
    }

    fn inc_dec(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<Option<Expr>, TransformError> {
        let ExprKind::IncDec { operand, .. } = &expr.kind else {
            return Ok(None);
        };
        let Some(target) = eligible_target(core, operand, false) else {
            return Ok(None);
        };

        core.table_for(&target.owner_class)
            .record_compound_write(&target.field, target.arity);

        let ExprKind::IncDec { op, operand } = std::mem::replace(&mut expr.kind, placeholder())
        else {
            return Ok(None);
        };

        let dummy = (*operand).clone();
        let mut indices = Vec::new();
        let receiver = dissect(*operand, &mut indices);

        let mut args = Vec::new();
        if target.is_static {
            args.push(build::name(names::CHECKPOINT_FIELD));
        }
        args.extend(indices);
        args.push(build::int(names::inc_dec_selector(op)));
        args.push(dummy);

        Ok(Some(accessor_call(
            receiver,
            names::special_accessor(&target.field),
            args,
            TypeAndOwner::owned(target.element_ty, target.owner_id),
        )))
    }
}

/// Aliasing interception: an array value escaping through a call argument,
/// a return, or an initializer is routed through the backup accessor so the
/// escape is captured by the protocol.
struct AliasRule;

impl AliasRule {
    fn alias(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
    ) -> Result<Option<Expr>, TransformError> {
        let Some(resolved) = expr.resolved else {
            return Ok(None);
        };
        if !core.types.is_array(resolved.ty) {
            return Ok(None);
        }
        let Some(target) = eligible_target(core, expr, true) else {
            return Ok(None);
        };

        core.table_for(&target.owner_class)
            .record_read(&target.field, target.arity);
        trace!(
            class = %target.owner_class,
            field = %target.field,
            "intercepted array alias"
        );

        let consumed = std::mem::replace(expr, Expr::new(placeholder()));
        let mut indices = Vec::new();
        let receiver = dissect(consumed, &mut indices);

        let mut args = Vec::new();
        if target.is_static {
            args.push(build::name(names::CHECKPOINT_FIELD));
        }
        args.extend(indices);

        Ok(Some(accessor_call(
            receiver,
            names::backup_accessor(&target.field),
            args,
            resolved,
        )))
    }
}

/// Constructor threading: construction sites of cross-analyzed types gain a
/// trailing checkpoint argument; sites whose target is not yet known to be
/// cross-analyzed are deferred.
struct ConstructionRule;

impl ConstructionRule {
    fn construction(
        &mut self,
        core: &mut SessionCore,
        expr: &mut Expr,
        site: usize,
    ) -> Result<(), TransformError> {
        let Some(resolved) = expr.resolved else {
            return Ok(());
        };
        let class = core.types.name(resolved.ty).to_string();
        let ExprKind::New { args, body, .. } = &mut expr.kind else {
            return Ok(());
        };
        // Anonymous bodies have no declared constructor to delegate to.
        if body.is_some() {
            return Ok(());
        }

        if core.is_rewritten(&class) {
            args.push(build::name(names::CHECKPOINT_FIELD));
        } else {
            core.fixups
                .defer(&class, Fixup::AppendCheckpointArg { site });
        }
        Ok(())
    }
}

/// Declaration finalization: drain the access table and synthesize the
/// protocol members.
struct ClassRule;

impl ClassRule {
    fn class_exit(
        &mut self,
        core: &mut SessionCore,
        binary: &TypeName,
        members: &mut Vec<Member>,
        interfaces: Option<&mut Vec<TypeRef>>,
    ) -> Result<(), TransformError> {
        let table = core.tables.remove(binary.as_str()).unwrap_or_default();

        let superclass = core
            .symbols
            .summary(binary.as_str())
            .and_then(|s| s.superclass.clone());
        let superclass_rewritten = superclass
            .as_deref()
            .is_some_and(|sc| core.is_rewritten(sc));

        // Object element classes of the managed fields, for checkpoint
        // propagation now or through a later fixup.
        let mut element_classes: HashMap<String, String> = HashMap::new();
        for member in members.iter() {
            if let Member::Field(field) = member {
                if field.modifiers.visibility == Visibility::Private {
                    if let Some(class) = core.element_class_of(&field.ty) {
                        element_classes.insert(field.name.as_str().to_string(), class);
                    }
                }
            }
        }
        for (field, class) in &element_classes {
            if !core.is_rewritten(class) && !table.write_arities(field).is_empty() {
                core.fixups.defer(
                    class,
                    Fixup::AddAccessorPropagation {
                        class: binary.as_str().to_string(),
                        field: field.clone(),
                    },
                );
            }
        }

        if let Some(sc) = superclass.as_deref() {
            if !superclass_rewritten && sc != tempo_resolve::OBJECT {
                core.fixups.defer(
                    sc,
                    Fixup::AddRestoreSuperCall {
                        class: binary.as_str().to_string(),
                    },
                );
            }
        }

        debug!(class = %binary, superclass_rewritten, "synthesizing protocol members");
        let cross = &core.resolver.cross_analysis;
        let is_rollbackable = |name: &str| cross.contains(name);
        let info = DeclInfo {
            class: binary.as_str(),
            superclass_rewritten,
            is_rollbackable: &is_rollbackable,
            rewrite_static_fields: core.options.rewrite_static_fields,
        };

        let mut no_interfaces = Vec::new();
        let interfaces = interfaces.unwrap_or(&mut no_interfaces);
        emitter::synthesize(members, interfaces, &info, &table, |field| {
            element_classes.get(field.name.as_str()).cloned()
        })?;

        core.rewritten.push(binary.clone());
        Ok(())
    }
}

/// Right-hand-side adjustment for plain assignment: a narrowing cast where
/// the accessor's formal parameter requires one, a concat wrap for textual
/// fields.
fn adjust_rhs(core: &SessionCore, element_ty: TypeId, rhs: Expr) -> Expr {
    let rhs_ty = rhs.resolved.map(|r| r.ty);

    if core.types.is_string(element_ty) {
        let already_textual = rhs_ty.is_some_and(|t| core.types.is_string(t) || core.types.is_null(t));
        if !already_textual {
            return build::binary(BinaryOp::Add, build::string(""), rhs);
        }
        return rhs;
    }

    let field_kind = core.types.primitive_kind(element_ty);
    let rhs_kind = rhs_ty.and_then(|t| core.types.primitive_kind(t));
    if let (Some(field_kind), Some(rhs_kind)) = (field_kind, rhs_kind) {
        if field_kind != rhs_kind && !is_true_widening(rhs_kind, field_kind) {
            return Expr::new(ExprKind::Cast {
                ty: core.type_ref_of(element_ty),
                expr: Box::new(rhs),
            });
        }
    }
    rhs
}

/// Whether the Java compiler widens `from` to `to` implicitly in a method
/// argument position. The lenient `int` -> `byte`/`short` ratings exist
/// only for literal initializers and still need an explicit cast here.
fn is_true_widening(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    use PrimitiveKind::*;
    matches!(
        (from, to),
        (Char, Int)
            | (Char, Long)
            | (Char, Float)
            | (Char, Double)
            | (Byte, Short)
            | (Byte, Int)
            | (Byte, Long)
            | (Byte, Float)
            | (Byte, Double)
            | (Short, Int)
            | (Short, Long)
            | (Short, Float)
            | (Short, Double)
            | (Int, Long)
            | (Int, Float)
            | (Int, Double)
            | (Long, Float)
            | (Long, Double)
            | (Float, Double)
    )
}

/// Rebuild a read of the target field at full index depth, used as the
/// concatenation operand for textual compound assignment.
fn rebuild_read(receiver: &Option<Expr>, target: &Target, indices: &[Expr]) -> Expr {
    let mut read = match receiver {
        Some(receiver) => build::field_access(receiver.clone(), &target.field),
        None => build::name(&target.field),
    };
    for index in indices {
        read = build::array_access(read, index.clone());
    }
    read
}

fn placeholder() -> ExprKind {
    ExprKind::Literal {
        value: Literal::Null,
    }
}
