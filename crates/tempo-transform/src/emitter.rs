//! Synthesis of the checkpoint-protocol members for one rewritten
//! declaration: the per-field history records, the overloaded accessors the
//! mutation rewrite calls, and the get/set-checkpoint, restore and commit
//! members that make the declaration rollbackable.

use tempo_core::{Modifiers, Name, Visibility};
use tempo_syntax::build;
use tempo_syntax::{
    AssignOp, BinaryOp, ConstructorDecl, Expr, ExprKind, FieldDecl, IncDecOp, Member, MethodDecl,
    Param, Stmt, TypeRef,
};

use crate::error::TransformError;
use crate::names;
use crate::tables::FieldAccessTable;

/// Everything the emitter needs to know about the declaration it is
/// finishing.
pub(crate) struct DeclInfo<'a> {
    /// Binary name of the declaration.
    pub class: &'a str,
    /// Whether the superclass is itself being rewritten; the top of a
    /// rewrite chain carries the checkpoint identity members.
    pub superclass_rewritten: bool,
    /// Element-type names already cross-analyzed, for checkpoint
    /// propagation in assign accessors.
    pub is_rollbackable: &'a dyn Fn(&str) -> bool,
    pub rewrite_static_fields: bool,
}

/// A managed field: private, directly declared, reassignable or an array.
struct ManagedField {
    name: String,
    ty: TypeRef,
    is_static: bool,
    is_final: bool,
    /// Fully qualified element type name, for the propagation check.
    element_class: Option<String>,
}

/// Synthesize every protocol member into `members`. Fails without touching
/// anything if a generated name collides with a declared member.
pub(crate) fn synthesize(
    members: &mut Vec<Member>,
    interfaces: &mut Vec<TypeRef>,
    info: &DeclInfo<'_>,
    table: &FieldAccessTable,
    element_class_of: impl Fn(&FieldDecl) -> Option<String>,
) -> Result<(), TransformError> {
    let managed = managed_fields(members, info, &element_class_of);
    check_collisions(members, info.class, &managed)?;

    let mut synthesized: Vec<Member> = Vec::new();

    for field in &managed {
        for arity in table.write_arities(&field.name) {
            synthesized.push(assign_accessor(field, arity, info));
        }
        for arity in table.compound_write_arities(&field.name) {
            synthesized.push(special_accessor(field, arity, info));
        }
        for arity in table.read_arities(&field.name) {
            synthesized.push(backup_accessor(field, arity));
        }
    }

    synthesized.push(commit_method(info));
    synthesized.push(restore_method(&managed, info));

    if !info.superclass_rewritten {
        synthesized.push(get_checkpoint_method());
        synthesized.push(set_checkpoint_method());
        synthesized.push(checkpoint_field());
        synthesized.push(checkpoint_record_field());
    }

    for field in &managed {
        synthesized.push(record_field_decl(field));
    }
    synthesized.push(records_array(&managed));

    synthesized.extend(delegating_constructors(members));

    members.extend(synthesized);

    let rollbackable = TypeRef::named(names::ROLLBACKABLE_TYPE);
    if !interfaces.contains(&rollbackable) {
        interfaces.push(rollbackable);
    }

    Ok(())
}

/// Strip the checkpoint-identity members back out of a declaration whose
/// superclass turned out to be rewritten after the declaration was emitted.
pub(crate) fn demote_to_subclass(members: &mut Vec<Member>) {
    members.retain(|member| match member {
        Member::Field(field) => {
            field.name.as_str() != names::CHECKPOINT_FIELD
                && field.name.as_str() != names::CHECKPOINT_RECORD_FIELD
        }
        Member::Method(method) => {
            method.name.as_str() != names::GET_CHECKPOINT
                && method.name.as_str() != names::SET_CHECKPOINT
        }
        _ => true,
    });

    for member in members.iter_mut() {
        let Member::Method(method) = member else {
            continue;
        };
        if method.name.as_str() == names::RESTORE {
            if let Some(body) = &mut method.body {
                // The trailing checkpoint-record guard becomes a super call.
                if matches!(body.stmts.last(), Some(Stmt::If { .. })) {
                    body.stmts.pop();
                }
                body.stmts.push(restore_super_call());
            }
        }
        if method.name.as_str() == names::COMMIT {
            if let Some(body) = &mut method.body {
                body.stmts
                    .retain(|stmt| !stmt_calls(stmt, names::CHECKPOINT_RECORD_FIELD, "commit"));
                body.stmts.push(build::expr_stmt(Expr::new(ExprKind::SuperCall {
                    name: Name::from(names::COMMIT),
                    args: vec![build::name("timestamp")],
                })));
            }
        }
    }
}

/// Add the checkpoint-propagation guard to every assign accessor of
/// `field`; applied when the field's class enters the cross-analysis set
/// after the accessors were emitted.
pub(crate) fn add_accessor_propagation(members: &mut [Member], field: &str) {
    let accessor = names::assign_accessor(field);
    for member in members.iter_mut() {
        let Member::Method(method) = member else {
            continue;
        };
        if method.name.as_str() != accessor {
            continue;
        }
        let Some(body) = &mut method.body else {
            continue;
        };
        let already = body.stmts.iter().any(is_propagation_guard);
        if !already && !body.stmts.is_empty() {
            let at = body.stmts.len() - 1;
            body.stmts.insert(at, propagation_guard(checkpoint_expr(false)));
        }
    }
}

fn managed_fields(
    members: &[Member],
    info: &DeclInfo<'_>,
    element_class_of: &impl Fn(&FieldDecl) -> Option<String>,
) -> Vec<ManagedField> {
    members
        .iter()
        .filter_map(|member| match member {
            Member::Field(field) => {
                let m = &field.modifiers;
                if m.visibility != Visibility::Private {
                    return None;
                }
                if m.is_static && !info.rewrite_static_fields {
                    return None;
                }
                if m.is_final && field.ty.dimensions() == 0 {
                    return None;
                }
                Some(ManagedField {
                    name: field.name.as_str().to_string(),
                    ty: field.ty.clone(),
                    is_static: m.is_static,
                    is_final: m.is_final,
                    element_class: element_class_of(field),
                })
            }
            _ => None,
        })
        .collect()
}

fn check_collisions(
    members: &[Member],
    class: &str,
    managed: &[ManagedField],
) -> Result<(), TransformError> {
    let mut generated: Vec<String> = vec![
        names::CHECKPOINT_FIELD.to_string(),
        names::CHECKPOINT_RECORD_FIELD.to_string(),
        names::RECORDS_FIELD.to_string(),
        names::GET_CHECKPOINT.to_string(),
        names::SET_CHECKPOINT.to_string(),
        names::RESTORE.to_string(),
        names::COMMIT.to_string(),
    ];
    for field in managed {
        generated.push(names::assign_accessor(&field.name));
        generated.push(names::special_accessor(&field.name));
        generated.push(names::backup_accessor(&field.name));
        generated.push(names::record_field(&field.name));
    }

    for member in members {
        let declared = match member {
            Member::Field(field) => Some(field.name.as_str()),
            Member::Method(method) => Some(method.name.as_str()),
            _ => None,
        };
        if let Some(declared) = declared {
            if generated.iter().any(|g| g == declared) {
                return Err(TransformError::DuplicateGeneratedMember {
                    class: class.to_string(),
                    member: declared.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// `$CHECKPOINT` for the top of a rewrite chain.
fn checkpoint_field() -> Member {
    Member::Field(FieldDecl {
        modifiers: Modifiers {
            visibility: Visibility::Protected,
            is_transient: true,
            ..Modifiers::default()
        },
        ty: TypeRef::named(names::CHECKPOINT_TYPE),
        name: Name::from(names::CHECKPOINT_FIELD),
        init: Some(build::new_object(
            TypeRef::named(names::CHECKPOINT_TYPE),
            vec![build::this()],
        )),
    })
}

fn checkpoint_record_field() -> Member {
    Member::Field(FieldDecl {
        modifiers: Modifiers {
            visibility: Visibility::Protected,
            is_transient: true,
            ..Modifiers::default()
        },
        ty: TypeRef::named(names::CHECKPOINT_RECORD_TYPE),
        name: Name::from(names::CHECKPOINT_RECORD_FIELD),
        init: Some(build::new_object(
            TypeRef::named(names::CHECKPOINT_RECORD_TYPE),
            vec![],
        )),
    })
}

fn record_field_decl(field: &ManagedField) -> Member {
    Member::Field(FieldDecl {
        modifiers: Modifiers {
            visibility: Visibility::Private,
            is_static: field.is_static,
            is_transient: true,
            ..Modifiers::default()
        },
        ty: TypeRef::named(names::FIELD_RECORD_TYPE),
        name: Name::from(names::record_field(&field.name).as_str()),
        init: Some(build::new_object(
            TypeRef::named(names::FIELD_RECORD_TYPE),
            vec![build::int(field.ty.dimensions() as i64)],
        )),
    })
}

fn records_array(managed: &[ManagedField]) -> Member {
    let elements = managed
        .iter()
        .map(|f| build::name(&names::record_field(&f.name)))
        .collect();
    Member::Field(FieldDecl {
        modifiers: Modifiers {
            visibility: Visibility::Private,
            is_transient: true,
            ..Modifiers::default()
        },
        ty: TypeRef::named(names::FIELD_RECORD_TYPE).array(),
        name: Name::from(names::RECORDS_FIELD),
        init: Some(Expr::new(ExprKind::ArrayCreation {
            ty: TypeRef::named(names::FIELD_RECORD_TYPE).array(),
            dims: vec![],
            init: Some(elements),
        })),
    })
}

/// The checkpoint reference an accessor body uses: the parameter for static
/// fields, the `$CHECKPOINT` field otherwise.
fn checkpoint_expr(is_static: bool) -> Expr {
    if is_static {
        build::name("checkpoint")
    } else {
        build::name(names::CHECKPOINT_FIELD)
    }
}

fn index_params(arity: usize) -> Vec<Param> {
    (0..arity)
        .map(|i| build::param(build::int_ty(), &format!("index{i}")))
        .collect()
}

/// `field[index0][index1]...` up to `depth`.
fn indexed_field(field: &ManagedField, depth: usize) -> Expr {
    let mut expr = build::name(&field.name);
    for i in 0..depth {
        expr = build::array_access(expr, build::name(&format!("index{i}")));
    }
    expr
}

fn element_type(field: &ManagedField, arity: usize) -> TypeRef {
    let mut ty = field.ty.clone();
    for _ in 0..arity {
        ty = match ty {
            TypeRef::Array(elem) => *elem,
            other => other,
        };
    }
    ty
}

/// `new int[] { index0, ... }` or `null` for arity 0.
fn indices_argument(arity: usize) -> Expr {
    if arity == 0 {
        return build::null();
    }
    Expr::new(ExprKind::ArrayCreation {
        ty: build::int_ty().array(),
        dims: vec![],
        init: Some((0..arity).map(|i| build::name(&format!("index{i}"))).collect()),
    })
}

/// `if (cp != null && cp.getTimestamp() > 0) { $RECORD$f.add(indices, old, cp.getTimestamp()); }`
fn record_guard(field: &ManagedField, arity: usize, checkpoint: &Expr) -> Stmt {
    let timestamp = build::call(Some(checkpoint.clone()), "getTimestamp", vec![]);
    let cond = build::binary(
        BinaryOp::And,
        build::binary(BinaryOp::Ne, checkpoint.clone(), build::null()),
        build::binary(BinaryOp::Gt, timestamp.clone(), build::int(0)),
    );
    let add = build::call(
        Some(build::name(&names::record_field(&field.name))),
        "add",
        vec![indices_argument(arity), indexed_field(field, arity), timestamp],
    );
    Stmt::If {
        cond,
        then_branch: Box::new(Stmt::Block(build::block(vec![build::expr_stmt(add)]))),
        else_branch: None,
    }
}

/// `if (newValue != null && cp != newValue.$GET$CHECKPOINT()) { newValue.$SET$CHECKPOINT(cp); }`
fn propagation_guard(checkpoint: Expr) -> Stmt {
    let cond = build::binary(
        BinaryOp::And,
        build::binary(BinaryOp::Ne, build::name("newValue"), build::null()),
        build::binary(
            BinaryOp::Ne,
            checkpoint.clone(),
            build::call(Some(build::name("newValue")), names::GET_CHECKPOINT, vec![]),
        ),
    );
    let set = build::call(
        Some(build::name("newValue")),
        names::SET_CHECKPOINT,
        vec![checkpoint],
    );
    Stmt::If {
        cond,
        then_branch: Box::new(Stmt::Block(build::block(vec![build::expr_stmt(set)]))),
        else_branch: None,
    }
}

fn accessor_modifiers(field: &ManagedField) -> Modifiers {
    Modifiers {
        visibility: Visibility::Private,
        is_static: field.is_static,
        is_final: true,
        ..Modifiers::default()
    }
}

fn assign_accessor(field: &ManagedField, arity: usize, info: &DeclInfo<'_>) -> Member {
    let element = element_type(field, arity);
    let checkpoint = checkpoint_expr(field.is_static);

    let mut params = Vec::new();
    if field.is_static {
        params.push(build::param(
            TypeRef::named(names::CHECKPOINT_TYPE),
            "checkpoint",
        ));
    }
    params.extend(index_params(arity));
    params.push(build::param(element.clone(), "newValue"));

    let mut stmts = vec![record_guard(field, arity, &checkpoint)];

    let propagate = field
        .element_class
        .as_deref()
        .is_some_and(|c| (info.is_rollbackable)(c))
        && element.dimensions() == 0
        && !matches!(element, TypeRef::Primitive(_));
    if propagate {
        stmts.push(propagation_guard(checkpoint));
    }

    stmts.push(build::ret(Some(build::assign(
        indexed_field(field, arity),
        build::name("newValue"),
    ))));

    Member::Method(MethodDecl {
        modifiers: accessor_modifiers(field),
        return_type: element,
        name: Name::from(names::assign_accessor(&field.name).as_str()),
        params,
        throws: Vec::new(),
        body: Some(build::block(stmts)),
    })
}

/// Operand type of the compound accessor: wide enough for any right-hand
/// side of the matching operator family.
fn operand_type(element: &TypeRef) -> TypeRef {
    match element {
        TypeRef::Primitive(name) => match name.as_str() {
            "float" | "double" => TypeRef::primitive("double"),
            "boolean" => TypeRef::primitive("boolean"),
            _ => TypeRef::primitive("long"),
        },
        other => other.clone(),
    }
}

fn special_accessor(field: &ManagedField, arity: usize, _info: &DeclInfo<'_>) -> Member {
    let element = element_type(field, arity);
    let checkpoint = checkpoint_expr(field.is_static);
    let target = || indexed_field(field, arity);

    let mut params = Vec::new();
    if field.is_static {
        params.push(build::param(
            TypeRef::named(names::CHECKPOINT_TYPE),
            "checkpoint",
        ));
    }
    params.extend(index_params(arity));
    params.push(build::param(build::int_ty(), "operator"));
    params.push(build::param(operand_type(&element), "newValue"));

    let compound = |op: AssignOp| {
        build::ret(Some(build::assign_op(op, target(), build::name("newValue"))))
    };
    let step = |op: IncDecOp| build::ret(Some(build::inc_dec(op, target())));

    let arms = vec![
        arm(0, compound(AssignOp::Add)),
        arm(1, compound(AssignOp::Sub)),
        arm(2, compound(AssignOp::Mul)),
        arm(3, compound(AssignOp::Div)),
        arm(4, compound(AssignOp::BitAnd)),
        arm(5, compound(AssignOp::BitOr)),
        arm(6, compound(AssignOp::BitXor)),
        arm(7, compound(AssignOp::Rem)),
        arm(8, compound(AssignOp::Shl)),
        arm(9, compound(AssignOp::Shr)),
        arm(10, compound(AssignOp::UShr)),
        arm(11, step(IncDecOp::PostInc)),
        arm(12, step(IncDecOp::PostDec)),
        arm(13, step(IncDecOp::PreInc)),
        arm(14, step(IncDecOp::PreDec)),
        tempo_syntax::SwitchArm {
            labels: vec![None],
            stmts: vec![build::ret(Some(target()))],
        },
    ];

    let body = build::block(vec![
        record_guard(field, arity, &checkpoint),
        Stmt::Switch {
            selector: build::name("operator"),
            arms,
        },
    ]);

    Member::Method(MethodDecl {
        modifiers: accessor_modifiers(field),
        return_type: element,
        name: Name::from(names::special_accessor(&field.name).as_str()),
        params,
        throws: Vec::new(),
        body: Some(body),
    })
}

fn arm(selector: i64, stmt: Stmt) -> tempo_syntax::SwitchArm {
    tempo_syntax::SwitchArm {
        labels: vec![Some(build::int(selector))],
        stmts: vec![stmt],
    }
}

fn backup_accessor(field: &ManagedField, arity: usize) -> Member {
    let element = element_type(field, arity);
    let checkpoint = checkpoint_expr(field.is_static);

    let mut params = Vec::new();
    if field.is_static {
        params.push(build::param(
            TypeRef::named(names::CHECKPOINT_TYPE),
            "checkpoint",
        ));
    }
    params.extend(index_params(arity));

    let backup = build::call(
        Some(build::name(&names::record_field(&field.name))),
        "backup",
        vec![
            indices_argument(arity),
            indexed_field(field, arity),
            build::call(Some(checkpoint), "getTimestamp", vec![]),
        ],
    );

    Member::Method(MethodDecl {
        modifiers: accessor_modifiers(field),
        return_type: element,
        name: Name::from(names::backup_accessor(&field.name).as_str()),
        params,
        throws: Vec::new(),
        body: Some(build::block(vec![
            build::expr_stmt(backup),
            build::ret(Some(indexed_field(field, arity))),
        ])),
    })
}

fn get_checkpoint_method() -> Member {
    Member::Method(MethodDecl {
        modifiers: Modifiers::public().with_final(),
        return_type: TypeRef::named(names::CHECKPOINT_TYPE),
        name: Name::from(names::GET_CHECKPOINT),
        params: vec![],
        throws: Vec::new(),
        body: Some(build::block(vec![build::ret(Some(build::name(
            names::CHECKPOINT_FIELD,
        )))])),
    })
}

fn set_checkpoint_method() -> Member {
    let cp = || build::name(names::CHECKPOINT_FIELD);

    let record = build::call(
        Some(build::name(names::CHECKPOINT_RECORD_FIELD)),
        "add",
        vec![
            cp(),
            build::call(Some(build::name("checkpoint")), "getTimestamp", vec![]),
        ],
    );
    let push_state = build::call(
        Some(build::name(names::FIELD_RECORD_TYPE)),
        "pushState",
        vec![build::name(names::RECORDS_FIELD)],
    );
    let when_non_null = Stmt::If {
        cond: build::binary(BinaryOp::Ne, build::name("checkpoint"), build::null()),
        then_branch: Box::new(Stmt::Block(build::block(vec![
            build::expr_stmt(record),
            build::expr_stmt(push_state),
        ]))),
        else_branch: None,
    };

    let migrate = build::block(vec![
        build::local(
            TypeRef::named(names::CHECKPOINT_TYPE),
            "oldCheckpoint",
            Some(cp()),
        ),
        when_non_null,
        build::expr_stmt(build::assign(cp(), build::name("checkpoint"))),
        build::expr_stmt(build::call(
            Some(build::name("oldCheckpoint")),
            "setCheckpoint",
            vec![build::name("checkpoint")],
        )),
        build::expr_stmt(build::call(
            Some(build::name("checkpoint")),
            "addObject",
            vec![build::this()],
        )),
    ]);

    let body = build::block(vec![
        Stmt::If {
            cond: build::binary(BinaryOp::Ne, cp(), build::name("checkpoint")),
            then_branch: Box::new(Stmt::Block(migrate)),
            else_branch: None,
        },
        build::ret(Some(build::this())),
    ]);

    Member::Method(MethodDecl {
        modifiers: Modifiers::public().with_final(),
        return_type: TypeRef::named("Object"),
        name: Name::from(names::SET_CHECKPOINT),
        params: vec![build::param(
            TypeRef::named(names::CHECKPOINT_TYPE),
            "checkpoint",
        )],
        throws: Vec::new(),
        body: Some(body),
    })
}

fn restore_params() -> Vec<Param> {
    vec![
        build::param(TypeRef::primitive("long"), "timestamp"),
        build::param(TypeRef::primitive("boolean"), "trim"),
    ]
}

fn restore_method(managed: &[ManagedField], info: &DeclInfo<'_>) -> Member {
    let mut stmts: Vec<Stmt> = Vec::new();

    for field in managed {
        let restore = build::call(
            Some(build::name(&names::record_field(&field.name))),
            "restore",
            vec![
                build::name(&field.name),
                build::name("timestamp"),
                build::name("trim"),
            ],
        );
        if field.is_final {
            // A final array cannot be reassigned; the record restores its
            // elements in place.
            stmts.push(build::expr_stmt(restore));
        } else {
            let value = if matches!(field.ty.element(), TypeRef::Primitive(_))
                && field.ty.dimensions() == 0
            {
                restore
            } else {
                Expr::new(ExprKind::Cast {
                    ty: field.ty.clone(),
                    expr: Box::new(restore),
                })
            };
            stmts.push(build::expr_stmt(build::assign(
                build::name(&field.name),
                value,
            )));
        }
    }

    if info.superclass_rewritten {
        stmts.push(restore_super_call());
    } else {
        let top_timestamp = build::call(
            Some(build::name(names::CHECKPOINT_RECORD_FIELD)),
            "getTopTimestamp",
            vec![],
        );
        let reinstate = build::block(vec![
            build::expr_stmt(build::assign(
                build::name(names::CHECKPOINT_FIELD),
                build::call(
                    Some(build::name(names::CHECKPOINT_RECORD_FIELD)),
                    "restore",
                    vec![
                        build::name(names::CHECKPOINT_FIELD),
                        build::this(),
                        build::name("timestamp"),
                        build::name("trim"),
                    ],
                ),
            )),
            build::expr_stmt(build::call(
                Some(build::name(names::FIELD_RECORD_TYPE)),
                "popState",
                vec![build::name(names::RECORDS_FIELD)],
            )),
            build::expr_stmt(build::call(None, names::RESTORE, vec![
                build::name("timestamp"),
                build::name("trim"),
            ])),
        ]);
        stmts.push(Stmt::If {
            cond: build::binary(BinaryOp::Le, build::name("timestamp"), top_timestamp),
            then_branch: Box::new(Stmt::Block(reinstate)),
            else_branch: None,
        });
    }

    Member::Method(MethodDecl {
        modifiers: Modifiers::public(),
        return_type: TypeRef::primitive("void"),
        name: Name::from(names::RESTORE),
        params: restore_params(),
        throws: Vec::new(),
        body: Some(build::block(stmts)),
    })
}

fn restore_super_call() -> Stmt {
    build::expr_stmt(Expr::new(ExprKind::SuperCall {
        name: Name::from(names::RESTORE),
        args: vec![build::name("timestamp"), build::name("trim")],
    }))
}

fn commit_method(info: &DeclInfo<'_>) -> Member {
    let mut stmts = vec![build::expr_stmt(build::call(
        Some(build::name(names::FIELD_RECORD_TYPE)),
        "commit",
        vec![
            build::name(names::RECORDS_FIELD),
            build::name("timestamp"),
            build::call(
                Some(build::name(names::CHECKPOINT_RECORD_FIELD)),
                "getTopTimestamp",
                vec![],
            ),
        ],
    ))];

    if !info.superclass_rewritten {
        stmts.push(build::expr_stmt(build::call(
            Some(build::name(names::CHECKPOINT_RECORD_FIELD)),
            "commit",
            vec![build::name("timestamp")],
        )));
    } else {
        stmts.push(build::expr_stmt(Expr::new(ExprKind::SuperCall {
            name: Name::from(names::COMMIT),
            args: vec![build::name("timestamp")],
        })));
    }

    Member::Method(MethodDecl {
        modifiers: Modifiers::public(),
        return_type: TypeRef::primitive("void"),
        name: Name::from(names::COMMIT),
        params: vec![build::param(TypeRef::primitive("long"), "timestamp")],
        throws: Vec::new(),
        body: Some(build::block(stmts)),
    })
}

/// For every declared constructor, a sibling taking a trailing checkpoint
/// that delegates and then adopts the checkpoint; one from scratch when the
/// class relies on the default constructor.
fn delegating_constructors(members: &[Member]) -> Vec<Member> {
    let declared: Vec<&ConstructorDecl> = members
        .iter()
        .filter_map(|m| match m {
            Member::Constructor(ctor) => Some(ctor),
            _ => None,
        })
        .collect();

    let adopt = build::expr_stmt(build::call(
        None,
        names::SET_CHECKPOINT,
        vec![build::name("checkpoint")],
    ));

    if declared.is_empty() {
        return vec![Member::Constructor(ConstructorDecl {
            modifiers: Modifiers::public(),
            params: vec![build::param(
                TypeRef::named(names::CHECKPOINT_TYPE),
                "checkpoint",
            )],
            throws: Vec::new(),
            body: build::block(vec![adopt]),
        })];
    }

    declared
        .iter()
        .map(|ctor| {
            let mut params = ctor.params.clone();
            params.push(build::param(
                TypeRef::named(names::CHECKPOINT_TYPE),
                "checkpoint",
            ));
            let delegate = Stmt::ThisConstructorCall(
                ctor.params
                    .iter()
                    .map(|p| build::name(p.name.as_str()))
                    .collect(),
            );
            Member::Constructor(ConstructorDecl {
                modifiers: ctor.modifiers,
                params,
                throws: ctor.throws.clone(),
                body: build::block(vec![delegate, adopt.clone()]),
            })
        })
        .collect()
}

/// Whether `stmt` is an expression statement calling `receiver.method(..)`.
fn stmt_calls(stmt: &Stmt, receiver: &str, method: &str) -> bool {
    let Stmt::Expr(expr) = stmt else {
        return false;
    };
    calls(expr, receiver, method)
}

fn calls(expr: &Expr, receiver: &str, method: &str) -> bool {
    match &expr.kind {
        ExprKind::Call {
            receiver: Some(object),
            name,
            ..
        } => {
            name.as_str() == method
                && matches!(
                    &object.kind,
                    ExprKind::Name { name } if name.as_str() == receiver
                )
        }
        _ => false,
    }
}

/// The `if (newValue != null && ...) { newValue.$SET$CHECKPOINT(..); }`
/// guard an assign accessor carries once propagation is in place.
fn is_propagation_guard(stmt: &Stmt) -> bool {
    let Stmt::If { then_branch, .. } = stmt else {
        return false;
    };
    let Stmt::Block(block) = then_branch.as_ref() else {
        return false;
    };
    block
        .stmts
        .iter()
        .any(|s| stmt_calls(s, "newValue", names::SET_CHECKPOINT))
}
