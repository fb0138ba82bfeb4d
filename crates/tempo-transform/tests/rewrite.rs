use pretty_assertions::assert_eq;
use tempo_core::Modifiers;
use tempo_syntax::build;
use tempo_syntax::{
    AssignOp, BinaryOp, CompilationUnit, Expr, ExprKind, IncDecOp, Literal, Member, MethodDecl,
    Stmt, TypeRef,
};
use tempo_transform::{RewriteOptions, RewriteSession};

fn session() -> RewriteSession {
    RewriteSession::new(tempo_resolve::builtin_symbols(), RewriteOptions::default())
}

fn methods_named<'a>(unit: &'a CompilationUnit, class: usize, name: &str) -> Vec<&'a MethodDecl> {
    unit.types[class]
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Method(method) if method.name.as_str() == name => Some(method),
            _ => None,
        })
        .collect()
}

fn first_body_expr<'a>(unit: &'a CompilationUnit, class: usize, method: &str) -> &'a Expr {
    let method = methods_named(unit, class, method)
        .into_iter()
        .next()
        .expect("method present");
    let body = method.body.as_ref().expect("method has a body");
    match &body.stmts[0] {
        Stmt::Expr(expr) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn counter_unit() -> CompilationUnit {
    let decl = build::class(
        "Counter",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "count", Some(build::int(0))),
            build::method(
                "increment",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![build::expr_stmt(build::assign(
                    build::name("count"),
                    build::binary(BinaryOp::Add, build::name("count"), build::int(1)),
                ))]),
            ),
        ],
    );
    build::unit(Some("demo"), vec![decl])
}

#[test]
fn scalar_write_becomes_one_assign_accessor() {
    let mut unit = counter_unit();
    let outcome = session().rewrite(&mut unit).expect("rewrite succeeds");

    assert_eq!(
        outcome
            .rewritten_classes
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>(),
        vec!["demo.Counter"]
    );

    // Exactly one assign accessor and one history record for `count`.
    assert_eq!(methods_named(&unit, 0, "$ASSIGN$count").len(), 1);
    let records: Vec<&str> = unit.types[0]
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Field(f) if f.name.as_str().starts_with("$RECORD$") => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(records, vec!["$RECORD$$CHECKPOINT", "$RECORD$count"]);

    // The write itself is now an accessor call carrying the new value.
    let expr = first_body_expr(&unit, 0, "increment");
    let ExprKind::Call { name, args, receiver } = &expr.kind else {
        panic!("expected accessor call, got {expr:?}");
    };
    assert_eq!(name.as_str(), "$ASSIGN$count");
    assert!(receiver.is_none());
    assert_eq!(args.len(), 1);

    // And the declaration now exposes the rollback capability.
    assert!(unit.types[0]
        .interfaces
        .iter()
        .any(|i| i.source_name() == "Rollbackable"));
    assert_eq!(methods_named(&unit, 0, "$RESTORE").len(), 1);
    assert_eq!(methods_named(&unit, 0, "$GET$CHECKPOINT").len(), 1);
    assert_eq!(methods_named(&unit, 0, "$SET$CHECKPOINT").len(), 1);
    assert_eq!(methods_named(&unit, 0, "$COMMIT").len(), 1);
}

#[test]
fn distinct_index_arities_get_distinct_overloads() {
    let body = build::block(vec![
        build::expr_stmt(build::assign(
            build::array_access(build::name("grid"), build::name("i")),
            build::name("row"),
        )),
        build::expr_stmt(build::assign(
            build::array_access(
                build::array_access(build::name("grid"), build::name("i")),
                build::name("j"),
            ),
            build::int(7),
        )),
    ]);
    let decl = build::class(
        "Grid",
        vec![
            build::field(
                Modifiers::private(),
                build::int_ty().array().array(),
                "grid",
                None,
            ),
            build::method(
                "update",
                TypeRef::primitive("void"),
                vec![
                    build::param(build::int_ty(), "i"),
                    build::param(build::int_ty(), "j"),
                    build::param(build::int_ty().array(), "row"),
                ],
                body,
            ),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    let overloads = methods_named(&unit, 0, "$ASSIGN$grid");
    assert_eq!(overloads.len(), 2);
    let mut arities: Vec<usize> = overloads.iter().map(|m| m.params.len() - 1).collect();
    arities.sort_unstable();
    assert_eq!(arities, vec![1, 2]);
}

#[test]
fn compound_operators_use_the_selector_table() {
    let body = build::block(vec![
        build::expr_stmt(build::assign_op(
            AssignOp::Add,
            build::name("count"),
            build::int(2),
        )),
        build::expr_stmt(build::inc_dec(IncDecOp::PostInc, build::name("count"))),
    ]);
    let decl = build::class(
        "Counter",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "count", None),
            build::method("bump", TypeRef::primitive("void"), vec![], body),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    let method = methods_named(&unit, 0, "bump")
        .into_iter()
        .next()
        .expect("bump");
    let body = method.body.as_ref().expect("body");

    let selector_of = |stmt: &Stmt| -> i64 {
        let Stmt::Expr(expr) = stmt else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { name, args, .. } = &expr.kind else {
            panic!("expected accessor call");
        };
        assert_eq!(name.as_str(), "$ASSIGN$SPECIAL$count");
        let ExprKind::Literal {
            value: Literal::Int(selector),
        } = &args[0].kind
        else {
            panic!("expected selector literal");
        };
        *selector
    };

    assert_eq!(selector_of(&body.stmts[0]), 0);
    assert_eq!(selector_of(&body.stmts[1]), 11);

    // One compound accessor synthesized for the field.
    assert_eq!(methods_named(&unit, 0, "$ASSIGN$SPECIAL$count").len(), 1);
}

#[test]
fn public_state_is_left_untouched() {
    let decl = build::class(
        "Plain",
        vec![
            build::field(Modifiers::public(), build::int_ty(), "visible", Some(build::int(3))),
            build::method(
                "poke",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![build::expr_stmt(build::assign(
                    build::name("visible"),
                    build::int(4),
                ))]),
            ),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    // The write stays a plain assignment and no accessors appear; only the
    // rollback capability members are added.
    let expr = first_body_expr(&unit, 0, "poke");
    assert!(matches!(expr.kind, ExprKind::Assign { .. }));
    assert!(methods_named(&unit, 0, "$ASSIGN$visible").is_empty());
    assert_eq!(methods_named(&unit, 0, "$RESTORE").len(), 1);
}

#[test]
fn escaping_array_reads_go_through_backup() {
    let decl = build::class(
        "Holder",
        vec![
            build::field(
                Modifiers::private(),
                build::int_ty().array(),
                "slots",
                None,
            ),
            build::method(
                "expose",
                build::int_ty().array(),
                vec![],
                build::block(vec![build::ret(Some(build::name("slots")))]),
            ),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    let method = methods_named(&unit, 0, "expose")
        .into_iter()
        .next()
        .expect("expose");
    let Stmt::Return(Some(expr)) = &method.body.as_ref().expect("body").stmts[0] else {
        panic!("expected return");
    };
    let ExprKind::Call { name, .. } = &expr.kind else {
        panic!("expected backup call, got {expr:?}");
    };
    assert_eq!(name.as_str(), "$BACKUP$slots");
    assert_eq!(methods_named(&unit, 0, "$BACKUP$slots").len(), 1);
}

#[test]
fn construction_sites_in_the_same_unit_are_threaded() {
    let a = build::class(
        "A",
        vec![build::method(
            "make",
            TypeRef::named("B"),
            vec![],
            build::block(vec![build::ret(Some(build::new_object(
                TypeRef::named("B"),
                vec![build::int(5)],
            )))]),
        )],
    );
    let b = build::class(
        "B",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "seed", None),
            build::constructor(
                vec![build::param(build::int_ty(), "seed")],
                build::block(vec![build::expr_stmt(build::assign(
                    build::field_access(build::this(), "seed"),
                    build::name("seed"),
                ))]),
            ),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![a, b]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    // B is walked after A, so the `new B(5)` site was deferred and then
    // patched when B entered the cross-analysis set.
    let method = methods_named(&unit, 0, "make")
        .into_iter()
        .next()
        .expect("make");
    let Stmt::Return(Some(expr)) = &method.body.as_ref().expect("body").stmts[0] else {
        panic!("expected return");
    };
    let ExprKind::New { args, .. } = &expr.kind else {
        panic!("expected construction, got {expr:?}");
    };
    assert_eq!(args.len(), 2);
    assert!(
        matches!(&args[1].kind, ExprKind::Name { name } if name.as_str() == "$CHECKPOINT")
    );

    // B gained a delegating constructor with a trailing checkpoint.
    let ctors: Vec<_> = unit.types[1]
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Constructor(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(ctors.len(), 2);
    assert_eq!(ctors[1].params.len(), 2);
    assert_eq!(ctors[1].params[1].ty.source_name(), "Checkpoint");
}

#[test]
fn late_cross_analysis_drains_the_pending_fixups() {
    let a = build::class(
        "A",
        vec![build::method(
            "make",
            TypeRef::named("ext.B"),
            vec![],
            build::block(vec![build::ret(Some(build::new_object(
                TypeRef::named("ext.B"),
                vec![],
            )))]),
        )],
    );
    let mut unit = build::unit(Some("demo"), vec![a]);

    let mut symbols = tempo_resolve::builtin_symbols();
    symbols.insert(tempo_resolve::ClassSummary::new("ext.B"));

    let mut session = RewriteSession::new(symbols, RewriteOptions::default());
    session.rewrite(&mut unit).expect("rewrite succeeds");

    // The site could not be threaded during the walk.
    assert_eq!(session.pending_fixups_for("ext.B"), 1);

    session.add_cross_analyzed("ext.B");
    session.apply_due_fixups(&mut unit);

    assert_eq!(session.pending_fixups_for("ext.B"), 0);
    let method = methods_named(&unit, 0, "make")
        .into_iter()
        .next()
        .expect("make");
    let Stmt::Return(Some(expr)) = &method.body.as_ref().expect("body").stmts[0] else {
        panic!("expected return");
    };
    let ExprKind::New { args, .. } = &expr.kind else {
        panic!("expected construction");
    };
    assert_eq!(args.len(), 1);
}

#[test]
fn rewriting_already_rewritten_source_is_refused() {
    let decl = build::class(
        "Twice",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "count", None),
            build::method(
                "poke",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![build::expr_stmt(build::assign(
                    build::name("count"),
                    build::int(1),
                ))]),
            ),
            build::method(
                "$ASSIGN$count",
                build::int_ty(),
                vec![build::param(build::int_ty(), "newValue")],
                build::block(vec![build::ret(Some(build::name("newValue")))]),
            ),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);

    let err = session().rewrite(&mut unit).expect_err("must refuse");
    assert_eq!(
        err,
        tempo_transform::TransformError::DuplicateGeneratedMember {
            class: "demo.Twice".into(),
            member: "$ASSIGN$count".into(),
        }
    );
}

#[test]
fn narrowing_assignments_gain_a_cast_and_strings_a_concat() {
    let body = build::block(vec![
        build::expr_stmt(build::assign(build::name("small"), build::int(1))),
        build::expr_stmt(build::assign_op(
            AssignOp::Add,
            build::name("label"),
            build::int(5),
        )),
    ]);
    let decl = build::class(
        "Mixed",
        vec![
            build::field(Modifiers::private(), TypeRef::primitive("byte"), "small", None),
            build::field(Modifiers::private(), build::string_ty(), "label", None),
            build::method("poke", TypeRef::primitive("void"), vec![], body),
        ],
    );
    let mut unit = build::unit(Some("demo"), vec![decl]);
    session().rewrite(&mut unit).expect("rewrite succeeds");

    let method = methods_named(&unit, 0, "poke")
        .into_iter()
        .next()
        .expect("poke");
    let body = method.body.as_ref().expect("body");

    // byte field: the literal is cast down to the accessor's parameter type.
    let Stmt::Expr(first) = &body.stmts[0] else {
        panic!("expected expression");
    };
    let ExprKind::Call { name, args, .. } = &first.kind else {
        panic!("expected accessor call");
    };
    assert_eq!(name.as_str(), "$ASSIGN$small");
    assert!(matches!(&args[0].kind, ExprKind::Cast { .. }));

    // String field: `+=` goes through the plain accessor as concatenation.
    let Stmt::Expr(second) = &body.stmts[1] else {
        panic!("expected expression");
    };
    let ExprKind::Call { name, args, .. } = &second.kind else {
        panic!("expected accessor call");
    };
    assert_eq!(name.as_str(), "$ASSIGN$label");
    assert!(matches!(
        &args[0].kind,
        ExprKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn rewritten_units_import_the_runtime_and_emit_compilable_source() {
    let mut unit = counter_unit();
    session().rewrite(&mut unit).expect("rewrite succeeds");

    let imports: Vec<&str> = unit.imports.iter().map(|i| i.name.as_str()).collect();
    assert!(imports.contains(&"tempo.rollback.Checkpoint"));
    assert!(imports.contains(&"tempo.rollback.Rollbackable"));

    let source = tempo_syntax::emit::unit_to_source(&unit);
    assert!(source.contains("public class Counter implements Rollbackable {"));
    assert!(source.contains("private final int $ASSIGN$count(int newValue) {"));
    assert!(source.contains("$RECORD$count.add(null, count, $CHECKPOINT.getTimestamp());"));
    assert!(source.contains("public void $RESTORE(long timestamp, boolean trim) {"));
}

#[test]
fn package_prefix_is_applied_to_rewritten_output() {
    let mut unit = counter_unit();
    let options = RewriteOptions {
        package_prefix: Some(tempo_core::PackageName::from_dotted("rollback")),
        ..RewriteOptions::default()
    };
    let mut session = RewriteSession::new(tempo_resolve::builtin_symbols(), options);
    session.rewrite(&mut unit).expect("rewrite succeeds");

    assert_eq!(
        unit.package.as_ref().map(|p| p.to_dotted()),
        Some("rollback.demo".to_string())
    );
}
