use pretty_assertions::assert_eq;
use tempo_core::Modifiers;
use tempo_syntax::build;
use tempo_syntax::emit::{expr_to_source, unit_to_source};
use tempo_syntax::{AssignOp, BinaryOp, CompilationUnit, IncDecOp, Stmt, TypeRef};

#[test]
fn emits_a_small_class() {
    let decl = build::class(
        "Counter",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "value", Some(build::int(0))),
            build::method(
                "increment",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![build::expr_stmt(build::assign(
                    build::name("value"),
                    build::binary(BinaryOp::Add, build::name("value"), build::int(1)),
                ))]),
            ),
        ],
    );
    let unit = build::unit(Some("demo"), vec![decl]);

    let source = unit_to_source(&unit);
    assert_eq!(
        source,
        "package demo;\n\
         \n\
         public class Counter {\n\
         \x20   private int value = 0;\n\
         \n\
         \x20   public void increment() {\n\
         \x20       value = value + 1;\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn precedence_parenthesizes_synthesized_expressions() {
    let expr = build::binary(
        BinaryOp::Mul,
        build::binary(BinaryOp::Add, build::name("a"), build::name("b")),
        build::name("c"),
    );
    assert_eq!(expr_to_source(&expr), "(a + b) * c");

    let nested = build::binary(
        BinaryOp::Sub,
        build::name("a"),
        build::binary(BinaryOp::Sub, build::name("b"), build::name("c")),
    );
    assert_eq!(expr_to_source(&nested), "a - (b - c)");

    let inc = build::inc_dec(IncDecOp::PostInc, build::name("i"));
    assert_eq!(expr_to_source(&inc), "i++");
}

#[test]
fn compound_assignment_tokens() {
    let expr = build::assign_op(AssignOp::Shl, build::name("bits"), build::int(2));
    assert_eq!(expr_to_source(&expr), "bits <<= 2");
}

#[test]
fn serde_round_trip_preserves_the_tree() {
    let decl = build::class(
        "Holder",
        vec![build::field(
            Modifiers::private().with_final(),
            build::int_ty().array(),
            "slots",
            Some(build::array_init(vec![build::int(1), build::int(2)])),
        )],
    );
    let unit = build::unit(Some("demo.util"), vec![decl]);

    let json = serde_json::to_string_pretty(&unit).expect("serialize");
    let back: CompilationUnit = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, unit);
}

#[test]
fn array_creation_with_partial_dimensions() {
    let expr = tempo_syntax::Expr::new(tempo_syntax::ExprKind::ArrayCreation {
        ty: build::int_ty().array().array(),
        dims: vec![build::int(4)],
        init: None,
    });
    assert_eq!(expr_to_source(&expr), "new int[4][]");
}

#[test]
fn statements_render_with_fixed_indentation() {
    let body = build::block(vec![
        build::local(build::int_ty(), "i", Some(build::int(0))),
        Stmt::While {
            cond: build::binary(BinaryOp::Lt, build::name("i"), build::int(10)),
            body: Box::new(Stmt::Expr(build::inc_dec(
                IncDecOp::PostInc,
                build::name("i"),
            ))),
        },
        build::ret(Some(build::name("i"))),
    ]);
    let decl = build::class(
        "Loop",
        vec![build::method("run", build::int_ty(), vec![], body)],
    );
    let unit = build::unit(None, vec![decl]);
    let source = unit_to_source(&unit);
    assert!(source.contains("while (i < 10)\n            i++;\n"));
    assert!(source.contains("return i;\n"));
}
