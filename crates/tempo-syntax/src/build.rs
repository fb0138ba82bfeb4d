//! Terse tree construction, used by tests and by the member synthesis in
//! the transform crate.

use tempo_core::{Modifiers, Name, PackageName, QualifiedName};

use crate::ast::*;

#[must_use]
pub fn unit(package: Option<&str>, types: Vec<TypeDecl>) -> CompilationUnit {
    CompilationUnit {
        package: package.map(PackageName::from_dotted),
        imports: Vec::new(),
        types,
    }
}

#[must_use]
pub fn class(name: &str, members: Vec<Member>) -> TypeDecl {
    TypeDecl {
        name: Name::from(name),
        kind: TypeDeclKind::Class,
        modifiers: Modifiers::public(),
        superclass: None,
        interfaces: Vec::new(),
        members,
    }
}

#[must_use]
pub fn field(modifiers: Modifiers, ty: TypeRef, name: &str, init: Option<Expr>) -> Member {
    Member::Field(FieldDecl {
        modifiers,
        ty,
        name: Name::from(name),
        init,
    })
}

#[must_use]
pub fn method(name: &str, return_type: TypeRef, params: Vec<Param>, body: Block) -> Member {
    Member::Method(MethodDecl {
        modifiers: Modifiers::public(),
        return_type,
        name: Name::from(name),
        params,
        throws: Vec::new(),
        body: Some(body),
    })
}

#[must_use]
pub fn constructor(params: Vec<Param>, body: Block) -> Member {
    Member::Constructor(ConstructorDecl {
        modifiers: Modifiers::public(),
        params,
        throws: Vec::new(),
        body,
    })
}

#[must_use]
pub fn param(ty: TypeRef, name: &str) -> Param {
    Param {
        ty,
        name: Name::from(name),
    }
}

#[must_use]
pub fn block(stmts: Vec<Stmt>) -> Block {
    Block { stmts }
}

#[must_use]
pub fn int_ty() -> TypeRef {
    TypeRef::primitive("int")
}

#[must_use]
pub fn string_ty() -> TypeRef {
    TypeRef::named("java.lang.String")
}

#[must_use]
pub fn name(text: &str) -> Expr {
    Expr::new(ExprKind::Name {
        name: QualifiedName::new(text),
    })
}

#[must_use]
pub fn this() -> Expr {
    Expr::new(ExprKind::This { qualifier: None })
}

#[must_use]
pub fn field_access(object: Expr, field: &str) -> Expr {
    Expr::new(ExprKind::FieldAccess {
        object: Box::new(object),
        name: Name::from(field),
    })
}

#[must_use]
pub fn int(value: i64) -> Expr {
    Expr::new(ExprKind::Literal {
        value: Literal::Int(value),
    })
}

#[must_use]
pub fn string(value: &str) -> Expr {
    Expr::new(ExprKind::Literal {
        value: Literal::Str(value.to_string()),
    })
}

#[must_use]
pub fn null() -> Expr {
    Expr::new(ExprKind::Literal {
        value: Literal::Null,
    })
}

#[must_use]
pub fn array_access(array: Expr, index: Expr) -> Expr {
    Expr::new(ExprKind::ArrayAccess {
        array: Box::new(array),
        index: Box::new(index),
    })
}

#[must_use]
pub fn assign(lhs: Expr, rhs: Expr) -> Expr {
    assign_op(AssignOp::Assign, lhs, rhs)
}

#[must_use]
pub fn assign_op(op: AssignOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Assign {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

#[must_use]
pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

#[must_use]
pub fn inc_dec(op: IncDecOp, operand: Expr) -> Expr {
    Expr::new(ExprKind::IncDec {
        op,
        operand: Box::new(operand),
    })
}

#[must_use]
pub fn call(receiver: Option<Expr>, method: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        receiver: receiver.map(Box::new),
        name: Name::from(method),
        args,
    })
}

#[must_use]
pub fn new_object(ty: TypeRef, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::New {
        ty,
        args,
        body: None,
    })
}

#[must_use]
pub fn array_init(values: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ArrayInit { values })
}

#[must_use]
pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

#[must_use]
pub fn local(ty: TypeRef, name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Local(LocalDecl {
        ty,
        name: Name::from(name),
        is_final: false,
        init,
    })
}

#[must_use]
pub fn ret(expr: Option<Expr>) -> Stmt {
    Stmt::Return(expr)
}
