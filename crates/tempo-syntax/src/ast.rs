//! Tree definitions for one compilation unit.
//!
//! Every expression carries a resolution slot the tree walker fills in
//! before firing that node's exit event; the slot is never serialized.

use serde::{Deserialize, Serialize};
use tempo_core::{Modifiers, Name, PackageName, QualifiedName};
use tempo_types::TypeAndOwner;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    #[serde(default)]
    pub package: Option<PackageName>,
    #[serde(default)]
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub name: QualifiedName,
    /// `import a.b.*;` rather than `import a.b.C;`.
    #[serde(default)]
    pub on_demand: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDeclKind {
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Name,
    pub kind: TypeDeclKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub superclass: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Nested(TypeDecl),
    Initializer(InitializerDecl),
}

/// Member indices in the category order a compiler generates code in:
/// fields, then nested types, then methods and constructors, then
/// initializers. Stable within a category. Nested-declaration numbering
/// depends on walking members in exactly this order.
#[must_use]
pub fn sorted_member_indices(members: &[Member]) -> Vec<usize> {
    fn rank(member: &Member) -> u8 {
        match member {
            Member::Field(_) => 0,
            Member::Nested(_) => 1,
            Member::Method(_) | Member::Constructor(_) => 2,
            Member::Initializer(_) => 3,
        }
    }

    let mut indices: Vec<usize> = (0..members.len()).collect();
    indices.sort_by_key(|&i| rank(&members[i]));
    indices
}

/// One declared field. Multi-fragment declarations (`int a, b;`) are split
/// by the parser into one `FieldDecl` per fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub name: Name,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub return_type: TypeRef,
    pub name: Name,
    pub params: Vec<Param>,
    #[serde(default)]
    pub throws: Vec<QualifiedName>,
    /// `None` for abstract and interface methods.
    #[serde(default)]
    pub body: Option<Block>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    pub params: Vec<Param>,
    #[serde(default)]
    pub throws: Vec<QualifiedName>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitializerDecl {
    #[serde(default)]
    pub is_static: bool,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: TypeRef,
    pub name: Name,
}

/// A type as written in source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeRef {
    Primitive(String),
    Named(QualifiedName),
    Array(Box<TypeRef>),
}

impl TypeRef {
    #[must_use]
    pub fn named(name: impl Into<String>) -> TypeRef {
        TypeRef::Named(QualifiedName::new(name))
    }

    #[must_use]
    pub fn primitive(name: impl Into<String>) -> TypeRef {
        TypeRef::Primitive(name.into())
    }

    #[must_use]
    pub fn array(self) -> TypeRef {
        TypeRef::Array(Box::new(self))
    }

    /// The source-form name (`int[]`, `a.b.C`).
    #[must_use]
    pub fn source_name(&self) -> String {
        match self {
            TypeRef::Primitive(name) => name.clone(),
            TypeRef::Named(name) => name.as_str().to_string(),
            TypeRef::Array(elem) => format!("{}[]", elem.source_name()),
        }
    }

    #[must_use]
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::Array(elem) => elem.element(),
            other => other,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        match self {
            TypeRef::Array(elem) => 1 + elem.dimensions(),
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Block(Block),
    Local(LocalDecl),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<ForInit>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        param: Param,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Switch {
        selector: Expr,
        arms: Vec<SwitchArm>,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break(Option<Name>),
    Continue(Option<Name>),
    Labeled {
        label: Name,
        stmt: Box<Stmt>,
    },
    /// `this(...)` as the first statement of a constructor.
    ThisConstructorCall(Vec<Expr>),
    /// `super(...)` as the first statement of a constructor.
    SuperConstructorCall(Vec<Expr>),
    /// A class declared inside a method body.
    LocalType(TypeDecl),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForInit {
    Local(LocalDecl),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub ty: TypeRef,
    pub name: Name,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    /// `None` is the `default:` label.
    pub labels: Vec<Option<Expr>>,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Param,
    pub body: Block,
}

/// An expression node: the kind plus the resolution slot the walker fills.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(skip)]
    pub resolved: Option<TypeAndOwner>,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            resolved: None,
        }
    }

    /// The expression with any parenthesization removed.
    #[must_use]
    pub fn unwrap_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren { inner } => inner.unwrap_parens(),
            _ => self,
        }
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Expr::new(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprKind {
    /// A simple or dotted name as written (`x`, `a.b.c`). Resolution decides
    /// what each segment denotes.
    Name { name: QualifiedName },
    /// `expr.field`.
    FieldAccess { object: Box<Expr>, name: Name },
    /// `super.field` / `Outer.super.field`.
    SuperFieldAccess {
        qualifier: Option<QualifiedName>,
        name: Name,
    },
    This { qualifier: Option<QualifiedName> },
    Literal { value: Literal },
    /// `array[index]`.
    ArrayAccess { array: Box<Expr>, index: Box<Expr> },
    /// `new T[dims...]` or `new T[] { ... }`.
    ArrayCreation {
        ty: TypeRef,
        dims: Vec<Expr>,
        init: Option<Vec<Expr>>,
    },
    /// `{ a, b, c }` in a field, local or array-creation initializer.
    ArrayInit { values: Vec<Expr> },
    /// `new T(args)`; `body` is the anonymous class body, when present.
    New {
        ty: TypeRef,
        args: Vec<Expr>,
        body: Option<Vec<Member>>,
    },
    /// `receiver.name(args)` or an unqualified `name(args)`.
    Call {
        receiver: Option<Box<Expr>>,
        name: Name,
        args: Vec<Expr>,
    },
    /// `super.name(args)`.
    SuperCall { name: Name, args: Vec<Expr> },
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    IncDec { op: IncDecOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast { ty: TypeRef, expr: Box<Expr> },
    InstanceOf { expr: Box<Expr>, ty: TypeRef },
    Paren { inner: Box<Expr> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    Bool(bool),
    Char(char),
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    Str(String),
    Null,
    /// `T.class`.
    Class(TypeRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
    Rem,
    Shl,
    Shr,
    UShr,
}

impl AssignOp {
    #[must_use]
    pub fn is_compound(self) -> bool {
        self != AssignOp::Assign
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Rem => "%=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::UShr => ">>>=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOp {
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    #[must_use]
    pub fn is_prefix(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PreDec)
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            IncDecOp::PreInc | IncDecOp::PostInc => "++",
            IncDecOp::PreDec | IncDecOp::PostDec => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// Whether the operator yields the operands' common type rather than
    /// boolean.
    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Add | Sub | Mul | Div | Rem | Shl | Shr | UShr | BitAnd | BitOr | BitXor
        )
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
