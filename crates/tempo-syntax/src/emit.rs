//! Plain source rendering for rewritten trees.
//!
//! The output is compilable, four-space-indented Java in one fixed style;
//! preserving the input's formatting is a non-goal. Parentheses are inserted
//! from operator precedence, so synthesized expressions never render
//! ambiguously.

use std::fmt::Write;

use tempo_core::Visibility;

use crate::ast::*;

/// Render a whole compilation unit to source text.
#[must_use]
pub fn unit_to_source(unit: &CompilationUnit) -> String {
    let mut e = Emitter::new();
    e.unit(unit);
    e.out
}

/// Render a single expression; used by tests and diagnostics.
#[must_use]
pub fn expr_to_source(expr: &Expr) -> String {
    let mut e = Emitter::new();
    e.expr(expr, 0);
    e.out
}

struct Emitter {
    out: String,
    indent: usize,
    /// Simple name of the type declaration being emitted; constructors
    /// print it as their own name.
    enclosing_name: String,
}

impl Emitter {
    fn new() -> Self {
        Emitter {
            out: String::new(),
            indent: 0,
            enclosing_name: String::new(),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        if let Some(package) = &unit.package {
            if !package.is_empty() {
                self.line(&format!("package {package};"));
                self.line("");
            }
        }
        for import in &unit.imports {
            if import.on_demand {
                self.line(&format!("import {}.*;", import.name));
            } else {
                self.line(&format!("import {};", import.name));
            }
        }
        if !unit.imports.is_empty() {
            self.line("");
        }
        for (i, decl) in unit.types.iter().enumerate() {
            if i > 0 {
                self.line("");
            }
            self.type_decl(decl);
        }
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.start();
        let mods = modifiers(&decl.modifiers);
        self.out.push_str(&mods);
        match decl.kind {
            TypeDeclKind::Class => self.out.push_str("class "),
            TypeDeclKind::Interface => self.out.push_str("interface "),
        }
        self.out.push_str(decl.name.as_str());
        if let Some(superclass) = &decl.superclass {
            write!(self.out, " extends {}", superclass.source_name()).ok();
        }
        if !decl.interfaces.is_empty() {
            let names: Vec<String> = decl.interfaces.iter().map(TypeRef::source_name).collect();
            let keyword = match decl.kind {
                TypeDeclKind::Class => "implements",
                TypeDeclKind::Interface => "extends",
            };
            write!(self.out, " {keyword} {}", names.join(", ")).ok();
        }
        self.out.push_str(" {\n");
        self.indent += 1;
        self.with_enclosing(decl.name.as_str().to_string(), |e| {
            e.members(&decl.members);
        });
        self.indent -= 1;
        self.line("}");
    }

    fn members(&mut self, members: &[Member]) {
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                self.line("");
            }
            match member {
                Member::Field(field) => self.field(field),
                Member::Method(method) => self.method(method),
                Member::Constructor(ctor) => self.constructor(ctor),
                Member::Nested(decl) => self.type_decl(decl),
                Member::Initializer(init) => {
                    self.start();
                    if init.is_static {
                        self.out.push_str("static ");
                    }
                    self.out.push_str("{\n");
                    self.indent += 1;
                    for stmt in &init.body.stmts {
                        self.stmt(stmt);
                    }
                    self.indent -= 1;
                    self.line("}");
                }
            }
        }
    }

    fn field(&mut self, field: &FieldDecl) {
        self.start();
        self.out.push_str(&modifiers(&field.modifiers));
        write!(self.out, "{} {}", field.ty.source_name(), field.name).ok();
        if let Some(init) = &field.init {
            self.out.push_str(" = ");
            self.expr(init, 0);
        }
        self.out.push_str(";\n");
    }

    fn method(&mut self, method: &MethodDecl) {
        self.start();
        self.out.push_str(&modifiers(&method.modifiers));
        write!(
            self.out,
            "{} {}({})",
            method.return_type.source_name(),
            method.name,
            params(&method.params)
        )
        .ok();
        self.throws(&method.throws);
        match &method.body {
            Some(body) => {
                self.out.push_str(" {\n");
                self.indent += 1;
                for stmt in &body.stmts {
                    self.stmt(stmt);
                }
                self.indent -= 1;
                self.line("}");
            }
            None => self.out.push_str(";\n"),
        }
    }

    fn constructor(&mut self, ctor: &ConstructorDecl) {
        self.start();
        self.out.push_str(&modifiers(&ctor.modifiers));
        write!(self.out, "{}({})", self.enclosing_name, params(&ctor.params)).ok();
        self.throws(&ctor.throws);
        self.out.push_str(" {\n");
        self.indent += 1;
        for stmt in &ctor.body.stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn throws(&mut self, throws: &[tempo_core::QualifiedName]) {
        if !throws.is_empty() {
            let names: Vec<&str> = throws.iter().map(|t| t.as_str()).collect();
            write!(self.out, " throws {}", names.join(", ")).ok();
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => {
                self.line("{");
                self.indent += 1;
                for s in &block.stmts {
                    self.stmt(s);
                }
                self.indent -= 1;
                self.line("}");
            }
            Stmt::Local(local) => {
                self.start();
                if local.is_final {
                    self.out.push_str("final ");
                }
                write!(self.out, "{} {}", local.ty.source_name(), local.name).ok();
                if let Some(init) = &local.init {
                    self.out.push_str(" = ");
                    self.expr(init, 0);
                }
                self.out.push_str(";\n");
            }
            Stmt::Expr(expr) => {
                self.start();
                self.expr(expr, 0);
                self.out.push_str(";\n");
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.start();
                self.out.push_str("if (");
                self.expr(cond, 0);
                self.out.push_str(")\n");
                self.nested(then_branch);
                if let Some(else_branch) = else_branch {
                    self.line("else");
                    self.nested(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.start();
                self.out.push_str("while (");
                self.expr(cond, 0);
                self.out.push_str(")\n");
                self.nested(body);
            }
            Stmt::DoWhile { body, cond } => {
                self.line("do");
                self.nested(body);
                self.start();
                self.out.push_str("while (");
                self.expr(cond, 0);
                self.out.push_str(");\n");
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.start();
                self.out.push_str("for (");
                for (i, fi) in init.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match fi {
                        ForInit::Local(local) => {
                            write!(self.out, "{} {}", local.ty.source_name(), local.name).ok();
                            if let Some(e) = &local.init {
                                self.out.push_str(" = ");
                                self.expr(e, 0);
                            }
                        }
                        ForInit::Expr(e) => self.expr(e, 0),
                    }
                }
                self.out.push_str("; ");
                if let Some(cond) = cond {
                    self.expr(cond, 0);
                }
                self.out.push_str("; ");
                for (i, e) in update.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(e, 0);
                }
                self.out.push_str(")\n");
                self.nested(body);
            }
            Stmt::ForEach {
                param,
                iterable,
                body,
            } => {
                self.start();
                write!(self.out, "for ({} {} : ", param.ty.source_name(), param.name).ok();
                self.expr(iterable, 0);
                self.out.push_str(")\n");
                self.nested(body);
            }
            Stmt::Switch { selector, arms } => {
                self.start();
                self.out.push_str("switch (");
                self.expr(selector, 0);
                self.out.push_str(") {\n");
                self.indent += 1;
                for arm in arms {
                    for label in &arm.labels {
                        match label {
                            Some(e) => {
                                self.start();
                                self.out.push_str("case ");
                                self.expr(e, 0);
                                self.out.push_str(":\n");
                            }
                            None => self.line("default:"),
                        }
                    }
                    self.indent += 1;
                    for s in &arm.stmts {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line("}");
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.line("try {");
                self.indent += 1;
                for s in &body.stmts {
                    self.stmt(s);
                }
                self.indent -= 1;
                for catch in catches {
                    self.line(&format!(
                        "}} catch ({} {}) {{",
                        catch.param.ty.source_name(),
                        catch.param.name
                    ));
                    self.indent += 1;
                    for s in &catch.body.stmts {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                if let Some(finally) = finally {
                    self.line("} finally {");
                    self.indent += 1;
                    for s in &finally.stmts {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.line("}");
            }
            Stmt::Return(expr) => {
                self.start();
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    self.expr(expr, 0);
                }
                self.out.push_str(";\n");
            }
            Stmt::Throw(expr) => {
                self.start();
                self.out.push_str("throw ");
                self.expr(expr, 0);
                self.out.push_str(";\n");
            }
            Stmt::Break(label) => match label {
                Some(label) => self.line(&format!("break {label};")),
                None => self.line("break;"),
            },
            Stmt::Continue(label) => match label {
                Some(label) => self.line(&format!("continue {label};")),
                None => self.line("continue;"),
            },
            Stmt::Labeled { label, stmt } => {
                self.line(&format!("{label}:"));
                self.nested(stmt);
            }
            Stmt::ThisConstructorCall(args) => {
                self.start();
                self.out.push_str("this(");
                self.args(args);
                self.out.push_str(");\n");
            }
            Stmt::SuperConstructorCall(args) => {
                self.start();
                self.out.push_str("super(");
                self.args(args);
                self.out.push_str(");\n");
            }
            Stmt::LocalType(decl) => self.type_decl(decl),
            Stmt::Empty => self.line(";"),
        }
    }

    /// A statement in a control-flow position: blocks stay flush, anything
    /// else gets one extra level.
    fn nested(&mut self, stmt: &Stmt) {
        if matches!(stmt, Stmt::Block(_)) {
            self.stmt(stmt);
        } else {
            self.indent += 1;
            self.stmt(stmt);
            self.indent -= 1;
        }
    }

    fn args(&mut self, args: &[Expr]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg, 0);
        }
    }

    fn expr(&mut self, expr: &Expr, min_prec: u8) {
        let prec = precedence(&expr.kind);
        if prec < min_prec {
            self.out.push('(');
            self.expr_inner(expr);
            self.out.push(')');
        } else {
            self.expr_inner(expr);
        }
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Name { name } => {
                self.out.push_str(name.as_str());
            }
            ExprKind::FieldAccess { object, name } => {
                self.expr(object, PREC_PRIMARY);
                write!(self.out, ".{name}").ok();
            }
            ExprKind::SuperFieldAccess { qualifier, name } => {
                if let Some(qualifier) = qualifier {
                    write!(self.out, "{qualifier}.").ok();
                }
                write!(self.out, "super.{name}").ok();
            }
            ExprKind::This { qualifier } => {
                if let Some(qualifier) = qualifier {
                    write!(self.out, "{qualifier}.").ok();
                }
                self.out.push_str("this");
            }
            ExprKind::Literal { value } => self.literal(value),
            ExprKind::ArrayAccess { array, index } => {
                self.expr(array, PREC_PRIMARY);
                self.out.push('[');
                self.expr(index, 0);
                self.out.push(']');
            }
            ExprKind::ArrayCreation { ty, dims, init } => {
                let element = ty.element();
                self.out.push_str("new ");
                self.out.push_str(&element.source_name());
                let total = ty.dimensions();
                for dim in dims {
                    self.out.push('[');
                    self.expr(dim, 0);
                    self.out.push(']');
                }
                for _ in dims.len()..total {
                    self.out.push_str("[]");
                }
                if let Some(values) = init {
                    self.out.push_str(" { ");
                    self.args(values);
                    self.out.push_str(" }");
                }
            }
            ExprKind::ArrayInit { values } => {
                self.out.push_str("{ ");
                self.args(values);
                self.out.push_str(" }");
            }
            ExprKind::New { ty, args, body } => {
                write!(self.out, "new {}(", ty.source_name()).ok();
                self.args(args);
                self.out.push(')');
                if let Some(members) = body {
                    self.out.push_str(" {\n");
                    self.indent += 1;
                    self.members(members);
                    self.indent -= 1;
                    self.start();
                    self.out.push('}');
                }
            }
            ExprKind::Call {
                receiver,
                name,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver, PREC_PRIMARY);
                    self.out.push('.');
                }
                write!(self.out, "{name}(").ok();
                self.args(args);
                self.out.push(')');
            }
            ExprKind::SuperCall { name, args } => {
                write!(self.out, "super.{name}(").ok();
                self.args(args);
                self.out.push(')');
            }
            ExprKind::Assign { op, lhs, rhs } => {
                self.expr(lhs, PREC_UNARY);
                write!(self.out, " {} ", op.token()).ok();
                self.expr(rhs, PREC_ASSIGN);
            }
            ExprKind::Unary { op, operand } => {
                self.out.push_str(op.token());
                self.expr(operand, PREC_UNARY);
            }
            ExprKind::IncDec { op, operand } => {
                if op.is_prefix() {
                    self.out.push_str(op.token());
                    self.expr(operand, PREC_UNARY);
                } else {
                    self.expr(operand, PREC_POSTFIX);
                    self.out.push_str(op.token());
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = precedence(&expr.kind);
                self.expr(lhs, prec);
                write!(self.out, " {} ", op.token()).ok();
                self.expr(rhs, prec + 1);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, PREC_CONDITIONAL + 1);
                self.out.push_str(" ? ");
                self.expr(then_expr, PREC_ASSIGN);
                self.out.push_str(" : ");
                self.expr(else_expr, PREC_ASSIGN);
            }
            ExprKind::Cast { ty, expr } => {
                write!(self.out, "({})", ty.source_name()).ok();
                self.expr(expr, PREC_UNARY);
            }
            ExprKind::InstanceOf { expr, ty } => {
                self.expr(expr, PREC_RELATIONAL);
                write!(self.out, " instanceof {}", ty.source_name()).ok();
            }
            ExprKind::Paren { inner } => {
                self.out.push('(');
                self.expr(inner, 0);
                self.out.push(')');
            }
        }
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Bool(v) => write!(self.out, "{v}").ok(),
            Literal::Char(c) => write!(self.out, "'{}'", escape_char(*c)).ok(),
            Literal::Int(v) => write!(self.out, "{v}").ok(),
            Literal::Long(v) => write!(self.out, "{v}L").ok(),
            Literal::Float(v) => write!(self.out, "{v}f").ok(),
            Literal::Double(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(self.out, "{v:.1}").ok()
                } else {
                    write!(self.out, "{v}").ok()
                }
            }
            Literal::Str(s) => write!(self.out, "\"{}\"", escape_string(s)).ok(),
            Literal::Null => {
                self.out.push_str("null");
                Some(())
            }
            Literal::Class(ty) => write!(self.out, "{}.class", ty.source_name()).ok(),
        };
    }

    // Set while emitting a type declaration so constructors can print the
    // class name.
    fn with_enclosing<R>(&mut self, name: String, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.enclosing_name, name);
        let result = f(self);
        self.enclosing_name = previous;
        result
    }
}

const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_RELATIONAL: u8 = 9;
const PREC_UNARY: u8 = 14;
const PREC_POSTFIX: u8 = 15;
const PREC_PRIMARY: u8 = 16;

fn precedence(kind: &ExprKind) -> u8 {
    match kind {
        ExprKind::Assign { .. } => PREC_ASSIGN,
        ExprKind::Conditional { .. } => PREC_CONDITIONAL,
        ExprKind::Binary { op, .. } => match op {
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Eq | BinaryOp::Ne => 8,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => PREC_RELATIONAL,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 10,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 12,
        },
        ExprKind::InstanceOf { .. } => PREC_RELATIONAL,
        ExprKind::Cast { .. } | ExprKind::Unary { .. } => PREC_UNARY,
        ExprKind::IncDec { op, .. } => {
            if op.is_prefix() {
                PREC_UNARY
            } else {
                PREC_POSTFIX
            }
        }
        _ => PREC_PRIMARY,
    }
}

fn modifiers(mods: &tempo_core::Modifiers) -> String {
    let mut out = String::new();
    match mods.visibility {
        Visibility::Public => out.push_str("public "),
        Visibility::Protected => out.push_str("protected "),
        Visibility::Package => {}
        Visibility::Private => out.push_str("private "),
    }
    if mods.is_abstract {
        out.push_str("abstract ");
    }
    if mods.is_static {
        out.push_str("static ");
    }
    if mods.is_final {
        out.push_str("final ");
    }
    if mods.is_transient {
        out.push_str("transient ");
    }
    out
}

fn params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", p.ty.source_name(), p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_char(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        other => other.to_string(),
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
