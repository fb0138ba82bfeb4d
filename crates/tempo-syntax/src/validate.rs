//! Structural well-formedness checks run before a unit is rewritten.
//!
//! The parser is trusted for syntax; these checks catch trees that are
//! shaped wrong in ways the rewrite engine would otherwise trip over.

use thiserror::Error;

use crate::ast::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("`{0}(...)` constructor call is only allowed as the first statement of a constructor")]
    MisplacedConstructorCall(&'static str),
    #[error("array initializer used outside a declaration or array creation")]
    MisplacedArrayInit,
    #[error("interface `{0}` declares a constructor")]
    InterfaceConstructor(String),
    #[error("compilation unit declares no types")]
    EmptyUnit,
}

/// Check a compilation unit; the first violation found is returned.
pub fn validate(unit: &CompilationUnit) -> Result<(), SyntaxError> {
    if unit.types.is_empty() {
        return Err(SyntaxError::EmptyUnit);
    }
    for decl in &unit.types {
        validate_type(decl)?;
    }
    Ok(())
}

fn validate_type(decl: &TypeDecl) -> Result<(), SyntaxError> {
    for member in &decl.members {
        match member {
            Member::Field(field) => {
                if let Some(init) = &field.init {
                    validate_init_expr(init)?;
                }
            }
            Member::Method(method) => {
                if let Some(body) = &method.body {
                    validate_block(body, false)?;
                }
            }
            Member::Constructor(ctor) => {
                if decl.kind == TypeDeclKind::Interface {
                    return Err(SyntaxError::InterfaceConstructor(
                        decl.name.as_str().to_string(),
                    ));
                }
                validate_block(&ctor.body, true)?;
            }
            Member::Nested(nested) => validate_type(nested)?,
            Member::Initializer(init) => validate_block(&init.body, false)?,
        }
    }
    Ok(())
}

fn validate_block(block: &Block, constructor_body: bool) -> Result<(), SyntaxError> {
    for (i, stmt) in block.stmts.iter().enumerate() {
        let first = constructor_body && i == 0;
        validate_stmt(stmt, first)?;
    }
    Ok(())
}

fn validate_stmt(stmt: &Stmt, first_in_constructor: bool) -> Result<(), SyntaxError> {
    match stmt {
        Stmt::ThisConstructorCall(args) => {
            if !first_in_constructor {
                return Err(SyntaxError::MisplacedConstructorCall("this"));
            }
            args.iter().try_for_each(validate_expr)
        }
        Stmt::SuperConstructorCall(args) => {
            if !first_in_constructor {
                return Err(SyntaxError::MisplacedConstructorCall("super"));
            }
            args.iter().try_for_each(validate_expr)
        }
        Stmt::Block(block) => validate_block(block, false),
        Stmt::Local(local) => match &local.init {
            Some(init) => validate_init_expr(init),
            None => Ok(()),
        },
        Stmt::Expr(expr) => validate_expr(expr),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            validate_expr(cond)?;
            validate_stmt(then_branch, false)?;
            match else_branch {
                Some(else_branch) => validate_stmt(else_branch, false),
                None => Ok(()),
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            validate_expr(cond)?;
            validate_stmt(body, false)
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
                        if let Some(e) = &local.init {
                            validate_init_expr(e)?;
                        }
                    }
                    ForInit::Expr(e) => validate_expr(e)?,
                }
            }
            if let Some(cond) = cond {
                validate_expr(cond)?;
            }
            update.iter().try_for_each(validate_expr)?;
            validate_stmt(body, false)
        }
        Stmt::ForEach { iterable, body, .. } => {
            validate_expr(iterable)?;
            validate_stmt(body, false)
        }
        Stmt::Switch { selector, arms } => {
            validate_expr(selector)?;
            for arm in arms {
                for label in arm.labels.iter().flatten() {
                    validate_expr(label)?;
                }
                for s in &arm.stmts {
                    validate_stmt(s, false)?;
                }
            }
            Ok(())
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            validate_block(body, false)?;
            for catch in catches {
                validate_block(&catch.body, false)?;
            }
            match finally {
                Some(finally) => validate_block(finally, false),
                None => Ok(()),
            }
        }
        Stmt::Return(expr) => match expr {
            Some(expr) => validate_expr(expr),
            None => Ok(()),
        },
        Stmt::Throw(expr) => validate_expr(expr),
        Stmt::Labeled { stmt, .. } => validate_stmt(stmt, false),
        Stmt::LocalType(decl) => validate_type(decl),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => Ok(()),
    }
}

/// Initializer position: a bare array initializer is allowed here.
fn validate_init_expr(expr: &Expr) -> Result<(), SyntaxError> {
    match &expr.kind {
        ExprKind::ArrayInit { values } => values.iter().try_for_each(validate_init_expr),
        _ => validate_expr(expr),
    }
}

fn validate_expr(expr: &Expr) -> Result<(), SyntaxError> {
    match &expr.kind {
        ExprKind::ArrayInit { .. } => Err(SyntaxError::MisplacedArrayInit),
        ExprKind::Name { .. }
        | ExprKind::This { .. }
        | ExprKind::Literal { .. }
        | ExprKind::SuperFieldAccess { .. } => Ok(()),
        ExprKind::FieldAccess { object, .. } => validate_expr(object),
        ExprKind::ArrayAccess { array, index } => {
            validate_expr(array)?;
            validate_expr(index)
        }
        ExprKind::ArrayCreation { dims, init, .. } => {
            dims.iter().try_for_each(validate_expr)?;
            match init {
                Some(values) => values.iter().try_for_each(validate_init_expr),
                None => Ok(()),
            }
        }
        ExprKind::New { args, body, .. } => {
            args.iter().try_for_each(validate_expr)?;
            if let Some(members) = body {
                for member in members {
                    if let Member::Nested(decl) = member {
                        validate_type(decl)?;
                    }
                }
            }
            Ok(())
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                validate_expr(receiver)?;
            }
            args.iter().try_for_each(validate_expr)
        }
        ExprKind::SuperCall { args, .. } => args.iter().try_for_each(validate_expr),
        ExprKind::Assign { lhs, rhs, .. } => {
            validate_expr(lhs)?;
            validate_expr(rhs)
        }
        ExprKind::Unary { operand, .. } | ExprKind::IncDec { operand, .. } => {
            validate_expr(operand)
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            validate_expr(lhs)?;
            validate_expr(rhs)
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            validate_expr(cond)?;
            validate_expr(then_expr)?;
            validate_expr(else_expr)
        }
        ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => validate_expr(expr),
        ExprKind::Paren { inner } => validate_expr(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;

    #[test]
    fn misplaced_super_call_is_rejected() {
        let decl = build::class(
            "Bad",
            vec![build::method(
                "m",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![Stmt::SuperConstructorCall(vec![])]),
            )],
        );
        let unit = build::unit(None, vec![decl]);
        assert_eq!(
            validate(&unit),
            Err(SyntaxError::MisplacedConstructorCall("super"))
        );
    }

    #[test]
    fn array_initializer_in_declaration_is_accepted() {
        let decl = build::class(
            "Ok",
            vec![build::field(
                tempo_core::Modifiers::private(),
                build::int_ty().array(),
                "a",
                Some(build::array_init(vec![build::int(0), build::int(0)])),
            )],
        );
        let unit = build::unit(Some("demo"), vec![decl]);
        assert_eq!(validate(&unit), Ok(()));
    }
}
