//! The single depth-first traversal. Every expression node is resolved to a
//! type and owner before its exit events fire, so handlers always observe
//! fully resolved children. Members of a declaration are visited fields
//! first, then nested declarations, then methods and constructors, then
//! initializers; nested-declaration naming depends on this order.

use tempo_core::TypeName;
use tempo_resolve::{ClassKind, ClassMetadataProvider, ClassSummary, FieldSummary, MethodSummary};
use tempo_syntax::{
    sorted_member_indices, Block, CompilationUnit, Expr, ExprKind, ForInit, Literal, Member,
    Param, Stmt, TypeDecl, TypeDeclKind, TypeRef,
};
use tempo_types::TypeAndOwner;
use tracing::trace;

use crate::error::TransformError;
use crate::session::RewriteSession;

impl RewriteSession {
    pub(crate) fn walk_unit(&mut self, unit: &mut CompilationUnit) -> Result<(), TransformError> {
        let package = self.core.resolver.current_package().to_string();
        for decl in &mut unit.types {
            let binary = if package.is_empty() {
                decl.name.as_str().to_string()
            } else {
                format!("{package}.{}", decl.name)
            };
            self.walk_type_decl(decl, TypeName::new(binary))?;
        }
        Ok(())
    }

    fn walk_type_decl(
        &mut self,
        decl: &mut TypeDecl,
        binary: TypeName,
    ) -> Result<(), TransformError> {
        trace!(class = %binary, "entering declaration");
        self.core.add_cross_analyzed(binary.as_str());
        self.core.resolver.classes.enter(binary.clone());
        self.core.open_class_scope(&binary);

        let order = sorted_member_indices(&decl.members);
        for idx in order {
            self.walk_member(&mut decl.members[idx], &binary)?;
        }

        if decl.kind == TypeDeclKind::Class {
            self.handlers.on_class_exit(
                &mut self.core,
                &binary,
                &mut decl.members,
                Some(&mut decl.interfaces),
            )?;
        }

        self.core.resolver.scopes.pop();
        self.core.resolver.classes.leave();
        Ok(())
    }

    fn walk_member(
        &mut self,
        member: &mut Member,
        binary: &TypeName,
    ) -> Result<(), TransformError> {
        match member {
            Member::Field(field) => {
                if let Some(init) = &mut field.init {
                    self.walk_initializer_expr(init)?;
                    self.handlers.on_alias_site(&mut self.core, init)?;
                }
                Ok(())
            }
            Member::Nested(nested) => {
                let child = binary.nested(nested.name.as_str());
                self.walk_type_decl(nested, child)
            }
            Member::Method(method) => {
                self.core.resolver.scopes.push();
                self.declare_params(&method.params)?;
                if let Some(body) = &mut method.body {
                    self.walk_block(body)?;
                }
                self.core.resolver.scopes.pop();
                Ok(())
            }
            Member::Constructor(ctor) => {
                self.core.resolver.scopes.push();
                self.declare_params(&ctor.params)?;
                self.walk_block(&mut ctor.body)?;
                self.core.resolver.scopes.pop();
                Ok(())
            }
            Member::Initializer(init) => self.walk_block(&mut init.body),
        }
    }

    fn declare_params(&mut self, params: &[Param]) -> Result<(), TransformError> {
        for param in params {
            let ty = self.core.resolve_type_ref(&param.ty)?;
            self.core.resolver.scopes.declare(param.name.as_str(), ty);
        }
        Ok(())
    }

    fn walk_block(&mut self, block: &mut Block) -> Result<(), TransformError> {
        self.core.resolver.scopes.push();
        for stmt in &mut block.stmts {
            self.walk_stmt(stmt)?;
        }
        self.core.resolver.scopes.pop();
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &mut Stmt) -> Result<(), TransformError> {
        match stmt {
            Stmt::Block(block) => self.walk_block(block),
            Stmt::Local(local) => {
                if let Some(init) = &mut local.init {
                    self.walk_initializer_expr(init)?;
                    self.handlers.on_alias_site(&mut self.core, init)?;
                }
                let ty = self.core.resolve_type_ref(&local.ty)?;
                self.core.resolver.scopes.declare(local.name.as_str(), ty);
                Ok(())
            }
            Stmt::Expr(expr) => self.walk_expr(expr).map(|_| ()),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk_expr(cond)?;
                self.walk_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.walk_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                self.walk_expr(cond)?;
                self.walk_stmt(body)
            }
            Stmt::DoWhile { body, cond } => {
                self.walk_stmt(body)?;
                self.walk_expr(cond).map(|_| ())
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.core.resolver.scopes.push();
                for fi in init {
                    match fi {
                        ForInit::Local(local) => {
                            if let Some(e) = &mut local.init {
                                self.walk_initializer_expr(e)?;
                            }
                            let ty = self.core.resolve_type_ref(&local.ty)?;
                            self.core.resolver.scopes.declare(local.name.as_str(), ty);
                        }
                        ForInit::Expr(e) => {
                            self.walk_expr(e)?;
                        }
                    }
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond)?;
                }
                for e in update {
                    self.walk_expr(e)?;
                }
                self.walk_stmt(body)?;
                self.core.resolver.scopes.pop();
                Ok(())
            }
            Stmt::ForEach {
                param,
                iterable,
                body,
            } => {
                self.core.resolver.scopes.push();
                self.walk_expr(iterable)?;
                let ty = self.core.resolve_type_ref(&param.ty)?;
                self.core.resolver.scopes.declare(param.name.as_str(), ty);
                self.walk_stmt(body)?;
                self.core.resolver.scopes.pop();
                Ok(())
            }
            Stmt::Switch { selector, arms } => {
                self.walk_expr(selector)?;
                for arm in arms {
                    for label in arm.labels.iter_mut().flatten() {
                        self.walk_expr(label)?;
                    }
                    for s in &mut arm.stmts {
                        self.walk_stmt(s)?;
                    }
                }
                Ok(())
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.walk_block(body)?;
                for catch in catches {
                    self.core.resolver.scopes.push();
                    let ty = self.core.resolve_type_ref(&catch.param.ty)?;
                    self.core
                        .resolver
                        .scopes
                        .declare(catch.param.name.as_str(), ty);
                    self.walk_block(&mut catch.body)?;
                    self.core.resolver.scopes.pop();
                }
                if let Some(finally) = finally {
                    self.walk_block(finally)?;
                }
                Ok(())
            }
            Stmt::Return(expr) => {
                if let Some(expr) = expr {
                    self.walk_expr(expr)?;
                    self.handlers.on_alias_site(&mut self.core, expr)?;
                }
                Ok(())
            }
            Stmt::Throw(expr) => self.walk_expr(expr).map(|_| ()),
            Stmt::Labeled { stmt, .. } => self.walk_stmt(stmt),
            Stmt::ThisConstructorCall(args) | Stmt::SuperConstructorCall(args) => {
                for arg in args.iter_mut() {
                    self.walk_expr(arg)?;
                    self.handlers.on_alias_site(&mut self.core, arg)?;
                }
                Ok(())
            }
            Stmt::LocalType(decl) => {
                let simple = decl.name.as_str().to_string();
                let binary = {
                    let context = self
                        .core
                        .resolver
                        .classes
                        .current_mut()
                        .ok_or(TransformError::UnknownConstruct("local class outside a class"))?;
                    let binary = context.next_nested_name(Some(&simple));
                    context.record_local_class(&simple, binary.clone());
                    binary
                };
                self.summarize_type_decl(decl, &binary)?;
                self.walk_type_decl(decl, binary)
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => Ok(()),
        }
    }

    /// A field or local initializer: a bare array initializer is walked
    /// element-wise, anything else is an ordinary expression.
    fn walk_initializer_expr(&mut self, expr: &mut Expr) -> Result<TypeAndOwner, TransformError> {
        if let ExprKind::ArrayInit { values } = &mut expr.kind {
            for value in values {
                self.walk_initializer_expr(value)?;
            }
            let null_ty = self.core.types.intern("null");
            let to = TypeAndOwner::unowned(null_ty);
            expr.resolved = Some(to);
            return Ok(to);
        }
        self.walk_expr(expr)
    }

    fn walk_expr(&mut self, expr: &mut Expr) -> Result<TypeAndOwner, TransformError> {
        let to: TypeAndOwner = match &mut expr.kind {
            ExprKind::Name { name } => self.resolve_name_expr(name.as_str())?,
            ExprKind::FieldAccess { object, name } => {
                let object_to = self.walk_expr(object)?;
                let class = self.core.types.name(object_to.ty).to_string();
                let name = name.as_str().to_string();
                self.core
                    .resolve_from_class(&class, &name)?
                    .ok_or_else(|| TransformError::UnresolvedName { scope: class, name })?
            }
            ExprKind::SuperFieldAccess { qualifier, name } => {
                let class = match qualifier {
                    Some(qualifier) => self
                        .core
                        .resolver
                        .lookup_class(&self.core.symbols, qualifier.as_str())
                        .map(|c| c.as_str().to_string())
                        .unwrap_or_else(|| qualifier.as_str().to_string()),
                    None => self.current_class_name()?,
                };
                let superclass = self.superclass_of(&class)?;
                let name = name.as_str().to_string();
                self.core
                    .resolve_from_class(&superclass, &name)?
                    .ok_or(TransformError::UnresolvedName {
                        scope: superclass,
                        name,
                    })?
            }
            ExprKind::This { qualifier } => {
                let class = match qualifier {
                    Some(qualifier) => self
                        .core
                        .resolver
                        .lookup_class(&self.core.symbols, qualifier.as_str())
                        .ok_or_else(|| {
                            TransformError::ClassResolution(qualifier.as_str().to_string())
                        })?
                        .as_str()
                        .to_string(),
                    None => self.current_class_name()?,
                };
                TypeAndOwner::unowned(self.core.types.intern(&class))
            }
            ExprKind::Literal { value } => {
                let name = match value {
                    Literal::Bool(_) => "boolean",
                    Literal::Char(_) => "char",
                    Literal::Int(_) => "int",
                    Literal::Long(_) => "long",
                    Literal::Float(_) => "float",
                    Literal::Double(_) => "double",
                    Literal::Str(_) => "java.lang.String",
                    Literal::Null => "null",
                    Literal::Class(_) => "java.lang.Class",
                };
                TypeAndOwner::unowned(self.core.types.intern(name))
            }
            ExprKind::ArrayAccess { array, index } => {
                let array_to = self.walk_expr(array)?;
                self.walk_expr(index)?;
                let element = self
                    .core
                    .types
                    .remove_dimension(array_to.ty)
                    .map_err(|e| TransformError::ClassResolution(e.to_string()))?;
                // Owner rides along so index writes can find their field.
                TypeAndOwner {
                    ty: element,
                    owner: array_to.owner,
                }
            }
            ExprKind::ArrayCreation { ty, dims, init } => {
                let ty = ty.clone();
                for dim in dims.iter_mut() {
                    self.walk_expr(dim)?;
                }
                if let Some(values) = init {
                    for value in values.iter_mut() {
                        self.walk_initializer_expr(value)?;
                    }
                }
                TypeAndOwner::unowned(self.core.resolve_type_ref(&ty)?)
            }
            ExprKind::ArrayInit { values } => {
                for value in values.iter_mut() {
                    self.walk_initializer_expr(value)?;
                }
                TypeAndOwner::unowned(self.core.types.intern("null"))
            }
            ExprKind::New { ty, args, body } => {
                let ty = ty.clone();
                for arg in args.iter_mut() {
                    self.walk_expr(arg)?;
                }
                let class_ty = self.core.resolve_type_ref(&ty)?;
                for arg in args.iter_mut() {
                    self.handlers.on_alias_site(&mut self.core, arg)?;
                }
                if let Some(members) = body {
                    let class = self.core.types.name(class_ty).to_string();
                    self.walk_anonymous_body(&class, members)?;
                }
                TypeAndOwner::unowned(class_ty)
            }
            ExprKind::Call {
                receiver,
                name,
                args,
            } => {
                let name = name.as_str().to_string();
                let owner_class = match receiver {
                    Some(receiver) => {
                        let to = self.walk_expr(receiver)?;
                        Some(self.core.types.name(to.ty).to_string())
                    }
                    None => None,
                };
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_types.push(self.walk_expr(arg)?.ty);
                }
                let found = self
                    .core
                    .resolve_method(owner_class.as_deref(), &name, &arg_types)?;
                let found = match found {
                    Some(found) => found,
                    None => {
                        let scope = match owner_class {
                            Some(owner) => owner,
                            None => self.current_class_name()?,
                        };
                        return Err(TransformError::UnresolvedName { scope, name });
                    }
                };
                for arg in args.iter_mut() {
                    self.handlers.on_alias_site(&mut self.core, arg)?;
                }
                found
            }
            ExprKind::SuperCall { name, args } => {
                let name = name.as_str().to_string();
                let class = self.current_class_name()?;
                let superclass = self.superclass_of(&class)?;
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_types.push(self.walk_expr(arg)?.ty);
                }
                let found = self
                    .core
                    .resolve_method(Some(&superclass), &name, &arg_types)?
                    .ok_or(TransformError::UnresolvedName {
                        scope: superclass,
                        name,
                    })?;
                for arg in args.iter_mut() {
                    self.handlers.on_alias_site(&mut self.core, arg)?;
                }
                found
            }
            ExprKind::Assign { lhs, rhs, .. } => {
                let lhs_to = self.walk_expr(lhs)?;
                self.walk_expr(rhs)?;
                lhs_to
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(operand)?,
            ExprKind::IncDec { operand, .. } => self.walk_expr(operand)?,
            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs_to = self.walk_expr(lhs)?;
                let rhs_to = self.walk_expr(rhs)?;
                if op.is_arithmetic() {
                    let common = self.core.types.common_type(lhs_to.ty, rhs_to.ty).ok_or(
                        TransformError::UnknownConstruct("operands with no common type"),
                    )?;
                    TypeAndOwner::unowned(common)
                } else {
                    TypeAndOwner::unowned(self.core.types.intern("boolean"))
                }
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.walk_expr(cond)?;
                let then_to = self.walk_expr(then_expr)?;
                let else_to = self.walk_expr(else_expr)?;
                self.branch_type(then_to.ty, else_to.ty)?
            }
            ExprKind::Cast { ty, expr: inner } => {
                let ty = ty.clone();
                let inner_to = self.walk_expr(inner)?;
                TypeAndOwner {
                    ty: self.core.resolve_type_ref(&ty)?,
                    owner: inner_to.owner,
                }
            }
            ExprKind::InstanceOf { expr: inner, ty } => {
                let ty = ty.clone();
                self.walk_expr(inner)?;
                self.core.resolve_type_ref(&ty)?;
                TypeAndOwner::unowned(self.core.types.intern("boolean"))
            }
            ExprKind::Paren { inner } => self.walk_expr(inner)?,
        };

        expr.resolved = Some(to);

        match &expr.kind {
            ExprKind::Assign { .. } => self.handlers.on_assignment(&mut self.core, expr)?,
            ExprKind::IncDec { .. } => self.handlers.on_inc_dec(&mut self.core, expr)?,
            ExprKind::New { .. } => {
                let site = self.core.construction_sites;
                self.core.construction_sites += 1;
                self.handlers.on_construction(&mut self.core, expr, site)?;
            }
            _ => {}
        }

        Ok(to)
    }

    /// Resolve a simple or dotted name: scopes and reachable classes first,
    /// then a growing class prefix with the remaining segments as members.
    fn resolve_name_expr(&mut self, text: &str) -> Result<TypeAndOwner, TransformError> {
        if !text.contains('.') {
            return self
                .core
                .resolve_simple(text, None)?
                .ok_or_else(|| TransformError::UnresolvedName {
                    scope: self.current_class_name().unwrap_or_default(),
                    name: text.to_string(),
                });
        }

        let segments: Vec<&str> = text.split('.').collect();
        let mut consumed = 1;
        let mut current = self.core.resolve_simple(segments[0], None)?;

        if current.is_none() {
            for end in 1..=segments.len() {
                let prefix = segments[..end].join(".");
                if let Some(class) = self.core.resolver.lookup_class(&self.core.symbols, &prefix) {
                    let class = class.as_str().to_string();
                    current = Some(TypeAndOwner::unowned(self.core.types.intern(&class)));
                    consumed = end;
                    break;
                }
            }
        }

        let mut current = current.ok_or_else(|| TransformError::UnresolvedName {
            scope: self.current_class_name().unwrap_or_default(),
            name: text.to_string(),
        })?;

        for segment in &segments[consumed..] {
            let class = self.core.types.name(current.ty).to_string();
            current = self
                .core
                .resolve_from_class(&class, segment)?
                .ok_or_else(|| TransformError::UnresolvedName {
                    scope: class,
                    name: (*segment).to_string(),
                })?;
        }

        Ok(current)
    }

    /// The common type of the two branches of a conditional, falling back
    /// to whichever branch the other is compatible with.
    fn branch_type(
        &mut self,
        then_ty: tempo_types::TypeId,
        else_ty: tempo_types::TypeId,
    ) -> Result<TypeAndOwner, TransformError> {
        if let Some(common) = self.core.types.common_type(then_ty, else_ty) {
            return Ok(TypeAndOwner::unowned(common));
        }
        let graph = tempo_resolve::MetadataGraph(&self.core.symbols);
        if let Ok(rating) = self.core.types.compatibility(then_ty, else_ty, &graph) {
            if rating >= 0 {
                return Ok(TypeAndOwner::unowned(else_ty));
            }
        }
        if let Ok(rating) = self.core.types.compatibility(else_ty, then_ty, &graph) {
            if rating >= 0 {
                return Ok(TypeAndOwner::unowned(then_ty));
            }
        }
        Err(TransformError::UnknownConstruct(
            "conditional branches with no common type",
        ))
    }

    fn current_class_name(&self) -> Result<String, TransformError> {
        self.core
            .resolver
            .classes
            .current_class()
            .map(|c| c.as_str().to_string())
            .ok_or(TransformError::UnknownConstruct(
                "expression outside a class declaration",
            ))
    }

    fn superclass_of(&self, class: &str) -> Result<String, TransformError> {
        let summary = self
            .core
            .symbols
            .summary(class)
            .ok_or_else(|| TransformError::ClassResolution(class.to_string()))?;
        Ok(summary
            .superclass
            .clone()
            .unwrap_or_else(|| tempo_resolve::OBJECT.to_string()))
    }

    /// An anonymous class body: assign the canonical nested name, register
    /// a summary built from the body, and walk it like a declaration.
    fn walk_anonymous_body(
        &mut self,
        target_class: &str,
        members: &mut Vec<Member>,
    ) -> Result<(), TransformError> {
        let name = self
            .core
            .resolver
            .classes
            .current_mut()
            .ok_or(TransformError::UnknownConstruct(
                "anonymous class outside a class",
            ))?
            .next_nested_name(None);

        let target_kind = self
            .core
            .symbols
            .summary(target_class)
            .map(|s| s.kind)
            .unwrap_or(ClassKind::Class);

        let mut summary = ClassSummary::new(name.as_str());
        match target_kind {
            ClassKind::Interface => {
                summary.superclass = Some(tempo_resolve::OBJECT.to_string());
                summary.interfaces = vec![target_class.to_string()];
            }
            ClassKind::Class => summary.superclass = Some(target_class.to_string()),
        }
        self.summarize_members(&mut summary, members)?;
        self.core.symbols.insert(summary);

        self.core.add_cross_analyzed(name.as_str());
        self.core.resolver.classes.enter(name.clone());
        self.core.open_class_scope(&name);

        let order = sorted_member_indices(members);
        for idx in order {
            self.walk_member(&mut members[idx], &name)?;
        }
        self.handlers
            .on_class_exit(&mut self.core, &name, members, None)?;

        self.core.resolver.scopes.pop();
        self.core.resolver.classes.leave();
        Ok(())
    }

    /// Register summaries for a local class declaration and its named
    /// nested declarations; the walker reaches them before any reference
    /// can, so walk-time registration is sufficient.
    fn summarize_type_decl(
        &mut self,
        decl: &TypeDecl,
        binary: &TypeName,
    ) -> Result<(), TransformError> {
        let mut summary = ClassSummary::new(binary.as_str());
        summary.kind = match decl.kind {
            TypeDeclKind::Class => ClassKind::Class,
            TypeDeclKind::Interface => ClassKind::Interface,
        };
        summary.superclass = match &decl.superclass {
            Some(superclass) => Some(self.qualified_type_name(superclass)?),
            None => None,
        };
        for iface in &decl.interfaces {
            let name = self.qualified_type_name(iface)?;
            summary.interfaces.push(name);
        }
        self.summarize_members(&mut summary, &decl.members)?;
        self.core.symbols.insert(summary);

        for member in &decl.members {
            if let Member::Nested(nested) = member {
                let child = binary.nested(nested.name.as_str());
                self.summarize_type_decl(nested, &child)?;
            }
        }
        Ok(())
    }

    fn summarize_members(
        &mut self,
        summary: &mut ClassSummary,
        members: &[Member],
    ) -> Result<(), TransformError> {
        for member in members {
            match member {
                Member::Field(field) => {
                    let ty = self.qualified_type_name(&field.ty)?;
                    summary.fields.push(FieldSummary {
                        name: field.name.as_str().to_string(),
                        ty,
                        modifiers: field.modifiers,
                    });
                }
                Member::Method(method) => {
                    let mut params = Vec::with_capacity(method.params.len());
                    for param in &method.params {
                        params.push(self.qualified_type_name(&param.ty)?);
                    }
                    let return_type = self.qualified_type_name(&method.return_type)?;
                    summary.methods.push(MethodSummary {
                        name: method.name.as_str().to_string(),
                        params,
                        return_type,
                        modifiers: method.modifiers,
                    });
                }
                Member::Nested(nested) => {
                    summary.nested.push(nested.name.as_str().to_string());
                }
                Member::Constructor(_) | Member::Initializer(_) => {}
            }
        }
        Ok(())
    }

    /// The fully qualified source-form name of a type reference.
    fn qualified_type_name(&mut self, ty: &TypeRef) -> Result<String, TransformError> {
        let id = self.core.resolve_type_ref(ty)?;
        Ok(self.core.types.display_name(id))
    }
}
