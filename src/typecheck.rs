//! Type checker: the centrepiece pass. Iterates the whole program to a
//! fixpoint, assigning a type to every expression node and widening local
//! variable and constructor-field types by LCA across iterations, until a
//! full traversal changes nothing.
//!
//! Grounded in the original `typechecker.py`: literal tags map to builtin
//! types, `var`/`load_field` resolve through the local variable table and
//! the type world respectively, `assign` and constructor `store_field`
//! widen their target's recorded type via `lca`, boolean operators and
//! `condition`/`ternary` require `Bool` operands, and `m_call`/`c_call`
//! check arity and per-argument subtype compatibility against the
//! receiver's resolved method table. Termination follows because a
//! variable's recorded type only moves upward along the lattice and the
//! lattice has finite height.

use std::collections::HashMap;

use crate::ast::{Expr, Method, Program, Stmt};
use crate::error::{CompileError, ErrorKind, Result};
use crate::loader::CONSTRUCTOR_NAME;
use crate::types::{TypeWorld, NOTHING, OBJ};

/// Per-method local variable types, persisted across fixpoint iterations
/// and widened in place as assignments are encountered. Keyed by
/// `(class name, method name)` since method names are not globally unique.
type VarTables = HashMap<(String, String), HashMap<String, String>>;

struct TypeChecker<'w> {
    world: &'w mut TypeWorld,
    var_tables: VarTables,
    current_class: String,
    current_method: String,
    current_ret_type: String,
}

pub fn check_types(program: &mut Program, world: &mut TypeWorld) -> Result<()> {
    let mut tc = TypeChecker {
        world,
        var_tables: VarTables::new(),
        current_class: String::new(),
        current_method: String::new(),
        current_ret_type: String::new(),
    };

    // Height of the lattice bounds the number of iterations a variable's
    // type can still be widening; +1 covers the final no-change pass.
    let max_iterations = tc.world.names().count() + 1;
    for _ in 0..max_iterations {
        let mut changed = false;
        for class in &mut program.classes {
            for method in &mut class.methods {
                changed |= tc.visit_method(&class.name, method)?;
            }
        }
        if !changed {
            tc.world.check_inheritance()?;
            return Ok(());
        }
    }
    Err(CompileError::new(
        ErrorKind::NotASubtype,
        "type checker did not reach a fixpoint within the expected number of iterations",
    ))
}

impl<'w> TypeChecker<'w> {
    fn visit_method(&mut self, class_name: &str, method: &mut Method) -> Result<bool> {
        self.current_class = class_name.to_string();
        self.current_method = method.name.clone();
        self.current_ret_type = method.ret_type_or_default().to_string();

        let key = (class_name.to_string(), method.name.clone());
        let table = self.var_tables.entry(key).or_insert_with(HashMap::new);
        table.insert("this".to_string(), class_name.to_string());
        for p in &method.params {
            table.insert(p.name.clone(), p.type_name.clone());
        }

        self.visit_block(&mut method.body)
    }

    fn visit_block(&mut self, block: &mut [Stmt]) -> Result<bool> {
        let mut changed = false;
        for stmt in block {
            changed |= self.visit_stmt(stmt)?;
        }
        Ok(changed)
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<bool> {
        match stmt {
            Stmt::Assign {
                name,
                declared_type,
                value,
                ty,
                span,
            } => {
                let mut changed = self.visit_expr(value)?;
                let imp = value.ty().to_string();
                let decl = declared_type.clone().unwrap_or_else(|| imp.clone());
                if !imp.is_empty() && !self.world.is_subtype(&imp, &decl)? {
                    return Err(CompileError::at(
                        ErrorKind::NotASubtype,
                        format!("{imp:?} is not a subclass of {decl:?}"),
                        *span,
                    ));
                }
                let key = (self.current_class.clone(), self.current_method.clone());
                let old = self
                    .var_tables
                    .get(&key)
                    .and_then(|t| t.get(name.as_str()))
                    .cloned()
                    .unwrap_or_default();
                let widened = self.world.lca(&old, &decl)?;
                if declared_type.is_some() && !self.world.is_subtype(&widened, declared_type.as_deref().unwrap())? {
                    return Err(CompileError::at(
                        ErrorKind::NotASubtype,
                        format!("{widened:?} is not a subclass of declared type {decl:?}"),
                        *span,
                    ));
                }
                self.var_tables
                    .entry(key)
                    .or_default()
                    .insert(name.clone(), widened.clone());
                if *ty != widened {
                    *ty = widened;
                    changed = true;
                }
                Ok(changed)
            }
            Stmt::StoreField {
                object,
                field,
                value,
                span,
            } => {
                let mut changed = self.visit_expr(object)?;
                changed |= self.visit_expr(value)?;
                let obj_ty = object.ty().to_string();
                let value_ty = value.ty().to_string();
                if value_ty.is_empty() {
                    return Ok(changed);
                }
                let is_ctor_this = self.current_method == CONSTRUCTOR_NAME && matches!(object, Expr::Var { name, .. } if name == "this");
                if is_ctor_this {
                    let class_name = self.current_class.clone();
                    let entry = self.world.get_mut(&class_name).expect("current class exists");
                    let existing = entry.fields.get(field).cloned().unwrap_or_default();
                    let widened = self.world.lca(&existing, &value_ty)?;
                    let entry = self.world.get_mut(&class_name).expect("current class exists");
                    if entry.fields.get(field).map(String::as_str) != Some(widened.as_str()) {
                        entry.fields.insert(field.clone(), widened);
                        changed = true;
                    }
                } else {
                    let entry = self.world.require(&obj_ty)?;
                    let declared = entry.fields.get(field).cloned().ok_or_else(|| {
                        CompileError::at(
                            ErrorKind::UnknownField,
                            format!("{field:?} is not a field of {obj_ty:?}"),
                            *span,
                        )
                    })?;
                    if !self.world.is_subtype(&value_ty, &declared)? {
                        return Err(CompileError::at(
                            ErrorKind::NotASubtype,
                            format!("{value_ty:?} is not a subclass of {declared:?}"),
                            *span,
                        ));
                    }
                }
                Ok(changed)
            }
            Stmt::RawExpr { value, .. } => self.visit_expr(value),
            Stmt::Ret { value, span } => {
                let Some(value) = value else {
                    return Ok(false);
                };
                let mut changed = self.visit_expr(value)?;
                let vty = value.ty().to_string();
                if !vty.is_empty() && !self.world.is_subtype(&vty, &self.current_ret_type)? {
                    return Err(CompileError::at(
                        ErrorKind::WrongReturnType,
                        format!("returns {vty:?}, expected {:?}", self.current_ret_type),
                        *span,
                    ));
                }
                Ok(changed)
            }
            Stmt::If {
                cond,
                then_block,
                elifs,
                else_block,
                span,
            } => {
                let mut changed = self.visit_expr(cond)?;
                if !cond.ty().is_empty() && cond.ty() != "Bool" {
                    return Err(CompileError::at(
                        ErrorKind::BooleanOperandRequired,
                        "if condition must be Bool",
                        *span,
                    ));
                }
                changed |= self.visit_block(then_block)?;
                for (econd, block) in elifs {
                    changed |= self.visit_expr(econd)?;
                    changed |= self.visit_block(block)?;
                }
                if let Some(block) = else_block {
                    changed |= self.visit_block(block)?;
                }
                Ok(changed)
            }
            Stmt::While { cond, body, span } => {
                let mut changed = self.visit_expr(cond)?;
                if !cond.ty().is_empty() && cond.ty() != "Bool" {
                    return Err(CompileError::at(
                        ErrorKind::BooleanOperandRequired,
                        "while condition must be Bool",
                        *span,
                    ));
                }
                changed |= self.visit_block(body)?;
                Ok(changed)
            }
            Stmt::Typecase {
                scrutinee,
                alternatives,
                ..
            } => {
                let mut changed = self.visit_expr(scrutinee)?;
                for alt in alternatives {
                    let key = (self.current_class.clone(), self.current_method.clone());
                    self.var_tables
                        .entry(key)
                        .or_default()
                        .insert(alt.bound_name.clone(), alt.type_name.clone());
                    changed |= self.visit_block(&mut alt.body)?;
                }
                Ok(changed)
            }
            Stmt::CompoundAssign { .. } | Stmt::RawStore { .. } => {
                unreachable!("desugar runs before type checking")
            }
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<bool> {
        let orig = expr.ty().to_string();
        let mut changed = false;
        let new_ty = match expr {
            Expr::LitNumber { .. } => "Int".to_string(),
            Expr::LitString { .. } => "String".to_string(),
            Expr::LitTrue { .. } | Expr::LitFalse { .. } => "Bool".to_string(),
            Expr::LitNothing { .. } => NOTHING.to_string(),
            Expr::Var { name, span, .. } => {
                let key = (self.current_class.clone(), self.current_method.clone());
                self.var_tables
                    .get(&key)
                    .and_then(|t| t.get(name.as_str()))
                    .cloned()
                    .ok_or_else(|| {
                        CompileError::at(ErrorKind::VarUndefined, format!("variable {name:?} is not defined"), *span)
                    })?
            }
            Expr::LoadField { object, field, span, .. } => {
                changed |= self.visit_expr(object)?;
                let obj_ty = object.ty().to_string();
                if obj_ty.is_empty() {
                    orig.clone()
                } else {
                    let entry = self.world.require(&obj_ty)?;
                    entry.fields.get(field).cloned().ok_or_else(|| {
                        CompileError::at(ErrorKind::UnknownField, format!("{field:?} is not a field of {obj_ty:?}"), *span)
                    })?
                }
            }
            Expr::And { left, right, span, .. } | Expr::Or { left, right, span, .. } => {
                changed |= self.visit_expr(left)?;
                changed |= self.visit_expr(right)?;
                for side in [left.ty(), right.ty()] {
                    if !side.is_empty() && side != "Bool" {
                        return Err(CompileError::at(
                            ErrorKind::BooleanOperandRequired,
                            "and/or operands must be Bool",
                            *span,
                        ));
                    }
                }
                "Bool".to_string()
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                span,
                ..
            } => {
                changed |= self.visit_expr(cond)?;
                changed |= self.visit_expr(then_expr)?;
                changed |= self.visit_expr(else_expr)?;
                if !cond.ty().is_empty() && cond.ty() != "Bool" {
                    return Err(CompileError::at(
                        ErrorKind::BooleanOperandRequired,
                        "ternary condition must be Bool",
                        *span,
                    ));
                }
                self.world.lca(then_expr.ty(), else_expr.ty())?
            }
            Expr::MCall {
                receiver,
                method,
                args,
                span,
                ..
            } => {
                changed |= self.visit_expr(receiver)?;
                for a in args.iter_mut() {
                    changed |= self.visit_expr(a)?;
                }
                let recv_ty = receiver.ty().to_string();
                if recv_ty.is_empty() {
                    orig.clone()
                } else {
                    let entry = self.world.require(&recv_ty)?;
                    let sig = entry.methods.get(method.as_str()).cloned().ok_or_else(|| {
                        CompileError::at(
                            ErrorKind::UnknownMethod,
                            format!("{recv_ty:?} has no method {method:?}"),
                            *span,
                        )
                    })?;
                    if sig.params.len() != args.len() {
                        return Err(CompileError::at(
                            ErrorKind::ArityMismatch,
                            format!(
                                "{method:?} expected {} arg{}, received {}",
                                sig.params.len(),
                                if sig.params.len() == 1 { "" } else { "s" },
                                args.len()
                            ),
                            *span,
                        ));
                    }
                    for (arg, param_ty) in args.iter().zip(sig.params.iter()) {
                        let arg_ty = arg.ty();
                        if !arg_ty.is_empty() && !self.world.is_subtype(arg_ty, param_ty)? {
                            return Err(CompileError::at(
                                ErrorKind::NotASubtype,
                                format!("{method:?} expected {param_ty:?}, received {arg_ty:?}"),
                                *span,
                            ));
                        }
                    }
                    sig.ret
                }
            }
            Expr::CCall {
                class_name,
                args,
                span,
                ..
            } => {
                for a in args.iter_mut() {
                    changed |= self.visit_expr(a)?;
                }
                let entry = self.world.require(class_name)?;
                let sig = entry.methods.get(CONSTRUCTOR_NAME).cloned().ok_or_else(|| {
                    CompileError::at(
                        ErrorKind::UnknownMethod,
                        format!("{class_name:?} has no constructor"),
                        *span,
                    )
                })?;
                if sig.params.len() != args.len() {
                    return Err(CompileError::at(
                        ErrorKind::ArityMismatch,
                        format!(
                            "{class_name:?} constructor expected {} arg{}, received {}",
                            sig.params.len(),
                            if sig.params.len() == 1 { "" } else { "s" },
                            args.len()
                        ),
                        *span,
                    ));
                }
                for (arg, param_ty) in args.iter().zip(sig.params.iter()) {
                    let arg_ty = arg.ty();
                    if !arg_ty.is_empty() && !self.world.is_subtype(arg_ty, param_ty)? {
                        return Err(CompileError::at(
                            ErrorKind::NotASubtype,
                            format!("constructor expected {param_ty:?}, received {arg_ty:?}"),
                            *span,
                        ));
                    }
                }
                class_name.clone()
            }
            Expr::BinOp { .. } | Expr::UnOp { .. } | Expr::NotEquals { .. } | Expr::LitLongString { .. } => {
                unreachable!("desugar runs before type checking")
            }
        };

        if new_ty != orig {
            changed = true;
        }
        match expr {
            Expr::LitNumber { ty, .. }
            | Expr::LitString { ty, .. }
            | Expr::LitTrue { ty, .. }
            | Expr::LitFalse { ty, .. }
            | Expr::LitNothing { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::LoadField { ty, .. }
            | Expr::MCall { ty, .. }
            | Expr::CCall { ty, .. }
            | Expr::And { ty, .. }
            | Expr::Or { ty, .. }
            | Expr::Ternary { ty, .. } => *ty = new_ty,
            _ => unreachable!("desugar runs before type checking"),
        }
        Ok(changed)
    }
}
