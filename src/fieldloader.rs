//! Field loader: definite-assignment analysis of `this.<field>` stores and
//! loads inside each class's constructor, producing the class's field set.
//!
//! Grounded in the original `checker.py`'s `FieldLoader`: walks the
//! constructor body tracking `initialized` (stored on every path so far)
//! and `seen` (loaded anywhere), intersecting branch results at `if`,
//! discarding loop-body results at `while` (a loop may run zero times),
//! and treating a `typecase` with no `Obj` alternative as having no
//! default branch.

use std::collections::HashSet;

use crate::ast::{ClassDef, Expr, Program, Stmt};
use crate::error::{CompileError, ErrorKind, Result};
use crate::loader::CONSTRUCTOR_NAME;
use crate::types::TypeWorld;

struct FieldLoader {
    initialized: HashSet<String>,
    seen: HashSet<String>,
    /// Every field stored anywhere in the constructor, on any branch,
    /// regardless of whether that branch's result survives intersection.
    /// Distinguishes "never stored at all" (`FieldUndefined`) from "stored
    /// on some path but not this one" (`FieldNotOnAllPaths`) at the point
    /// of an unready load.
    ever_stored: HashSet<String>,
}

pub fn load_fields(program: &Program, world: &mut TypeWorld) -> Result<()> {
    for class in &program.classes {
        let ctor = class
            .methods
            .iter()
            .find(|m| m.name == CONSTRUCTOR_NAME)
            .expect("class loader always inserts a constructor first");

        let mut fl = FieldLoader {
            initialized: HashSet::new(),
            seen: HashSet::new(),
            ever_stored: HashSet::new(),
        };
        fl.visit_block(&ctor.body)?;

        let undefined: Vec<_> = fl.seen.difference(&fl.initialized).cloned().collect();
        if let Some(field) = undefined.into_iter().next() {
            return Err(CompileError::at(
                ErrorKind::FieldNotOnAllPaths,
                format!("field {field:?} is not defined on all paths in {:?}'s constructor", class.name),
                class.span,
            ));
        }

        finalize_fields(class, &fl.initialized, world);
    }
    Ok(())
}

fn finalize_fields(class: &ClassDef, initialized: &HashSet<String>, world: &mut TypeWorld) {
    let entry = world
        .get_mut(&class.name)
        .expect("class loader always registers every class");
    for field in initialized {
        entry.fields.entry(field.clone()).or_insert_with(String::new);
    }
}

impl FieldLoader {
    fn visit_block(&mut self, block: &[Stmt]) -> Result<()> {
        for stmt in block {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::StoreField { object, field, value, .. } => {
                self.visit_expr(value)?;
                self.visit_expr(object)?;
                if is_this(object) {
                    self.initialized.insert(field.clone());
                    self.seen.insert(field.clone());
                    self.ever_stored.insert(field.clone());
                }
            }
            Stmt::Assign { value, .. } => self.visit_expr(value)?,
            Stmt::RawExpr { value, .. } => self.visit_expr(value)?,
            Stmt::Ret { value, .. } => {
                if let Some(v) = value {
                    self.visit_expr(v)?;
                }
            }
            Stmt::If {
                cond,
                then_block,
                elifs,
                else_block,
                ..
            } => {
                self.visit_expr(cond)?;
                let snapshot = self.initialized.clone();
                let mut branch_results = Vec::new();

                self.initialized = snapshot.clone();
                self.visit_block(then_block)?;
                branch_results.push(std::mem::replace(&mut self.initialized, snapshot.clone()));

                for (econd, block) in elifs {
                    self.visit_expr(econd)?;
                    self.initialized = snapshot.clone();
                    self.visit_block(block)?;
                    branch_results.push(std::mem::replace(&mut self.initialized, snapshot.clone()));
                }

                match else_block {
                    Some(block) => {
                        self.initialized = snapshot.clone();
                        self.visit_block(block)?;
                        branch_results.push(std::mem::replace(&mut self.initialized, snapshot.clone()));
                    }
                    None => branch_results.push(snapshot.clone()),
                }

                self.initialized = intersect_all(&branch_results, &snapshot);
            }
            Stmt::While { cond, body, .. } => {
                self.visit_expr(cond)?;
                let snapshot = self.initialized.clone();
                self.visit_block(body)?;
                self.initialized = snapshot;
            }
            Stmt::Typecase {
                scrutinee,
                alternatives,
                ..
            } => {
                self.visit_expr(scrutinee)?;
                let snapshot = self.initialized.clone();
                let mut branch_results = Vec::new();
                let mut has_obj = false;

                for alt in alternatives {
                    if alt.type_name == "Obj" {
                        has_obj = true;
                    }
                    self.initialized = snapshot.clone();
                    self.visit_block(&alt.body)?;
                    branch_results.push(std::mem::replace(&mut self.initialized, snapshot.clone()));
                }
                if !has_obj {
                    branch_results.push(snapshot.clone());
                }

                self.initialized = intersect_all(&branch_results, &snapshot);
            }
            Stmt::CompoundAssign { .. } | Stmt::RawStore { .. } => {
                unreachable!("desugar runs before field loading")
            }
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::LoadField { object, field, span, .. } => {
                self.visit_expr(object)?;
                if is_this(object) {
                    if !self.initialized.contains(field) {
                        let (kind, message) = if self.ever_stored.contains(field) {
                            (ErrorKind::FieldNotOnAllPaths, format!("field {field:?} is not defined on every path reaching this use"))
                        } else {
                            (ErrorKind::FieldUndefined, format!("field {field:?} is not defined"))
                        };
                        return Err(CompileError::at(kind, message, *span));
                    }
                    self.seen.insert(field.clone());
                }
            }
            Expr::MCall { receiver, args, .. } => {
                self.visit_expr(receiver)?;
                for a in args {
                    self.visit_expr(a)?;
                }
            }
            Expr::CCall { args, .. } => {
                for a in args {
                    self.visit_expr(a)?;
                }
            }
            Expr::And { left, right, .. } | Expr::Or { left, right, .. } => {
                self.visit_expr(left)?;
                self.visit_expr(right)?;
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                self.visit_expr(cond)?;
                self.visit_expr(then_expr)?;
                self.visit_expr(else_expr)?;
            }
            Expr::LitNumber { .. }
            | Expr::LitString { .. }
            | Expr::LitTrue { .. }
            | Expr::LitFalse { .. }
            | Expr::LitNothing { .. }
            | Expr::Var { .. } => {}
            Expr::BinOp { .. } | Expr::UnOp { .. } | Expr::NotEquals { .. } | Expr::LitLongString { .. } => {
                unreachable!("desugar runs before field loading")
            }
        }
        Ok(())
    }
}

fn is_this(expr: &Expr) -> bool {
    matches!(expr, Expr::Var { name, .. } if name == "this")
}

/// Intersection of every branch's resulting set, unioned with the
/// snapshot taken before any branch ran (fields already definite before
/// the construct stay definite regardless of which branch executes).
fn intersect_all(branches: &[HashSet<String>], snapshot: &HashSet<String>) -> HashSet<String> {
    let mut result = match branches.split_first() {
        Some((first, rest)) => {
            let mut acc = first.clone();
            for b in rest {
                acc = acc.intersection(b).cloned().collect();
            }
            acc
        }
        None => HashSet::new(),
    };
    result.extend(snapshot.iter().cloned());
    result
}
