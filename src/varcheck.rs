//! Variable checker: definite-assignment analysis for local variables,
//! with the same branch-intersection discipline the field loader uses for
//! `this.<field>`, but over variable names and reset per method.
//!
//! Grounded in the original `checker.py`'s `VarChecker`: the live set is
//! reset to `{this} ∪ formal parameters` at each method, `typecase`
//! additionally introduces its bound name into each alternative's branch.

use std::collections::HashSet;

use crate::ast::{Expr, Method, Program, Stmt};
use crate::error::{CompileError, ErrorKind, Result};

struct VarChecker {
    live: HashSet<String>,
}

pub fn check_vars(program: &Program) -> Result<()> {
    for class in &program.classes {
        for method in &class.methods {
            check_method(method)?;
        }
    }
    Ok(())
}

fn check_method(method: &Method) -> Result<()> {
    let mut vc = VarChecker {
        live: std::iter::once("this".to_string())
            .chain(method.params.iter().map(|p| p.name.clone()))
            .collect(),
    };
    vc.visit_block(&method.body)
}

impl VarChecker {
    fn visit_block(&mut self, block: &[Stmt]) -> Result<()> {
        for stmt in block {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { name, value, .. } => {
                self.visit_expr(value)?;
                self.live.insert(name.clone());
            }
            Stmt::StoreField { object, value, .. } => {
                self.visit_expr(value)?;
                self.visit_expr(object)?;
            }
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
                let snapshot = self.live.clone();
                let mut branch_results = Vec::new();

                self.live = snapshot.clone();
                self.visit_block(then_block)?;
                branch_results.push(std::mem::replace(&mut self.live, snapshot.clone()));

                for (econd, block) in elifs {
                    self.visit_expr(econd)?;
                    self.live = snapshot.clone();
                    self.visit_block(block)?;
                    branch_results.push(std::mem::replace(&mut self.live, snapshot.clone()));
                }

                match else_block {
                    Some(block) => {
                        self.live = snapshot.clone();
                        self.visit_block(block)?;
                        branch_results.push(std::mem::replace(&mut self.live, snapshot.clone()));
                    }
                    None => branch_results.push(snapshot.clone()),
                }

                self.live = intersect_all(&branch_results, &snapshot);
            }
            Stmt::While { cond, body, .. } => {
                self.visit_expr(cond)?;
                let snapshot = self.live.clone();
                self.visit_block(body)?;
                self.live = snapshot;
            }
            Stmt::Typecase {
                scrutinee,
                alternatives,
                ..
            } => {
                self.visit_expr(scrutinee)?;
                let snapshot = self.live.clone();
                let mut branch_results = Vec::new();
                let mut has_obj = false;

                for alt in alternatives {
                    if alt.type_name == "Obj" {
                        has_obj = true;
                    }
                    self.live = snapshot.clone();
                    self.live.insert(alt.bound_name.clone());
                    self.visit_block(&alt.body)?;
                    branch_results.push(std::mem::replace(&mut self.live, snapshot.clone()));
                }
                if !has_obj {
                    branch_results.push(snapshot.clone());
                }

                self.live = intersect_all(&branch_results, &snapshot);
            }
            Stmt::CompoundAssign { .. } | Stmt::RawStore { .. } => {
                unreachable!("desugar runs before variable checking")
            }
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Var { name, span, .. } => {
                if !self.live.contains(name) {
                    return Err(CompileError::at(
                        ErrorKind::VarUndefined,
                        format!("variable {name:?} is not defined"),
                        *span,
                    ));
                }
            }
            Expr::LoadField { object, .. } => self.visit_expr(object)?,
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
            Expr::LitNumber { .. } | Expr::LitString { .. } | Expr::LitTrue { .. } | Expr::LitFalse { .. } | Expr::LitNothing { .. } => {}
            Expr::BinOp { .. } | Expr::UnOp { .. } | Expr::NotEquals { .. } | Expr::LitLongString { .. } => {
                unreachable!("desugar runs before variable checking")
            }
        }
        Ok(())
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FormalArg, Span};

    fn var(name: &str) -> Expr {
        Expr::Var {
            name: name.to_string(),
            ty: String::new(),
            span: Span::default(),
        }
    }

    fn method_with(params: Vec<&str>, body: Vec<Stmt>) -> Method {
        Method {
            name: "m".into(),
            params: params
                .into_iter()
                .map(|p| FormalArg {
                    name: p.into(),
                    type_name: "Obj".into(),
                })
                .collect(),
            ret_type: None,
            body,
            span: Span::default(),
        }
    }

    #[test]
    fn this_and_params_are_live() {
        let method = method_with(
            vec!["x"],
            vec![Stmt::RawExpr {
                value: var("x"),
                span: Span::default(),
            }],
        );
        check_method(&method).unwrap();
    }

    #[test]
    fn undeclared_variable_fails() {
        let method = method_with(
            vec![],
            vec![Stmt::RawExpr {
                value: var("ghost"),
                span: Span::default(),
            }],
        );
        let err = check_method(&method).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VarUndefined);
    }

    #[test]
    fn assigned_inside_one_branch_not_live_after() {
        let method = method_with(
            vec![],
            vec![
                Stmt::If {
                    cond: Expr::LitTrue {
                        ty: String::new(),
                        span: Span::default(),
                    },
                    then_block: vec![Stmt::Assign {
                        name: "y".into(),
                        declared_type: None,
                        value: Expr::LitNumber {
                            value: 1,
                            ty: String::new(),
                            span: Span::default(),
                        },
                        ty: String::new(),
                        span: Span::default(),
                    }],
                    elifs: vec![],
                    else_block: None,
                    span: Span::default(),
                },
                Stmt::RawExpr {
                    value: var("y"),
                    span: Span::default(),
                },
            ],
        );
        let err = check_method(&method).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VarUndefined);
    }
}
