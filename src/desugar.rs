//! Operator desugarer: rewrites operator and compound-assignment syntax
//! into the method-call and assignment shapes every later pass expects.
//!
//! Grounded in the original `transformer.py`: infix/unary operators become
//! `m_call` nodes, `!=` becomes a negated `EQUALS` call, compound
//! assignment becomes a plain assignment or field store built from a call
//! to the corresponding operator method, and a two-child field-store shape
//! coming out of the parser is rearranged into the three-child
//! `(object, field, value)` shape the rest of the pipeline uses.

use crate::ast::{BinOpKind, Expr, Method, Program, Span, Stmt, TypeAlt};
use crate::error::{CompileError, ErrorKind, Result};

pub fn desugar_program(program: &mut Program) -> Result<()> {
    for class in &mut program.classes {
        desugar_block(&mut class.constructor_body)?;
        for method in &mut class.methods {
            desugar_method(method)?;
        }
    }
    Ok(())
}

fn desugar_method(method: &mut Method) -> Result<()> {
    desugar_block(&mut method.body)
}

fn desugar_block(block: &mut Vec<Stmt>) -> Result<()> {
    for stmt in block.iter_mut() {
        desugar_stmt(stmt)?;
    }
    Ok(())
}

fn desugar_stmt(stmt: &mut Stmt) -> Result<()> {
    let owned = std::mem::take(stmt);
    *stmt = desugar_stmt_owned(owned)?;
    Ok(())
}

impl Default for Stmt {
    fn default() -> Self {
        Stmt::RawExpr {
            value: Expr::LitNothing {
                ty: String::new(),
                span: Span::default(),
            },
            span: Span::default(),
        }
    }
}

fn desugar_stmt_owned(stmt: Stmt) -> Result<Stmt> {
    Ok(match stmt {
        Stmt::Assign {
            name,
            declared_type,
            value,
            ty,
            span,
        } => Stmt::Assign {
            name,
            declared_type,
            value: desugar_expr(value)?,
            ty,
            span,
        },
        Stmt::StoreField {
            object,
            field,
            value,
            span,
        } => Stmt::StoreField {
            object: desugar_expr(object)?,
            field,
            value: desugar_expr(value)?,
            span,
        },
        Stmt::RawExpr { value, span } => Stmt::RawExpr {
            value: desugar_expr(value)?,
            span,
        },
        Stmt::Ret { value, span } => {
            let value = match value {
                Some(v) => desugar_expr(v)?,
                None => Expr::LitNothing {
                    ty: String::new(),
                    span,
                },
            };
            Stmt::Ret {
                value: Some(value),
                span,
            }
        }
        Stmt::If {
            cond,
            mut then_block,
            elifs,
            else_block,
            span,
        } => {
            desugar_block(&mut then_block)?;
            let mut new_elifs = Vec::with_capacity(elifs.len());
            for (cond, mut block) in elifs {
                desugar_block(&mut block)?;
                new_elifs.push((desugar_expr(cond)?, block));
            }
            let else_block = match else_block {
                Some(mut block) => {
                    desugar_block(&mut block)?;
                    Some(block)
                }
                None => None,
            };
            Stmt::If {
                cond: desugar_expr(cond)?,
                then_block,
                elifs: new_elifs,
                else_block,
                span,
            }
        }
        Stmt::While { cond, mut body, span } => {
            desugar_block(&mut body)?;
            Stmt::While {
                cond: desugar_expr(cond)?,
                body,
                span,
            }
        }
        Stmt::Typecase {
            scrutinee,
            alternatives,
            span,
        } => {
            let mut new_alts = Vec::with_capacity(alternatives.len());
            for mut alt in alternatives {
                desugar_block(&mut alt.body)?;
                new_alts.push(TypeAlt { ..alt });
            }
            Stmt::Typecase {
                scrutinee: desugar_expr(scrutinee)?,
                alternatives: new_alts,
                span,
            }
        }
        Stmt::CompoundAssign { target, op, value, span } => {
            let value = desugar_expr(value)?;
            match target {
                Expr::Var { name, span: vspan, .. } => Stmt::Assign {
                    name: name.clone(),
                    declared_type: None,
                    value: Expr::MCall {
                        receiver: Box::new(Expr::Var {
                            name,
                            ty: String::new(),
                            span: vspan,
                        }),
                        method: op.method_name().to_string(),
                        args: vec![value],
                        ty: String::new(),
                        span,
                    },
                    ty: String::new(),
                    span,
                },
                Expr::LoadField { object, field, .. } => {
                    let object = desugar_expr(*object)?;
                    let current = Expr::LoadField {
                        object: Box::new(object.clone()),
                        field: field.clone(),
                        ty: String::new(),
                        span,
                    };
                    Stmt::StoreField {
                        object,
                        field,
                        value: Expr::MCall {
                            receiver: Box::new(current),
                            method: op.method_name().to_string(),
                            args: vec![value],
                            ty: String::new(),
                            span,
                        },
                        span,
                    }
                }
                other => {
                    return Err(CompileError::at(
                        ErrorKind::AssignToCall,
                        "left-hand side of a compound assignment must be a variable or field",
                        other.span(),
                    ));
                }
            }
        }
        Stmt::RawStore { target, value, span } => {
            let value = desugar_expr(value)?;
            match target {
                Expr::LoadField { object, field, .. } => Stmt::StoreField {
                    object: desugar_expr(*object)?,
                    field,
                    value,
                    span,
                },
                Expr::MCall { .. } => {
                    return Err(CompileError::at(
                        ErrorKind::AssignToCall,
                        "cannot assign to a method call",
                        span,
                    ));
                }
                Expr::CCall { .. } => {
                    return Err(CompileError::at(
                        ErrorKind::AssignToCall,
                        "cannot assign to a constructor call",
                        span,
                    ));
                }
                _ => {
                    return Err(CompileError::at(
                        ErrorKind::AssignToCall,
                        "left-hand side of a field assignment must be a field access",
                        span,
                    ));
                }
            }
        }
    })
}

fn desugar_expr(expr: Expr) -> Result<Expr> {
    Ok(match expr {
        Expr::BinOp { op, left, right, span } => Expr::MCall {
            receiver: Box::new(desugar_expr(*left)?),
            method: op.method_name().to_string(),
            args: vec![desugar_expr(*right)?],
            ty: String::new(),
            span,
        },
        Expr::UnOp { op, operand, span } => Expr::MCall {
            receiver: Box::new(desugar_expr(*operand)?),
            method: op.method_name().to_string(),
            args: Vec::new(),
            ty: String::new(),
            span,
        },
        Expr::NotEquals { left, right, span } => {
            let equals = Expr::MCall {
                receiver: Box::new(desugar_expr(*left)?),
                method: BinOpKind::Equals.method_name().to_string(),
                args: vec![desugar_expr(*right)?],
                ty: String::new(),
                span,
            };
            Expr::MCall {
                receiver: Box::new(equals),
                method: "NEGATE".to_string(),
                args: Vec::new(),
                ty: String::new(),
                span,
            }
        }
        Expr::LitLongString { raw, span } => {
            let inner = if raw.len() >= 6 { &raw[3..raw.len() - 3] } else { "" };
            let escaped = inner.replace('\n', "\\n");
            Expr::LitString {
                value: format!("\"{escaped}\""),
                ty: String::new(),
                span,
            }
        }
        Expr::LoadField { object, field, ty, span } => Expr::LoadField {
            object: Box::new(desugar_expr(*object)?),
            field,
            ty,
            span,
        },
        Expr::MCall {
            receiver,
            method,
            args,
            ty,
            span,
        } => Expr::MCall {
            receiver: Box::new(desugar_expr(*receiver)?),
            method,
            args: args.into_iter().map(desugar_expr).collect::<Result<_>>()?,
            ty,
            span,
        },
        Expr::CCall {
            class_name,
            args,
            ty,
            span,
        } => Expr::CCall {
            class_name,
            args: args.into_iter().map(desugar_expr).collect::<Result<_>>()?,
            ty,
            span,
        },
        Expr::And { left, right, ty, span } => Expr::And {
            left: Box::new(desugar_expr(*left)?),
            right: Box::new(desugar_expr(*right)?),
            ty,
            span,
        },
        Expr::Or { left, right, ty, span } => Expr::Or {
            left: Box::new(desugar_expr(*left)?),
            right: Box::new(desugar_expr(*right)?),
            ty,
            span,
        },
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
            ty,
            span,
        } => Expr::Ternary {
            cond: Box::new(desugar_expr(*cond)?),
            then_expr: Box::new(desugar_expr(*then_expr)?),
            else_expr: Box::new(desugar_expr(*else_expr)?),
            ty,
            span,
        },
        literal @ (Expr::LitNumber { .. }
        | Expr::LitString { .. }
        | Expr::LitTrue { .. }
        | Expr::LitFalse { .. }
        | Expr::LitNothing { .. }
        | Expr::Var { .. }) => literal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn num(n: i64) -> Expr {
        Expr::LitNumber {
            value: n,
            ty: String::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn binop_lowers_to_mcall() {
        let expr = Expr::BinOp {
            op: BinOpKind::Plus,
            left: Box::new(num(2)),
            right: Box::new(num(3)),
            span: Span::default(),
        };
        match desugar_expr(expr).unwrap() {
            Expr::MCall { method, args, .. } => {
                assert_eq!(method, "PLUS");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected MCall, got {other:?}"),
        }
    }

    #[test]
    fn not_equals_lowers_to_negated_equals() {
        let expr = Expr::NotEquals {
            left: Box::new(num(1)),
            right: Box::new(num(2)),
            span: Span::default(),
        };
        match desugar_expr(expr).unwrap() {
            Expr::MCall { method, receiver, .. } => {
                assert_eq!(method, "NEGATE");
                match *receiver {
                    Expr::MCall { method, .. } => assert_eq!(method, "EQUALS"),
                    other => panic!("expected nested EQUALS call, got {other:?}"),
                }
            }
            other => panic!("expected MCall, got {other:?}"),
        }
    }

    #[test]
    fn bare_return_becomes_lit_nothing() {
        let stmt = Stmt::Ret {
            value: None,
            span: Span::default(),
        };
        match desugar_stmt_owned(stmt).unwrap() {
            Stmt::Ret { value: Some(Expr::LitNothing { .. }), .. } => {}
            other => panic!("expected Ret(LitNothing), got {other:?}"),
        }
    }

    #[test]
    fn store_to_method_call_is_rejected() {
        let stmt = Stmt::RawStore {
            target: Expr::MCall {
                receiver: Box::new(num(1)),
                method: "PLUS".into(),
                args: vec![],
                ty: String::new(),
                span: Span::default(),
            },
            value: num(2),
            span: Span::default(),
        };
        let err = desugar_stmt_owned(stmt).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AssignToCall);
    }

    #[test]
    fn long_string_unescapes_newlines() {
        let expr = Expr::LitLongString {
            raw: "\"\"\"a\nb\"\"\"".to_string(),
            span: Span::default(),
        };
        match desugar_expr(expr).unwrap() {
            Expr::LitString { value, .. } => assert_eq!(value, "\"a\\nb\""),
            other => panic!("expected LitString, got {other:?}"),
        }
    }
}
