//! Return checker: ensures every method whose declared return type is not
//! `Nothing` returns on every control-flow path, and appends an implicit
//! `return none` to methods that never explicitly return.
//!
//! Grounded in the original `checker.py`'s `ReturnChecker`: a boolean
//! predicate over statements ("does this subtree guarantee a return"),
//! with `while` always `false` (a loop may execute zero times) and
//! `typecase` requiring every alternative to return *and* an `Obj`
//! alternative to be present.

use crate::ast::{Expr, Method, Program, Span, Stmt};
use crate::error::{CompileError, ErrorKind, Result};

pub fn check_returns(program: &mut Program) -> Result<()> {
    for class in &mut program.classes {
        for method in &mut class.methods {
            check_method(method)?;
        }
    }
    Ok(())
}

fn check_method(method: &mut Method) -> Result<()> {
    if block_returns(&method.body) {
        return Ok(());
    }
    if method.ret_type_or_default() != "Nothing" {
        return Err(CompileError::at(
            ErrorKind::MissingReturn,
            format!("{:?} does not return on every path", method.name),
            method.span,
        ));
    }
    let span = method.body.last().map(Stmt::span).unwrap_or(method.span);
    method.body.push(Stmt::Ret {
        value: Some(Expr::LitNothing { ty: String::new(), span }),
        span,
    });
    Ok(())
}

/// Does any top-level statement of `block` guarantee a return? Matches the
/// original's "stop at the first statement that returns" short circuit —
/// later statements are dead code if inline and not traversed further.
fn block_returns(block: &[Stmt]) -> bool {
    block.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Ret { .. } => true,
        Stmt::If {
            then_block,
            elifs,
            else_block,
            ..
        } => {
            let else_returns = match else_block {
                Some(block) => block_returns(block),
                None => false,
            };
            block_returns(then_block) && elifs.iter().all(|(_, b)| block_returns(b)) && else_returns
        }
        Stmt::While { .. } => false,
        Stmt::Typecase { alternatives, .. } => {
            let has_obj = alternatives.iter().any(|a| a.type_name == "Obj");
            has_obj && alternatives.iter().all(|a| block_returns(&a.body))
        }
        Stmt::Assign { .. }
        | Stmt::StoreField { .. }
        | Stmt::RawExpr { .. }
        | Stmt::CompoundAssign { .. }
        | Stmt::RawStore { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassDef, TypeAlt};

    fn method_with_body(ret_type: Option<&str>, body: Vec<Stmt>) -> Method {
        Method {
            name: "m".into(),
            params: vec![],
            ret_type: ret_type.map(String::from),
            body,
            span: Span::default(),
        }
    }

    fn lit_ret() -> Stmt {
        Stmt::Ret {
            value: Some(Expr::LitNumber {
                value: 1,
                ty: String::new(),
                span: Span::default(),
            }),
            span: Span::default(),
        }
    }

    #[test]
    fn non_nothing_method_without_return_fails() {
        let mut method = method_with_body(Some("Int"), vec![]);
        let err = check_method(&mut method).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingReturn);
    }

    #[test]
    fn nothing_method_without_return_gets_implicit_one() {
        let mut method = method_with_body(None, vec![]);
        check_method(&mut method).unwrap();
        assert!(matches!(method.body.last(), Some(Stmt::Ret { .. })));
    }

    #[test]
    fn if_without_else_does_not_guarantee_return() {
        let body = vec![Stmt::If {
            cond: Expr::LitTrue {
                ty: String::new(),
                span: Span::default(),
            },
            then_block: vec![lit_ret()],
            elifs: vec![],
            else_block: None,
            span: Span::default(),
        }];
        assert!(!block_returns(&body));
    }

    #[test]
    fn if_with_returning_else_guarantees_return() {
        let body = vec![Stmt::If {
            cond: Expr::LitTrue {
                ty: String::new(),
                span: Span::default(),
            },
            then_block: vec![lit_ret()],
            elifs: vec![],
            else_block: Some(vec![lit_ret()]),
            span: Span::default(),
        }];
        assert!(block_returns(&body));
    }

    #[test]
    fn while_never_guarantees_return() {
        let body = vec![Stmt::While {
            cond: Expr::LitTrue {
                ty: String::new(),
                span: Span::default(),
            },
            body: vec![lit_ret()],
            span: Span::default(),
        }];
        assert!(!block_returns(&body));
    }

    #[test]
    fn typecase_without_obj_default_does_not_guarantee_return() {
        let body = vec![Stmt::Typecase {
            scrutinee: Expr::Var {
                name: "x".into(),
                ty: String::new(),
                span: Span::default(),
            },
            alternatives: vec![TypeAlt {
                bound_name: "y".into(),
                type_name: "Int".into(),
                body: vec![lit_ret()],
                span: Span::default(),
            }],
            span: Span::default(),
        }];
        assert!(!block_returns(&body));
    }

    #[test]
    fn class_methods_all_checked() {
        let mut program = crate::ast::Program {
            classes: vec![ClassDef {
                name: "C".into(),
                super_name: None,
                formal_args: vec![],
                constructor_body: vec![],
                methods: vec![method_with_body(Some("Int"), vec![])],
                span: Span::default(),
            }],
        };
        let err = check_returns(&mut program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingReturn);
    }
}
