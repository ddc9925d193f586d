//! Generator: lowers the type-checked AST to a textual stack-machine
//! instruction stream, one [`ClassObject`] per class.
//!
//! Grounded throughout in the original `generator.py`. Control-flow and
//! short-circuit lowering (`if`/`while`/`and`/`or`) live in
//! [`control_flow`], split out the way the teacher keeps its own
//! `codegen/control_flow.rs` separate from the rest of code generation.
//!
//! Unlike the original, every class (including the synthesised main
//! class) is registered in the type world by the time generation runs —
//! see [`crate::mainblock`] — so there is no "class not found, this must
//! be main" fallback here.

mod control_flow;
mod state;

pub use state::{ClassObject, MethodObject};

use crate::ast::{ClassDef, Expr, Method, Program, Stmt};
use crate::error::{CompileError, ErrorKind, Result};
use crate::loader::CONSTRUCTOR_NAME;
use crate::types::{TypeWorld, OBJ};
use state::LabelCounters;

pub(crate) struct CodeGen<'w> {
    world: &'w TypeWorld,
    classes: Vec<ClassObject>,
    current_class: Option<ClassObject>,
    current_method: Option<MethodObject>,
    labels: LabelCounters,
}

pub fn generate_program(program: &Program, world: &TypeWorld) -> Result<Vec<ClassObject>> {
    let mut gen = CodeGen {
        world,
        classes: Vec::new(),
        current_class: None,
        current_method: None,
        labels: LabelCounters::new(),
    };
    for class in &program.classes {
        gen.visit_class(class)?;
    }
    Ok(gen.classes)
}

impl<'w> CodeGen<'w> {
    fn current_class_name(&self) -> &str {
        &self.current_class.as_ref().expect("inside a class").name
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.current_method
            .as_mut()
            .expect("inside a method")
            .code
            .push(format!("    {}", line.into()));
    }

    fn emit_label(&mut self, label: &str) {
        self.current_method
            .as_mut()
            .expect("inside a method")
            .code
            .push(format!("{label}:"));
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        self.labels.fresh(prefix)
    }

    fn visit_class(&mut self, class: &ClassDef) -> Result<()> {
        let super_name = class.super_name.clone().unwrap_or_else(|| OBJ.to_string());
        let entry = self.world.require(&class.name)?;
        let fields: Vec<String> = entry.fields.keys().cloned().collect();
        let inherited_fields = self
            .world
            .get(&super_name)
            .map(|s| s.fields.keys().cloned().collect())
            .unwrap_or_default();

        self.current_class = Some(ClassObject {
            name: class.name.clone(),
            super_name,
            methods: Vec::new(),
            inherited_fields,
            fields,
        });

        for method in &class.methods {
            self.visit_method(method)?;
        }

        let finished = self.current_class.take().expect("just set");
        self.classes.push(finished);
        Ok(())
    }

    fn visit_method(&mut self, method: &Method) -> Result<()> {
        self.current_method = Some(MethodObject {
            name: method.name.clone(),
            args: method.params.iter().map(|p| p.name.clone()).collect(),
            locals: Vec::new(),
            code: Vec::new(),
        });

        self.emit("enter");
        for stmt in &method.body {
            self.visit_stmt(stmt)?;
        }

        let finished = self.current_method.take().expect("just set");
        self.current_class
            .as_mut()
            .expect("inside a class")
            .methods
            .push(finished);
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { name, declared_type, value, ty, .. } => {
                self.visit_expr(value)?;
                let local_ty = declared_type.as_deref().unwrap_or(ty);
                self.current_method
                    .as_mut()
                    .expect("inside a method")
                    .record_local(name, local_ty);
                self.emit(format!("store {name}"));
                Ok(())
            }
            Stmt::StoreField { object, field, value, .. } => {
                // Value pushed before the object, matching the VM's
                // `store_field` operand order.
                self.visit_expr(value)?;
                self.visit_expr(object)?;
                let obj_ty = self.alias(object.ty());
                self.emit(format!("store_field {obj_ty}:{field}"));
                Ok(())
            }
            Stmt::RawExpr { value, .. } => {
                self.visit_expr(value)?;
                self.emit("pop");
                Ok(())
            }
            Stmt::Ret { value, .. } => control_flow::codegen_ret(self, value.as_ref()),
            Stmt::If {
                cond,
                then_block,
                elifs,
                else_block,
                ..
            } => control_flow::codegen_if(self, cond, then_block, elifs, else_block.as_deref()),
            Stmt::While { cond, body, .. } => control_flow::codegen_while(self, cond, body),
            Stmt::Typecase { .. } => Err(CompileError::new(
                ErrorKind::UnknownType,
                "typecase code generation is not implemented",
            )),
            Stmt::CompoundAssign { .. } | Stmt::RawStore { .. } => {
                unreachable!("desugar runs before code generation")
            }
        }
    }

    /// `$` if `ty` is the current class, else `ty` unchanged.
    fn alias(&self, ty: &str) -> String {
        if ty == self.current_class_name() {
            "$".to_string()
        } else {
            ty.to_string()
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::LitNumber { value, .. } => self.emit(format!("const {value}")),
            Expr::LitString { value, .. } => self.emit(format!("const {value}")),
            Expr::LitTrue { .. } => self.emit("const true"),
            Expr::LitFalse { .. } => self.emit("const false"),
            Expr::LitNothing { .. } => self.emit("const nothing"),
            Expr::Var { name, .. } => {
                if name == "this" {
                    self.emit("load $");
                } else {
                    self.emit(format!("load {name}"));
                }
            }
            Expr::LoadField { object, field, .. } => {
                self.visit_expr(object)?;
                let obj_ty = self.alias(object.ty());
                self.emit(format!("load_field {obj_ty}:{field}"));
            }
            Expr::MCall { receiver, method, args, .. } => {
                self.visit_expr(receiver)?;
                for a in args {
                    self.visit_expr(a)?;
                }
                if !args.is_empty() {
                    self.emit(format!("roll {}", args.len()));
                }
                let recv_ty = receiver.ty();
                self.emit(format!("call {recv_ty}:{method}"));
            }
            Expr::CCall { class_name, args, .. } => {
                for a in args {
                    self.visit_expr(a)?;
                }
                let alias = self.alias(class_name);
                self.emit(format!("new {alias}"));
                self.emit(format!("call {alias}:{CONSTRUCTOR_NAME}"));
            }
            Expr::And { left, right, .. } => control_flow::codegen_and(self, left, right)?,
            Expr::Or { left, right, .. } => control_flow::codegen_or(self, left, right)?,
            Expr::Ternary { cond, then_expr, else_expr, .. } => {
                control_flow::codegen_ternary(self, cond, then_expr, else_expr)?
            }
            Expr::BinOp { .. } | Expr::UnOp { .. } | Expr::NotEquals { .. } | Expr::LitLongString { .. } => {
                unreachable!("desugar runs before code generation")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FormalArg, Span};
    use crate::types::ClassEntry;

    fn world_with_main() -> TypeWorld {
        let mut w = TypeWorld::new();
        w.insert(OBJ.to_string(), ClassEntry { super_name: OBJ.to_string(), ..Default::default() });
        w.insert("Main".to_string(), ClassEntry { super_name: OBJ.to_string(), ..Default::default() });
        w
    }

    fn num(n: i64) -> Expr {
        Expr::LitNumber { value: n, ty: "Int".into(), span: Span::default() }
    }

    #[test]
    fn constructor_emits_load_dollar_and_return_zero() {
        let world = world_with_main();
        let program = Program {
            classes: vec![ClassDef {
                name: "Main".into(),
                super_name: None,
                formal_args: vec![],
                constructor_body: vec![],
                methods: vec![Method {
                    name: CONSTRUCTOR_NAME.into(),
                    params: vec![FormalArg { name: "unused".into(), type_name: "Int".into() }],
                    ret_type: Some("Nothing".into()),
                    body: vec![Stmt::Ret {
                        value: Some(Expr::LitNothing { ty: "Nothing".into(), span: Span::default() }),
                        span: Span::default(),
                    }],
                    span: Span::default(),
                }],
                span: Span::default(),
            }],
        };
        let classes = generate_program(&program, &world).unwrap();
        let code = &classes[0].methods[0].code;
        assert!(code.contains(&"    load $".to_string()));
        assert!(code.contains(&"    return 0".to_string()));
    }

    #[test]
    fn non_constructor_return_pops_formal_arg_count() {
        let world = world_with_main();
        let program = Program {
            classes: vec![ClassDef {
                name: "Main".into(),
                super_name: None,
                formal_args: vec![],
                constructor_body: vec![],
                methods: vec![Method {
                    name: "f".into(),
                    params: vec![FormalArg { name: "a".into(), type_name: "Int".into() }],
                    ret_type: Some("Int".into()),
                    body: vec![Stmt::Ret { value: Some(num(1)), span: Span::default() }],
                    span: Span::default(),
                }],
                span: Span::default(),
            }],
        };
        let classes = generate_program(&program, &world).unwrap();
        assert!(classes[0].methods[0].code.contains(&"    return 1".to_string()));
    }

    #[test]
    fn raw_expr_statement_pops_its_value() {
        let world = world_with_main();
        let program = Program {
            classes: vec![ClassDef {
                name: "Main".into(),
                super_name: None,
                formal_args: vec![],
                constructor_body: vec![],
                methods: vec![Method {
                    name: CONSTRUCTOR_NAME.into(),
                    params: vec![],
                    ret_type: Some("Nothing".into()),
                    body: vec![Stmt::RawExpr { value: num(1), span: Span::default() }],
                    span: Span::default(),
                }],
                span: Span::default(),
            }],
        };
        let classes = generate_program(&program, &world).unwrap();
        let code = &classes[0].methods[0].code;
        assert_eq!(code[0], "    enter");
        assert_eq!(code[1], "    const 1");
        assert_eq!(code[2], "    pop");
    }
}
