//! Class loader: populates the type world from the user's class
//! declarations and synthesises each class's `$constructor` method.
//!
//! Grounded in the original `loader.py`'s `ClassLoader.class_`: resolve
//! the supertype (defaulting to `Obj`), copy the supertype's methods and
//! fields by value, synthesise a constructor from the class's formal
//! arguments and constructor body, insert it as the method list's first
//! entry, then register every method's declared signature — overwriting
//! inherited entries where the class overrides them.

use crate::ast::{Method, Program};
use crate::error::{CompileError, ErrorKind, Result};
use crate::types::{ClassEntry, MethodSig, TypeWorld, OBJ};

pub const CONSTRUCTOR_NAME: &str = "$constructor";

pub fn load_classes(program: &Program, world: &mut TypeWorld) -> Result<()> {
    for class in &program.classes {
        tracing::debug!(class = %class.name, "loading class");
        let super_name = class.super_name.clone().unwrap_or_else(|| OBJ.to_string());
        let super_entry = world.require(&super_name).map_err(|_| {
            CompileError::at(
                ErrorKind::UnknownType,
                format!("{:?} extends unknown class {super_name:?}", class.name),
                class.span,
            )
        })?;
        let mut methods = super_entry.methods.clone();
        let fields = super_entry.fields.clone();

        let constructor_sig = MethodSig {
            params: class.formal_args.iter().map(|a| a.type_name.clone()).collect(),
            ret: "Nothing".to_string(),
        };
        methods.insert(CONSTRUCTOR_NAME.to_string(), constructor_sig);

        for method in &class.methods {
            methods.insert(
                method.name.clone(),
                MethodSig {
                    params: method.params.iter().map(|a| a.type_name.clone()).collect(),
                    ret: method.ret_type_or_default().to_string(),
                },
            );
        }

        world.insert(
            class.name.clone(),
            ClassEntry {
                super_name,
                methods,
                fields,
            },
        );
    }
    Ok(())
}

/// Builds the synthesised constructor method for a class, to be inserted
/// as the first entry of its method list. Separate from [`load_classes`]
/// because the AST owns the method list and the type world owns the
/// signature table; the two are kept in lockstep by the caller.
pub fn synthesize_constructor(class_name: &str, formal_args: &[crate::ast::FormalArg], body: Vec<crate::ast::Stmt>, span: crate::ast::Span) -> Method {
    let _ = class_name;
    Method {
        name: CONSTRUCTOR_NAME.to_string(),
        params: formal_args.to_vec(),
        ret_type: Some("Nothing".to_string()),
        body,
        span,
    }
}

/// Inserts the synthesised constructor as the first method of every
/// class, consuming each class's constructor body.
pub fn attach_constructors(program: &mut Program) {
    for class in &mut program.classes {
        let ctor = synthesize_constructor(
            &class.name,
            &class.formal_args,
            std::mem::take(&mut class.constructor_body),
            class.span,
        );
        class.methods.insert(0, ctor);
    }
}
