//! Emitter: serialises generated [`ClassObject`]s into one `.asm` file per
//! class.
//!
//! Grounded in the original `generator.py`'s `generate_file`: a `.class`
//! header, one `.field` per locally-declared (non-inherited) field,
//! forward declarations for every non-constructor method, then each
//! method's `.method`/`.args`/`.local` header followed by its code.

use std::fmt::Write as _;
use std::path::Path;

use crate::codegen::ClassObject;
use crate::error::Result;
use crate::loader::CONSTRUCTOR_NAME;

/// Renders one class to the textual assembly format, without touching the
/// filesystem. Kept separate from [`emit_to_dir`] so tests can check the
/// generated text directly.
pub fn render_class(class: &ClassObject) -> Result<String> {
    let mut out = String::new();
    writeln!(out, ".class {}:{}", class.name, class.super_name)?;

    for field in &class.fields {
        if !class.inherited_fields.contains(field) {
            writeln!(out, ".field {field}")?;
        }
    }

    for method in &class.methods {
        if method.name != CONSTRUCTOR_NAME {
            writeln!(out, ".method {} forward", method.name)?;
        }
    }
    writeln!(out)?;

    for method in &class.methods {
        writeln!(out, ".method {}", method.name)?;
        if !method.args.is_empty() {
            writeln!(out, ".args {}", method.args.join(","))?;
        }
        if !method.locals.is_empty() {
            let names: Vec<&str> = method.locals.iter().map(|(n, _)| n.as_str()).collect();
            writeln!(out, ".local {}", names.join(","))?;
        }
        for line in &method.code {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

/// Writes every class to `<dir>/<ClassName>.asm`, returning the list of
/// class names written (used by the CLI's `--list` flag).
pub fn emit_to_dir(classes: &[ClassObject], dir: &Path) -> Result<Vec<String>> {
    let mut written = Vec::with_capacity(classes.len());
    for class in classes {
        let text = render_class(class)?;
        let path = dir.join(format!("{}.asm", class.name));
        std::fs::write(&path, text).map_err(|e| {
            crate::error::CompileError::new(
                crate::error::ErrorKind::CodeGenFormat,
                format!("could not write {}: {e}", path.display()),
            )
        })?;
        written.push(class.name.clone());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MethodObject;

    #[test]
    fn renders_class_header_fields_and_forward_declarations() {
        let class = ClassObject {
            name: "Point".into(),
            super_name: "Obj".into(),
            inherited_fields: vec![],
            fields: vec!["x".into()],
            methods: vec![
                MethodObject {
                    name: CONSTRUCTOR_NAME.into(),
                    args: vec![],
                    locals: vec![],
                    code: vec!["    enter".into(), "    load $".into(), "    return 0".into()],
                },
                MethodObject {
                    name: "getX".into(),
                    args: vec![],
                    locals: vec![],
                    code: vec!["    enter".into()],
                },
            ],
        };
        let text = render_class(&class).unwrap();
        assert!(text.starts_with(".class Point:Obj\n"));
        assert!(text.contains(".field x\n"));
        assert!(text.contains(".method getX forward\n"));
        assert!(!text.contains(".method $constructor forward"));
    }

    #[test]
    fn inherited_fields_are_not_redeclared() {
        let class = ClassObject {
            name: "Dog".into(),
            super_name: "Animal".into(),
            inherited_fields: vec!["name".into()],
            fields: vec!["name".into(), "breed".into()],
            methods: vec![],
        };
        let text = render_class(&class).unwrap();
        assert!(!text.contains(".field name"));
        assert!(text.contains(".field breed"));
    }
}
