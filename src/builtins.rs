//! Loads the builtin type table JSON into a [`TypeWorld`].
//!
//! This is plumbing, not design: the grammar and the VM are the real
//! external collaborators here, and the only obligation of this module is
//! to hand the pipeline a [`TypeWorld`] already populated with `Obj`,
//! `Int`, `String`, `Bool`, `Nothing`, and whatever user-visible builtin
//! classes the host toolchain ships. An unresolvable name in the table is
//! as much a compile error as one found mid-pipeline, so it is reported
//! through the same [`CompileError`] channel as every other pass.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CompileError, ErrorKind, Result};
use crate::types::{ClassEntry, TypeWorld, NOTHING, OBJ};

#[derive(Debug, Deserialize)]
struct RawMethod {
    #[serde(default)]
    params: Vec<String>,
    #[serde(default = "default_ret")]
    ret: String,
}

fn default_ret() -> String {
    NOTHING.to_string()
}

#[derive(Debug, Deserialize)]
struct RawClass {
    #[serde(rename = "super")]
    super_name: String,
    #[serde(default)]
    methods: HashMap<String, RawMethod>,
    #[serde(default)]
    fields: HashMap<String, String>,
}

/// Parse a builtin type table and validate it as a standalone [`TypeWorld`].
pub fn load_builtin_table(json: &str) -> Result<TypeWorld> {
    let raw: HashMap<String, RawClass> = serde_json::from_str(json).map_err(|e| {
        CompileError::new(ErrorKind::UnknownType, format!("malformed builtin type table: {e}"))
    })?;

    let mut world = TypeWorld::new();
    for (name, class) in raw {
        let mut methods = HashMap::new();
        for (mname, m) in class.methods {
            methods.insert(
                mname,
                crate::types::MethodSig {
                    params: m.params,
                    ret: m.ret,
                },
            );
        }
        world.insert(
            name,
            ClassEntry {
                super_name: class.super_name,
                methods,
                fields: class.fields,
            },
        );
    }

    validate(&world)?;
    Ok(world)
}

/// Read and parse the builtin type table from disk.
pub fn load_builtin_table_file(path: &Path) -> Result<TypeWorld> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CompileError::new(
            ErrorKind::UnknownType,
            format!("could not read builtin type table {}: {e}", path.display()),
        )
    })?;
    load_builtin_table(&contents)
}

fn validate(world: &TypeWorld) -> Result<()> {
    for required in [OBJ, "Int", "String", "Bool", NOTHING] {
        if !world.contains(required) {
            return Err(CompileError::new(
                ErrorKind::UnknownType,
                format!("builtin type table is missing required class {required:?}"),
            ));
        }
    }
    let obj = world.require(OBJ)?;
    if obj.super_name != OBJ {
        return Err(CompileError::new(
            ErrorKind::UnknownType,
            format!("{OBJ:?}'s super must be itself, found {:?}", obj.super_name),
        ));
    }
    for name in world.names() {
        let entry = world.require(name)?;
        if !world.contains(&entry.super_name) {
            return Err(CompileError::new(
                ErrorKind::UnknownType,
                format!("{name:?} has unknown super {:?}", entry.super_name),
            ));
        }
        for (mname, sig) in &entry.methods {
            for p in &sig.params {
                if !world.contains(p) {
                    return Err(CompileError::new(
                        ErrorKind::UnknownType,
                        format!("{name:?}.{mname} references unknown parameter type {p:?}"),
                    ));
                }
            }
            if !world.contains(&sig.ret) {
                return Err(CompileError::new(
                    ErrorKind::UnknownType,
                    format!("{name:?}.{mname} references unknown return type {:?}", sig.ret),
                ));
            }
        }
        for (fname, fty) in &entry.fields {
            if !world.contains(fty) {
                return Err(CompileError::new(
                    ErrorKind::UnknownType,
                    format!("{name:?}.{fname} references unknown field type {fty:?}"),
                ));
            }
        }
    }
    Ok(())
}
