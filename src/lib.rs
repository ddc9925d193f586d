//! Quack compiler library.
//!
//! Provides the semantic-analysis and code-generation pipeline that turns
//! an already-parsed Quack program into textual stack-machine assembly.
//! The concrete grammar, its parser, and the assembler/VM that consume the
//! emitted `.asm` files are external collaborators this crate does not
//! implement — see [`ast`] for the tree shape this crate expects to
//! receive, and [`builtins`] for the one JSON artifact it does load itself.
//!
//! # Extending the compiler
//!
//! A host embedding this crate supplies its own parsed [`ast::Program`]
//! plus the top-level statements that become the synthesised main class:
//!
//! ```rust,ignore
//! use quackc::{compile_program, Program, TypeWorld};
//!
//! let (classes, world) = compile_program(program, top_level_stmts, "Main", world)?;
//! ```

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod desugar;
pub mod emit;
pub mod error;
pub mod fieldloader;
pub mod loader;
pub mod mainblock;
pub mod returncheck;
pub mod typecheck;
pub mod types;
pub mod varcheck;

pub use ast::{ParsedUnit, Program, Span, Stmt};
pub use codegen::ClassObject;
pub use error::{CompileError, ErrorKind, Result};
pub use types::TypeWorld;

use std::path::Path;

/// Runs the full semantic-analysis and code-generation pipeline, starting
/// from an already-parsed [`Program`] (user classes only — no main class
/// yet) and a separate list of top-level statements, and ending with one
/// [`ClassObject`] per class, ready for [`emit::render_class`].
///
/// Stage order: main-block synthesis, operator desugaring, class loading,
/// field loading, return checking, variable checking, type checking,
/// code generation. Main-block synthesis runs before desugaring (rather
/// than textually fourth, as the pipeline's own stage numbering has it)
/// so that top-level code is desugared and registered in the type world
/// exactly like any other class body — see `DESIGN.md` for the rationale.
pub fn compile_program(
    mut program: Program,
    top_level: Vec<Stmt>,
    main_name: &str,
    mut world: TypeWorld,
) -> Result<(Vec<ClassObject>, TypeWorld)> {
    let main_span = top_level.first().map(Stmt::span).unwrap_or_default();
    mainblock::synthesize_main(&mut program, main_name, top_level, main_span);

    tracing::debug!("desugaring operators");
    desugar::desugar_program(&mut program)?;

    tracing::debug!("loading classes");
    loader::attach_constructors(&mut program);
    loader::load_classes(&program, &mut world)?;

    tracing::debug!("loading fields");
    fieldloader::load_fields(&program, &mut world)?;

    tracing::debug!("checking returns");
    returncheck::check_returns(&mut program)?;

    tracing::debug!("checking variables");
    varcheck::check_vars(&program)?;

    tracing::debug!("checking types");
    typecheck::check_types(&mut program, &mut world)?;

    tracing::debug!("generating code");
    let classes = codegen::generate_program(&program, &world)?;

    Ok((classes, world))
}

/// Convenience entry point mirroring the CLI: reads a [`ParsedUnit`] from
/// `source_path` (the stand-in for what a real grammar/parser would hand
/// us — see [`ast`]'s module doc comment) and the builtin type table from
/// `builtins_path`, runs [`compile_program`], and writes one `.asm` file
/// per class into `out_dir`. Returns the class names written.
///
/// Every error returned carries `source_path` as its
/// [`CompileError::source_name`], so the formatted message matches the
/// `"<source-name> (<line>:<col>): <message>"` surface described in
/// `SPEC_FULL.md` §6 regardless of which pass raised it.
pub fn compile_file(
    source_path: &Path,
    main_name: &str,
    builtins_path: &Path,
    out_dir: &Path,
) -> Result<Vec<String>> {
    compile_file_inner(source_path, main_name, builtins_path, out_dir)
        .map_err(|e| e.with_source_name(source_path.display().to_string()))
}

fn compile_file_inner(
    source_path: &Path,
    main_name: &str,
    builtins_path: &Path,
    out_dir: &Path,
) -> Result<Vec<String>> {
    let source = std::fs::read_to_string(source_path)
        .map_err(|e| CompileError::new(ErrorKind::UnknownType, format!("could not read source: {e}")))?;
    let unit: ParsedUnit = serde_json::from_str(&source)
        .map_err(|e| CompileError::new(ErrorKind::UnknownType, format!("could not parse source: {e}")))?;
    let world = builtins::load_builtin_table_file(builtins_path)?;
    let program = Program { classes: unit.classes };
    let (classes, _world) = compile_program(program, unit.top_level, main_name, world)?;
    emit::emit_to_dir(&classes, out_dir)
}
