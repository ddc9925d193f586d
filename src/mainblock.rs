//! Main block synthesiser: wraps the program's top-level statements into a
//! synthesised class whose constructor is the whole program.
//!
//! There is no Python equivalent file to ground this on directly — in the
//! original pipeline the parser itself produces a `start` rule that is
//! already shaped like a class, constructor included, with top-level
//! statements directly in the constructor body (see `compile.py`'s
//! `Main` naming convention for the default class name). Here the parser
//! hands us a flat statement list and this pass does the wrapping
//! explicitly, matching the same naming convention.

use crate::ast::{ClassDef, Program, Span, Stmt};

/// Wraps `top_level` into a class named `name` with no supertype and an
/// empty formal-argument list, and appends it to `program.classes`. The
/// later passes (class loader, field loader, ...) treat it exactly like
/// any user-defined class.
pub fn synthesize_main(program: &mut Program, name: &str, top_level: Vec<Stmt>, span: Span) {
    program.classes.push(ClassDef {
        name: name.to_string(),
        super_name: None,
        formal_args: vec![],
        constructor_body: top_level,
        methods: vec![],
        span,
    });
}
