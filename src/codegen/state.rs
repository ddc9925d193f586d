//! Shared state for code generation: the label counter and the class/method
//! record types the generator builds and the emitter later serialises.
//!
//! Grounded in the original `generator.py`'s `Generator.__init__`/`emit`/
//! `label`: one monotonic counter per label prefix (`itertools.count`
//! keyed by a `defaultdict`), and a plain `code: Vec<String>` per method
//! that instructions are appended to, four-space indented unless the line
//! is a label.

use std::collections::HashMap;

/// A single class's generated code, ready for the emitter.
#[derive(Debug, Clone)]
pub struct ClassObject {
    pub name: String,
    pub super_name: String,
    pub methods: Vec<MethodObject>,
    pub inherited_fields: Vec<String>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MethodObject {
    pub name: String,
    pub args: Vec<String>,
    /// Local variable name -> recorded type, in first-seen order.
    pub locals: Vec<(String, String)>,
    pub code: Vec<String>,
}

impl MethodObject {
    pub fn record_local(&mut self, name: &str, ty: &str) {
        if let Some(entry) = self.locals.iter_mut().find(|(n, _)| n == name) {
            entry.1 = ty.to_string();
        } else {
            self.locals.push((name.to_string(), ty.to_string()));
        }
    }
}

/// Per-prefix monotonic label counters. Different prefixes never collide,
/// which keeps emitted labels legible (`and_0`, `join_1`, ...) without
/// needing a single global counter.
#[derive(Debug, Default)]
pub struct LabelCounters {
    counts: HashMap<String, u32>,
}

impl LabelCounters {
    pub fn new() -> Self {
        LabelCounters::default()
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let n = self.counts.entry(prefix.to_string()).or_insert(0);
        let label = format!("{prefix}_{n}");
        *n += 1;
        label
    }
}
