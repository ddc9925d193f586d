//! The type world: the registry of every class known during compilation,
//! its inheritance, methods, and fields, plus the lattice operations
//! (`is_subtype`, `depth`, `lca`) passes need.
//!
//! Classes inherit by value: when a class is loaded its supertype's
//! methods and fields are deep-copied into it, so a lookup never needs to
//! walk `super` at query time. The root of the lattice is `Obj`, whose own
//! `super` is itself — a self-loop sentinel rather than an `Option`.

use std::collections::HashMap;

use crate::error::{CompileError, ErrorKind, Result};

pub const OBJ: &str = "Obj";
pub const NOTHING: &str = "Nothing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub params: Vec<String>,
    pub ret: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClassEntry {
    pub super_name: String,
    pub methods: HashMap<String, MethodSig>,
    pub fields: HashMap<String, String>,
}

/// Mutable registry of all classes known during compilation. Exactly one
/// pass owns `&mut TypeWorld` at a time; ownership moves between passes in
/// the pipeline rather than being shared behind interior mutability.
#[derive(Debug, Clone, Default)]
pub struct TypeWorld {
    classes: HashMap<String, ClassEntry>,
}

impl TypeWorld {
    pub fn new() -> Self {
        TypeWorld {
            classes: HashMap::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassEntry> {
        self.classes.get_mut(name)
    }

    pub fn insert(&mut self, name: String, entry: ClassEntry) {
        self.classes.insert(name, entry);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    pub fn require(&self, name: &str) -> Result<&ClassEntry> {
        self.classes.get(name).ok_or_else(|| {
            CompileError::new(ErrorKind::UnknownType, format!("{name:?} is not a known type"))
        })
    }

    /// Number of `super` hops from `name` up to the `Obj` self-loop.
    pub fn depth(&self, name: &str) -> Result<usize> {
        let mut cur = name.to_string();
        let mut n = 0usize;
        loop {
            let entry = self.require(&cur)?;
            if entry.super_name == cur {
                return Ok(n);
            }
            cur = entry.super_name.clone();
            n += 1;
        }
    }

    /// Does `sub` inherit from (or equal) `sup`, walking `super` links?
    pub fn is_subtype(&self, sub: &str, sup: &str) -> Result<bool> {
        let mut cur = sub.to_string();
        loop {
            if cur == sup {
                return Ok(true);
            }
            let entry = self.require(&cur)?;
            if entry.super_name == cur {
                return Ok(false);
            }
            cur = entry.super_name.clone();
        }
    }

    /// Least upper bound of `a` and `b` along the inheritance tree. The
    /// empty string is the bottom sentinel: `lca("", x) == x`.
    pub fn lca(&self, a: &str, b: &str) -> Result<String> {
        if a.is_empty() {
            return Ok(b.to_string());
        }
        if b.is_empty() {
            return Ok(a.to_string());
        }
        if a == b {
            return Ok(a.to_string());
        }
        let (mut hi, mut lo, mut hi_depth, mut lo_depth) = {
            let da = self.depth(a)?;
            let db = self.depth(b)?;
            if da >= db {
                (a.to_string(), b.to_string(), da, db)
            } else {
                (b.to_string(), a.to_string(), db, da)
            }
        };
        while hi_depth > lo_depth {
            hi = self.require(&hi)?.super_name.clone();
            hi_depth -= 1;
        }
        while hi != lo {
            hi = self.require(&hi)?.super_name.clone();
            lo = self.require(&lo)?.super_name.clone();
        }
        Ok(hi)
    }

    /// Post-fixpoint inheritance cross-check: every overriding method
    /// agrees in arity, is contravariant in parameters, covariant in
    /// return type; every inherited field is present with a compatible
    /// type. Called once after type checking reaches its fixpoint.
    pub fn check_inheritance(&self) -> Result<()> {
        for (name, entry) in &self.classes {
            if entry.super_name == *name {
                continue; // Obj
            }
            let sup = self.require(&entry.super_name)?;
            for (fname, sup_ty) in &sup.fields {
                match entry.fields.get(fname) {
                    None => {
                        return Err(CompileError::new(
                            ErrorKind::InheritedFieldMissing,
                            format!("{name:?} is missing inherited field {fname:?}"),
                        ));
                    }
                    Some(sub_ty) => {
                        if !self.is_subtype(sub_ty, sup_ty)? {
                            return Err(CompileError::new(
                                ErrorKind::InheritedFieldNotSubtype,
                                format!(
                                    "{name:?} field {fname:?} has type {sub_ty:?}, not a subtype of inherited type {sup_ty:?}"
                                ),
                            ));
                        }
                    }
                }
            }
            for (mname, sup_sig) in &sup.methods {
                if mname == "$constructor" {
                    continue;
                }
                let Some(sub_sig) = entry.methods.get(mname) else {
                    continue; // not overridden
                };
                if sub_sig.params.len() != sup_sig.params.len() {
                    return Err(CompileError::new(
                        ErrorKind::OverrideArityMismatch,
                        format!(
                            "{name:?} overrides {mname:?} with {} params, expected {}",
                            sub_sig.params.len(),
                            sup_sig.params.len()
                        ),
                    ));
                }
                for (sub_p, sup_p) in sub_sig.params.iter().zip(sup_sig.params.iter()) {
                    if !self.is_subtype(sup_p, sub_p)? {
                        return Err(CompileError::new(
                            ErrorKind::OverrideParamNotContravariant,
                            format!(
                                "{name:?} overrides {mname:?} with parameter type {sub_p:?} that is not a supertype of inherited parameter type {sup_p:?}"
                            ),
                        ));
                    }
                }
                if !self.is_subtype(&sub_sig.ret, &sup_sig.ret)? {
                    return Err(CompileError::new(
                        ErrorKind::OverrideReturnNotCovariant,
                        format!(
                            "{name:?} overrides {mname:?} with return type {:?} that is not a subtype of inherited return type {:?}",
                            sub_sig.ret, sup_sig.ret
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
