//! Abstract syntax tree for Quack.
//!
//! The concrete grammar and parser are external collaborators; this module
//! defines the tree shape every pass in this crate agrees to produce and
//! consume. Each node kind is its own Rust type rather than a generic
//! tagged tree — passes are ordinary functions that pattern-match on the
//! relevant enum instead of visitor subclasses.
//!
//! A handful of variants (`BinOp`, `UnOp`, `NotEquals`, `LitLongString` on
//! [`Expr`], `CompoundAssign` and `RawStore` on [`Stmt`]) only ever appear
//! before [`crate::desugar::desugar_program`] runs. Every later pass may
//! assume they are gone; that guarantee is a pass contract, not something
//! enforced by a second AST type.
//!
//! Every node type also derives `serde::Deserialize`. There is no real
//! grammar in this crate to produce a `Program`, so the CLI driver (see
//! [`crate::ParsedUnit`]) reads one from a JSON file instead — a stand-in
//! for whatever the external parser would hand the pipeline, not a format
//! with any ambition of being a second grammar.

use serde::Deserialize;

/// Source position, 1-indexed for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

/// Sentinel type used before a node's first type assignment. Acts as the
/// bottom element of the inheritance lattice for the purposes of `lca`.
pub const BOTTOM_TYPE: &str = "";

#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub classes: Vec<ClassDef>,
}

/// What the external parser would hand the pipeline for one source file:
/// the user's class declarations, plus the statements outside any class
/// that [`crate::mainblock::synthesize_main`] wraps into the main class.
/// Read from disk as JSON by the CLI driver; see the module doc comment
/// for why that format exists at all.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedUnit {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub top_level: Vec<Stmt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormalArg {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassDef {
    pub name: String,
    /// `None` means the grammar gave no explicit supertype; the class
    /// loader defaults this to `Obj`.
    #[serde(default)]
    pub super_name: Option<String>,
    #[serde(default)]
    pub formal_args: Vec<FormalArg>,
    #[serde(default)]
    pub constructor_body: Vec<Stmt>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub params: Vec<FormalArg>,
    /// `None` means no declared return type; defaults to `Nothing`.
    #[serde(default)]
    pub ret_type: Option<String>,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Method {
    pub fn ret_type_or_default(&self) -> &str {
        self.ret_type.as_deref().unwrap_or("Nothing")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinOpKind {
    Plus,
    Minus,
    Times,
    Divide,
    Mod,
    Equals,
    Less,
    AtMost,
    More,
    AtLeast,
}

impl BinOpKind {
    /// Method name this operator lowers to on the receiver's type.
    pub fn method_name(self) -> &'static str {
        match self {
            BinOpKind::Plus => "PLUS",
            BinOpKind::Minus => "MINUS",
            BinOpKind::Times => "TIMES",
            BinOpKind::Divide => "DIVIDE",
            BinOpKind::Mod => "MOD",
            BinOpKind::Equals => "EQUALS",
            BinOpKind::Less => "LESS",
            BinOpKind::AtMost => "ATMOST",
            BinOpKind::More => "MORE",
            BinOpKind::AtLeast => "ATLEAST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnOpKind {
    Neg,
    Negate,
}

impl UnOpKind {
    pub fn method_name(self) -> &'static str {
        match self {
            UnOpKind::Neg => "NEG",
            UnOpKind::Negate => "NEGATE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeAlt {
    pub bound_name: String,
    pub type_name: String,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Deserialize)]
pub enum Stmt {
    /// `name [: declared_type] = value`. `ty` is the decoration slot the
    /// type checker widens via LCA across fixpoint iterations; when
    /// `declared_type` is absent the generator uses `ty` as the local's
    /// recorded type.
    Assign {
        name: String,
        #[serde(default)]
        declared_type: Option<String>,
        value: Expr,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    /// Post-desugar field store: `object.field = value`.
    StoreField {
        object: Expr,
        field: String,
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    /// An expression evaluated for effect; its value is popped.
    RawExpr {
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    /// `return [value]`. Pre-desugar a bare `return` carries `None`;
    /// desugaring fills it with a `Expr::LitNothing`.
    Ret {
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        #[serde(default)]
        elifs: Vec<(Expr, Vec<Stmt>)>,
        #[serde(default)]
        else_block: Option<Vec<Stmt>>,
        #[serde(default)]
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Typecase {
        scrutinee: Expr,
        alternatives: Vec<TypeAlt>,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only: `target op= value` where `target` is a `Var` or
    /// `LoadField` expression.
    CompoundAssign {
        target: Expr,
        op: BinOpKind,
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only: the parser's two-child shape for a field store,
    /// `target = value` where `target` is expected to be a `LoadField`
    /// expression (anything else is an `AssignToCall` error).
    RawStore {
        target: Expr,
        value: Expr,
        #[serde(default)]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::StoreField { span, .. }
            | Stmt::RawExpr { span, .. }
            | Stmt::Ret { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Typecase { span, .. }
            | Stmt::CompoundAssign { span, .. }
            | Stmt::RawStore { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub enum Expr {
    LitNumber {
        value: i64,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    LitString {
        value: String,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    LitTrue {
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    LitFalse {
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    LitNothing {
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    Var {
        name: String,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    LoadField {
        object: Box<Expr>,
        field: String,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    MCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    CCall {
        class_name: String,
        args: Vec<Expr>,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        #[serde(default)]
        ty: String,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only.
    BinOp {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only.
    UnOp {
        op: UnOpKind,
        operand: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only: `left != right`.
    NotEquals {
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// Pre-desugar only: a triple-quoted string token, not yet unescaped.
    LitLongString {
        raw: String,
        #[serde(default)]
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::LitNumber { span, .. }
            | Expr::LitString { span, .. }
            | Expr::LitTrue { span, .. }
            | Expr::LitFalse { span, .. }
            | Expr::LitNothing { span, .. }
            | Expr::Var { span, .. }
            | Expr::LoadField { span, .. }
            | Expr::MCall { span, .. }
            | Expr::CCall { span, .. }
            | Expr::And { span, .. }
            | Expr::Or { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::BinOp { span, .. }
            | Expr::UnOp { span, .. }
            | Expr::NotEquals { span, .. }
            | Expr::LitLongString { span, .. } => *span,
        }
    }

    /// The node's current type decoration, or the bottom sentinel if this
    /// variant carries none (only pre-desugar variants lack one).
    pub fn ty(&self) -> &str {
        match self {
            Expr::LitNumber { ty, .. }
            | Expr::LitString { ty, .. }
            | Expr::LitTrue { ty, .. }
            | Expr::LitFalse { ty, .. }
            | Expr::LitNothing { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::LoadField { ty, .. }
            | Expr::MCall { ty, .. }
            | Expr::CCall { ty, .. }
            | Expr::And { ty, .. }
            | Expr::Or { ty, .. }
            | Expr::Ternary { ty, .. } => ty,
            _ => BOTTOM_TYPE,
        }
    }
}
