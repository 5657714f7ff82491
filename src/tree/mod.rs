// src/tree/mod.rs
//! The symbol- and type-annotated tree handed to this pass.
//!
//! Upstream phases (parsing, naming, typing) have already resolved every
//! reference to a [`SymbolId`](crate::symtab::SymbolId) and annotated
//! expression nodes with their [`Type`](crate::types::Type). This pass
//! walks the tree once, validates it, and may replace nodes (singleton
//! expansion, constructor rewrites, super-accessor redirections).

use crate::intern::Name;
use crate::symtab::SymbolId;
use crate::types::Type;
use miette::SourceSpan;

/// Source location span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> SourceSpan {
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

/// Literal values appearing in annotated trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lit {
    Null,
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    EqEq,
    BangEq,
}

/// A node of the annotated tree.
///
/// Definition nodes carry the defined symbol; reference nodes carry the
/// referenced symbol and the resolved type of the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    ClassDef {
        sym: SymbolId,
        body: Vec<Tree>,
        span: Span,
    },
    /// Singleton object definition; expanded by the rewriter.
    ModuleDef {
        sym: SymbolId,
        body: Vec<Tree>,
        span: Span,
    },
    DefDef {
        sym: SymbolId,
        rhs: Option<Box<Tree>>,
        span: Span,
    },
    ValDef {
        sym: SymbolId,
        rhs: Option<Box<Tree>>,
        span: Span,
    },
    /// Type alias or abstract type member definition.
    TypeDef {
        sym: SymbolId,
        span: Span,
    },
    /// Statement sequence; the last statement is the block's value.
    Block {
        stats: Vec<Tree>,
        span: Span,
    },
    Ident {
        sym: SymbolId,
        tpe: Type,
        span: Span,
    },
    Select {
        qual: Box<Tree>,
        sym: SymbolId,
        tpe: Type,
        span: Span,
    },
    This {
        sym: SymbolId,
        span: Span,
    },
    /// `super` reference from inside `this_sym`; `mix` names the parent
    /// when the reference is qualified (`super[P]`).
    Super {
        this_sym: SymbolId,
        mix: Option<Name>,
        span: Span,
    },
    /// Direct object construction; `Apply { fun: New, .. }` invokes the
    /// primary constructor of the referenced class.
    New {
        tpe: Type,
        span: Span,
    },
    Apply {
        fun: Box<Tree>,
        args: Vec<Tree>,
        tpe: Type,
        span: Span,
    },
    /// Explicit type application of a polymorphic term.
    TypeApply {
        fun: Box<Tree>,
        args: Vec<Type>,
        tpe: Type,
        span: Span,
    },
    Assign {
        lhs: Box<Tree>,
        rhs: Box<Tree>,
        span: Span,
    },
    If {
        cond: Box<Tree>,
        then_branch: Box<Tree>,
        else_branch: Option<Box<Tree>>,
        span: Span,
    },
    Binary {
        op: BinOp,
        lhs: Box<Tree>,
        rhs: Box<Tree>,
        span: Span,
    },
    Literal {
        value: Lit,
        span: Span,
    },
    Empty,
}

impl Tree {
    pub fn span(&self) -> Span {
        match self {
            Tree::ClassDef { span, .. }
            | Tree::ModuleDef { span, .. }
            | Tree::DefDef { span, .. }
            | Tree::ValDef { span, .. }
            | Tree::TypeDef { span, .. }
            | Tree::Block { span, .. }
            | Tree::Ident { span, .. }
            | Tree::Select { span, .. }
            | Tree::This { span, .. }
            | Tree::Super { span, .. }
            | Tree::New { span, .. }
            | Tree::Apply { span, .. }
            | Tree::TypeApply { span, .. }
            | Tree::Assign { span, .. }
            | Tree::If { span, .. }
            | Tree::Binary { span, .. }
            | Tree::Literal { span, .. } => *span,
            Tree::Empty => Span::default(),
        }
    }

    /// The symbol a definition node introduces, if this is one.
    pub fn defined_symbol(&self) -> Option<SymbolId> {
        match self {
            Tree::ClassDef { sym, .. }
            | Tree::ModuleDef { sym, .. }
            | Tree::DefDef { sym, .. }
            | Tree::ValDef { sym, .. }
            | Tree::TypeDef { sym, .. } => Some(*sym),
            _ => None,
        }
    }

    /// The resolved type of an expression node, when it carries one.
    pub fn tpe(&self) -> Option<&Type> {
        match self {
            Tree::Ident { tpe, .. }
            | Tree::Select { tpe, .. }
            | Tree::New { tpe, .. }
            | Tree::Apply { tpe, .. }
            | Tree::TypeApply { tpe, .. } => Some(tpe),
            _ => None,
        }
    }
}

/// One fully annotated compilation unit.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub body: Vec<Tree>,
}

impl CompilationUnit {
    pub fn new(body: Vec<Tree>) -> Self {
        Self { body }
    }
}
