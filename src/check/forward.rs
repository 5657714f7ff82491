// src/check/forward.rs
//! Forward-reference tracking over the scope-level stack.
//!
//! Entering a block pushes a level and pre-registers every local
//! definition with its statement index. References to registered symbols
//! arm the level's furthest-forward marker; a value definition whose
//! index does not exceed the marker is a proven forward reference.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::check::RefChecker;
use crate::errors::CheckError;
use crate::symtab::{Flags, SymbolId};
use crate::tree::{Span, Tree};

/// One lexical block on the level stack.
#[derive(Debug, Default)]
pub struct LevelInfo {
    /// Locally defined symbols with their statement indices.
    scope: FxHashMap<SymbolId, usize>,
    /// Index of the furthest-defined symbol referenced so far. Monotonic
    /// within the level.
    max_index: Option<usize>,
    /// The symbol whose reference armed the marker, for logging.
    ref_sym: Option<SymbolId>,
    /// Where that reference occurred; forward-reference errors point here.
    ref_span: Span,
}

impl RefChecker<'_> {
    pub(crate) fn push_level(&mut self) {
        self.levels.push(LevelInfo::default());
    }

    pub(crate) fn pop_level(&mut self) {
        self.levels.pop();
    }

    /// Pre-register every local definition of the block with its index,
    /// before any statement is transformed. All definition kinds are
    /// registered so that a reference to any of them can arm the marker;
    /// only value definitions check the marker on the defining side.
    pub(crate) fn enter_syms(&mut self, stats: &[Tree]) {
        let Some(level) = self.levels.last_mut() else {
            return;
        };
        for (index, stat) in stats.iter().enumerate() {
            if let Some(sym) = stat.defined_symbol()
                && self.defs.flags(sym).contains(Flags::LOCAL)
            {
                level.scope.insert(sym, index);
            }
        }
    }

    /// Record a reference to `sym`. If the symbol is registered at some
    /// level and defined no earlier than anything referenced so far, the
    /// level's furthest-forward marker moves to this reference.
    pub(crate) fn enter_reference(&mut self, sym: SymbolId, span: Span) {
        for level in self.levels.iter_mut().rev() {
            let Some(&index) = level.scope.get(&sym) else {
                continue;
            };
            if level.max_index.is_none_or(|max| index >= max) {
                level.max_index = Some(index);
                level.ref_sym = Some(sym);
                level.ref_span = span;
            }
            return;
        }
    }

    /// Called after a value definition statement is transformed: if an
    /// earlier reference reached past this definition's index, that
    /// reference was a forward reference.
    pub(crate) fn check_forward_def(&mut self, sym: SymbolId) {
        let Some(level) = self.levels.last() else {
            return;
        };
        let Some(&index) = level.scope.get(&sym) else {
            return;
        };
        if let Some(max) = level.max_index
            && index <= max
        {
            let span: miette::SourceSpan = level.ref_span.into();
            // The same offending reference crosses every later value
            // definition it precedes; report it once.
            let already = self.errors.iter().any(
                |e| matches!(e, CheckError::ForwardReference { span: s, .. } if *s == span),
            );
            if already {
                return;
            }
            debug!(
                defined = ?sym,
                forced_by = ?level.ref_sym,
                "forward reference detected"
            );
            let err = CheckError::ForwardReference {
                definition: self.defs.describe(sym),
                span,
            };
            self.report(err);
        }
    }
}
