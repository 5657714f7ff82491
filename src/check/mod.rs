// src/check/mod.rs
//! The reference-check pass: one depth-first walk per compilation unit.
//!
//! On entering a class body the base-type validator and override checker
//! run against the class's resolved hierarchy before its members are
//! visited. Blocks push a scope level for forward-reference tracking.
//! Rewrites (singleton expansion, case factories, super accessors) are
//! applied node-locally during the same walk.
//!
//! Every diagnostic is recoverable: errors accumulate in the checker's
//! sink and the walk always completes. An internal [`TypeFailure`] raised
//! while processing one node is converted into an `E3901` diagnostic at
//! that node and the original node is kept untransformed.

mod forward;
mod overrides;
mod parents;
mod rewrite;
mod variance;


use crate::errors::{CheckError, TypeFailure};
use crate::symtab::{Definitions, Flags, SymbolId};
use crate::tree::{CompilationUnit, Tree};
use crate::types::lookup;
use crate::types::relate::conforms_to_bounds;

pub use forward::LevelInfo;

/// Run the reference checks over one unit, rewriting its tree in place.
/// Returns the accumulated diagnostics.
pub fn check_unit(defs: &mut Definitions, unit: &mut CompilationUnit) -> Vec<CheckError> {
    let mut checker = RefChecker::new(defs);
    let body = std::mem::take(&mut unit.body);
    unit.body = checker.transform_stats(&body);
    checker.finish()
}

/// Per-unit checker state: the symbol handle, the diagnostic sink, the
/// scope-level stack, and the class whose body is being walked.
pub struct RefChecker<'a> {
    defs: &'a mut Definitions,
    errors: Vec<CheckError>,
    levels: Vec<LevelInfo>,
    current_class: Option<SymbolId>,
}

impl<'a> RefChecker<'a> {
    pub fn new(defs: &'a mut Definitions) -> Self {
        Self {
            defs,
            errors: Vec::new(),
            levels: Vec::new(),
            current_class: None,
        }
    }

    pub fn finish(self) -> Vec<CheckError> {
        self.errors
    }

    fn report(&mut self, err: CheckError) {
        self.errors.push(err);
    }

    /// Transform one node, catching internal type failures at this node.
    pub fn transform(&mut self, tree: &Tree) -> Tree {
        match self.transform_node(tree) {
            Ok(t) => t,
            Err(failure) => {
                self.report(CheckError::Internal {
                    message: failure.message,
                    span: tree.span().into(),
                });
                tree.clone()
            }
        }
    }

    fn transform_node(&mut self, tree: &Tree) -> Result<Tree, TypeFailure> {
        match tree {
            Tree::ClassDef { sym, body, span } => {
                self.validate_base_types(*sym, *span)?;
                self.check_all_overrides(*sym, *span)?;
                self.validate_definition_variance(*sym, *span);
                let saved = self.current_class.replace(*sym);
                let body = self.transform_stats(body);
                self.current_class = saved;
                Ok(Tree::ClassDef {
                    sym: *sym,
                    body,
                    span: *span,
                })
            }

            // Normally spliced by `transform_stats`; standalone modules
            // expand into a block.
            Tree::ModuleDef { sym, body, span } => {
                let expanded = self.expand_module(*sym, body, *span)?;
                Ok(match <[Tree; 1]>::try_from(expanded) {
                    Ok([single]) => single,
                    Err(stats) => Tree::Block { stats, span: *span },
                })
            }

            Tree::DefDef { sym, rhs, span } => {
                self.validate_definition_variance(*sym, *span);
                let rhs = rhs.as_ref().map(|r| Box::new(self.transform(r)));
                Ok(Tree::DefDef {
                    sym: *sym,
                    rhs,
                    span: *span,
                })
            }

            Tree::ValDef { sym, rhs, span } => {
                self.validate_definition_variance(*sym, *span);
                let rhs = rhs.as_ref().map(|r| Box::new(self.transform(r)));
                Ok(Tree::ValDef {
                    sym: *sym,
                    rhs,
                    span: *span,
                })
            }

            Tree::TypeDef { sym, span } => {
                self.validate_definition_variance(*sym, *span);
                Ok(tree.clone())
            }

            Tree::Block { stats, span } => {
                self.push_level();
                self.enter_syms(stats);
                let stats = self.transform_stats(stats);
                self.pop_level();
                Ok(Tree::Block { stats, span: *span })
            }

            Tree::Ident { sym, tpe, span } => {
                self.enter_reference(*sym, *span);
                if let Some(ctor) = self.factory_call(*sym, tpe, *span) {
                    return Ok(ctor);
                }
                Ok(tree.clone())
            }

            Tree::Select { qual, sym, tpe, span } => self.transform_select(qual, *sym, tpe, *span),

            Tree::New { tpe, span } => {
                if let Some(sym) = tpe.type_symbol() {
                    self.enter_reference(sym, *span);
                }
                Ok(tree.clone())
            }

            Tree::Apply {
                fun,
                args,
                tpe,
                span,
            } => {
                let fun = Box::new(self.transform(fun));
                let args = args.iter().map(|a| self.transform(a)).collect();
                Ok(Tree::Apply {
                    fun,
                    args,
                    tpe: tpe.clone(),
                    span: *span,
                })
            }

            Tree::TypeApply {
                fun,
                args,
                tpe,
                span,
            } => {
                if let Some(fsym) = fun_symbol(fun)
                    && let Some(ctor) = self.factory_call(fsym, tpe, *span)
                {
                    return Ok(ctor);
                }
                self.check_type_arguments(fun, args, *span)?;
                let fun = Box::new(self.transform(fun));
                Ok(Tree::TypeApply {
                    fun,
                    args: args.clone(),
                    tpe: tpe.clone(),
                    span: *span,
                })
            }

            Tree::Assign { lhs, rhs, span } => Ok(Tree::Assign {
                lhs: Box::new(self.transform(lhs)),
                rhs: Box::new(self.transform(rhs)),
                span: *span,
            }),

            Tree::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => Ok(Tree::If {
                cond: Box::new(self.transform(cond)),
                then_branch: Box::new(self.transform(then_branch)),
                else_branch: else_branch.as_ref().map(|e| Box::new(self.transform(e))),
                span: *span,
            }),

            Tree::Binary { op, lhs, rhs, span } => Ok(Tree::Binary {
                op: *op,
                lhs: Box::new(self.transform(lhs)),
                rhs: Box::new(self.transform(rhs)),
                span: *span,
            }),

            Tree::This { .. } | Tree::Super { .. } | Tree::Literal { .. } | Tree::Empty => {
                Ok(tree.clone())
            }
        }
    }

    /// Transform a statement sequence in source order. Module definitions
    /// are spliced into their expansion; value definitions are checked
    /// against the current level's forward-reference marker afterwards.
    fn transform_stats(&mut self, stats: &[Tree]) -> Vec<Tree> {
        let mut result = Vec::with_capacity(stats.len());
        for stat in stats {
            if let Tree::ModuleDef { sym, body, span } = stat {
                match self.expand_module(*sym, body, *span) {
                    Ok(mut expanded) => result.append(&mut expanded),
                    Err(failure) => {
                        self.report(CheckError::Internal {
                            message: failure.message,
                            span: (*span).into(),
                        });
                        result.push(stat.clone());
                    }
                }
                continue;
            }
            let transformed = self.transform(stat);
            if let Tree::ValDef { sym, .. } = stat {
                self.check_forward_def(*sym);
            }
            result.push(transformed);
        }
        result
    }

    /// Check explicit type arguments against the parameters' declared
    /// bounds, with the arguments themselves substituted into the bounds.
    fn check_type_arguments(
        &mut self,
        fun: &Tree,
        args: &[crate::types::Type],
        span: crate::tree::Span,
    ) -> Result<(), TypeFailure> {
        let Some(fsym) = fun_symbol(fun) else {
            return Ok(());
        };
        let tparams = self.defs.get(fsym).type_params.clone();
        let map: rustc_hash::FxHashMap<SymbolId, crate::types::Type> = tparams
            .iter()
            .copied()
            .zip(args.iter().cloned())
            .collect();
        for (&tp, arg) in tparams.iter().zip(args) {
            let bounds = lookup::substitute(&self.defs.get(tp).ty, &map);
            if !conforms_to_bounds(self.defs, arg, &bounds) {
                self.report(CheckError::TypeArgumentBounds {
                    arg: self.defs.type_string(arg),
                    param: self.defs.name_str(tp).to_string(),
                    bounds: self.defs.type_string(&bounds),
                    span: span.into(),
                });
            }
        }
        Ok(())
    }
}

/// The symbol a callee tree refers to, if it is reference-shaped.
fn fun_symbol(fun: &Tree) -> Option<SymbolId> {
    match fun {
        Tree::Ident { sym, .. } | Tree::Select { sym, .. } => Some(*sym),
        _ => None,
    }
}

impl Definitions {
    /// Whether a symbol is the synthesized case-class factory method.
    fn is_case_factory(&self, sym: SymbolId) -> bool {
        let def = self.get(sym);
        def.kind == crate::symtab::SymbolKind::Method
            && def.flags.contains(Flags::CASE)
            && !def.flags.contains(Flags::CONSTRUCTOR)
    }
}
