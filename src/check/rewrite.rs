// src/check/rewrite.rs
//! Node-local tree rewrites applied during the walk.
//!
//! Three rewrites share the traversal: singleton-object expansion into a
//! class plus a lazily initialized holder, case-factory references turned
//! into direct constructor invocations, and super/this selections
//! redirected through trait super-accessors or inherited parameter
//! accessors.

use crate::check::RefChecker;
use crate::errors::{CheckError, TypeFailure};
use crate::symtab::{Flags, SymbolId};
use crate::tree::{BinOp, Lit, Span, Tree};
use crate::types::lookup::{linearize, parents};
use crate::types::Type;

impl RefChecker<'_> {
    /// Expand a singleton-object definition. A static singleton becomes a
    /// plain class definition; a non-static one becomes three siblings:
    /// the backing class, a null-initialized backing variable, and an
    /// accessor that instantiates the class into the variable on first
    /// access.
    pub(crate) fn expand_module(
        &mut self,
        sym: SymbolId,
        body: &[Tree],
        span: Span,
    ) -> Result<Vec<Tree>, TypeFailure> {
        let module_class = self.defs.get(sym).module_class.ok_or_else(|| {
            TypeFailure::new(format!(
                "{} has no backing class",
                self.defs.describe(sym)
            ))
        })?;
        let cdef = Tree::ClassDef {
            sym: module_class,
            body: body.to_vec(),
            span,
        };
        if self.defs.flags(sym).contains(Flags::STATIC) {
            return Ok(vec![self.transform(&cdef)]);
        }

        let var = self.defs.fresh_module_var(sym);
        let var_ty = self.defs.get(var).ty.clone();
        let var_ref = |tpe: Type| Tree::Ident {
            sym: var,
            tpe,
            span,
        };
        let null = Tree::Literal {
            value: Lit::Null,
            span,
        };

        let vdef = Tree::ValDef {
            sym: var,
            rhs: Some(Box::new(null.clone())),
            span,
        };
        // if (var == null) var = new C; var
        let lazy_init = Tree::If {
            cond: Box::new(Tree::Binary {
                op: BinOp::EqEq,
                lhs: Box::new(var_ref(var_ty.clone())),
                rhs: Box::new(null),
                span,
            }),
            then_branch: Box::new(Tree::Assign {
                lhs: Box::new(var_ref(var_ty.clone())),
                rhs: Box::new(Tree::Apply {
                    fun: Box::new(Tree::New {
                        tpe: var_ty.clone(),
                        span,
                    }),
                    args: Vec::new(),
                    tpe: var_ty.clone(),
                    span,
                }),
                span,
            }),
            else_branch: None,
            span,
        };
        let ddef = Tree::DefDef {
            sym,
            rhs: Some(Box::new(Tree::Block {
                stats: vec![lazy_init, var_ref(var_ty)],
                span,
            })),
            span,
        };
        Ok(vec![
            self.transform(&cdef),
            self.transform(&vdef),
            self.transform(&ddef),
        ])
    }

    /// Rewrite a reference to a case class's synthesized factory method
    /// into a direct construction of the class.
    pub(crate) fn factory_call(&mut self, sym: SymbolId, tpe: &Type, span: Span) -> Option<Tree> {
        self.defs.is_case_factory(sym).then(|| Tree::New {
            tpe: tpe.final_result().clone(),
            span,
        })
    }

    /// Selections carry the remaining rewrites: super-accessor
    /// redirection inside traits, parameter-accessor alias redirection,
    /// case-factory selection, and the abstract-super access check.
    pub(crate) fn transform_select(
        &mut self,
        qual: &Tree,
        sym: SymbolId,
        tpe: &Type,
        span: Span,
    ) -> Result<Tree, TypeFailure> {
        if let Some(ctor) = self.factory_call(sym, tpe, span) {
            return Ok(ctor);
        }

        if let Tree::Super {
            this_sym, mix, ..
        } = qual
        {
            return self.transform_super_select(qual, *this_sym, *mix, sym, tpe, span);
        }

        if let Tree::This { sym: this_class, .. } = qual
            && self.defs.flags(sym).contains(Flags::PARAM_ACCESSOR)
            && let Some(alias) = self.defs.get(sym).alias_of
        {
            // Forward to the inherited accessor through the first parent.
            let mix = parents(self.defs, *this_class)?
                .first()
                .and_then(|t| t.type_symbol())
                .map(|p| self.defs.name_of(p));
            return Ok(Tree::Select {
                qual: Box::new(Tree::Super {
                    this_sym: *this_class,
                    mix,
                    span: qual.span(),
                }),
                sym: alias,
                tpe: tpe.clone(),
                span,
            });
        }

        Ok(Tree::Select {
            qual: Box::new(self.transform(qual)),
            sym,
            tpe: tpe.clone(),
            span,
        })
    }

    fn transform_super_select(
        &mut self,
        qual: &Tree,
        this_class: SymbolId,
        mix: Option<crate::intern::Name>,
        sym: SymbolId,
        tpe: &Type,
        span: Span,
    ) -> Result<Tree, TypeFailure> {
        if self.defs.flags(sym).contains(Flags::DEFERRED) {
            // A super access to an abstract member only resolves when the
            // accessing class overrides it with an `abstract override`
            // member whose chain is still incomplete; once a concrete
            // implementation exists below, the access is plainly illegal.
            let covered = if mix.is_some() {
                false
            } else if let Some(m) = self
                .defs
                .decl_named(this_class, self.defs.name_of(sym))
                .filter(|&m| self.defs.flags(m).contains(Flags::ABSTRACT_OVERRIDE))
            {
                let lin = linearize(self.defs, this_class)?;
                !self.has_concrete_impl(this_class, m, &lin, 1)?
            } else {
                false
            };
            if !covered {
                self.report(CheckError::AbstractSuperAccess {
                    member: self.defs.describe(sym),
                    span: span.into(),
                });
            }
        }

        // Traits cannot emit ordinary binary super calls; unqualified
        // super selections go through a generated accessor instead.
        if mix.is_none() && self.defs.flags(this_class).contains(Flags::TRAIT) {
            let accessor = self.defs.super_accessor(this_class, sym, tpe.clone());
            return Ok(Tree::Select {
                qual: Box::new(Tree::This {
                    sym: this_class,
                    span: qual.span(),
                }),
                sym: accessor,
                tpe: tpe.clone(),
                span,
            });
        }

        Ok(Tree::Select {
            qual: Box::new(qual.clone()),
            sym,
            tpe: tpe.clone(),
            span,
        })
    }
}
