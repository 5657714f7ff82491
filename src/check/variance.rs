// src/check/variance.rs
//! Declaration-site vs. use-site variance validation.
//!
//! For every definition whose declared type is visited, the validator
//! walks the type's full structure tracking the variance context of the
//! current position, and compares each non-invariant type parameter's
//! declared variance against the variance its occurrence requires. The
//! required variance is the parameter's relative variance (a walk up the
//! defining symbol's owner chain) composed with the position context.

use crate::check::RefChecker;
use crate::errors::CheckError;
use crate::symtab::{Definitions, Flags, SymbolId, SymbolKind, Variance};
use crate::tree::Span;
use crate::types::Type;

impl RefChecker<'_> {
    /// Variance-check the declared type of a definition node.
    pub(crate) fn validate_definition_variance(&mut self, sym: SymbolId, span: Span) {
        let (kind, flags, ty) = {
            let def = self.defs.get(sym);
            (def.kind, def.flags, def.ty.clone())
        };
        let context = match kind {
            // A mutable value's type is read and written.
            SymbolKind::Value if flags.contains(Flags::MUTABLE) => Variance::Invariant,
            _ => Variance::Covariant,
        };
        let rendered = self.defs.type_string(&ty);
        self.variance_walk(sym, &rendered, &ty, context, span);
    }

    fn variance_walk(
        &mut self,
        base: SymbolId,
        full_ty: &str,
        ty: &Type,
        context: Variance,
        span: Span,
    ) {
        match ty {
            Type::Ref { prefix, sym, args } => {
                let (kind, declared) = {
                    let def = self.defs.get(*sym);
                    (def.kind, def.variance)
                };
                if kind == SymbolKind::TypeParam
                    && declared != Variance::Invariant
                    && let Some(relative) = relative_variance(self.defs, base, *sym)
                {
                    let required = relative.compose(context);
                    if declared != required {
                        self.report(CheckError::VarianceViolation {
                            declared: declared.label().to_string(),
                            param: self.defs.name_str(*sym).to_string(),
                            occurring: required.label().to_string(),
                            ty: full_ty.to_string(),
                            site: self.defs.describe(base),
                            span: span.into(),
                        });
                    }
                }
                self.variance_walk(base, full_ty, prefix, context, span);
                let tparams = self.defs.get(*sym).type_params.clone();
                for (i, arg) in args.iter().enumerate() {
                    let arg_variance = tparams
                        .get(i)
                        .map(|&tp| self.defs.get(tp).variance)
                        .unwrap_or(Variance::Invariant);
                    self.variance_walk(base, full_ty, arg, context.compose(arg_variance), span);
                }
            }
            Type::ClassInfo { parents, .. } | Type::Refined { parents, .. } => {
                for parent in parents {
                    self.variance_walk(base, full_ty, parent, context, span);
                }
            }
            Type::Bounds { lo, hi } => {
                self.variance_walk(base, full_ty, lo, context.flip(), span);
                self.variance_walk(base, full_ty, hi, context, span);
            }
            Type::Method { params, result } => {
                for param in params {
                    self.variance_walk(base, full_ty, param, context.flip(), span);
                }
                self.variance_walk(base, full_ty, result, context, span);
            }
            Type::Poly { params, result } => {
                for &tp in params {
                    let bounds = self.defs.get(tp).ty.clone();
                    self.variance_walk(base, full_ty, &bounds, context, span);
                }
                self.variance_walk(base, full_ty, result, context, span);
            }
            Type::Error | Type::NoType | Type::Wildcard | Type::Single { .. } => {}
        }
    }
}

/// The variance of a type-parameter occurrence relative to where the
/// occurrence sits: a walk from the defining symbol up toward the
/// parameter's declaring scope. Each step through a non-constructor
/// parameter flips the sign; a non-class owner makes the result
/// indeterminate (`None`); a type alias forces invariance.
fn relative_variance(defs: &Definitions, base: SymbolId, tparam: SymbolId) -> Option<Variance> {
    let declaring = defs.owner(tparam)?;
    let mut sym = base;
    let mut state = Variance::Covariant;
    while sym != declaring {
        let def = defs.get(sym);
        let owner = def.owner?;
        if def.flags.contains(Flags::PARAM) && !defs.is_constructor(owner) {
            state = state.flip();
        } else if !defs.is_class(owner) {
            return None;
        } else if def.kind == SymbolKind::TypeAlias {
            return Some(Variance::Invariant);
        }
        sym = owner;
    }
    Some(state)
}
