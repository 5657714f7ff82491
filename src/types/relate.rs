// src/types/relate.rs
//! Subtyping and signature matching over resolved types.
//!
//! `Error` conforms in both directions so one upstream failure does not
//! cascade into secondary diagnostics here.

use rustc_hash::FxHashMap;

use crate::symtab::{Definitions, SymbolId, SymbolKind, Variance};
use crate::types::lookup::{base_type, substitute};
use crate::types::Type;

/// Structural subtyping: is `a` usable where `b` is expected?
pub fn is_subtype(defs: &Definitions, a: &Type, b: &Type) -> bool {
    if a.is_error() || b.is_error() || a == b {
        return true;
    }
    match (a, b) {
        (Type::NoType, _) | (_, Type::Wildcard) => true,
        (Type::Wildcard, _) | (_, Type::NoType) => false,

        (Type::Single { sym }, _) => is_subtype(defs, defs.get(*sym).ty.final_result(), b),

        (Type::Method { params: pa, result: ra }, Type::Method { params: pb, result: rb }) => {
            pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| same_type(defs, x, y))
                && is_subtype(defs, ra, rb)
        }
        (Type::Poly { params: pa, result: ra }, Type::Poly { params: pb, result: rb }) => {
            if pa.len() != pb.len() {
                return false;
            }
            let rename: FxHashMap<SymbolId, Type> = pb
                .iter()
                .copied()
                .zip(pa.iter().map(|&p| Type::named(p)))
                .collect();
            is_subtype(defs, ra, &substitute(rb, &rename))
        }

        (Type::Refined { parents, .. }, _) => parents.iter().any(|p| is_subtype(defs, p, b)),
        (_, Type::Refined { parents, .. }) => parents.iter().all(|p| is_subtype(defs, a, p)),

        (Type::Ref { sym, args, .. }, _) => {
            let def = defs.get(*sym);
            match def.kind {
                SymbolKind::TypeAlias => {
                    let map: FxHashMap<SymbolId, Type> = def
                        .type_params
                        .iter()
                        .copied()
                        .zip(args.iter().cloned())
                        .collect();
                    is_subtype(defs, &substitute(&def.ty, &map), b)
                }
                SymbolKind::Class => class_ref_subtype(defs, a, *sym, b),
                // Abstract types and parameters conform through their
                // upper bound.
                _ => match &def.ty {
                    Type::Bounds { hi, .. } => is_subtype(defs, hi, b),
                    _ => false,
                },
            }
        }
        _ => false,
    }
}

fn class_ref_subtype(defs: &Definitions, a: &Type, a_sym: SymbolId, b: &Type) -> bool {
    let Type::Ref { sym: b_sym, args: b_args, .. } = b else {
        return false;
    };
    let b_def = defs.get(*b_sym);
    match b_def.kind {
        SymbolKind::TypeAlias => {
            let map: FxHashMap<SymbolId, Type> = b_def
                .type_params
                .iter()
                .copied()
                .zip(b_args.iter().cloned())
                .collect();
            return is_subtype(defs, a, &substitute(&b_def.ty, &map));
        }
        SymbolKind::Class => {}
        // A concrete type conforms to an abstract type only through its
        // lower bound.
        _ => {
            return match &b_def.ty {
                Type::Bounds { lo, .. } if !matches!(lo.as_ref(), Type::NoType) => {
                    is_subtype(defs, a, lo)
                }
                _ => false,
            };
        }
    }

    let instantiated = if a_sym == *b_sym {
        Some(a.clone())
    } else {
        base_type(defs, a, *b_sym).ok().flatten()
    };
    let Some(Type::Ref { args: a_args, .. }) = instantiated else {
        return false;
    };
    if a_args.len() != b_args.len() {
        return a_args.is_empty() && b_args.is_empty();
    }
    b_def
        .type_params
        .iter()
        .zip(a_args.iter().zip(b_args))
        .all(|(&tp, (x, y))| match defs.get(tp).variance {
            Variance::Covariant => is_subtype(defs, x, y),
            Variance::Contravariant => is_subtype(defs, y, x),
            Variance::Invariant => same_type(defs, x, y),
        })
}

/// Mutual subtyping.
pub fn same_type(defs: &Definitions, a: &Type, b: &Type) -> bool {
    is_subtype(defs, a, b) && is_subtype(defs, b, a)
}

fn bounds_of(ty: &Type) -> (&Type, &Type) {
    match ty {
        Type::Bounds { lo, hi } => (lo, hi),
        other => (other, other),
    }
}

/// Do `inner` bounds fit inside `outer` bounds? True when the outer lower
/// bound conforms to the inner one and the inner upper bound conforms to
/// the outer one.
pub fn bounds_contain(defs: &Definitions, outer: &Type, inner: &Type) -> bool {
    let (olo, ohi) = bounds_of(outer);
    let (ilo, ihi) = bounds_of(inner);
    is_subtype(defs, olo, ilo) && is_subtype(defs, ihi, ohi)
}

/// Is a concrete `arg` within `bounds`?
pub fn conforms_to_bounds(defs: &Definitions, arg: &Type, bounds: &Type) -> bool {
    let (lo, hi) = bounds_of(bounds);
    is_subtype(defs, lo, arg) && is_subtype(defs, arg, hi)
}

/// Signature-shape matching used to pair a member with the members it
/// might override: same parameter lists up to equivalence, any result.
pub fn matches(defs: &Definitions, a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Method { params: pa, result: ra }, Type::Method { params: pb, result: rb }) => {
            pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| same_type(defs, x, y))
                && matches(defs, ra, rb)
        }
        (Type::Poly { params: pa, result: ra }, Type::Poly { params: pb, result: rb }) => {
            if pa.len() != pb.len() {
                return false;
            }
            let rename: FxHashMap<SymbolId, Type> = pb
                .iter()
                .copied()
                .zip(pa.iter().map(|&p| Type::named(p)))
                .collect();
            matches(defs, ra, &substitute(rb, &rename))
        }
        (Type::Method { .. } | Type::Poly { .. }, _) | (_, Type::Method { .. } | Type::Poly { .. }) => {
            a.is_error() || b.is_error()
        }
        _ => true,
    }
}

/// Explain why `found` does not conform to `required`, piece by piece.
pub fn describe_mismatch(defs: &Definitions, found: &Type, required: &Type) -> String {
    let mut parts = Vec::new();
    mismatch_parts(defs, found, required, &mut parts);
    if parts.is_empty() {
        format!(
            "found {}, required {}",
            defs.type_string(found),
            defs.type_string(required)
        )
    } else {
        parts.join("; ")
    }
}

fn mismatch_parts(defs: &Definitions, found: &Type, required: &Type, parts: &mut Vec<String>) {
    match (found, required) {
        (Type::Method { params: pf, result: rf }, Type::Method { params: pr, result: rr }) => {
            if pf.len() != pr.len() {
                parts.push(format!(
                    "takes {} parameters instead of {}",
                    pf.len(),
                    pr.len()
                ));
                return;
            }
            for (i, (f, r)) in pf.iter().zip(pr).enumerate() {
                if !same_type(defs, f, r) {
                    parts.push(format!(
                        "parameter {} has type {} instead of {}",
                        i + 1,
                        defs.type_string(f),
                        defs.type_string(r)
                    ));
                }
            }
            mismatch_parts(defs, rf, rr, parts);
        }
        (Type::Poly { params: pf, result: rf }, Type::Poly { params: pr, result: rr }) => {
            if pf.len() != pr.len() {
                parts.push(format!(
                    "takes {} type parameters instead of {}",
                    pf.len(),
                    pr.len()
                ));
                return;
            }
            let rename: FxHashMap<SymbolId, Type> = pr
                .iter()
                .copied()
                .zip(pf.iter().map(|&p| Type::named(p)))
                .collect();
            mismatch_parts(defs, rf, &substitute(rr, &rename), parts);
        }
        _ => {
            if !is_subtype(defs, found, required) {
                parts.push(format!(
                    "result type {} does not conform to {}",
                    defs.type_string(found),
                    defs.type_string(required)
                ));
            }
        }
    }
}
