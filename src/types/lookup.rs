// src/types/lookup.rs
//! Class hierarchy queries: linearization, base types, member lookup.
//!
//! Everything here returns `Result` with a [`TypeFailure`] on malformed
//! input (cycles, missing class info). Callers in the checker catch these
//! per node and keep going.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::TypeFailure;
use crate::symtab::{Definitions, SymbolId, SymbolKind};
use crate::types::Type;

/// Guard against runaway alias or hierarchy recursion.
const MAX_DEPTH: usize = 512;

/// The linearization of `class`: the class itself first, then every base
/// class, most derived first. Parents contribute their linearizations
/// right to left; a class appearing more than once keeps only its last
/// (most general) position. Cached per class.
pub fn linearize(defs: &Definitions, class: SymbolId) -> Result<Rc<[SymbolId]>, TypeFailure> {
    let mut visiting = Vec::new();
    lin_of(defs, class, &mut visiting)
}

fn lin_of(
    defs: &Definitions,
    class: SymbolId,
    visiting: &mut Vec<SymbolId>,
) -> Result<Rc<[SymbolId]>, TypeFailure> {
    if let Some(cached) = defs.lin_cache().borrow().get(&class) {
        return Ok(cached.clone());
    }
    if visiting.contains(&class) {
        return Err(TypeFailure::new(format!(
            "cyclic inheritance involving {}",
            defs.describe(class)
        )));
    }
    visiting.push(class);

    let mut tail: Vec<SymbolId> = Vec::new();
    for parent in parents(defs, class)?.iter().rev() {
        let psym = parent.type_symbol().ok_or_else(|| {
            TypeFailure::new(format!(
                "parent of {} is not a class type: {}",
                defs.describe(class),
                defs.type_string(parent)
            ))
        })?;
        tail.extend_from_slice(&lin_of(defs, psym, visiting)?);
    }
    visiting.pop();

    // Keep the last occurrence of each base class.
    let mut seen: FxHashSet<SymbolId> = FxHashSet::default();
    seen.insert(class);
    let mut deduped: Vec<SymbolId> = Vec::with_capacity(tail.len() + 1);
    for &s in tail.iter().rev() {
        if seen.insert(s) {
            deduped.push(s);
        }
    }
    deduped.push(class);
    deduped.reverse();

    let rc: Rc<[SymbolId]> = deduped.into();
    defs.lin_cache().borrow_mut().insert(class, rc.clone());
    Ok(rc)
}

/// Position of `base` in the linearization of `class`.
pub fn closure_pos(
    defs: &Definitions,
    class: SymbolId,
    base: SymbolId,
) -> Result<Option<usize>, TypeFailure> {
    Ok(linearize(defs, class)?.iter().position(|&s| s == base))
}

/// Whether `sub` is `base` or inherits from it.
pub fn is_subclass(defs: &Definitions, sub: SymbolId, base: SymbolId) -> bool {
    match linearize(defs, sub) {
        Ok(lin) => lin.contains(&base),
        Err(_) => sub == base,
    }
}

/// The declared parent types of a class.
pub fn parents(defs: &Definitions, class: SymbolId) -> Result<&[Type], TypeFailure> {
    match &defs.get(class).ty {
        Type::ClassInfo { parents, .. } => Ok(parents),
        other => Err(TypeFailure::new(format!(
            "{} has no class info (found {})",
            defs.describe(class),
            defs.type_string(other)
        ))),
    }
}

/// The directly declared members of a class.
pub fn decls(defs: &Definitions, class: SymbolId) -> Result<&[SymbolId], TypeFailure> {
    match &defs.get(class).ty {
        Type::ClassInfo { decls, .. } => Ok(decls),
        other => Err(TypeFailure::new(format!(
            "{} has no class info (found {})",
            defs.describe(class),
            defs.type_string(other)
        ))),
    }
}

/// All members named `name` visible in `class`, declared or inherited,
/// in linearization order.
pub fn members_named(
    defs: &Definitions,
    class: SymbolId,
    name: crate::intern::Name,
) -> Result<Vec<SymbolId>, TypeFailure> {
    let mut found = Vec::new();
    for &bc in linearize(defs, class)?.iter() {
        for &d in decls(defs, bc)? {
            if defs.get(d).name == name && !found.contains(&d) {
                found.push(d);
            }
        }
    }
    Ok(found)
}

/// The type of `class` as seen from inside itself: a reference applied to
/// its own type parameters.
pub fn self_type(defs: &Definitions, class: SymbolId) -> Type {
    let args = defs
        .get(class)
        .type_params
        .iter()
        .map(|&p| Type::named(p))
        .collect();
    Type::Ref {
        prefix: Box::new(Type::NoType),
        sym: class,
        args,
    }
}

/// Replace bare references to the mapped symbols. Used to instantiate a
/// class's type parameters at a use site.
pub fn substitute(ty: &Type, map: &FxHashMap<SymbolId, Type>) -> Type {
    if map.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::Ref { prefix, sym, args } => {
            if args.is_empty()
                && let Some(replacement) = map.get(sym)
            {
                return replacement.clone();
            }
            Type::Ref {
                prefix: Box::new(substitute(prefix, map)),
                sym: *sym,
                args: args.iter().map(|a| substitute(a, map)).collect(),
            }
        }
        Type::Bounds { lo, hi } => Type::bounds(substitute(lo, map), substitute(hi, map)),
        Type::Method { params, result } => Type::Method {
            params: params.iter().map(|p| substitute(p, map)).collect(),
            result: Box::new(substitute(result, map)),
        },
        Type::Poly { params, result } => Type::Poly {
            params: params.clone(),
            result: Box::new(substitute(result, map)),
        },
        Type::ClassInfo { parents, decls } => Type::ClassInfo {
            parents: parents.iter().map(|p| substitute(p, map)).collect(),
            decls: decls.clone(),
        },
        Type::Refined { parents, decls } => Type::Refined {
            parents: parents.iter().map(|p| substitute(p, map)).collect(),
            decls: decls.clone(),
        },
        leaf => leaf.clone(),
    }
}

fn param_map(
    defs: &Definitions,
    sym: SymbolId,
    args: &[Type],
) -> FxHashMap<SymbolId, Type> {
    defs.get(sym)
        .type_params
        .iter()
        .copied()
        .zip(args.iter().cloned())
        .collect()
}

/// The instantiation of `target` as a base type of `ty`, if `ty` inherits
/// from it. `base_type(List[Int], Seq)` yields `Seq[Int]`.
pub fn base_type(
    defs: &Definitions,
    ty: &Type,
    target: SymbolId,
) -> Result<Option<Type>, TypeFailure> {
    base_type_at(defs, ty, target, 0)
}

fn base_type_at(
    defs: &Definitions,
    ty: &Type,
    target: SymbolId,
    depth: usize,
) -> Result<Option<Type>, TypeFailure> {
    if depth > MAX_DEPTH {
        return Err(TypeFailure::new(format!(
            "recursion limit reached computing a base type of {}",
            defs.type_string(ty)
        )));
    }
    match ty {
        Type::Error => Ok(Some(Type::Error)),
        Type::Single { sym } => base_type_at(defs, &defs.get(*sym).ty, target, depth + 1),
        Type::Ref { sym, args, .. } => {
            let def = defs.get(*sym);
            match def.kind {
                SymbolKind::Class => {
                    if *sym == target {
                        return Ok(Some(ty.clone()));
                    }
                    let map = param_map(defs, *sym, args);
                    for parent in parents(defs, *sym)? {
                        let inst = substitute(parent, &map);
                        if let Some(bt) = base_type_at(defs, &inst, target, depth + 1)? {
                            return Ok(Some(bt));
                        }
                    }
                    Ok(None)
                }
                SymbolKind::TypeAlias => {
                    let map = param_map(defs, *sym, args);
                    base_type_at(defs, &substitute(&def.ty, &map), target, depth + 1)
                }
                SymbolKind::AbstractType | SymbolKind::TypeParam => match &def.ty {
                    Type::Bounds { hi, .. } => base_type_at(defs, hi, target, depth + 1),
                    _ => Ok(None),
                },
                _ => Ok(None),
            }
        }
        Type::Refined { parents, .. } => {
            for parent in parents {
                if let Some(bt) = base_type_at(defs, parent, target, depth + 1)? {
                    return Ok(Some(bt));
                }
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// The declared type of `member` as seen from `class`: the owner's type
/// parameters are replaced by the arguments `class` inherits it with.
pub fn member_type(
    defs: &Definitions,
    class: SymbolId,
    member: SymbolId,
) -> Result<Type, TypeFailure> {
    let declared = defs.get(member).ty.clone();
    let Some(owner) = defs.owner(member).filter(|&o| defs.is_class(o)) else {
        return Ok(declared);
    };
    if owner == class {
        return Ok(declared);
    }
    let self_ty = self_type(defs, class);
    match base_type(defs, &self_ty, owner)? {
        Some(Type::Ref { args, .. }) if !args.is_empty() => {
            let map = param_map(defs, owner, &args);
            Ok(substitute(&declared, &map))
        }
        Some(_) => Ok(declared),
        None => Err(TypeFailure::new(format!(
            "{} is not a base class of {}",
            defs.describe(owner),
            defs.describe(class)
        ))),
    }
}
