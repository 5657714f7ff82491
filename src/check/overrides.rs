// src/check/overrides.rs
//! Override compatibility checking across a class's linearization.
//!
//! For every member declared in a proper ancestor, the checker locates
//! the member of the class's merged member set that overrides it and
//! validates the pair against a fixed rule order, reporting only the
//! first violated rule per pair. Separately it enforces that concrete
//! classes implement every deferred member, and that every explicit
//! override marker actually overrides something (clearing the marker
//! otherwise, so later phases see a consistent symbol).

use miette::SourceSpan;

use crate::check::RefChecker;
use crate::errors::{CheckError, TypeFailure};
use crate::symtab::{Flags, SymbolId, SymbolKind};
use crate::tree::Span;
use crate::types::lookup::{
    closure_pos, decls, is_subclass, linearize, member_type, members_named, parents,
};
use crate::types::relate;
use crate::types::Type;

impl RefChecker<'_> {
    pub(crate) fn check_all_overrides(
        &mut self,
        clazz: SymbolId,
        span: Span,
    ) -> Result<(), TypeFailure> {
        let lin = linearize(self.defs, clazz)?;
        for &bc in lin.iter().skip(1) {
            for other in decls(self.defs, bc)?.to_vec() {
                self.check_override_for(clazz, other, span)?;
            }
        }
        self.check_abstract_members(clazz, &lin, span)?;
        self.check_override_markers(clazz, &lin)?;
        Ok(())
    }

    /// Locate the member of `clazz`'s merged member set overriding `other`
    /// and validate the pair, unless an ancestor already validated it.
    fn check_override_for(
        &mut self,
        clazz: SymbolId,
        other: SymbolId,
        class_span: Span,
    ) -> Result<(), TypeFailure> {
        let oflags = self.defs.flags(other);
        if self.defs.is_class(other)
            || oflags.contains(Flags::PRIVATE)
            || self.defs.is_constructor(other)
        {
            return Ok(());
        }

        let name = self.defs.name_of(other);
        let other_ty = member_type(self.defs, clazz, other)?;
        let other_pos = match self.defs.owner(other) {
            Some(oo) => closure_pos(self.defs, clazz, oo)?,
            None => None,
        };
        let Some(other_pos) = other_pos else {
            return Ok(());
        };

        // Only members declared more derived than `other` can override it.
        let mut candidates: Vec<(SymbolId, usize)> = Vec::new();
        for m in members_named(self.defs, clazz, name)? {
            if m == other || self.defs.owner(m) == self.defs.owner(other) {
                continue;
            }
            let pos = match self.defs.owner(m) {
                Some(mo) => closure_pos(self.defs, clazz, mo)?,
                None => None,
            };
            let Some(pos) = pos.filter(|&p| p < other_pos) else {
                continue;
            };
            if self.defs.is_type_member(other) != self.defs.is_type_member(m) {
                continue;
            }
            // Type members pair by name alone; terms by signature shape.
            if self.defs.is_type_member(other) {
                candidates.push((m, pos));
                continue;
            }
            let m_ty = member_type(self.defs, clazz, m)?;
            if relate::matches(self.defs, &m_ty, &other_ty) {
                candidates.push((m, pos));
            }
        }
        // The merged member set keeps the most derived matching member per
        // name; later declarations along the linearization are shadowed.
        if let Some(best) = candidates.iter().map(|&(_, p)| p).min() {
            candidates.retain(|&(_, p)| p == best);
        }

        let member = match candidates.as_slice() {
            [] => return Ok(()),
            [(single, _)] => *single,
            [(first, _), (second, _), ..] => {
                let pos = candidates
                    .iter()
                    .find(|&&(c, _)| self.defs.owner(c) == Some(clazz))
                    .map(|&(c, _)| self.defs.get(c).span)
                    .unwrap_or(class_span);
                self.report(CheckError::AmbiguousOverride {
                    first: self.defs.describe(*first),
                    second: self.defs.describe(*second),
                    other: self.defs.describe(other),
                    span: pos.into(),
                });
                return Ok(());
            }
        };

        if self.defs.flags(member).contains(Flags::LOCAL) {
            return Ok(());
        }
        self.defs.set_flag(member, Flags::ACCESSED);

        if self.defs.owner(member) != Some(clazz)
            && self.already_validated(clazz, member, other)?
        {
            return Ok(());
        }

        let member_ty = member_type(self.defs, clazz, member)?;
        self.check_override_pair(clazz, member, other, &member_ty, &other_ty, class_span);
        Ok(())
    }

    /// The duplicate-pair suppression conditions: the pair `(member,
    /// other)` was already validated while checking an ancestor when
    /// (a) the member's owner is a subclass of the other's owner, or
    /// (b) some direct parent is a subclass of both owners, in both
    /// cases unless the member is deferred while the other is not, or
    /// (c) every direct parent agrees on whether it descends from the
    /// member's owner vs. the other's owner.
    fn already_validated(
        &mut self,
        clazz: SymbolId,
        member: SymbolId,
        other: SymbolId,
    ) -> Result<bool, TypeFailure> {
        let (Some(mo), Some(oo)) = (self.defs.owner(member), self.defs.owner(other)) else {
            return Ok(true);
        };
        let weaker_deferred = self.defs.flags(member).contains(Flags::DEFERRED)
            && !self.defs.flags(other).contains(Flags::DEFERRED);

        if !weaker_deferred && is_subclass(self.defs, mo, oo) {
            return Ok(true);
        }
        let direct: Vec<SymbolId> = parents(self.defs, clazz)?
            .iter()
            .filter_map(|t| t.type_symbol())
            .collect();
        if !weaker_deferred
            && direct
                .iter()
                .any(|&p| is_subclass(self.defs, p, mo) && is_subclass(self.defs, p, oo))
        {
            return Ok(true);
        }
        Ok(direct
            .iter()
            .all(|&p| is_subclass(self.defs, p, mo) == is_subclass(self.defs, p, oo)))
    }

    /// The rule chain of the override contract; only the first violated
    /// rule is reported for a pair.
    fn check_override_pair(
        &mut self,
        clazz: SymbolId,
        member: SymbolId,
        other: SymbolId,
        member_ty: &Type,
        other_ty: &Type,
        class_span: Span,
    ) {
        let mflags = self.defs.flags(member);
        let oflags = self.defs.flags(other);
        let span: SourceSpan = if self.defs.owner(member) == Some(clazz) {
            self.defs.get(member).span.into()
        } else {
            class_span.into()
        };
        let member_d = self.defs.describe(member);
        let other_d = self.defs.describe(other);

        let err = if mflags.contains(Flags::PRIVATE) {
            Some(CheckError::OverridePrivate {
                member: member_d,
                other: other_d,
                span,
            })
        } else if mflags.contains(Flags::PROTECTED) && !oflags.contains(Flags::PROTECTED) {
            Some(CheckError::OverrideWeakerAccess {
                member: member_d,
                other: other_d,
                span,
            })
        } else if oflags.contains(Flags::FINAL) {
            Some(CheckError::OverrideFinal {
                member: member_d,
                other: other_d,
                span,
            })
        } else if !oflags.contains(Flags::DEFERRED) && !mflags.has_override_marker() {
            Some(CheckError::MissingOverrideModifier {
                member: member_d,
                other: other_d,
                span,
            })
        } else if self.defs.is_stable(other) && !self.defs.is_stable(member) {
            Some(CheckError::OverrideNotStable {
                member: member_d,
                other: other_d,
                span,
            })
        } else if self.defs.kind(other) == SymbolKind::TypeAlias {
            if !self.defs.get(member).type_params.is_empty()
                || !self.defs.get(other).type_params.is_empty()
            {
                Some(CheckError::OverrideParameterizedType {
                    member: member_d,
                    other: other_d,
                    span,
                })
            } else if !relate::same_type(self.defs, member_ty, other_ty) {
                Some(CheckError::IncompatibleOverride {
                    member: member_d,
                    other: other_d,
                    details: relate::describe_mismatch(self.defs, member_ty, other_ty),
                    span,
                })
            } else {
                None
            }
        } else if self.defs.kind(other) == SymbolKind::AbstractType {
            if !self.defs.get(member).type_params.is_empty() {
                Some(CheckError::OverrideParameterizedType {
                    member: member_d,
                    other: other_d,
                    span,
                })
            } else if !relate::bounds_contain(self.defs, other_ty, member_ty) {
                Some(CheckError::IncompatibleOverride {
                    member: member_d,
                    other: other_d,
                    details: format!(
                        "bounds {} are not contained in {}",
                        self.defs.type_string(member_ty),
                        self.defs.type_string(other_ty)
                    ),
                    span,
                })
            } else {
                None
            }
        } else if !relate::is_subtype(self.defs, member_ty, other_ty) {
            Some(CheckError::IncompatibleOverride {
                member: member_d,
                other: other_d,
                details: relate::describe_mismatch(self.defs, member_ty, other_ty),
                span,
            })
        } else {
            None
        };

        if let Some(err) = err {
            self.report(err);
        }
    }

    /// A concrete class must implement every deferred member of its
    /// merged member set, and every `abstract override` member must have
    /// a concrete implementation somewhere below it in the linearization.
    /// Each violation is reported and the class is then marked abstract.
    fn check_abstract_members(
        &mut self,
        clazz: SymbolId,
        lin: &[SymbolId],
        span: Span,
    ) -> Result<(), TypeFailure> {
        if self
            .defs
            .flags(clazz)
            .intersects(Flags::ABSTRACT | Flags::TRAIT)
        {
            return Ok(());
        }
        let mut missing = false;
        for (pos, &bc) in lin.iter().enumerate() {
            for d in decls(self.defs, bc)?.to_vec() {
                let dflags = self.defs.flags(d);
                let undefined = if dflags.contains(Flags::DEFERRED) {
                    !self.has_concrete_impl(clazz, d, lin, 0)?
                } else if dflags.contains(Flags::ABSTRACT_OVERRIDE) {
                    !self.has_concrete_impl(clazz, d, lin, pos + 1)?
                } else {
                    false
                };
                if !undefined {
                    continue;
                }
                missing = true;
                let note = if dflags.contains(Flags::MUTABLE) {
                    " (variables need to be initialized to be defined)"
                } else {
                    ""
                };
                let d_ty = member_type(self.defs, clazz, d)?;
                self.report(CheckError::NeedsAbstract {
                    class: self.defs.describe(clazz),
                    member: format!(
                        "{} of type {}",
                        self.defs.describe(d),
                        self.defs.type_string(&d_ty)
                    ),
                    note: note.to_string(),
                    span: span.into(),
                });
            }
        }
        if missing {
            self.defs.set_flag(clazz, Flags::ABSTRACT);
        }
        Ok(())
    }

    /// Is there a concrete member matching `d` declared at or after
    /// linearization position `from`?
    pub(crate) fn has_concrete_impl(
        &mut self,
        clazz: SymbolId,
        d: SymbolId,
        lin: &[SymbolId],
        from: usize,
    ) -> Result<bool, TypeFailure> {
        let name = self.defs.name_of(d);
        let d_ty = member_type(self.defs, clazz, d)?;
        for &bc in &lin[from..] {
            for m in decls(self.defs, bc)?.to_vec() {
                if m == d
                    || self.defs.get(m).name != name
                    || self.defs.flags(m).contains(Flags::DEFERRED)
                    || self.defs.is_type_member(d) != self.defs.is_type_member(m)
                {
                    continue;
                }
                if self.defs.is_type_member(d) {
                    return Ok(true);
                }
                let m_ty = member_type(self.defs, clazz, m)?;
                if relate::matches(self.defs, &m_ty, &d_ty) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Every member of the class carrying an explicit override marker
    /// must override something; otherwise the marker is cleared and the
    /// symbol treated as unmarked from here on.
    fn check_override_markers(
        &mut self,
        clazz: SymbolId,
        lin: &[SymbolId],
    ) -> Result<(), TypeFailure> {
        for d in decls(self.defs, clazz)?.to_vec() {
            if !self.defs.flags(d).has_override_marker() {
                continue;
            }
            if !self.overrides_something(clazz, d, lin)? {
                self.report(CheckError::OverridesNothing {
                    member: self.defs.describe(d),
                    span: self.defs.get(d).span.into(),
                });
                self.defs
                    .clear_flag(d, Flags::OVERRIDE | Flags::ABSTRACT_OVERRIDE);
            }
        }
        Ok(())
    }

    fn overrides_something(
        &mut self,
        clazz: SymbolId,
        d: SymbolId,
        lin: &[SymbolId],
    ) -> Result<bool, TypeFailure> {
        let name = self.defs.name_of(d);
        let d_ty = member_type(self.defs, clazz, d)?;
        for &bc in lin.iter().skip(1) {
            for o in decls(self.defs, bc)?.to_vec() {
                if self.defs.get(o).name != name
                    || self.defs.flags(o).contains(Flags::PRIVATE)
                    || self.defs.is_type_member(d) != self.defs.is_type_member(o)
                {
                    continue;
                }
                if self.defs.is_type_member(d) {
                    return Ok(true);
                }
                let o_ty = member_type(self.defs, clazz, o)?;
                if relate::matches(self.defs, &d_ty, &o_ty) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
