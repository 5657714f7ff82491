// src/check/parents.rs
//! Base-type consistency and case-hierarchy validation.
//!
//! Walks a class's declared parents and, recursively, each parent's own
//! parents: indirect ancestors in reverse declaration order, the head of
//! each list last, with the include-super flag set only along the
//! superclass chain of the outermost call. Each ancestor position in the
//! linearization must carry a single consistent parameterization, and at
//! most one case-flagged ancestor is allowed.

use rustc_hash::FxHashMap;

use crate::check::RefChecker;
use crate::errors::{CheckError, TypeFailure};
use crate::symtab::{Flags, SymbolId};
use crate::tree::Span;
use crate::types::lookup::{closure_pos, linearize, parents, substitute};
use crate::types::relate::is_subtype;
use crate::types::Type;

impl RefChecker<'_> {
    pub(crate) fn validate_base_types(
        &mut self,
        clazz: SymbolId,
        span: Span,
    ) -> Result<(), TypeFailure> {
        let lin = linearize(self.defs, clazz)?;
        let mut seen: Vec<Option<Type>> = vec![None; lin.len()];
        // A case class starts as its own recorded case ancestor.
        let mut seen_case = self
            .defs
            .flags(clazz)
            .contains(Flags::CASE)
            .then_some(clazz);

        let direct = parents(self.defs, clazz)?.to_vec();
        self.validate_types(clazz, &direct, &mut seen, &mut seen_case, span, true)
    }

    fn validate_types(
        &mut self,
        clazz: SymbolId,
        tps: &[Type],
        seen: &mut [Option<Type>],
        seen_case: &mut Option<SymbolId>,
        span: Span,
        include_super: bool,
    ) -> Result<(), TypeFailure> {
        let Some((head, tail)) = tps.split_first() else {
            return Ok(());
        };
        for tp in tail.iter().rev() {
            self.validate_type(clazz, tp, seen, seen_case, span, false)?;
        }
        if include_super {
            self.validate_type(clazz, head, seen, seen_case, span, true)?;
        }
        Ok(())
    }

    fn validate_type(
        &mut self,
        clazz: SymbolId,
        tp: &Type,
        seen: &mut [Option<Type>],
        seen_case: &mut Option<SymbolId>,
        span: Span,
        include_super: bool,
    ) -> Result<(), TypeFailure> {
        let Some(base) = tp.type_symbol() else {
            return Ok(());
        };
        if !self.defs.is_class(base) {
            return Ok(());
        }
        let Some(index) = closure_pos(self.defs, clazz, base)? else {
            return Ok(());
        };

        if let Some(prev) = &seen[index]
            && !is_subtype(self.defs, tp, prev)
        {
            self.report(CheckError::IllegalInheritance {
                class: self.defs.describe(clazz),
                base: self.defs.name_str(base).to_string(),
                first: self.defs.type_string(prev),
                second: self.defs.type_string(tp),
                span: span.into(),
            });
        }
        seen[index] = Some(tp.clone());

        if self.defs.flags(base).contains(Flags::CASE) {
            match *seen_case {
                Some(prev_case) if prev_case != base => {
                    self.report(CheckError::CaseClassCombination {
                        first: self.defs.name_str(prev_case).to_string(),
                        second: self.defs.name_str(base).to_string(),
                        span: span.into(),
                    });
                }
                _ => *seen_case = Some(base),
            }
        }

        // Recurse into the parent's own parents, instantiated with the
        // arguments it was reached with here.
        let map: FxHashMap<SymbolId, Type> = match tp {
            Type::Ref { args, .. } => self
                .defs
                .get(base)
                .type_params
                .iter()
                .copied()
                .zip(args.iter().cloned())
                .collect(),
            _ => FxHashMap::default(),
        };
        let grand: Vec<Type> = parents(self.defs, base)?
            .iter()
            .map(|p| substitute(p, &map))
            .collect();
        self.validate_types(clazz, &grand, seen, seen_case, span, include_super)
    }
}
