// src/types/mod.rs
//! The type language this pass reads.
//!
//! Types are immutable values. Subtyping, member lookup, and substitution
//! over them live in [`relate`] and [`lookup`]; nothing in this pass
//! performs inference or unification.

pub mod lookup;
pub mod relate;

use crate::symtab::{Definitions, SymbolId, SymbolKind};

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Error marker; compatible with everything for recovery.
    Error,
    /// Absent type (also the unbounded lower bound).
    NoType,
    /// Unknown type (also the unbounded upper bound).
    Wildcard,
    /// Singleton type of a stable value, `x.type`.
    Single { sym: SymbolId },
    /// Reference to a class, alias, abstract type, or type parameter,
    /// possibly applied to type arguments.
    Ref {
        prefix: Box<Type>,
        sym: SymbolId,
        args: Vec<Type>,
    },
    /// A class's structural info: resolved parents plus member scope.
    ClassInfo {
        parents: Vec<Type>,
        decls: Vec<SymbolId>,
    },
    /// Refinement without a backing class.
    Refined {
        parents: Vec<Type>,
        decls: Vec<SymbolId>,
    },
    /// Type bounds, `>: lo <: hi`.
    Bounds { lo: Box<Type>, hi: Box<Type> },
    /// Method signature.
    Method { params: Vec<Type>, result: Box<Type> },
    /// Polymorphic signature; `params` are type-parameter symbols.
    Poly {
        params: Vec<SymbolId>,
        result: Box<Type>,
    },
}

impl Type {
    /// Plain reference to a class or type symbol, no prefix, no arguments.
    pub fn named(sym: SymbolId) -> Type {
        Type::Ref {
            prefix: Box::new(Type::NoType),
            sym,
            args: Vec::new(),
        }
    }

    /// Reference applied to type arguments.
    pub fn app(sym: SymbolId, args: Vec<Type>) -> Type {
        Type::Ref {
            prefix: Box::new(Type::NoType),
            sym,
            args,
        }
    }

    pub fn bounds(lo: Type, hi: Type) -> Type {
        Type::Bounds {
            lo: Box::new(lo),
            hi: Box::new(hi),
        }
    }

    /// Unconstrained bounds, `>: nothing <: anything`.
    pub fn unbounded() -> Type {
        Type::bounds(Type::NoType, Type::Wildcard)
    }

    pub fn method(params: Vec<Type>, result: Type) -> Type {
        Type::Method {
            params,
            result: Box::new(result),
        }
    }

    pub fn poly(params: Vec<SymbolId>, result: Type) -> Type {
        Type::Poly {
            params,
            result: Box::new(result),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// The referenced symbol, for reference-shaped types.
    pub fn type_symbol(&self) -> Option<SymbolId> {
        match self {
            Type::Ref { sym, .. } | Type::Single { sym } => Some(*sym),
            _ => None,
        }
    }

    /// Result type after stripping method/poly signature layers.
    pub fn final_result(&self) -> &Type {
        match self {
            Type::Method { result, .. } | Type::Poly { result, .. } => result.final_result(),
            other => other,
        }
    }
}

impl Definitions {
    /// Render a type for diagnostics.
    pub fn type_string(&self, ty: &Type) -> String {
        match ty {
            Type::Error => "<error>".to_string(),
            Type::NoType => "<notype>".to_string(),
            Type::Wildcard => "_".to_string(),
            Type::Single { sym } => format!("{}.type", self.name_str(*sym)),
            Type::Ref { prefix, sym, args } => {
                let mut s = String::new();
                if let Type::Single { sym: pre } = prefix.as_ref() {
                    s.push_str(self.name_str(*pre));
                    s.push('.');
                }
                s.push_str(self.name_str(*sym));
                if !args.is_empty() {
                    s.push('[');
                    s.push_str(&self.type_strings(args));
                    s.push(']');
                }
                s
            }
            Type::ClassInfo { parents, .. } | Type::Refined { parents, .. } => {
                let rendered: Vec<String> =
                    parents.iter().map(|p| self.type_string(p)).collect();
                rendered.join(" with ")
            }
            Type::Bounds { lo, hi } => {
                let mut s = String::new();
                if !matches!(lo.as_ref(), Type::NoType) {
                    s.push_str(&format!(" >: {}", self.type_string(lo)));
                }
                if !matches!(hi.as_ref(), Type::Wildcard) {
                    s.push_str(&format!(" <: {}", self.type_string(hi)));
                }
                if s.is_empty() {
                    s.push_str(" >: nothing <: anything");
                }
                s.trim_start().to_string()
            }
            Type::Method { params, result } => {
                format!("({}){}", self.type_strings(params), self.type_string(result))
            }
            Type::Poly { params, result } => {
                let names: Vec<&str> = params.iter().map(|&p| self.name_str(p)).collect();
                format!("[{}]{}", names.join(", "), self.type_string(result))
            }
        }
    }

    fn type_strings(&self, tys: &[Type]) -> String {
        let rendered: Vec<String> = tys.iter().map(|t| self.type_string(t)).collect();
        rendered.join(", ")
    }

    /// A member's rendered signature, e.g. `method f: (Int)Int`.
    pub fn signature_string(&self, sym: SymbolId) -> String {
        let def = self.get(sym);
        match def.kind {
            SymbolKind::Class => self.describe(sym),
            _ => format!("{}: {}", self.describe(sym), self.type_string(&def.ty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::Flags;

    #[test]
    fn render_applied_reference() {
        let mut defs = Definitions::new();
        let list = defs.new_symbol(SymbolKind::Class, None, "List", Flags::empty());
        let int = defs.new_symbol(SymbolKind::Class, None, "Int", Flags::empty());
        let ty = Type::app(list, vec![Type::named(int)]);
        assert_eq!(defs.type_string(&ty), "List[Int]");
    }

    #[test]
    fn render_method_and_poly() {
        let mut defs = Definitions::new();
        let int = defs.new_symbol(SymbolKind::Class, None, "Int", Flags::empty());
        let t = defs.new_symbol(SymbolKind::TypeParam, None, "T", Flags::empty());
        let m = Type::method(vec![Type::named(int)], Type::named(int));
        assert_eq!(defs.type_string(&m), "(Int)Int");
        let p = Type::poly(vec![t], Type::method(vec![Type::named(t)], Type::named(t)));
        assert_eq!(defs.type_string(&p), "[T](T)T");
    }

    #[test]
    fn final_result_strips_signatures() {
        let mut defs = Definitions::new();
        let int = defs.new_symbol(SymbolKind::Class, None, "Int", Flags::empty());
        let ty = Type::method(vec![], Type::named(int));
        assert_eq!(ty.final_result(), &Type::named(int));
    }
}
