// src/symtab/flags.rs
//! Modifier flags and declared variance for symbols.

use bitflags::bitflags;

bitflags! {
    /// Modifier flags carried by a symbol.
    ///
    /// Upstream phases set these; this pass reads them and applies two
    /// corrections: setting `ABSTRACT` on a class found to have
    /// unimplemented members, and clearing `OVERRIDE`/`ABSTRACT_OVERRIDE`
    /// from a member that overrides nothing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u32 {
        const PRIVATE           = 1 << 0;
        const PROTECTED         = 1 << 1;
        const FINAL             = 1 << 2;
        /// Declared without an implementation (abstract member).
        const DEFERRED          = 1 << 3;
        const OVERRIDE          = 1 << 4;
        const ABSTRACT_OVERRIDE = 1 << 5;
        const CASE              = 1 << 6;
        /// Abstract class (distinct from DEFERRED, which is for members).
        const ABSTRACT          = 1 << 7;
        const TRAIT             = 1 << 8;
        /// Singleton object (on the module value and its class).
        const MODULE            = 1 << 9;
        /// Mutable value (var rather than val).
        const MUTABLE           = 1 << 10;
        const PARAM             = 1 << 11;
        /// Accessor generated for a constructor parameter.
        const PARAM_ACCESSOR    = 1 << 12;
        /// Defined directly inside a block, not a class.
        const LOCAL             = 1 << 13;
        const STATIC            = 1 << 14;
        const SYNTHETIC         = 1 << 15;
        const CONSTRUCTOR       = 1 << 16;
        /// Set when the override checker locates the member as an
        /// override target; read by later lint layers, never here.
        const ACCESSED          = 1 << 17;
        /// Symbol comes from previously compiled, read-only library
        /// code. Flag mutation on such symbols is refused.
        const LIBRARY           = 1 << 18;
    }
}

impl Flags {
    /// Either form of an explicit override marker.
    pub fn has_override_marker(self) -> bool {
        self.intersects(Flags::OVERRIDE | Flags::ABSTRACT_OVERRIDE)
    }
}

/// Declared variance of a type parameter, or the variance context at a
/// position inside a type.
///
/// Variance describes how a type parameter relates to subtyping:
/// - Covariant: if T is a subtype of U, then F<T> is a subtype of F<U>
/// - Contravariant: if T is a subtype of U, then F<U> is a subtype of F<T>
/// - Invariant: F<T> and F<U> are unrelated unless T = U
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variance {
    Contravariant,
    #[default]
    Invariant,
    Covariant,
}

impl Variance {
    /// Sign representation used for composing positions: -1, 0, +1.
    pub fn sign(self) -> i8 {
        match self {
            Variance::Contravariant => -1,
            Variance::Invariant => 0,
            Variance::Covariant => 1,
        }
    }

    fn from_sign(sign: i8) -> Variance {
        match sign {
            s if s < 0 => Variance::Contravariant,
            0 => Variance::Invariant,
            _ => Variance::Covariant,
        }
    }

    /// Flip variance (used when entering a contravariant position such as
    /// the lower bound of a bounds pair or a method parameter).
    pub fn flip(self) -> Variance {
        Variance::from_sign(-self.sign())
    }

    /// Compose two variance positions; invariant is absorbing.
    pub fn compose(self, other: Variance) -> Variance {
        Variance::from_sign(self.sign() * other.sign())
    }

    /// Adjective used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Variance::Contravariant => "contravariant",
            Variance::Invariant => "invariant",
            Variance::Covariant => "covariant",
        }
    }
}
