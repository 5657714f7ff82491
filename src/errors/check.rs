// src/errors/check.rs
//! Reference-check errors (E3xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CheckError {
    #[error("{member} has weaker access privileges than {other}; it should not be private")]
    #[diagnostic(code(E3001))]
    OverridePrivate {
        member: String,
        other: String,
        #[label("overriding member is private")]
        span: SourceSpan,
    },

    #[error("{member} has weaker access privileges than {other}; it should not be protected")]
    #[diagnostic(code(E3002))]
    OverrideWeakerAccess {
        member: String,
        other: String,
        #[label("access weakened here")]
        span: SourceSpan,
    },

    #[error("{member} cannot override final member {other}")]
    #[diagnostic(code(E3003))]
    OverrideFinal {
        member: String,
        other: String,
        #[label("overrides a final member")]
        span: SourceSpan,
    },

    #[error("{member} overrides concrete member {other}")]
    #[diagnostic(
        code(E3004),
        help("add the `override` modifier to the declaration")
    )]
    MissingOverrideModifier {
        member: String,
        other: String,
        #[label("needs `override` modifier")]
        span: SourceSpan,
    },

    #[error("{member} needs to be a stable, immutable value in order to override {other}")]
    #[diagnostic(code(E3005))]
    OverrideNotStable {
        member: String,
        other: String,
        #[label("not a stable value")]
        span: SourceSpan,
    },

    #[error("{member} cannot override {other}: type members may not be parameterized")]
    #[diagnostic(code(E3006))]
    OverrideParameterizedType {
        member: String,
        other: String,
        #[label("parameterized type member")]
        span: SourceSpan,
    },

    #[error("{member} has incompatible type with {other}: {details}")]
    #[diagnostic(code(E3007))]
    IncompatibleOverride {
        member: String,
        other: String,
        details: String,
        #[label("incompatible override")]
        span: SourceSpan,
    },

    #[error("ambiguous override: both {first} and {second} match {other}")]
    #[diagnostic(code(E3008))]
    AmbiguousOverride {
        first: String,
        second: String,
        other: String,
        #[label("ambiguous override")]
        span: SourceSpan,
    },

    #[error("{class} needs to be abstract, since {member} is not defined{note}")]
    #[diagnostic(code(E3009))]
    NeedsAbstract {
        class: String,
        member: String,
        note: String,
        #[label("unimplemented member")]
        span: SourceSpan,
    },

    #[error("{member} overrides nothing")]
    #[diagnostic(
        code(E3010),
        help("remove the `override` modifier or match an inherited member's signature")
    )]
    OverridesNothing {
        member: String,
        #[label("no matching member in any base class")]
        span: SourceSpan,
    },

    #[error("illegal inheritance: {class} inherits different type instances of {base}: {first} and {second}")]
    #[diagnostic(code(E3011))]
    IllegalInheritance {
        class: String,
        base: String,
        first: String,
        second: String,
        #[label("conflicting instantiations")]
        span: SourceSpan,
    },

    #[error("illegal combination of case {first} and case {second} in one object")]
    #[diagnostic(code(E3012))]
    CaseClassCombination {
        first: String,
        second: String,
        #[label("second case ancestor")]
        span: SourceSpan,
    },

    #[error("{declared} type parameter {param} occurs in {occurring} position in type {ty} of {site}")]
    #[diagnostic(code(E3013))]
    VarianceViolation {
        declared: String,
        param: String,
        occurring: String,
        ty: String,
        site: String,
        #[label("variance violation")]
        span: SourceSpan,
    },

    #[error("forward reference extends over definition of {definition}")]
    #[diagnostic(code(E3014))]
    ForwardReference {
        definition: String,
        #[label("reference precedes the definition")]
        span: SourceSpan,
    },

    #[error("type argument {arg} does not conform to bounds {bounds} of type parameter {param}")]
    #[diagnostic(code(E3015))]
    TypeArgumentBounds {
        arg: String,
        param: String,
        bounds: String,
        #[label("argument out of bounds")]
        span: SourceSpan,
    },

    #[error("{member} is accessed from super; it may not be abstract unless it is overridden by a member declared `abstract override`")]
    #[diagnostic(code(E3016))]
    AbstractSuperAccess {
        member: String,
        #[label("super access to abstract member")]
        span: SourceSpan,
    },

    #[error("internal error during reference checking: {message}")]
    #[diagnostic(code(E3901))]
    Internal {
        message: String,
        #[label("while checking this")]
        span: SourceSpan,
    },
}

/// Internal failure raised by hierarchy/type queries (cycles, missing
/// class info, recursion limits). Not a user diagnostic by itself; the
/// traversal catches it per node and converts it into [`CheckError::Internal`].
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TypeFailure {
    pub message: String,
}

impl TypeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
