// src/errors/mod.rs
//! Structured error reporting for the reference-check pass.
//!
//! Diagnostics are miette types; [`TypeFailure`] is the internal,
//! non-diagnostic failure the hierarchy queries propagate.

pub mod check;
pub mod report;

pub use check::{CheckError, TypeFailure};
pub use report::{emit_all, render_to_string};
