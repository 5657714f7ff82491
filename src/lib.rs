// src/lib.rs
pub mod check;
pub mod errors;
pub mod intern;
pub mod symtab;
pub mod tree;
pub mod types;

pub use check::{RefChecker, check_unit};
pub use errors::CheckError;
pub use intern::{Interner, Name};
pub use symtab::{Definitions, SymbolId, SymbolKind};
pub use tree::{CompilationUnit, Span, Tree};
pub use types::Type;
