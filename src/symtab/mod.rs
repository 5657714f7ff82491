// src/symtab/mod.rs
//! Symbol arena for the checked compilation unit.
//!
//! Symbols form a tree through `owner` indices into the arena (a reference
//! relation, not ownership). [`Definitions`] is the single mutable handle a
//! checker holds per unit: all reads and the two in-place flag corrections
//! this pass performs go through it. Symbols flagged `LIBRARY` belong to
//! previously compiled code and are never mutated.

pub mod flags;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::intern::{Interner, Name};
use crate::tree::Span;
use crate::types::Type;

pub use flags::{Flags, Variance};

/// Identity of a symbol: an index into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// What kind of declaration a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Method,
    Value,
    TypeAlias,
    AbstractType,
    TypeParam,
}

/// One symbol record in the arena.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub id: SymbolId,
    pub name: Name,
    pub kind: SymbolKind,
    pub owner: Option<SymbolId>,
    pub flags: Flags,
    /// Declared variance; meaningful only for type parameters.
    pub variance: Variance,
    /// Declared type. For a class this is its `ClassInfo`; for a type
    /// parameter or abstract type member, its `Bounds`.
    pub ty: Type,
    /// Ordered type parameters of a class or polymorphic method.
    pub type_params: SmallVec<[SymbolId; 4]>,
    /// For a parameter accessor: the inherited accessor it forwards to.
    pub alias_of: Option<SymbolId>,
    /// For a module (singleton object) value: its backing class.
    pub module_class: Option<SymbolId>,
    pub span: Span,
}

/// The symbol arena plus the name interner: the query surface this pass
/// consumes and the handle through which it applies flag corrections.
#[derive(Debug, Default)]
pub struct Definitions {
    symbols: Vec<SymbolDef>,
    pub names: Interner,
    /// Linearizations are computed once per class and cached.
    lin_cache: RefCell<FxHashMap<SymbolId, Rc<[SymbolId]>>>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new symbol. Its type starts as `NoType`; upstream code
    /// fills it in with `set_type`/`set_class_info`.
    pub fn new_symbol(
        &mut self,
        kind: SymbolKind,
        owner: Option<SymbolId>,
        name: &str,
        flags: Flags,
    ) -> SymbolId {
        let id = SymbolId::new(self.symbols.len() as u32);
        let name = self.names.intern(name);
        self.symbols.push(SymbolDef {
            id,
            name,
            kind,
            owner,
            flags,
            variance: Variance::default(),
            ty: Type::NoType,
            type_params: SmallVec::new(),
            alias_of: None,
            module_class: None,
            span: Span::default(),
        });
        id
    }

    pub fn get(&self, id: SymbolId) -> &SymbolDef {
        &self.symbols[id.index() as usize]
    }

    fn get_mut(&mut self, id: SymbolId) -> &mut SymbolDef {
        &mut self.symbols[id.index() as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    // ------------------------------------------------------------------
    // Setters used by upstream phases (and by test fixtures)
    // ------------------------------------------------------------------

    pub fn set_type(&mut self, id: SymbolId, ty: Type) {
        self.get_mut(id).ty = ty;
        self.lin_cache.borrow_mut().remove(&id);
    }

    /// Install a class's resolved parents and member scope.
    pub fn set_class_info(&mut self, id: SymbolId, parents: Vec<Type>, decls: Vec<SymbolId>) {
        self.set_type(id, Type::ClassInfo { parents, decls });
    }

    pub fn set_type_params(&mut self, id: SymbolId, params: impl IntoIterator<Item = SymbolId>) {
        self.get_mut(id).type_params = params.into_iter().collect();
    }

    pub fn set_variance(&mut self, id: SymbolId, variance: Variance) {
        self.get_mut(id).variance = variance;
    }

    pub fn set_alias(&mut self, id: SymbolId, target: SymbolId) {
        self.get_mut(id).alias_of = Some(target);
    }

    pub fn set_module_class(&mut self, id: SymbolId, class: SymbolId) {
        self.get_mut(id).module_class = Some(class);
    }

    pub fn set_span(&mut self, id: SymbolId, span: Span) {
        self.get_mut(id).span = span;
    }

    /// Append a symbol to a class's member scope.
    pub fn enter_decl(&mut self, class: SymbolId, member: SymbolId) {
        if let Type::ClassInfo { decls, .. } = &mut self.get_mut(class).ty {
            decls.push(member);
        }
    }

    // ------------------------------------------------------------------
    // Flag mutation (the only symbol mutation this pass performs)
    // ------------------------------------------------------------------

    pub fn set_flag(&mut self, id: SymbolId, flag: Flags) {
        let def = self.get_mut(id);
        if def.flags.contains(Flags::LIBRARY) {
            debug!(sym = ?id, ?flag, "refusing flag set on library symbol");
            return;
        }
        def.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, id: SymbolId, flag: Flags) {
        let def = self.get_mut(id);
        if def.flags.contains(Flags::LIBRARY) {
            debug!(sym = ?id, ?flag, "refusing flag clear on library symbol");
            return;
        }
        def.flags.remove(flag);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn flags(&self, id: SymbolId) -> Flags {
        self.get(id).flags
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.get(id).kind
    }

    pub fn owner(&self, id: SymbolId) -> Option<SymbolId> {
        self.get(id).owner
    }

    pub fn name_of(&self, id: SymbolId) -> Name {
        self.get(id).name
    }

    pub fn name_str(&self, id: SymbolId) -> &str {
        self.names.resolve(self.get(id).name)
    }

    pub fn is_class(&self, id: SymbolId) -> bool {
        self.get(id).kind == SymbolKind::Class
    }

    pub fn is_constructor(&self, id: SymbolId) -> bool {
        self.get(id).flags.contains(Flags::CONSTRUCTOR)
    }

    /// A stable value: an immutable, parameterless term that can appear in
    /// singleton types.
    pub fn is_stable(&self, id: SymbolId) -> bool {
        let def = self.get(id);
        def.kind == SymbolKind::Value && !def.flags.contains(Flags::MUTABLE)
    }

    pub fn is_type_member(&self, id: SymbolId) -> bool {
        matches!(
            self.get(id).kind,
            SymbolKind::TypeAlias | SymbolKind::AbstractType | SymbolKind::TypeParam
        )
    }

    /// The innermost enclosing class of a symbol (itself, if a class).
    pub fn enclosing_class(&self, id: SymbolId) -> Option<SymbolId> {
        let mut cur = Some(id);
        while let Some(s) = cur {
            if self.is_class(s) {
                return Some(s);
            }
            cur = self.owner(s);
        }
        None
    }

    /// Find a directly declared member of `class` by name.
    pub fn decl_named(&self, class: SymbolId, name: Name) -> Option<SymbolId> {
        if let Type::ClassInfo { decls, .. } = &self.get(class).ty {
            decls.iter().copied().find(|&d| self.get(d).name == name)
        } else {
            None
        }
    }

    /// Human-readable description of a symbol for diagnostics, e.g.
    /// `method size in trait Seq`.
    pub fn describe(&self, id: SymbolId) -> String {
        let def = self.get(id);
        let kind = match def.kind {
            SymbolKind::Class if def.flags.contains(Flags::MODULE) => "object",
            SymbolKind::Class if def.flags.contains(Flags::TRAIT) => "trait",
            SymbolKind::Class => "class",
            SymbolKind::Method if def.flags.contains(Flags::CONSTRUCTOR) => "constructor",
            SymbolKind::Method => "method",
            SymbolKind::Value if def.flags.contains(Flags::MODULE) => "object",
            SymbolKind::Value if def.flags.contains(Flags::MUTABLE) => "variable",
            SymbolKind::Value => "value",
            SymbolKind::TypeAlias | SymbolKind::AbstractType => "type",
            SymbolKind::TypeParam => "type parameter",
        };
        let name = self.names.resolve(def.name);
        match def.owner.filter(|&o| self.is_class(o)) {
            Some(o) => format!("{} {} in {}", kind, name, self.describe_short(o)),
            None => format!("{} {}", kind, name),
        }
    }

    fn describe_short(&self, id: SymbolId) -> String {
        let def = self.get(id);
        let kind = if def.flags.contains(Flags::MODULE) {
            "object"
        } else if def.flags.contains(Flags::TRAIT) {
            "trait"
        } else {
            "class"
        };
        format!("{} {}", kind, self.names.resolve(def.name))
    }

    // ------------------------------------------------------------------
    // Synthetic symbols emitted by the tree rewriter
    // ------------------------------------------------------------------

    /// Allocate the backing variable for an expanded singleton object,
    /// bound into the enclosing scope's declarations.
    pub fn fresh_module_var(&mut self, module: SymbolId) -> SymbolId {
        let owner = self.get(module).owner;
        let module_class = self.get(module).module_class.unwrap_or(module);
        let name = format!("{}$module", self.name_str(module));
        let mut flags = Flags::MUTABLE | Flags::SYNTHETIC;
        if let Some(o) = owner
            && self.is_class(o)
        {
            flags |= Flags::PRIVATE | Flags::LOCAL;
        }
        let var = self.new_symbol(SymbolKind::Value, owner, &name, flags);
        let span = self.get(module).span;
        self.set_span(var, span);
        self.set_type(var, Type::named(module_class));
        if let Some(o) = owner
            && self.is_class(o)
        {
            self.enter_decl(o, var);
        }
        var
    }

    /// Look up or allocate the super-accessor a trait exposes for an
    /// unqualified `super` reference to `target`.
    pub fn super_accessor(&mut self, trait_sym: SymbolId, target: SymbolId, ty: Type) -> SymbolId {
        let name = format!("super${}", self.name_str(target));
        let interned = self.names.intern(&name);
        if let Some(existing) = self.decl_named(trait_sym, interned) {
            return existing;
        }
        let acc = self.new_symbol(
            SymbolKind::Method,
            Some(trait_sym),
            &name,
            Flags::SYNTHETIC | Flags::FINAL,
        );
        let span = self.get(target).span;
        self.set_span(acc, span);
        self.set_type(acc, ty);
        self.enter_decl(trait_sym, acc);
        acc
    }

    pub(crate) fn lin_cache(&self) -> &RefCell<FxHashMap<SymbolId, Rc<[SymbolId]>>> {
        &self.lin_cache
    }
}
