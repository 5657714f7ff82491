// src/intern.rs

use rustc_hash::FxHashMap;

/// Interned name of a definition or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(pub u32);

/// Interns strings to unique Name IDs
#[derive(Debug, Default)]
pub struct Interner {
    map: FxHashMap<String, Name>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.map.get(s) {
            return name;
        }

        let name = Name(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), name);
        name
    }

    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }

    /// Look up an already-interned string without inserting it.
    pub fn lookup(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }
}
