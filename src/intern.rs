//! String interning.
//!
//! Every identifier and keyword is interned once and thereafter compared by
//! identity: a small `Symbol(u32)` index into a `Vec<String>`, backed by a
//! `HashMap<String, Symbol>` for the reverse lookup during interning.

use std::collections::HashMap;
use std::fmt;

/// An interned string: cheap to copy, compares by identity (`id`) rather than
/// by content. Two `Symbol`s are equal iff they were interned from the same
/// byte sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl Symbol {
    /// A symbol guaranteed not to resolve to any real interned text. Used by
    /// the parser to keep producing a tree after a missing-identifier
    /// diagnostic instead of aborting the parse.
    pub fn sentinel() -> Self {
        Symbol(u32::MAX)
    }
}

/// Owns the canonical storage for every interned string produced during one
/// compilation. Lives as long as the arena it's paired with.
#[derive(Default)]
pub struct Interner {
    strings: Vec<String>,
    ids: HashMap<String, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Interner {
            strings: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Interns `text`, returning the same `Symbol` for repeated calls with
    /// equal content (matching `str.h`'s `operator==`: hash first, then
    /// bytes — `HashMap` gives us that for free).
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.ids.get(text) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(text.to_string());
        self.ids.insert(text.to_string(), sym);
        sym
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_returns_same_symbol() {
        let mut i = Interner::new();
        let a = i.intern("count");
        let b = i.intern("count");
        assert_eq!(a, b);
    }

    #[test]
    fn interning_different_text_returns_different_symbols() {
        let mut i = Interner::new();
        let a = i.intern("count");
        let b = i.intern("total");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let mut i = Interner::new();
        let sym = i.intern("@top_level");
        assert_eq!(i.resolve(sym), "@top_level");
    }
}
