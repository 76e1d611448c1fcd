//! Scoped symbol table.
//!
//! A flat `HashMap` plus a "stash stack" recording, for every binding
//! shadowed or introduced inside the current scope, enough information to
//! restore the table to exactly what it was when `enter_scope()` was
//! called. `enter_scope`/`exit_scope` push/pop a scope-marker sentinel onto
//! that stash so nested scopes compose without needing a separate stack of
//! full table snapshots.

use std::collections::HashMap;

use crate::intern::Symbol;

/// One entry on the stash stack: the symbol that was rebound, and the value
/// it held immediately before this scope touched it (`None` if the symbol
/// didn't exist before — mirrors the original's `~0u` "didn't exist"
/// sentinel scope id).
enum Stashed<V> {
    /// Marks the start of a scope (`@scope_marker` in the original).
    ScopeMarker,
    /// `symbol` previously had no binding; remove it on exit.
    WasAbsent(Symbol),
    /// `symbol` previously held `value`; restore it on exit.
    WasBound(Symbol, V),
}

/// A symbol table with block scoping, parameterised over the value type
/// stored per binding (`Operand` when used by the IR generator, `DataType`
/// when used by the type checker — mirrors `SymTable<T>` in the original,
/// which is instantiated once per value type at each usage site).
pub struct SymTable<V> {
    table: HashMap<Symbol, V>,
    stash: Vec<Stashed<V>>,
}

impl<V: Clone> SymTable<V> {
    pub fn new() -> Self {
        SymTable {
            table: HashMap::new(),
            stash: Vec::new(),
        }
    }

    /// True if `name` is bound in any enclosing scope.
    pub fn has(&self, name: Symbol) -> bool {
        self.table.contains_key(&name)
    }

    /// True if `name` was bound *after* the most recent `enter_scope` — i.e.
    /// it would disappear on `exit_scope`. Used to detect re-declaration of
    /// the same name within one block.
    pub fn in_current_scope(&self, name: Symbol) -> bool {
        for entry in self.stash.iter().rev() {
            match entry {
                Stashed::ScopeMarker => return false,
                Stashed::WasAbsent(s) | Stashed::WasBound(s, _) => {
                    if *s == name {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, name: Symbol) -> Option<&V> {
        self.table.get(&name)
    }

    /// Binds `name` to `value`, stashing whatever was there before (or the
    /// fact that nothing was) so `exit_scope` can undo it.
    pub fn put(&mut self, name: Symbol, value: V) {
        match self.table.insert(name, value) {
            Some(old) => self.stash.push(Stashed::WasBound(name, old)),
            None => self.stash.push(Stashed::WasAbsent(name)),
        }
    }

    pub fn enter_scope(&mut self) {
        self.stash.push(Stashed::ScopeMarker);
    }

    /// Unwinds the stash back to (and including) the most recent
    /// `@scope_marker`, restoring every binding it recorded.
    pub fn exit_scope(&mut self) {
        while let Some(entry) = self.stash.pop() {
            match entry {
                Stashed::ScopeMarker => break,
                Stashed::WasAbsent(s) => {
                    self.table.remove(&s);
                }
                Stashed::WasBound(s, old) => {
                    self.table.insert(s, old);
                }
            }
        }
    }
}

impl<V: Clone> Default for SymTable<V> {
    fn default() -> Self {
        SymTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn exit_scope_restores_shadowed_binding() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut sym: SymTable<i32> = SymTable::new();

        sym.put(x, 1);
        sym.enter_scope();
        sym.put(x, 2);
        assert_eq!(sym.get(x), Some(&2));
        sym.exit_scope();
        assert_eq!(sym.get(x), Some(&1));
    }

    #[test]
    fn exit_scope_removes_binding_introduced_inside() {
        let mut interner = Interner::new();
        let y = interner.intern("y");
        let mut sym: SymTable<i32> = SymTable::new();

        sym.enter_scope();
        sym.put(y, 5);
        assert!(sym.has(y));
        sym.exit_scope();
        assert!(!sym.has(y));
    }

    #[test]
    fn in_current_scope_is_scoped_to_the_innermost_block() {
        let mut interner = Interner::new();
        let z = interner.intern("z");
        let mut sym: SymTable<i32> = SymTable::new();

        sym.put(z, 1);
        sym.enter_scope();
        assert!(!sym.in_current_scope(z));
        sym.put(z, 2);
        assert!(sym.in_current_scope(z));
    }

    #[test]
    fn nested_scopes_compose() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let mut sym: SymTable<i32> = SymTable::new();

        sym.put(a, 0);
        sym.enter_scope();
        sym.put(a, 1);
        sym.enter_scope();
        sym.put(a, 2);
        assert_eq!(sym.get(a), Some(&2));
        sym.exit_scope();
        assert_eq!(sym.get(a), Some(&1));
        sym.exit_scope();
        assert_eq!(sym.get(a), Some(&0));
    }
}
