//! Block-structured symbol tables
//!
//! Scopes form a tree rooted at the global table. Because scopes
//! cross-reference each other (a function's table points at its parent,
//! which may gain bindings after the child exists), the tree lives in a
//! single arena and scopes are addressed by `ScopeId` handles rather than
//! pointers.
//!
//! Bindings use an insertion-ordered map so that enumerating a scope is
//! deterministic across runs.

use indexmap::IndexMap;

/// Handle for one scope in a `SymbolTable` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeId(u32);

#[derive(Debug, Clone)]
struct Scope<V> {
    parent: Option<ScopeId>,
    bindings: IndexMap<String, V>,
}

/// An arena of block-structured regions, each mapping identifiers to
/// values of type `V`.
#[derive(Debug, Clone)]
pub struct SymbolTable<V> {
    scopes: Vec<Scope<V>>,
}

impl<V> SymbolTable<V> {
    /// A new arena containing only the root (global) scope.
    pub fn new() -> SymbolTable<V> {
        SymbolTable {
            scopes: vec![Scope {
                parent: None,
                bindings: IndexMap::new(),
            }],
        }
    }

    /// The root (global) scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Create a new scope nested inside `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            bindings: IndexMap::new(),
        });
        id
    }

    /// The binding of `name` in the innermost region enclosing `scope`
    /// that declares it, or `None`.
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&V> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0 as usize];
            if let Some(value) = scope.bindings.get(name) {
                return Some(value);
            }
            current = scope.parent;
        }
        None
    }

    /// Add a mapping of `name` to `value` in `scope`, possibly shadowing
    /// bindings in enclosing regions or replacing one in this region.
    pub fn put(&mut self, scope: ScopeId, name: impl Into<String>, value: V) {
        self.scopes[scope.0 as usize]
            .bindings
            .insert(name.into(), value);
    }

    /// Whether `name` has a binding in `scope` itself, ignoring enclosing
    /// regions.
    pub fn declares(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.0 as usize].bindings.contains_key(name)
    }

    /// The names declared in `scope` itself, in insertion order.
    pub fn declared_symbols(&self, scope: ScopeId) -> impl Iterator<Item = &str> {
        self.scopes[scope.0 as usize]
            .bindings
            .keys()
            .map(String::as_str)
    }

    /// The enclosing scope, or `None` for the root.
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0 as usize].parent
    }
}

impl<V> Default for SymbolTable<V> {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parent_chain() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", 1);

        let inner = table.push_scope(root);
        assert_eq!(table.get(inner, "x"), Some(&1));
        assert_eq!(table.get(inner, "y"), None);
    }

    #[test]
    fn test_shadowing() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", 1);

        let inner = table.push_scope(root);
        table.put(inner, "x", 2);

        assert_eq!(table.get(inner, "x"), Some(&2));
        assert_eq!(table.get(root, "x"), Some(&1));
    }

    #[test]
    fn test_declares_is_shallow() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", 1);

        let inner = table.push_scope(root);
        assert!(!table.declares(inner, "x"));
        assert!(table.declares(root, "x"));
    }

    #[test]
    fn test_parent_gains_bindings_after_child_exists() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        let outer = table.push_scope(root);
        let inner = table.push_scope(outer);

        table.put(outer, "late", 3);
        assert_eq!(table.get(inner, "late"), Some(&3));
    }

    #[test]
    fn test_declared_symbols_in_insertion_order() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        table.put(root, "b", 1);
        table.put(root, "a", 2);
        table.put(root, "c", 3);

        let names: Vec<&str> = table.declared_symbols(root).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_parent_links() {
        let mut table: SymbolTable<i32> = SymbolTable::new();
        let root = table.root();
        let inner = table.push_scope(root);
        assert_eq!(table.parent(root), None);
        assert_eq!(table.parent(inner), Some(root));
    }
}
