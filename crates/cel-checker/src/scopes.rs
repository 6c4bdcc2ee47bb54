//! Lexical scopes of declarations
//!
//! A [`Scopes`] value is a handle to the innermost scope of a parent-linked
//! chain. Pushing returns a new handle; the parent chain is shared, so
//! dropping the pushed handle restores the outer view. Cloned handles share
//! their groups until [`Scopes::detach`] gives one a private copy.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::decls::{FunctionDecl, VariableDecl};

/// Declarations local to one scope
#[derive(Debug, Default, Clone)]
pub struct Group {
    idents: FxHashMap<String, VariableDecl>,
    functions: FxHashMap<String, Arc<FunctionDecl>>,
}

/// Handle to the innermost scope of a chain
#[derive(Debug, Clone)]
pub struct Scopes {
    group: Arc<RwLock<Group>>,
    parent: Option<Arc<Scopes>>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    /// A single, empty, outermost scope
    pub fn new() -> Self {
        Scopes {
            group: Arc::new(RwLock::new(Group::default())),
            parent: None,
        }
    }

    /// New child scope of this one
    pub fn push(&self) -> Scopes {
        Scopes {
            group: Arc::new(RwLock::new(Group::default())),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// The parent scope, or `None` at the outermost scope
    pub fn pop(&self) -> Option<Scopes> {
        self.parent.as_deref().cloned()
    }

    /// Number of scopes in the chain
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// Give this handle a private copy of its innermost group
    ///
    /// Handles cloned from this one keep the group as it was; nothing is
    /// copied when no other handle shares it.
    pub fn detach(&mut self) {
        if Arc::strong_count(&self.group) > 1 {
            let copy = Group::clone(&self.group.read());
            self.group = Arc::new(RwLock::new(copy));
        }
    }

    fn global(&self) -> &Scopes {
        match &self.parent {
            Some(parent) => parent.global(),
            None => self,
        }
    }

    /// Declare an identifier in this scope, replacing any local one of the same name
    pub fn add_ident(&self, decl: VariableDecl) {
        self.group
            .write()
            .idents
            .insert(decl.name().to_string(), decl);
    }

    /// Declare an identifier in the outermost scope
    pub fn add_global_ident(&self, decl: VariableDecl) {
        self.global().add_ident(decl);
    }

    /// Innermost declaration of `name`
    pub fn find_ident(&self, name: &str) -> Option<VariableDecl> {
        if let Some(decl) = self.find_ident_in_scope(name) {
            return Some(decl);
        }
        self.parent.as_ref().and_then(|p| p.find_ident(name))
    }

    /// Declaration of `name` in this scope only
    pub fn find_ident_in_scope(&self, name: &str) -> Option<VariableDecl> {
        self.group.read().idents.get(name).cloned()
    }

    /// Declare or replace a function in this scope
    pub fn set_function(&self, decl: FunctionDecl) {
        self.group
            .write()
            .functions
            .insert(decl.name().to_string(), Arc::new(decl));
    }

    /// Innermost declaration of function `name`
    pub fn find_function(&self, name: &str) -> Option<Arc<FunctionDecl>> {
        if let Some(decl) = self.group.read().functions.get(name) {
            return Some(Arc::clone(decl));
        }
        self.parent.as_ref().and_then(|p| p.find_function(name))
    }

    /// Every visible identifier, innermost declaration first, sorted by name
    pub fn idents(&self) -> Vec<VariableDecl> {
        let mut seen: FxHashMap<String, VariableDecl> = FxHashMap::default();
        let mut scope = Some(self);
        while let Some(s) = scope {
            for (name, decl) in s.group.read().idents.iter() {
                seen.entry(name.clone()).or_insert_with(|| decl.clone());
            }
            scope = s.parent.as_deref();
        }
        let mut out: Vec<VariableDecl> = seen.into_values().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    /// Every visible function, sorted by name
    pub fn functions(&self) -> Vec<Arc<FunctionDecl>> {
        let mut seen: FxHashMap<String, Arc<FunctionDecl>> = FxHashMap::default();
        let mut scope = Some(self);
        while let Some(s) = scope {
            for (name, decl) in s.group.read().functions.iter() {
                seen.entry(name.clone()).or_insert_with(|| Arc::clone(decl));
            }
            scope = s.parent.as_deref();
        }
        let mut out: Vec<Arc<FunctionDecl>> = seen.into_values().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_types::Type;

    #[test]
    fn test_push_pop_shadowing() {
        let root = Scopes::new();
        root.add_ident(VariableDecl::new("x", Type::int()));

        let inner = root.push();
        inner.add_ident(VariableDecl::new("x", Type::string()));
        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.find_ident("x").unwrap().ty(), &Type::string());

        let outer = inner.pop().unwrap();
        assert_eq!(outer.find_ident("x").unwrap().ty(), &Type::int());
        assert!(outer.pop().is_none());
        // The outer handle never saw the inner declaration
        assert_eq!(root.find_ident("x").unwrap().ty(), &Type::int());
    }

    #[test]
    fn test_global_ident_visible_everywhere() {
        let root = Scopes::new();
        let inner = root.push().push();
        inner.add_global_ident(VariableDecl::new("acme.Order", Type::int()));
        assert!(root.find_ident("acme.Order").is_some());
        assert!(inner.find_ident_in_scope("acme.Order").is_none());
        assert!(inner.find_ident("acme.Order").is_some());
    }

    #[test]
    fn test_detach_copies_shared_group() {
        let base = Scopes::new();
        base.add_ident(VariableDecl::new("x", Type::int()));

        let mut derived = base.clone();
        derived.detach();
        derived.add_ident(VariableDecl::new("y", Type::int()));
        derived.set_function(FunctionDecl::new("f"));

        assert!(derived.find_ident("x").is_some());
        assert!(base.find_ident("y").is_none());
        assert!(base.find_function("f").is_none());
    }

    #[test]
    fn test_functions() {
        let root = Scopes::new();
        root.set_function(FunctionDecl::new("f"));
        let inner = root.push();
        assert_eq!(inner.find_function("f").unwrap().name(), "f");
        assert!(inner.find_function("g").is_none());
    }

    #[test]
    fn test_visible_declarations() {
        let root = Scopes::new();
        root.add_ident(VariableDecl::new("y", Type::int()));
        root.add_ident(VariableDecl::new("x", Type::int()));
        root.set_function(FunctionDecl::new("g"));
        root.set_function(FunctionDecl::new("f"));
        let inner = root.push();
        inner.add_ident(VariableDecl::new("x", Type::string()));

        let idents = inner.idents();
        let names: Vec<&str> = idents.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(idents[0].ty(), &Type::string());

        let functions: Vec<String> = inner.functions().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(functions, vec!["f", "g"]);
    }
}
