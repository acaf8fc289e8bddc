//! Function registries.
//!
//! Two independent maps are kept: by-name (last `def` wins, last write
//! wins — re-defining a name overwrites the name -> function mapping)
//! and by-id (additive; every registered function keeps its id entry
//! even after its name is overwritten by a later `def`). Call-by-id
//! bypasses shadowing entirely by going straight through the id map.

use std::rc::Rc;

use ahash::AHashMap;

use crate::program::Stmt;

/// An executable function: parameters and a body, plus the identity it
/// was registered under.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub id: String,
    pub params: Vec<String>,
    pub body: Rc<[Stmt]>,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: AHashMap<String, Rc<FunctionDef>>,
    by_id: AHashMap<String, Rc<FunctionDef>>,
    next_runtime_id: u64,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh synthetic id for a `def` that didn't carry one, of the
    /// form `fn_runtime_<n>`, distinct from the `fn_<8-hex>` shape used
    /// by author- or edit-assigned ids.
    pub fn next_synthetic_id(&mut self) -> String {
        let id = format!("fn_runtime_{}", self.next_runtime_id);
        self.next_runtime_id += 1;
        id
    }

    /// Register a function definition, assigning a synthetic id first
    /// if `fn_id` is absent. Returns the id it was registered under.
    pub fn register(&mut self, name: &str, fn_id: Option<&str>, params: Vec<String>, body: Rc<[Stmt]>) -> String {
        let id = fn_id
            .map(str::to_string)
            .unwrap_or_else(|| self.next_synthetic_id());
        let def = Rc::new(FunctionDef {
            name: name.to_string(),
            id: id.clone(),
            params,
            body,
        });
        self.by_name.insert(name.to_string(), Rc::clone(&def));
        self.by_id.insert(id.clone(), def);
        id
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Rc<FunctionDef>> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&Rc<FunctionDef>> {
        self.by_id.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefining_a_name_overwrites_name_map_but_keeps_old_id() {
        let mut reg = FunctionRegistry::new();
        let id1 = reg.register("f", Some("fn_aaaaaaaa"), vec![], Rc::from(vec![]));
        let id2 = reg.register("f", Some("fn_bbbbbbbb"), vec![], Rc::from(vec![]));
        assert_ne!(id1, id2);
        assert_eq!(reg.by_name("f").unwrap().id, id2);
        assert!(reg.by_id(&id1).is_some());
        assert!(reg.by_id(&id2).is_some());
    }

    #[test]
    fn missing_id_gets_synthetic_runtime_id() {
        let mut reg = FunctionRegistry::new();
        let id = reg.register("f", None, vec![], Rc::from(vec![]));
        assert!(id.starts_with("fn_runtime_"));
    }
}
