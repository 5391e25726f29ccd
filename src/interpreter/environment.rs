use std::{cell::RefCell, fmt::Debug, rc::Rc};

use rustc_hash::FxHashMap;

use super::Value;

pub type Env = Rc<RefCell<Environment>>;

/// A name-to-value table with an optional parent. The same shape backs the
/// global scope of a run, the isolated top level of a module, and the local
/// scope of a function call (parented on the function's closure
/// environment).
pub struct Environment {
    bindings: FxHashMap<String, Value>,
    parent: Option<Env>,
}

impl Environment {
    pub fn root() -> Env {
        Rc::new(RefCell::new(Self {
            bindings: FxHashMap::default(),
            parent: None,
        }))
    }

    pub fn child(parent: Env) -> Env {
        Rc::new(RefCell::new(Self {
            bindings: FxHashMap::default(),
            parent: Some(parent),
        }))
    }

    /// Reads walk the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }

    /// Lookup in this table only; module member access never reaches a
    /// parent.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    /// Declaration and reassignment are the same write: both land in this
    /// environment's own table, shadowing rather than updating any outer
    /// binding of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may hold this environment back (closures), so print names
        // and the parent pointer only.
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("parent", &self.parent.as_ref().map(Rc::as_ptr))
            .finish()
    }
}
