use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Environments are shared between the call frame that created them and any
/// closure defined inside it.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    /// Walks outward until `name` is bound. `None` means unbound, which is
    /// different from being bound to `null`.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Binds in this scope only, shadowing any outer binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}
