use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use crate::{
    error::{Error, Result},
    runtime::Value,
};

#[derive(Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
    parent: Option<Environment>,
}

/// One scope in a parent-linked chain. Cloning shares the scope rather than copying it,
/// which is how function values keep their defining scope alive.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Environment {
        Environment(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn declare(&self, name: &str, value: Value) -> Result<()> {
        self.bind(name, value, false)
    }

    /// Like `declare`, but later `assign` calls to this binding fail.
    pub fn declare_constant(&self, name: &str, value: Value) -> Result<()> {
        self.bind(name, value, true)
    }

    fn bind(&self, name: &str, value: Value, constant: bool) -> Result<()> {
        let mut scope = self.0.borrow_mut();
        if scope.bindings.contains_key(name) {
            return Err(Error::DuplicateBinding(name.to_string()));
        }
        scope
            .bindings
            .insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Value> {
        let scope = self.0.borrow();
        match (scope.bindings.get(name), &scope.parent) {
            (Some(binding), _) => Ok(binding.value.clone()),
            (None, Some(parent)) => parent.lookup(name),
            (None, None) => Err(Error::UnboundIdentifier(name.to_string())),
        }
    }

    /// Rebinds the nearest enclosing declaration of `name`. Never creates a binding.
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        let scope = &mut *self.0.borrow_mut();
        match scope.bindings.get_mut(name) {
            Some(binding) if binding.constant => Err(Error::ConstantAssignment(name.to_string())),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => match &scope.parent {
                Some(parent) => parent.assign(name, value),
                None => Err(Error::UnboundIdentifier(name.to_string())),
            },
        }
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// Scopes can reach themselves through a captured function, so only names are printed.
impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<_> = scope.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}
