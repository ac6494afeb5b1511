use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, RillError};
use crate::value::Value;

#[derive(Clone)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined_variable(name, line))
        }
    }

    /// Overwrite an existing binding; assignment never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined_variable(name, line))
        }
    }

    /// Read a binding at an exact lexical distance.  The resolver guarantees
    /// the name exists there; a violated guarantee still surfaces as an
    /// undefined-variable error rather than a panic.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        match Self::ancestor(env, distance) {
            Some(target) => {
                let target = target.borrow();
                target
                    .values
                    .get(name)
                    .cloned()
                    .ok_or_else(|| undefined_variable(name, line))
            }
            None => Err(undefined_variable(name, line)),
        }
    }

    /// Overwrite a binding at an exact lexical distance.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        match Self::ancestor(env, distance) {
            Some(target) => {
                let mut target = target.borrow_mut();
                match target.values.get_mut(name) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(undefined_variable(name, line)),
                }
            }
            None => Err(undefined_variable(name, line)),
        }
    }

    /// Walk `enclosing` exactly `distance` times.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let enclosing = match current.borrow().enclosing.as_ref() {
                Some(enclosing) => Rc::clone(enclosing),
                None => return None,
            };
            current = enclosing;
        }

        Some(current)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

fn undefined_variable(name: &str, line: usize) -> RillError {
    RillError::runtime(line, format!("Undefined variable '{}'.", name))
}
