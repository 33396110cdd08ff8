//! Chained scope frames for the interpreter.
//!
//! Each frame owns a name→value map and an optional link to its enclosing
//! frame. Frames are shared-ownership values (`Rc<RefCell<..>>`): any number
//! of closures may hold the same frame, and mutation through one handle is
//! visible through all of them.

use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Environment {
    values: HashMap<String, Value>,
    pub enclosing: Option<Rc<RefCell<Environment>>>,
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

    /// Insert-or-overwrite in this frame. Never fails; re-declaring a name
    /// in the same frame replaces the old binding. (The resolver separately
    /// rejects duplicate declarations in one static block scope; that is a
    /// different check at a different time.)
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look a name up, searching innermost to outermost.
    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Mutate the first frame that owns `name`, searching innermost to
    /// outermost. Assignment never creates a new binding.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Walk `distance` enclosing links from `environment`.
    ///
    /// A missing link means the resolver produced a distance that does not
    /// correspond to a real frame; that is a defect in this crate, not a
    /// user error, so it panics instead of returning a `RuntimeError`.
    pub fn ancestor(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Rc<RefCell<Environment>> {
        let mut frame = environment.clone();
        for _ in 0..distance {
            let enclosing = frame
                .borrow()
                .enclosing
                .as_ref()
                .expect("binding distance exceeds the frame chain")
                .clone();
            frame = enclosing;
        }
        frame
    }

    /// Fast path for resolved references: read `name` from the frame exactly
    /// `distance` hops up, no search. Infallible for a correctly resolved
    /// reference.
    pub fn get_at(environment: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Self::ancestor(environment, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolved name missing from its frame")
    }

    /// Fast path for resolved assignments: write `name` in the frame exactly
    /// `distance` hops up.
    pub fn assign_at(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) {
        Self::ancestor(environment, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
