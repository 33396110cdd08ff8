//! Runtime object model: user functions, classes, and instances.
//!
//! All three are built on shared environment frames. A `Function` pairs its
//! declaration with the frame active at its declaration site (the closure);
//! a `Class` holds its unbound methods and an optional superclass link; an
//! `Instance` owns its field map exclusively.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// The reserved construction method name.
pub const INITIALIZER_NAME: &str = "init";

/// A user-defined function or method value.
///
/// The closure frame is captured by shared reference, never copied: later
/// mutation of an outer variable is visible to every closure over it.
#[derive(Debug, Clone)]
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose environment binds `this` to
    /// the given instance, enclosing the method's original closure.
    pub fn bind(&self, instance: Value) -> Function {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));
        environment.borrow_mut().define("this", instance);

        Function {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke with an already-checked argument list: bind each parameter in
    /// a fresh frame chained to the closure, run the body, and convert the
    /// resulting control flow into a value. Only this boundary consumes a
    /// `Flow::Return`; blocks and loops merely propagate it.
    ///
    /// Initializers always yield the bound instance, whatever the body did.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!("Calling function '{}'", self.name());

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment
                .borrow_mut()
                .define(&param.lexeme, argument.clone());
        }

        let flow = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, "this"));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// A class value. Doubles as the constructor when called.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Function>,
    ) -> Self {
        Class {
            name,
            superclass,
            methods,
        }
    }

    /// Look a method up on this class, walking the superclass chain. The
    /// chain is never flattened; lookup is O(depth) per call, which is fine
    /// for the shallow hierarchies this language sees.
    pub fn find_method(&self, name: &str) -> Option<Function> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Constructor arity: the initializer's arity, or zero if the class has
    /// no initializer.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Construct an instance: create it, then bind and run the initializer
    /// if one exists, discarding its return value.
    pub fn construct(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        debug!("Constructing instance of '{}'", class.name);

        let instance = Rc::new(RefCell::new(Instance::new(class.clone())));

        if let Some(initializer) = class.find_method(INITIALIZER_NAME) {
            initializer
                .bind(Value::Instance(instance.clone()))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance of a class. The field map is exclusively owned by the
/// instance; fields are created implicitly on first assignment.
#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property lookup: fields shadow methods. A method hit is bound to the
    /// instance, producing a fresh closure whose frame defines `this`.
    pub fn get(
        instance: &Rc<RefCell<Instance>>,
        name: &Token,
    ) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = instance.borrow().class.clone();
        if let Some(method) = class.find_method(&name.lexeme) {
            let bound = method.bind(Value::Instance(instance.clone()));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Unconditionally insert-or-overwrite a field.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
