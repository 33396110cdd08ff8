//! Tree-walking evaluator for the **Quill** language.
//!
//! The interpreter holds the persistent `globals` frame, a cursor to the
//! current frame (swapped for the duration of a block or call and always
//! restored), and the resolver's reference-id → distance table. Execution is
//! strictly single-threaded and recursive.
//!
//! Non-local `return` is modeled as an explicit statement result
//! ([`Flow`]), not an error: every statement executor propagates
//! `Flow::Return` upward and only the function/method call boundary
//! ([`Function::call`](crate::object::Function::call)) consumes it. Runtime
//! failures travel in the `Err` channel and abort the current top-level
//! statement.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::object::{Class, Function, Instance, INITIALIZER_NAME};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Result of executing one statement. `Return` unwinds to the nearest
/// enclosing call boundary; blocks, conditionals, and loops just pass it
/// along.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Creates a new Interpreter writing to stdout, with the native
    /// builtins pre-registered in the globals frame.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an Interpreter writing `print` output (and `print_string`)
    /// to the given sink. Tests use this to capture output.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));
        define_native_functions(&globals);

        Self {
            globals: globals.clone(),
            environment: globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Merge a resolver-produced distance table. Called once per program
    /// (or once per REPL line; ids never collide across lines).
    pub fn resolve(&mut self, locals: HashMap<ExprId, usize>) {
        debug!("Installing {} resolved binding(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program"). On a runtime error the
    /// remaining statements are skipped; global state keeps whatever
    /// mutations completed before the failure point.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for statement in statements {
            // a top-level Return is statically rejected, so any Flow here
            // is Normal and can be discarded
            self.execute(statement)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.write_line(&value.to_string());
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // the function value closes over the frame active at its
                // declaration site
                let function =
                    Function::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Return statement with value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class_decl(name, superclass.as_ref(), methods),
        }
    }

    /// Executes statements with `environment` as the current frame,
    /// restoring the previous frame on every exit path (normal, early
    /// return, or error).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    fn execute_class_decl(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<Flow> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass_value = match superclass {
            Some(superclass_expr) => match self.evaluate(superclass_expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match superclass_expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };
                    return Err(RuntimeError::SuperclassMustBeClass { line });
                }
            },
            None => None,
        };

        // pre-declare as Nil so methods can refer to the class by name
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let mut class_environment = self.environment.clone();
        if let Some(superclass) = &superclass_value {
            class_environment = Rc::new(RefCell::new(Environment::with_enclosing(
                class_environment,
            )));
            class_environment
                .borrow_mut()
                .define("super", Value::Class(superclass.clone()));
        }

        let mut method_map = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == INITIALIZER_NAME;
            let function = Function::new(method.clone(), class_environment.clone(), is_initializer);
            method_map.insert(method.name.lexeme.clone(), function);
        }

        let class = Rc::new(Class::new(
            name.lexeme.clone(),
            superclass_value,
            method_map,
        ));

        // bind the finished class over the Nil placeholder
        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if is_truthy(&left_value) => Ok(left_value),
                    TokenType::AND if !is_truthy(&left_value) => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } | Expr::This { id, keyword: name } => {
                self.look_up_variable(name, *id)
            }

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }
                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee_value, paren.line, &argument_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::OnlyInstancesHaveProperties { line: name.line }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(&name.lexeme, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::OnlyInstancesHaveFields { line: name.line }),
            },

            Expr::Super { id, method, .. } => self.evaluate_super(*id, method),
        }
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => unreachable!("parser produced an invalid unary operator"),
        }
    }

    /// Evaluates a binary expression.
    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;
        let line = operator.line;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::type_error(
                    line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(RuntimeError::type_error(line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                // string repetition: "ab" * 3 == 3 * "ab" == "ababab",
                // repeating floor(n) times
                (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
                    Ok(Value::String(s.repeat(n.floor() as usize)))
                }

                (Value::String(_), _) | (_, Value::String(_)) => Err(RuntimeError::type_error(
                    line,
                    "String repetition count must be a number.",
                )),

                _ => Err(RuntimeError::type_error(line, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(RuntimeError::DivisionByZero { line })
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                _ => Err(RuntimeError::type_error(line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            TokenType::LESS => compare_numbers(left_value, right_value, line, |a, b| a < b),
            TokenType::LESS_EQUAL => compare_numbers(left_value, right_value, line, |a, b| a <= b),
            TokenType::GREATER => compare_numbers(left_value, right_value, line, |a, b| a > b),
            TokenType::GREATER_EQUAL => {
                compare_numbers(left_value, right_value, line, |a, b| a >= b)
            }

            _ => unreachable!("parser produced an invalid binary operator"),
        }
    }

    /// `super.method`: the superclass is looked up through the synthetic
    /// `super` binding, the receiver through `this` one frame below it, and
    /// method search starts at the superclass rather than the dynamic
    /// class.
    fn evaluate_super(&mut self, id: ExprId, method: &Token) -> IResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .expect("'super' reference was not resolved");

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' bound to a non-class"),
        };
        let object = Environment::get_at(&self.environment, distance - 1, "this");

        let function =
            superclass
                .find_method(&method.lexeme)
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: method.lexeme.clone(),
                    line: method.line,
                })?;

        Ok(Value::Function(Rc::new(function.bind(object))))
    }

    /// Resolved references use the distance fast path; everything else is a
    /// global, looked up dynamically by name.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(
                &self.environment,
                distance,
                &name.lexeme,
            )),
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    /// Invokes a callable-capable value: a native function, a user function,
    /// or a class acting as constructor. Argument count must equal the
    /// callable's arity exactly; nothing of the body runs otherwise.
    fn invoke_callable(
        &mut self,
        callee: Value,
        line: usize,
        arguments: &[Value],
    ) -> IResult<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                if arguments.len() != arity {
                    return Err(RuntimeError::ArityMismatch {
                        expected: arity,
                        got: arguments.len(),
                        line,
                    });
                }

                func(self, arguments).map_err(|message| RuntimeError::Native { message, line })
            }

            Value::Function(function) => {
                if arguments.len() != function.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: function.arity(),
                        got: arguments.len(),
                        line,
                    });
                }

                function.call(self, arguments)
            }

            Value::Class(class) => {
                if arguments.len() != class.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: class.arity(),
                        got: arguments.len(),
                        line,
                    });
                }

                Class::construct(&class, self, arguments)
            }

            _ => Err(RuntimeError::NotCallable { line }),
        }
    }

    /// Write one line to the output sink. Output failures are not a
    /// language-level error; they are dropped.
    fn write_line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn compare_numbers(
    left: Value,
    right: Value,
    line: usize,
    op: fn(f64, f64) -> bool,
) -> IResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(op(a, b))),
        _ => Err(RuntimeError::type_error(line, "Operands must be numbers.")),
    }
}

/// `nil` and `false` are falsy; every other value (including `0` and `""`)
/// is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native builtins
// ─────────────────────────────────────────────────────────────────────────────

fn define_native_functions(globals: &Rc<RefCell<Environment>>) {
    debug!("Defining native functions");

    let mut globals = globals.borrow_mut();

    globals.define(
        "clock",
        Value::NativeFunction {
            name: "clock",
            arity: 0,
            func: native_clock,
        },
    );

    globals.define(
        "read_line",
        Value::NativeFunction {
            name: "read_line",
            arity: 0,
            func: native_read_line,
        },
    );

    globals.define(
        "print_string",
        Value::NativeFunction {
            name: "print_string",
            arity: 1,
            func: native_print_string,
        },
    );

    globals.define(
        "square",
        Value::NativeFunction {
            name: "square",
            arity: 1,
            func: native_square,
        },
    );
}

/// Wall-clock seconds since the Unix epoch.
fn native_clock(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

/// One line from stdin without its trailing newline, or Nil at end of
/// input.
fn native_read_line(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, String> {
    let mut line = String::new();

    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => Ok(Value::Nil),
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::String(line))
        }
        Err(e) => Err(format!("read_line error: {}", e)),
    }
}

/// Writes the debug representation of its argument (strings quoted) to the
/// interpreter's output sink.
fn native_print_string(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let text = args[0].repr();
    interpreter.write_line(&text);
    Ok(Value::Nil)
}

/// `square(n)` for numbers; Nil for anything else.
fn native_square(_interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(n * n)),
        _ => Ok(Value::Nil),
    }
}
