//! Centralised error hierarchy for the **Quill interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! Static analysis and runtime each get their own taxonomy (`ResolveError`,
//! `RuntimeError`); both fold into [`QuillError`] at the crate boundary.
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuillError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure from the resolver pass.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl QuillError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        QuillError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        QuillError::Parse { message, line }
    }
}

/// Static errors surfaced by the resolver pass.
///
/// The resolver accumulates these and runs to completion, so a single run
/// reports every static error in the program. The presence of any of them
/// prevents interpretation from starting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("[line {line}] Error: Already a variable named '{name}' in this scope.")]
    DuplicateDeclaration { name: String, line: usize },

    #[error("[line {line}] Error: Can't read local variable '{name}' in its own initializer.")]
    SelfReferencingInitializer { name: String, line: usize },

    #[error("[line {line}] Error: Can't return from top-level code.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error: Can't return a value from an initializer.")]
    ReturnValueFromInitializer { line: usize },

    #[error("[line {line}] Error: Can't use 'this' outside of a class.")]
    ThisOutsideClass { line: usize },

    #[error("[line {line}] Error: Can't use 'super' outside of a class.")]
    SuperOutsideClass { line: usize },

    #[error("[line {line}] Error: Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass { line: usize },

    #[error("[line {line}] Error: A class can't inherit from itself.")]
    SelfInheritance { name: String, line: usize },
}

/// Failures raised while evaluating the program.
///
/// These abort the current top-level statement and are caught only at
/// `interpret`'s outer boundary. Every variant carries the source line of the
/// offending construct for user-facing reporting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("{message} [line {line}]")]
    TypeError { message: String, line: usize },

    #[error("Division by zero. [line {line}]")]
    DivisionByZero { line: usize },

    #[error("Undefined variable '{name}'. [line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'. [line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Only instances have properties. [line {line}]")]
    OnlyInstancesHaveProperties { line: usize },

    #[error("Only instances have fields. [line {line}]")]
    OnlyInstancesHaveFields { line: usize },

    #[error("Can only call functions and classes. [line {line}]")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}. [line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Superclass must be a class. [line {line}]")]
    SuperclassMustBeClass { line: usize },

    /// A native builtin failed on the host side (e.g. the system clock).
    #[error("{message} [line {line}]")]
    Native { message: String, line: usize },
}

impl RuntimeError {
    /// Helper constructor for operand-kind mismatches.
    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating TypeError: line={}, msg={}", line, message);

        RuntimeError::TypeError { message, line }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, QuillError>;
