//! Error taxonomy for the core engine.
//!
//! Two families: [`ProgramError`] covers shape
//! problems found while building the typed [`crate::program`] tree from
//! raw JSON (these would be `E_PROGRAM_SHAPE`/`E_STMT_SHAPE` validation
//! issues if encountered through the report-mode validator, and a single
//! raised failure in fail-fast mode). [`RuntimeError`] covers everything
//! that can go wrong once a well-shaped program is actually executing.
//!
//! Both are hand-rolled enums with `Display`/`std::error::Error` impls —
//! no `thiserror`/`anyhow` — matching the style the rest of this crate's
//! dependency stack favors for its own error types.

use std::fmt;

use crate::capability::PermissionDenied;

/// Where in the program an error occurred, and which functions were
/// active at the time. Optional: callers that don't need rich
/// diagnostics can ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub path: String,
    pub call_stack: Vec<String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.path)?;
        if !self.call_stack.is_empty() {
            write!(f, " (call stack: {})", self.call_stack.join(" -> "))?;
        }
        Ok(())
    }
}

/// A malformed program shape discovered while decoding raw JSON into the
/// typed statement/expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// Top level value is neither a JSON array nor `{program: [...]}`.
    NotAList,
    /// A statement node is not a JSON object.
    StmtNotObject { path: String },
    /// A statement object matches none of the known statement kinds, or
    /// is missing required fields for the kind it does match.
    BadStmtShape { path: String, detail: String },
    /// An expression node has an invalid shape (e.g. a `call` with both
    /// `name` and `id`, or neither).
    BadExprShape { path: String, detail: String },
}

impl ProgramError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAList => "E_PROGRAM_SHAPE",
            Self::StmtNotObject { .. } => "E_STMT_SHAPE",
            Self::BadStmtShape { .. } => "E_STMT_SHAPE",
            Self::BadExprShape { .. } => "E_STMT_SHAPE",
        }
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAList => {
                write!(f, "Program must be a list or a {{program:[...]}} wrapper")
            }
            Self::StmtNotObject { path } => write!(f, "Statement must be an object, at {path}"),
            Self::BadStmtShape { path, detail } => {
                write!(f, "{detail}, at {path}")
            }
            Self::BadExprShape { path, detail } => {
                write!(f, "{detail}, at {path}")
            }
        }
    }
}

impl std::error::Error for ProgramError {}

/// Everything that can go wrong once a validated program is executing.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    VariableNotFound {
        name: String,
        context: Option<ErrorContext>,
    },
    CannotSetUndefined {
        name: String,
        context: Option<ErrorContext>,
    },
    FunctionNameNotDefined {
        name: String,
        context: Option<ErrorContext>,
    },
    FunctionIdNotDefined {
        id: String,
        context: Option<ErrorContext>,
    },
    CallArityMismatch {
        display_name: String,
        expected: usize,
        got: usize,
        context: Option<ErrorContext>,
    },
    OperatorArity {
        op: String,
        got: usize,
    },
    UnknownOperator {
        op: String,
    },
    DivisionByZero,
    IntParseFailure {
        input: String,
    },
    IndexOutOfRange {
        op: &'static str,
    },
    WrongKind {
        op: &'static str,
        detail: String,
    },
    EffectDenied(PermissionDenied),
    RecursionLimitExceeded,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariableNotFound { name, context } => {
                write!(f, "Variable not found: {name}")?;
                fmt_context(f, context)
            }
            Self::CannotSetUndefined { name, context } => {
                write!(f, "Variable not found: {name}")?;
                fmt_context(f, context)
            }
            Self::FunctionNameNotDefined { name, context } => {
                write!(f, "Function not defined: {name}")?;
                fmt_context(f, context)
            }
            Self::FunctionIdNotDefined { id, context } => {
                write!(f, "Function id not defined: {id}")?;
                fmt_context(f, context)
            }
            Self::CallArityMismatch {
                display_name,
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Function {display_name} expects {expected} args, got {got}"
                )?;
                fmt_context(f, context)
            }
            Self::OperatorArity { op, got } => {
                write!(f, "Operator {op} invalid arity: {got}")
            }
            Self::UnknownOperator { op } => write!(f, "Unknown operator: {op}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::IntParseFailure { input } => write!(f, "int parse failed: {input:?}"),
            Self::IndexOutOfRange { op } => write!(f, "{op}: index out of range"),
            Self::WrongKind { op, detail } => write!(f, "{op}: {detail}"),
            Self::EffectDenied(p) => write!(f, "{p}"),
            Self::RecursionLimitExceeded => write!(f, "maximum recursion depth exceeded"),
        }
    }
}

fn fmt_context(f: &mut fmt::Formatter<'_>, context: &Option<ErrorContext>) -> fmt::Result {
    if let Some(ctx) = context {
        write!(f, " ({ctx})")?;
    }
    Ok(())
}

impl std::error::Error for RuntimeError {}

/// Top-level error produced by running a program: either the program
/// never made it past shape decoding, or it ran and failed at runtime.
#[derive(Debug, Clone)]
pub enum ExecError {
    Program(ProgramError),
    Runtime(RuntimeError),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<ProgramError> for ExecError {
    fn from(e: ProgramError) -> Self {
        Self::Program(e)
    }
}

impl From<RuntimeError> for ExecError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}
