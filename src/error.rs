use miette::Diagnostic;
use thiserror::Error;

use crate::ir::event::EventKind;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(cmdir::type_mismatch))]
    TypeMismatch { expected: String, found: String },

    #[error("`{what}` expected {expected} arguments but received {received}")]
    #[diagnostic(code(cmdir::arity_mismatch))]
    ArityMismatch {
        what: String,
        expected: String,
        received: usize,
    },

    #[error("Value `{name}` was used before it was constructed")]
    #[diagnostic(code(cmdir::unbound_value))]
    UnboundValue { name: String },

    #[error("Operator `{op}` is not supported on type `{ty}`")]
    #[diagnostic(code(cmdir::unsupported_operator))]
    UnsupportedOperator { op: String, ty: String },

    #[error("`{insn}` expected {expected} event, got {found} event `{event}`")]
    #[diagnostic(code(cmdir::wrong_event_kind))]
    WrongEventKind {
        insn: String,
        event: String,
        expected: EventKind,
        found: EventKind,
    },

    #[error("Function `{function}` is inline and cannot be registered as `{insn}` target")]
    #[diagnostic(
        code(cmdir::inline_handler),
        help("handlers and setup functions must be addressable functions")
    )]
    InlineHandlerNotAllowed { insn: String, function: String },

    #[error("`{insn}` cannot be used here: {message}")]
    #[diagnostic(code(cmdir::scope_violation))]
    ScopeViolation { insn: String, message: String },

    #[error("Phase violation: {message}")]
    #[diagnostic(code(cmdir::phase_violation))]
    PhaseViolation { message: String },

    #[error("{what} `{name}` not found")]
    #[diagnostic(code(cmdir::name_not_found))]
    NameNotFound { what: &'static str, name: String },

    #[error("Missing argument `{name}`")]
    #[diagnostic(code(cmdir::missing_argument), help("pass it as a session argument"))]
    MissingArgument { name: String },

    #[error("Unknown command argument kind `{kind}`")]
    #[diagnostic(
        code(cmdir::unknown_argument_kind),
        help("expected one of: tag, arg, entity_local, func")
    )]
    UnknownArgumentKind { kind: String },

    #[error("Cannot read instruction `{input}`: {message}")]
    #[diagnostic(code(cmdir::syntax))]
    Syntax { input: String, message: String },

    #[error("Objective `{trimmed}` is produced by both `{first}` and `{second}`")]
    #[diagnostic(
        code(cmdir::name_collision),
        help("objective names keep only their last 16 characters; rename one of them")
    )]
    NameCollision {
        trimmed: String,
        first: String,
        second: String,
    },

    #[error("In `{insn}`: {source}")]
    #[diagnostic(code(cmdir::instruction))]
    Instruction {
        insn: &'static str,
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub fn phase(message: impl Into<String>) -> Self {
        CompileError::PhaseViolation {
            message: message.into(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CompileError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Attaches the name of the instruction that failed, once.
    pub fn in_insn(self, insn: &'static str) -> Self {
        match self {
            CompileError::Instruction { .. } => self,
            other => CompileError::Instruction {
                insn,
                source: Box::new(other),
            },
        }
    }

    /// The underlying failure with any instruction context stripped.
    pub fn root(&self) -> &CompileError {
        match self {
            CompileError::Instruction { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn insn(&self) -> Option<&'static str> {
        match self {
            CompileError::Instruction { insn, .. } => Some(insn),
            _ => None,
        }
    }
}
