use thiserror::Error;

/// Faults that mean the core was handed input it should never see, or that
/// one of its own passes broke an invariant. These abort compilation; user
/// mistakes are reported as [`crate::diagnostic::Diagnostic`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("label '{label}' is referenced in function '{function}' but never resolved")]
    UnresolvedLabel { function: String, label: String },
    #[error("function '{0}' is called but was never emitted")]
    MissingCallee(String),
    #[error("constant folding of '{function}' does not support ref/out parameter '{parameter}'")]
    ConstantRefParameter { function: String, parameter: String },
    #[error("block '{block}' has no terminal named '{terminal}'")]
    UnknownTerminal {
        block: &'static str,
        terminal: &'static str,
    },
}

impl CoreError {
    pub fn internal(message: impl Into<String>) -> Self {
        CoreError::Internal(message.into())
    }
}
