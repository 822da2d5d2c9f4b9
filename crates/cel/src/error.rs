use thiserror::Error;

/// Errors raised while parsing or evaluating a CEL expression.
#[derive(Debug, Clone, Error)]
pub enum CelError {
    /// The expression text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// An operation was applied to values of the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// A referenced variable is not present in the activation.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Evaluation failed (division by zero, bad regex, unknown function).
    #[error("evaluation error: {0}")]
    Evaluation(String),
}
