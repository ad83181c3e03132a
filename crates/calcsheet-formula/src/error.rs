use calcsheet_core::CoreError;
use thiserror::Error;

/// Why one formula failed to evaluate.
///
/// These never escape the recalculation engine: a failing cell reads as
/// empty, and only `IFERROR` can observe the failure itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{0} requires a range argument")]
    NotARange(&'static str),

    #[error("Invalid reference: {0}")]
    Reference(String),

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("Invalid value: {0}")]
    Value(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Lookup value not found: {0}")]
    NotFound(String),
}

impl From<CoreError> for EvalError {
    fn from(err: CoreError) -> Self {
        EvalError::Reference(err.to_string())
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
