use thiserror::Error;

/// Errors raised at the address/template boundary.
///
/// These are authoring errors in the template (a formula cell placed at an
/// address that does not parse, a block declared with a broken range) and are
/// never produced while recalculating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Text does not match `[A-Z]{1,3}[0-9]+` after stripping `$` markers
    #[error("Malformed cell address: {0}")]
    MalformedAddress(String),

    /// Text is not a `A1:B2` style range (optionally sheet-qualified)
    #[error("Malformed range: {0}")]
    MalformedRange(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
