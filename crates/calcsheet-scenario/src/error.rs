use calcsheet_core::CoreError;
use thiserror::Error;

use crate::scenario::ScenarioId;

/// Template and scenario errors
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Template error: {0}")]
    Core(#[from] CoreError),

    #[error("Cell {0} is defined both as a literal and as a formula")]
    DuplicateCell(String),

    #[error("Cell {0} is not an input cell")]
    ReadOnlyCell(String),

    #[error("Cell {0} is outside every working block")]
    OutsideBlocks(String),

    #[error("Unknown working block: {0}")]
    UnknownBlock(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(ScenarioId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
