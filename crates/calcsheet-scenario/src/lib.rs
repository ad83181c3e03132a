pub mod error;
pub mod scenario;
pub mod template;

pub use error::{ScenarioError, ScenarioResult};
pub use scenario::{Scenario, ScenarioId, ScenarioRegistry};
pub use template::{ClassSource, Template, TemplateSource, DEFAULT_SHEET};
