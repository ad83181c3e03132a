pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod recalc;
pub mod resolver;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use dependency::DependencyGraph;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use functions::{Arg, Function};
pub use parser::{parse_formula, transform, Formula, ParseError};
pub use recalc::{
    FormulaCell, FormulaSet, RecalcOptions, RecalcReport, Recalculator, DEFAULT_MAX_PASSES,
};
pub use resolver::Resolver;

use calcsheet_core::{CellValue, ValueStore};

/// Transform and evaluate a single formula against a value store.
///
/// Any failure reads as an empty value, the way a failing cell displays.
pub fn evaluate_formula(formula_text: &str, store: &ValueStore) -> CellValue {
    let formula = transform(formula_text);
    Evaluator::new(Resolver::new(store))
        .evaluate_formula(&formula)
        .unwrap_or_default()
}

/// Recalculate `formulas` over `store` with default options
pub fn recalculate(formulas: &FormulaSet, store: &mut ValueStore) -> RecalcReport {
    Recalculator::new().run(formulas, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsheet_core::CellAddress;

    #[test]
    fn test_evaluate_formula_collapses_failures() {
        let mut store = ValueStore::new();
        store.set(CellAddress::parse("A1").unwrap(), 2.0);

        assert_eq!(evaluate_formula("=A1*21", &store), CellValue::Number(42.0));
        assert_eq!(evaluate_formula("=A1/0", &store), CellValue::Empty);
        assert_eq!(evaluate_formula("=VLOOKUP(\"x\", A1:B2, 2)", &store), CellValue::Empty);
    }

    #[test]
    fn test_recalculate_with_defaults() {
        let mut store = ValueStore::new();
        let formulas: FormulaSet = [(CellAddress::parse("B1").unwrap(), "=1+1")]
            .into_iter()
            .collect();

        let report = recalculate(&formulas, &mut store);
        assert!(report.converged);
        assert_eq!(store.get(CellAddress::parse("B1").unwrap()), &CellValue::Number(2.0));
    }
}
