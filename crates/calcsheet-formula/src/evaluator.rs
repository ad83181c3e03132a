use std::cmp::Ordering;

use calcsheet_core::{CellRange, CellValue};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{EvalError, EvalResult};
use crate::functions::math::scalar_number;
use crate::functions::{logical, lookup, math, Arg, Function};
use crate::parser::Formula;
use crate::resolver::Resolver;

/// Evaluator for formula AST
pub struct Evaluator<'a> {
    resolver: Resolver<'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(resolver: Resolver<'a>) -> Self {
        Self { resolver }
    }

    /// Evaluate a transformed formula; a formula that failed to parse is a
    /// `Syntax` failure here.
    pub fn evaluate_formula(&self, formula: &Formula) -> EvalResult<CellValue> {
        match formula.expr() {
            Ok(expr) => self.evaluate(expr),
            Err(err) => Err(EvalError::Syntax(err.to_string())),
        }
    }

    /// Evaluate an expression AST to a value
    pub fn evaluate(&self, expr: &Expr) -> EvalResult<CellValue> {
        match expr {
            Expr::Number(n) => Ok(CellValue::Number(*n)),
            Expr::String(s) => Ok(CellValue::Text(s.clone())),
            Expr::Boolean(b) => Ok(CellValue::Boolean(*b)),

            Expr::CellRef { sheet, addr } => self.resolver.resolve_cell(sheet.as_deref(), *addr),

            // Ranges are expanded by functions, not evaluated directly
            Expr::Range(range) => Err(EvalError::Value(format!(
                "range {} used where a single value is expected",
                range
            ))),

            Expr::Binary { left, op, right } => self.evaluate_binary(left, *op, right),

            Expr::Unary { op, operand } => self.evaluate_unary(*op, operand),

            Expr::FunctionCall { name, args } => self.evaluate_function(name, args),

            Expr::Grouped(inner) => self.evaluate(inner),
        }
    }

    fn evaluate_binary(&self, left: &Expr, op: BinaryOp, right: &Expr) -> EvalResult<CellValue> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match op {
            BinaryOp::Add => numeric_op(&left_val, &right_val, |a, b| a + b),
            BinaryOp::Sub => numeric_op(&left_val, &right_val, |a, b| a - b),
            BinaryOp::Mul => numeric_op(&left_val, &right_val, |a, b| a * b),
            BinaryOp::Div => {
                if scalar_number(&right_val)? == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    numeric_op(&left_val, &right_val, |a, b| a / b)
                }
            }
            BinaryOp::Pow => numeric_op(&left_val, &right_val, f64::powf),

            BinaryOp::Concat => Ok(CellValue::Text(format!(
                "{}{}",
                left_val.as_text(),
                right_val.as_text()
            ))),

            BinaryOp::Eq => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_eq())),
            BinaryOp::Ne => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_ne())),
            BinaryOp::Lt => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_lt())),
            BinaryOp::Gt => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_gt())),
            BinaryOp::Le => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_le())),
            BinaryOp::Ge => Ok(CellValue::Boolean(compare_values(&left_val, &right_val).is_ge())),
        }
    }

    fn evaluate_unary(&self, op: UnaryOp, operand: &Expr) -> EvalResult<CellValue> {
        let n = scalar_number(&self.evaluate(operand)?)?;

        Ok(CellValue::Number(match op {
            UnaryOp::Neg => -n,
            UnaryOp::Pos => n,
            UnaryOp::Percent => n / 100.0,
        }))
    }

    fn evaluate_function(&self, name: &str, args: &[Expr]) -> EvalResult<CellValue> {
        let function =
            Function::from_name(name).ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        function.check_arity(args.len())?;

        match function {
            Function::Sum => math::sum(&self.arguments(args)?),
            Function::Max => math::max(&self.arguments(args)?),
            Function::Min => math::min(&self.arguments(args)?),
            Function::Average => math::average(&self.arguments(args)?),
            Function::SumProduct => math::sumproduct(&self.arguments(args)?),
            Function::Round => math::round(&self.evaluate(&args[0])?, &self.evaluate(&args[1])?),

            // Only the taken branch is evaluated
            Function::If => {
                let condition = self.evaluate(&args[0])?;
                if condition.is_truthy() {
                    self.evaluate(&args[1])
                } else {
                    args.get(2)
                        .map_or(Ok(CellValue::Boolean(false)), |e| self.evaluate(e))
                }
            }

            Function::IfError => match self.evaluate(&args[0]) {
                Ok(value) => Ok(value),
                Err(_) => self.evaluate(&args[1]),
            },

            Function::And => Ok(logical::and(&self.arguments(args)?)),
            Function::Or => Ok(logical::or(&self.arguments(args)?)),
            Function::Not => Ok(logical::not(&self.evaluate(&args[0])?)),

            Function::CountIf => {
                let values = self.argument(&args[0])?;
                let criterion = self.evaluate(&args[1])?;
                Ok(logical::countif(&values, &criterion))
            }

            // The fourth (exact match) argument is accepted and not evaluated
            Function::VLookup => {
                let key = self.evaluate(&args[0])?;
                let table = self.table_argument(function, &args[1])?;
                let column = self.evaluate(&args[2])?;
                lookup::vlookup(&self.resolver, &key, &table, &column)
            }
        }
    }

    fn arguments(&self, args: &[Expr]) -> EvalResult<Vec<Arg>> {
        args.iter().map(|arg| self.argument(arg)).collect()
    }

    /// Resolve one function argument; ranges become lists
    fn argument(&self, expr: &Expr) -> EvalResult<Arg> {
        match expr {
            Expr::Range(range) => Ok(Arg::List(self.resolver.resolve_range(range)?)),
            other => Ok(Arg::Scalar(self.evaluate(other)?)),
        }
    }

    /// A table argument may be a range node or text holding a reference
    fn table_argument(&self, function: Function, expr: &Expr) -> EvalResult<CellRange> {
        match expr {
            Expr::Range(range) => Ok(range.clone()),
            Expr::CellRef { sheet, addr } => {
                let range = CellRange::new(*addr, *addr);
                Ok(match sheet {
                    Some(sheet) => range.with_sheet(sheet.clone()),
                    None => range,
                })
            }
            other => match self.evaluate(other)? {
                CellValue::Text(reference) => Ok(CellRange::parse(&reference)?),
                _ => Err(EvalError::NotARange(function.name())),
            },
        }
    }
}

fn numeric_op(
    left: &CellValue,
    right: &CellValue,
    op: impl Fn(f64, f64) -> f64,
) -> EvalResult<CellValue> {
    let result = op(scalar_number(left)?, scalar_number(right)?);
    if result.is_nan() || result.is_infinite() {
        Err(EvalError::Value("result is not a finite number".to_string()))
    } else {
        Ok(CellValue::Number(result))
    }
}

/// Numbers compare numerically (numeric text included), booleans as
/// booleans, everything else by case-insensitive string form. An empty
/// side reads as 0 against a number, as it does in arithmetic.
fn compare_values(left: &CellValue, right: &CellValue) -> Ordering {
    match (left, right) {
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
        _ => match (comparable_number(left, right), comparable_number(right, left)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => left
                .as_text()
                .to_lowercase()
                .cmp(&right.as_text().to_lowercase()),
        },
    }
}

fn comparable_number(value: &CellValue, other: &CellValue) -> Option<f64> {
    match value {
        CellValue::Empty if other.as_number().is_some() => Some(0.0),
        _ => value.as_number(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::transform;
    use calcsheet_core::{CellAddress, ValueStore, Workbook};

    fn addr(text: &str) -> CellAddress {
        CellAddress::parse(text).unwrap()
    }

    fn eval_with(store: &ValueStore, input: &str) -> EvalResult<CellValue> {
        let evaluator = Evaluator::new(Resolver::new(store));
        evaluator.evaluate_formula(&transform(input))
    }

    fn eval(input: &str) -> EvalResult<CellValue> {
        eval_with(&ValueStore::new(), input)
    }

    fn cities() -> ValueStore {
        [
            (addr("A2"), CellValue::text("Kazan")),
            (addr("B2"), CellValue::Number(80.0)),
            (addr("A3"), CellValue::text("Moscow")),
            (addr("B3"), CellValue::Number(120.0)),
            (addr("A4"), CellValue::text("Samara")),
            (addr("B4"), CellValue::Number(0.0)),
            (addr("A5"), CellValue::text("Tver")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1 + 2"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=2^3"), Ok(CellValue::Number(8.0)));
        assert_eq!(eval("=-2^2"), Ok(CellValue::Number(4.0)));
        assert_eq!(eval("=50%"), Ok(CellValue::Number(0.5)));
        assert_eq!(eval("=(1+2)*3"), Ok(CellValue::Number(9.0)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("=1/0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_empty_cells_are_zero_in_arithmetic() {
        assert_eq!(eval("=A1+5"), Ok(CellValue::Number(5.0)));
        assert!(matches!(eval("=\"abc\"+1"), Err(EvalError::Value(_))));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("=1 < 2"), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=\"10\" = 10"), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=\"abc\" = \"ABC\""), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=A1 = \"\""), Ok(CellValue::Boolean(true)));
    }

    #[test]
    fn test_empty_cell_compares_as_zero_against_numbers() {
        assert_eq!(eval("=A1 > -1"), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=A1 = 0"), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=0 = A1"), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=A1 < \"4,5\""), Ok(CellValue::Boolean(true)));
        assert_eq!(eval("=A1 = \"x\""), Ok(CellValue::Boolean(false)));
    }

    #[test]
    fn test_concat() {
        assert_eq!(eval("=\"Hello\" & \" \" & 42"), Ok(CellValue::text("Hello 42")));
    }

    #[test]
    fn test_sum_of_mixed_text() {
        let store: ValueStore = [
            (addr("A1"), CellValue::text("3")),
            (addr("A2"), CellValue::text("4,5")),
            (addr("A3"), CellValue::text("")),
            (addr("A4"), CellValue::text("x")),
        ]
        .into_iter()
        .collect();
        assert_eq!(eval_with(&store, "=SUM(A1:A4)"), Ok(CellValue::Number(7.5)));
        assert_eq!(eval_with(&store, "=SUM(A1:A4, 10, A1)"), Ok(CellValue::Number(20.5)));
    }

    #[test]
    fn test_aggregates_without_arguments() {
        assert_eq!(eval("=SUM()"), Ok(CellValue::Number(0.0)));
        assert_eq!(eval("=MAX()"), Ok(CellValue::Number(0.0)));
        assert_eq!(eval("=MIN( )"), Ok(CellValue::Number(0.0)));
        assert!(matches!(eval("=AVERAGE()"), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn test_if_function() {
        assert_eq!(eval("=IF(TRUE, \"A\", \"B\")"), Ok(CellValue::text("A")));
        assert_eq!(eval("=IF(0, \"A\", \"B\")"), Ok(CellValue::text("B")));
        assert_eq!(eval("=IF(1>2, \"A\")"), Ok(CellValue::Boolean(false)));
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        assert_eq!(eval("=IF(TRUE, 1, 1/0)"), Ok(CellValue::Number(1.0)));
    }

    #[test]
    fn test_iferror() {
        assert_eq!(eval("=IFERROR(1/0, \"fallback\")"), Ok(CellValue::text("fallback")));
        assert_eq!(eval("=IFERROR(NOPE(1), 7)"), Ok(CellValue::Number(7.0)));
        // Empty and zero pass through unchanged
        assert_eq!(eval("=IFERROR(A1, 7)"), Ok(CellValue::Empty));
        assert_eq!(eval("=IFERROR(0, 7)"), Ok(CellValue::Number(0.0)));
    }

    #[test]
    fn test_vlookup() {
        let store = cities();
        assert_eq!(
            eval_with(&store, "=VLOOKUP(\"Moscow\", \"A2:C5\", 2)"),
            Ok(CellValue::Number(120.0))
        );
        assert_eq!(
            eval_with(&store, "=VLOOKUP(\"Moscow\", $A$2:$C$5, 2, FALSE)"),
            Ok(CellValue::Number(120.0))
        );
        assert!(matches!(
            eval_with(&store, "=VLOOKUP(\"Unknown\", \"A2:C5\", 2)"),
            Err(EvalError::NotFound(_))
        ));
        assert_eq!(
            eval_with(&store, "=IFERROR(VLOOKUP(\"Unknown\", \"A2:C5\", 2), 0)"),
            Ok(CellValue::Number(0.0))
        );
        // A found zero is not an error
        assert_eq!(
            eval_with(&store, "=IFERROR(VLOOKUP(\"Samara\", A2:C5, 2), 99)"),
            Ok(CellValue::Number(0.0))
        );
        // Found key with an empty target
        assert_eq!(eval_with(&store, "=VLOOKUP(\"Tver\", A2:C5, 2)"), Ok(CellValue::Empty));
        assert_eq!(eval_with(&store, "=VLOOKUP(\"Kazan\", A2:C5, 9)"), Ok(CellValue::Empty));
    }

    #[test]
    fn test_vlookup_requires_table() {
        assert_eq!(
            eval("=VLOOKUP(1, 5, 2)"),
            Err(EvalError::NotARange("VLOOKUP"))
        );
    }

    #[test]
    fn test_vlookup_cross_sheet() {
        let store: ValueStore = [(addr("E22"), CellValue::text("Kazan"))].into_iter().collect();
        let mut book = Workbook::new();
        book.insert_sheet("City reach", cities());
        let resolver = Resolver::new(&store).with_workbook(&book).with_sheet("Calc");
        let evaluator = Evaluator::new(resolver);

        let formula = transform("=VLOOKUP($E$22,'[1]City reach'!$A$2:$C$90,2,FALSE)");
        assert_eq!(evaluator.evaluate_formula(&formula), Ok(CellValue::Number(80.0)));

        let formula = transform("=SUM('City reach'!B2:B4)+'City reach'!B3");
        assert_eq!(evaluator.evaluate_formula(&formula), Ok(CellValue::Number(320.0)));

        let formula = transform("=Lists!A1");
        assert_eq!(
            evaluator.evaluate_formula(&formula),
            Err(EvalError::UnknownSheet("Lists".to_string()))
        );
    }

    #[test]
    fn test_countif() {
        let store: ValueStore = [
            (addr("A1"), CellValue::text("Radio")),
            (addr("A2"), CellValue::text("TV")),
            (addr("A3"), CellValue::text("Radio")),
        ]
        .into_iter()
        .collect();
        assert_eq!(eval_with(&store, "=COUNTIF(A1:A3, \"Radio\")"), Ok(CellValue::Number(2.0)));
        assert_eq!(eval_with(&store, "=COUNTIF(A2, \"TV\")"), Ok(CellValue::Number(1.0)));
    }

    #[test]
    fn test_failures() {
        assert_eq!(eval("=FOO(1)"), Err(EvalError::UnknownFunction("FOO".to_string())));
        assert!(matches!(eval("=SUM(1"), Err(EvalError::Syntax(_))));
        assert!(matches!(eval("=NOT(1, 2)"), Err(EvalError::Arity { .. })));
        assert!(matches!(eval("=A1:A3"), Err(EvalError::Value(_))));
    }

    #[test]
    fn test_case_insensitive_names_and_booleans() {
        assert_eq!(eval("=if(true, 1, 2)"), Ok(CellValue::Number(1.0)));
        assert_eq!(eval("=And(TRUE, False)"), Ok(CellValue::Boolean(false)));
        assert_eq!(eval("=ROUND(2.5, 0)"), Ok(CellValue::Number(3.0)));
        assert_eq!(eval("=SUMPRODUCT(2, 3)"), Ok(CellValue::Number(6.0)));
    }
}
