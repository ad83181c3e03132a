pub mod logical;
pub mod lookup;
pub mod math;

use calcsheet_core::CellValue;

use crate::error::{EvalError, EvalResult};

/// The closed set of functions a formula may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sum,
    Max,
    Min,
    Average,
    Round,
    SumProduct,
    If,
    IfError,
    And,
    Or,
    Not,
    CountIf,
    VLookup,
}

impl Function {
    pub const ALL: [Function; 13] = [
        Function::Sum,
        Function::Max,
        Function::Min,
        Function::Average,
        Function::Round,
        Function::SumProduct,
        Function::If,
        Function::IfError,
        Function::And,
        Function::Or,
        Function::Not,
        Function::CountIf,
        Function::VLookup,
    ];

    /// Look up a function by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Canonical (upper-case) name
    pub fn name(self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Average => "AVERAGE",
            Function::Round => "ROUND",
            Function::SumProduct => "SUMPRODUCT",
            Function::If => "IF",
            Function::IfError => "IFERROR",
            Function::And => "AND",
            Function::Or => "OR",
            Function::Not => "NOT",
            Function::CountIf => "COUNTIF",
            Function::VLookup => "VLOOKUP",
        }
    }

    /// Check the argument count, returning an `Arity` failure if it is off
    pub fn check_arity(self, got: usize) -> EvalResult<()> {
        let (min, max, expected) = match self {
            Function::Sum | Function::Max | Function::Min => (0, usize::MAX, "any number of"),
            Function::Average | Function::And | Function::Or | Function::SumProduct => {
                (1, usize::MAX, "at least 1")
            }
            Function::Round | Function::IfError | Function::CountIf => (2, 2, "2"),
            Function::If => (2, 3, "2 or 3"),
            Function::Not => (1, 1, "1"),
            Function::VLookup => (3, 4, "3 or 4"),
        };

        if got < min || got > max {
            return Err(EvalError::Arity {
                function: self.name(),
                expected,
                got,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved function argument: one scalar, or the values of a range
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Scalar(CellValue),
    List(Vec<CellValue>),
}

impl Arg {
    /// View the argument as a list; a scalar becomes a one-element list
    pub fn values(&self) -> &[CellValue] {
        match self {
            Arg::Scalar(value) => std::slice::from_ref(value),
            Arg::List(values) => values,
        }
    }
}

/// Flatten every argument into one sequence of scalars
pub fn flatten(args: &[Arg]) -> impl Iterator<Item = &CellValue> {
    args.iter().flat_map(Arg::values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(Function::from_name("vlookup"), Some(Function::VLookup));
        assert_eq!(Function::from_name("IfError"), Some(Function::IfError));
        assert_eq!(Function::from_name("SUMIF"), None);
    }

    #[test]
    fn test_names_roundtrip() {
        for function in Function::ALL {
            assert_eq!(Function::from_name(function.name()), Some(function));
        }
    }

    #[test]
    fn test_arity() {
        assert!(Function::If.check_arity(3).is_ok());
        assert!(Function::If.check_arity(2).is_ok());
        assert_eq!(
            Function::If.check_arity(4),
            Err(EvalError::Arity {
                function: "IF",
                expected: "2 or 3",
                got: 4
            })
        );
        assert!(Function::Sum.check_arity(0).is_ok());
        assert!(Function::Max.check_arity(0).is_ok());
        assert!(Function::Average.check_arity(0).is_err());
        assert!(Function::VLookup.check_arity(2).is_err());
    }

    #[test]
    fn test_flatten_mixes_scalars_and_lists() {
        let args = vec![
            Arg::Scalar(CellValue::Number(1.0)),
            Arg::List(vec![CellValue::Number(2.0), CellValue::Empty]),
        ];
        assert_eq!(flatten(&args).count(), 3);
    }
}
