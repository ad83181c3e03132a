//! Nom-based formula parser.
//!
//! Turns template formula text into an [`Expr`] tree. Before parsing, the
//! leading `=` is dropped and workbook-revision markers (`[1]` in
//! `'[1]City reach'!A2:C90`) are removed outside string literals. Boolean
//! literals are matched case-insensitively, known function names are
//! normalized to their canonical spelling, and cell tokens are only read as
//! addresses when they are not part of a longer identifier (`LOG10(` is a
//! call, not cell `LOG10`).
//!
//! Parsing never fails outright: [`transform`] keeps the error inside the
//! returned [`Formula`] and it surfaces when the formula is evaluated.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1, take_while_m_n},
    character::complete::{char, multispace0, one_of, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::ErrorKind,
    multi::{fold_many0, many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::functions::Function;
use calcsheet_core::{CellAddress, CellRange};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

// =============================================================================
// Formula
// =============================================================================

/// A transformed formula: the authored text plus its parsed tree, or the
/// reason it could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    parsed: Result<Expr, ParseError>,
}

impl Formula {
    /// Formula text as authored, including the leading `=`
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Result<&Expr, &ParseError> {
        self.parsed.as_ref()
    }

    /// Cells and ranges read by this formula (empty if it did not parse)
    pub fn references(&self) -> Vec<CellRange> {
        self.parsed.as_ref().map(Expr::references).unwrap_or_default()
    }
}

/// Transform formula source text into an evaluable [`Formula`].
pub fn transform(formula_text: &str) -> Formula {
    Formula {
        source: formula_text.to_string(),
        parsed: parse_formula(formula_text),
    }
}

/// Parse formula text (with or without the leading `=`) into an AST
pub fn parse_formula(formula_text: &str) -> Result<Expr, ParseError> {
    let trimmed = formula_text.trim();
    let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let body = strip_revision_markers(body);

    match parse_expression(&body) {
        Ok((remaining, expr)) => {
            // Check that all input was consumed
            let remaining = remaining.trim();
            if remaining.is_empty() {
                Ok(expr)
            } else {
                Err(ParseError {
                    message: format!("Unexpected input: '{}'", remaining),
                    position: body.len() - remaining.len(),
                })
            }
        }
        Err(e) => Err(ParseError {
            message: format!("Parse error: {:?}", e),
            position: 0,
        }),
    }
}

/// Drop `[...]` workbook-revision markers that sit outside string literals
fn strip_revision_markers(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    let mut in_marker = false;

    for c in body.chars() {
        match c {
            '"' if !in_marker => {
                in_string = !in_string;
                out.push(c);
            }
            '[' if !in_string => in_marker = true,
            ']' if in_marker => in_marker = false,
            _ if in_marker => {}
            _ => out.push(c),
        }
    }

    out
}

// =============================================================================
// Helper Combinators
// =============================================================================

/// Skip whitespace
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Succeeds (consuming nothing) when the next char cannot continue a name
fn name_boundary(input: &str) -> IResult<&str, ()> {
    not(satisfy(|c| is_ident_char(c) || c == '(' || c == '!'))(input)
}

/// Parse a decimal number (integer or float)
fn parse_number(input: &str) -> IResult<&str, Expr> {
    let (rest, num_str) = recognize(tuple((
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt(tuple((
            one_of("eE"),
            opt(one_of("+-")),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)?;

    match num_str.parse::<f64>() {
        Ok(num) => Ok((rest, Expr::Number(num))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Float))),
    }
}

/// Parse a string literal (double-quoted, `""` escapes a quote)
fn parse_string(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = input.chars().peekable();
    let mut consumed = 0;

    loop {
        match chars.next() {
            Some('"') => {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    result.push('"');
                    chars.next();
                    consumed += 2;
                } else {
                    consumed += 1;
                    break;
                }
            }
            Some(c) => {
                result.push(c);
                consumed += c.len_utf8();
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    ErrorKind::Char,
                )));
            }
        }
    }

    Ok((&input[consumed..], Expr::String(result)))
}

/// Parse a boolean literal, case-insensitively
fn parse_boolean(input: &str) -> IResult<&str, Expr> {
    terminated(
        alt((
            value(Expr::Boolean(true), tag_no_case("TRUE")),
            value(Expr::Boolean(false), tag_no_case("FALSE")),
        )),
        name_boundary,
    )(input)
}

/// Parse a single address token (`A1`, `$B$2`, `ZZZ10`)
fn parse_address(input: &str) -> IResult<&str, CellAddress> {
    let (rest, text) = recognize(tuple((
        opt(char('$')),
        take_while_m_n(1, 3, |c: char| c.is_ascii_uppercase()),
        opt(char('$')),
        take_while1(|c: char| c.is_ascii_digit()),
    )))(input)?;
    let (rest, _) = name_boundary(rest)?;

    match CellAddress::parse(text) {
        Ok(addr) => Ok((rest, addr)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Verify))),
    }
}

/// Parse a sheet name (quoted or unquoted)
/// Examples: Lists, 'City reach', 'Sheet''s Data'
fn parse_sheet_name(input: &str) -> IResult<&str, String> {
    alt((
        // Quoted sheet name: 'Sheet Name' or 'Sheet''s Data'
        map(
            delimited(
                char('\''),
                recognize(many0(alt((
                    take_while1(|c: char| c != '\''),
                    tag("''"),
                )))),
                char('\''),
            ),
            |s: &str| s.replace("''", "'"),
        ),
        // Unquoted sheet name
        map(take_while1(is_ident_char), |s: &str| s.to_string()),
    ))(input)
}

/// Parse a cell or range reference with an optional `Sheet!` qualifier
fn parse_reference(input: &str) -> IResult<&str, Expr> {
    let (input, sheet) = opt(terminated(parse_sheet_name, char('!')))(input)?;
    let (input, start) = parse_address(input)?;
    let (input, end) = opt(preceded(ws(char(':')), parse_address))(input)?;

    let expr = match end {
        Some(end) => {
            let range = CellRange::new(start, end);
            Expr::Range(match sheet {
                Some(sheet) => range.with_sheet(sheet),
                None => range,
            })
        }
        None => Expr::CellRef { sheet, addr: start },
    };

    Ok((input, expr))
}

/// Parse a function call; known names are normalized to canonical casing
fn parse_function_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = take_while1(is_ident_char)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;

    let (input, args) = separated_list0(ws(alt((char(','), char(';')))), parse_expression)(input)?;

    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;

    let name = match Function::from_name(name) {
        Some(function) => function.name().to_string(),
        None => name.to_string(),
    };

    Ok((input, Expr::FunctionCall { name, args }))
}

// =============================================================================
// Operator Parsers
// =============================================================================

fn parse_comparison_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Ne, tag("<>")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        value(BinaryOp::Eq, tag("=")),
    ))(input)
}

fn parse_additive_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    ))(input)
}

fn parse_multiplicative_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
    ))(input)
}

fn parse_concat_op(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::Concat, char('&'))(input)
}

// =============================================================================
// Expression Parsers (Precedence Climbing)
// =============================================================================

/// Parse a primary expression (literals, references, function calls, parentheses)
fn parse_primary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;

    alt((
        map(
            delimited(char('('), parse_expression, preceded(multispace0, char(')'))),
            |e| Expr::Grouped(Box::new(e)),
        ),
        parse_string,
        parse_number,
        parse_boolean,
        parse_reference,
        parse_function_call,
    ))(input)
}

/// Parse a postfix expression (percent)
fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = parse_primary(input)?;
    let (input, _) = multispace0(input)?;

    let (input, percents) = many0(terminated(char('%'), multispace0))(input)?;

    let result = percents
        .into_iter()
        .fold(expr, |acc, _| Expr::unary(UnaryOp::Percent, acc));

    Ok((input, result))
}

/// Parse a unary expression (prefix - or +)
fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;

    alt((
        map(pair(char('-'), parse_unary), |(_, e)| Expr::unary(UnaryOp::Neg, e)),
        map(pair(char('+'), parse_unary), |(_, e)| Expr::unary(UnaryOp::Pos, e)),
        parse_postfix,
    ))(input)
}

/// Parse power expressions (right-associative)
fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_unary(input)?;
    let (input, _) = multispace0(input)?;

    if let Ok((input, _)) = char::<&str, nom::error::Error<&str>>('^')(input) {
        let (input, exp) = parse_power(input)?;
        Ok((input, Expr::binary(base, BinaryOp::Pow, exp)))
    } else {
        Ok((input, base))
    }
}

/// Parse multiplicative expressions (*, /)
fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_power(input)?;

    fold_many0(
        pair(ws(parse_multiplicative_op), parse_power),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse additive expressions (+, -)
fn parse_additive(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_multiplicative(input)?;

    fold_many0(
        pair(ws(parse_additive_op), parse_multiplicative),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse concatenation expressions (&)
fn parse_concat(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_additive(input)?;

    fold_many0(
        pair(ws(parse_concat_op), parse_additive),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse comparison expressions (=, <>, <, >, <=, >=)
fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_concat(input)?;

    fold_many0(
        pair(ws(parse_comparison_op), parse_concat),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse a complete expression
pub fn parse_expression(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    parse_comparison(input)
}

// =============================================================================
// Tests
// =============================================================================
