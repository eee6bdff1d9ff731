//! Recursive-descent arithmetic parser over an already token-encoded
//! formula (spec §4.7). Grammar:
//!
//! ```text
//! expr   ::= term (('+' | '-') term)*
//! term   ::= factor (('*' | '/') factor)*
//! factor ::= '(' expr ')' | ident
//! ident  ::= [A-Za-z0-9_]+
//! ```
//!
//! Modeled on the filter-parser crate's style: a `nom_locate` span for
//! error locations, a `ws` whitespace-stripping combinator, and a
//! depth-guarded descent through parenthesized groups so a pathological
//! formula can't blow the call stack.

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0};
use nom::combinator::{cut, map};
use nom::error::{Error as NomError, ErrorKind};
use nom::sequence::delimited;
use nom::{Finish, IResult};
use nom_locate::LocatedSpan;

use obs_types::ObsError;

use crate::ast::{Expr, Op};

pub type Span<'a> = LocatedSpan<&'a str>;

const MAX_FORMULA_DEPTH: u8 = 32;

fn ws<'a, F, O>(mut inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, O>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, O>,
{
    move |input| {
        let (input, _) = multispace0(input)?;
        let (input, out) = inner(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, out))
    }
}

fn ident(input: Span) -> IResult<Span, Span> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_node(input: Span) -> IResult<Span, Expr> {
    map(ident, |span: Span| Expr::Node(span.fragment().to_string()))(input)
}

fn parse_factor(depth: u8, input: Span) -> IResult<Span, Expr> {
    if depth == 0 {
        return Err(nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge)));
    }
    ws(alt((
        delimited(ws(char('(')), move |i| parse_expr(depth - 1, i), cut(ws(char(')')))),
        parse_node,
    )))(input)
}

fn parse_term(depth: u8, input: Span) -> IResult<Span, Expr> {
    let (mut input, mut lhs) = parse_factor(depth, input)?;
    loop {
        let mut op = ws(alt((map(char('*'), |_| Op::Mul), map(char('/'), |_| Op::Div))));
        match op(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = parse_factor(depth, rest)?;
                lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
                input = rest;
            }
            Err(_) => break,
        }
    }
    Ok((input, lhs))
}

fn parse_expr(depth: u8, input: Span) -> IResult<Span, Expr> {
    let (mut input, mut lhs) = parse_term(depth, input)?;
    loop {
        let mut op = ws(alt((map(char('+'), |_| Op::Add), map(char('-'), |_| Op::Sub))));
        match op(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = parse_term(depth, rest)?;
                lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
                input = rest;
            }
            Err(_) => break,
        }
    }
    Ok((input, lhs))
}

/// Parses one already-encoded formula into an expression tree, or a
/// typed parse error.
pub fn parse(encoded: &str) -> Result<Expr, ObsError> {
    let span = Span::new(encoded);
    let (remainder, expr) =
        parse_expr(MAX_FORMULA_DEPTH, span).finish().map_err(|e| {
            ObsError::invalid_argument(format!("malformed formula at offset {}: {:?}", e.input.location_offset(), e.code))
        })?;
    let trailing = remainder.fragment().trim();
    if !trailing.is_empty() {
        return Err(ObsError::invalid_argument(format!("unexpected trailing input in formula: '{trailing}'")));
    }
    Ok(expr)
}
