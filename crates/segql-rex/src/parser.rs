//! Pest-based parser for row expressions

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;
use crate::rex::LiteralValue;

#[derive(Parser)]
#[grammar = "rex.pest"]
pub struct RexParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Pest error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
}

/// Parse expression text into the untyped AST
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut pairs = RexParser::parse(Rule::expression, source).map_err(Box::new)?;
    let root = pairs.next().ok_or_else(|| syntax("Empty input"))?;
    let expr = root
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| syntax("Missing expression"))?;
    parse_expr(expr)
}

fn syntax(message: impl Into<String>) -> ParseError {
    ParseError::Syntax(message.into())
}

fn first_inner(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>, ParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| syntax(format!("Empty {rule:?}")))
}

fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr | Rule::primary => parse_expr(first_inner(pair)?),
        Rule::or_expr => fold_binary(pair, Rule::and_expr, BinOp::Or),
        Rule::and_expr => fold_binary(pair, Rule::not_expr, BinOp::And),
        Rule::concat_expr => fold_binary(pair, Rule::primary, BinOp::Concat),
        Rule::not_expr => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(|| syntax("Empty NOT expression"))?;
            if first.as_rule() == Rule::not_op {
                let operand = inner.next().ok_or_else(|| syntax("NOT without operand"))?;
                Ok(Expr::UnaryOp {
                    op: UnOp::Not,
                    expr: Box::new(parse_expr(operand)?),
                })
            } else {
                parse_expr(first)
            }
        }
        Rule::predicate => parse_predicate(pair),
        Rule::literal => parse_literal(pair),
        Rule::column => parse_column(pair),
        Rule::func_call => parse_func_call(pair),
        rule => Err(syntax(format!("Cannot parse expr: {rule:?}"))),
    }
}

/// Left-associative fold over `operand (op operand)*`
fn fold_binary(pair: Pair<'_, Rule>, operand_rule: Rule, op: BinOp) -> Result<Expr, ParseError> {
    let mut operands = pair.into_inner().filter(|p| p.as_rule() == operand_rule);
    let first = operands.next().ok_or_else(|| syntax("Missing operand"))?;
    let mut left = parse_expr(first)?;
    for next in operands {
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(parse_expr(next)?),
        };
    }
    Ok(left)
}

fn parse_predicate(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let left = parse_expr(inner.next().ok_or_else(|| syntax("Empty predicate"))?)?;

    let Some(tail) = inner.next() else {
        return Ok(left);
    };

    match tail.as_rule() {
        Rule::null_test => {
            let negated = tail.into_inner().any(|p| p.as_rule() == Rule::negation);
            Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            })
        }
        Rule::like_test => {
            let mut negated = false;
            let mut pattern = None;
            let mut escape = None;
            for part in tail.into_inner() {
                match part.as_rule() {
                    Rule::negation => negated = true,
                    Rule::concat_expr => pattern = Some(parse_expr(part)?),
                    Rule::string => escape = Some(unquote(part.as_str(), '\'')),
                    _ => {}
                }
            }
            Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern.ok_or_else(|| syntax("LIKE without pattern"))?),
                escape,
                negated,
            })
        }
        Rule::comparison => {
            let mut parts = tail.into_inner();
            let op_pair = parts.next().ok_or_else(|| syntax("Missing comparison operator"))?;
            let right = parts.next().ok_or_else(|| syntax("Missing right operand"))?;
            let op = match op_pair.as_str() {
                "=" => BinOp::Eq,
                "<>" | "!=" => BinOp::Ne,
                "<" => BinOp::Lt,
                "<=" => BinOp::Le,
                ">" => BinOp::Gt,
                ">=" => BinOp::Ge,
                other => return Err(syntax(format!("Unknown operator: {other}"))),
            };
            Ok(Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(parse_expr(right)?),
            })
        }
        rule => Err(syntax(format!("Invalid predicate: {rule:?}"))),
    }
}

fn parse_literal(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let inner = first_inner(pair)?;
    let text = inner.as_str();
    let value = match inner.as_rule() {
        Rule::null_literal => LiteralValue::Null,
        Rule::boolean => LiteralValue::Boolean(text.eq_ignore_ascii_case("true")),
        Rule::int => LiteralValue::Integer(
            text.parse()
                .map_err(|_| syntax(format!("Integer out of range: {text}")))?,
        ),
        Rule::decimal => LiteralValue::Double(
            text.parse()
                .map_err(|_| syntax(format!("Invalid number: {text}")))?,
        ),
        Rule::string => LiteralValue::String(unquote(text, '\'')),
        rule => return Err(syntax(format!("Invalid literal: {rule:?}"))),
    };
    Ok(Expr::Literal(value))
}

fn parse_column(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let inner = first_inner(pair)?;
    let name = match inner.as_rule() {
        Rule::quoted_identifier => unquote(inner.as_str(), '"'),
        _ => inner.as_str().to_string(),
    };
    Ok(Expr::Column(name))
}

fn parse_func_call(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| syntax("Function without name"))?
        .as_str()
        .to_string();
    let args = inner.map(parse_expr).collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::FuncCall(FuncCall { name, args }))
}

/// Strip surrounding quotes and collapse doubled quote characters
fn unquote(text: &str, quote: char) -> String {
    let body = &text[1..text.len() - 1];
    let doubled: String = [quote, quote].iter().collect();
    body.replace(&doubled, &quote.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Box<Expr> {
        Box::new(Expr::Column(name.to_string()))
    }

    #[test]
    fn test_parse_function_call() {
        let expr = parse("REGEXP_LIKE(url, '^https://')").unwrap();
        assert_eq!(
            expr,
            Expr::FuncCall(FuncCall {
                name: "REGEXP_LIKE".to_string(),
                args: vec![
                    Expr::Column("url".to_string()),
                    Expr::Literal(LiteralValue::String("^https://".to_string())),
                ],
            })
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a = 1 OR b = 2 AND c = 3").unwrap();
        match expr {
            Expr::BinaryOp { op: BinOp::Or, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: BinOp::And, .. }));
            }
            other => panic!("expected OR at the root, got {other:?}"),
        }
    }

    #[test]
    fn test_not_like_with_escape() {
        let expr = parse("name NOT LIKE 'a!%%' ESCAPE '!'").unwrap();
        assert_eq!(
            expr,
            Expr::Like {
                expr: column("name"),
                pattern: Box::new(Expr::Literal(LiteralValue::String("a!%%".to_string()))),
                escape: Some("!".to_string()),
                negated: true,
            }
        );
    }

    #[test]
    fn test_is_not_null_and_keywords_in_identifiers() {
        let expr = parse("nullable_col IS NOT NULL").unwrap();
        assert_eq!(
            expr,
            Expr::IsNull {
                expr: column("nullable_col"),
                negated: true,
            }
        );
        assert!(matches!(parse("orders <> 'x'").unwrap(), Expr::BinaryOp { op: BinOp::Ne, .. }));
    }

    #[test]
    fn test_quoted_identifier_and_string_escapes() {
        let expr = parse(r#""my ""col""" = 'it''s'"#).unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinOp::Eq,
                left: column("my \"col\""),
                right: Box::new(Expr::Literal(LiteralValue::String("it's".to_string()))),
            }
        );
    }

    #[test]
    fn test_concat_chain() {
        let expr = parse("a || '-' || b").unwrap();
        match expr {
            Expr::BinaryOp { op: BinOp::Concat, left, right } => {
                assert!(matches!(*left, Expr::BinaryOp { op: BinOp::Concat, .. }));
                assert_eq!(right, column("b"));
            }
            other => panic!("expected concat, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(parse("REGEXP_LIKE(url,").is_err());
        assert!(parse("").is_err());
    }
}
