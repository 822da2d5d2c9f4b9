//! Recursive descent parser for the CEL expression subset.
//!
//! `nom` handles token-level recognition; operator precedence is climbed
//! manually, one function per level. The output is the [`Expr`] tree.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, recognize},
    multi::separated_list0,
    sequence::{delimited, tuple},
};

use crate::error::CelError;
use crate::expr::{BinaryOp, Expr, UnaryOp};

/// Parse a complete expression string.
///
/// Fails with [`CelError::Parse`] on malformed input or trailing tokens.
pub fn parse_expr(input: &str) -> Result<Expr, CelError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CelError::Parse("empty expression".to_owned()));
    }
    let (rest, expr) =
        parse_ternary(input).map_err(|e| CelError::Parse(format!("expression: {e}")))?;
    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(CelError::Parse(format!("trailing input: {rest:?}")));
    }
    Ok(expr)
}

/// Consume optional whitespace around a parser.
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn err(input: &str, kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

// ---------------------------------------------------------------------------
// Atoms
// ---------------------------------------------------------------------------

fn parse_atom(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        parse_keyword_literal,
        parse_number,
        parse_string_literal,
        parse_list_literal,
        parse_map_literal,
        parse_paren,
        parse_call_or_ident,
    ))(input)
}

/// `null`, `true`, and `false`, rejecting identifier prefixes such as
/// `nullable`.
fn parse_keyword_literal(input: &str) -> IResult<&str, Expr> {
    let (rest, word) = alt((tag("null"), tag("true"), tag("false")))(input)?;
    if rest
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(err(input, nom::error::ErrorKind::Tag));
    }
    let expr = match word {
        "null" => Expr::Null,
        "true" => Expr::Bool(true),
        _ => Expr::Bool(false),
    };
    Ok((rest, expr))
}

/// Unsigned numeric literal. A leading `-` belongs to the unary layer.
fn parse_number(input: &str) -> IResult<&str, Expr> {
    let (rest, num) = recognize(tuple((
        take_while1(|c: char| c.is_ascii_digit()),
        opt(tuple((
            char('.'),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)?;
    if num.contains('.') {
        let f: f64 = num
            .parse()
            .map_err(|_| err(input, nom::error::ErrorKind::Float))?;
        Ok((rest, Expr::Float(f)))
    } else {
        let i: i64 = num
            .parse()
            .map_err(|_| err(input, nom::error::ErrorKind::Digit))?;
        Ok((rest, Expr::Int(i)))
    }
}

/// Double-quoted string literal with `\n`, `\t`, `\\`, and `\"` escapes.
fn parse_string_literal(input: &str) -> IResult<&str, Expr> {
    let (body, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = body.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[pos + 1..], Expr::String(result))),
            '\\' => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => return Err(err(input, nom::error::ErrorKind::Char)),
            },
            _ => result.push(c),
        }
    }
    Err(err(input, nom::error::ErrorKind::Char))
}

fn parse_list_literal(input: &str) -> IResult<&str, Expr> {
    let (input, items) = delimited(
        char('['),
        separated_list0(ws(char(',')), parse_ternary),
        ws(char(']')),
    )(input)?;
    Ok((input, Expr::List(items)))
}

fn parse_map_literal(input: &str) -> IResult<&str, Expr> {
    let (input, entries) = delimited(
        char('{'),
        separated_list0(ws(char(',')), parse_map_entry),
        ws(char('}')),
    )(input)?;
    Ok((input, Expr::Map(entries)))
}

/// A map entry `key: value` where the key is a string literal or a bare
/// identifier.
fn parse_map_entry(input: &str) -> IResult<&str, (String, Expr)> {
    let (input, _) = multispace0(input)?;
    let (input, key) = alt((
        |i| {
            let (rest, expr) = parse_string_literal(i)?;
            match expr {
                Expr::String(s) => Ok((rest, s)),
                _ => Err(err(i, nom::error::ErrorKind::Tag)),
            }
        },
        |i| {
            let (rest, ident) = parse_ident_str(i)?;
            Ok((rest, ident.to_owned()))
        },
    ))(input)?;
    let (input, _) = ws(char(':'))(input)?;
    let (input, value) = parse_ternary(input)?;
    Ok((input, (key, value)))
}

fn parse_paren(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), ws(parse_ternary), char(')'))(input)
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
fn parse_ident_str(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    )))(input)
}

/// A function call (`size(...)`) or a plain identifier.
fn parse_call_or_ident(input: &str) -> IResult<&str, Expr> {
    let (rest, ident) = parse_ident_str(input)?;
    let (after_ws, _) = multispace0(rest)?;
    if after_ws.starts_with('(') {
        let (rest, args) = delimited(
            char('('),
            separated_list0(ws(char(',')), parse_ternary),
            ws(char(')')),
        )(after_ws)?;
        let name = match ident {
            // CEL spells length as `size`.
            "size" => "len",
            "int" => "to_int",
            "string" => "to_string",
            other => other,
        };
        return Ok((rest, Expr::Call(name.to_owned(), args)));
    }
    Ok((rest, Expr::Ident(ident.to_owned())))
}

// ---------------------------------------------------------------------------
// Postfix: field access, method calls, index access
// ---------------------------------------------------------------------------

fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = parse_atom(input)?;

    loop {
        let (next, _) = multispace0(input)?;

        if let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>('.')(next) {
            let (rest, _) = multispace0(rest)?;
            let (rest, field) = parse_ident_str(rest)?;
            let (after_ws, _) = multispace0(rest)?;
            if after_ws.starts_with('(') {
                let (rest, args) = delimited(
                    char('('),
                    separated_list0(ws(char(',')), parse_ternary),
                    ws(char(')')),
                )(after_ws)?;
                expr = method_call(expr, field, args);
                input = rest;
            } else {
                expr = Expr::Field(Box::new(expr), field.to_owned());
                input = rest;
            }
            continue;
        }

        if let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>('[')(next) {
            let (rest, index) = ws(parse_ternary)(rest)?;
            let (rest, _) = char(']')(rest)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
            input = rest;
            continue;
        }

        input = next;
        break;
    }

    Ok((input, expr))
}

/// Lower a method call onto the receiver. The CEL string predicates
/// become binary operators; anything else becomes a generic call with
/// the receiver as the first argument.
fn method_call(receiver: Expr, method: &str, mut args: Vec<Expr>) -> Expr {
    let binary = match (method, args.len()) {
        ("contains", 1) => Some(BinaryOp::Contains),
        ("startsWith", 1) => Some(BinaryOp::StartsWith),
        ("endsWith", 1) => Some(BinaryOp::EndsWith),
        ("matches", 1) => Some(BinaryOp::Matches),
        _ => None,
    };
    if let Some(op) = binary {
        let rhs = args.remove(0);
        return Expr::Binary(op, Box::new(receiver), Box::new(rhs));
    }
    if method == "size" && args.is_empty() {
        return Expr::Call("len".to_owned(), vec![receiver]);
    }
    let mut full = vec![receiver];
    full.append(&mut args);
    Expr::Call(method.to_owned(), full)
}

// ---------------------------------------------------------------------------
// Unary and binary precedence levels
// ---------------------------------------------------------------------------

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    if let Some(rest) = input.strip_prefix('!') {
        let (rest, operand) = parse_unary(rest)?;
        return Ok((rest, Expr::Unary(UnaryOp::Not, Box::new(operand))));
    }
    if let Some(rest) = input.strip_prefix('-') {
        let (rest, operand) = parse_unary(rest)?;
        return Ok((rest, Expr::Unary(UnaryOp::Neg, Box::new(operand))));
    }
    parse_postfix(input)
}

/// Climb one precedence level: repeatedly fold `next`-level operands
/// joined by any operator in `table`.
fn climb<'a>(
    input: &'a str,
    next: fn(&'a str) -> IResult<&'a str, Expr>,
    table: &[(&str, BinaryOp)],
) -> IResult<&'a str, Expr> {
    let (mut input, mut left) = next(input)?;
    'outer: loop {
        let (after_ws, _) = multispace0(input)?;
        for (symbol, op) in table {
            if let Some(rest) = after_ws.strip_prefix(symbol) {
                // Keyword operators must not swallow identifier prefixes
                // (`in` vs `instance`).
                if symbol.chars().all(char::is_alphanumeric)
                    && rest
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    continue;
                }
                let (rest, right) = next(rest)?;
                left = Expr::Binary(*op, Box::new(left), Box::new(right));
                input = rest;
                continue 'outer;
            }
        }
        input = after_ws;
        break;
    }
    Ok((input, left))
}

fn parse_mul(input: &str) -> IResult<&str, Expr> {
    climb(
        input,
        parse_unary,
        &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
    )
}

fn parse_add(input: &str) -> IResult<&str, Expr> {
    climb(input, parse_mul, &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)])
}

fn parse_relational(input: &str) -> IResult<&str, Expr> {
    // Two-character symbols must be tried before their one-character
    // prefixes.
    climb(
        input,
        parse_add,
        &[
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
            ("in", BinaryOp::In),
        ],
    )
}

fn parse_equality(input: &str) -> IResult<&str, Expr> {
    climb(
        input,
        parse_relational,
        &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    )
}

fn parse_and(input: &str) -> IResult<&str, Expr> {
    climb(input, parse_equality, &[("&&", BinaryOp::And)])
}

fn parse_or(input: &str) -> IResult<&str, Expr> {
    climb(input, parse_and, &[("||", BinaryOp::Or)])
}

fn parse_ternary(input: &str) -> IResult<&str, Expr> {
    let (input, cond) = parse_or(input)?;
    let (after_ws, _) = multispace0(input)?;
    if let Some(rest) = after_ws.strip_prefix('?') {
        let (rest, then_expr) = parse_ternary(rest)?;
        let (rest, _) = ws(char(':'))(rest)?;
        let (rest, else_expr) = parse_ternary(rest)?;
        return Ok((
            rest,
            Expr::Ternary(Box::new(cond), Box::new(then_expr), Box::new(else_expr)),
        ));
    }
    Ok((input, cond))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        assert!(matches!(parse_expr("null").unwrap(), Expr::Null));
        assert!(matches!(parse_expr("true").unwrap(), Expr::Bool(true)));
        assert!(matches!(parse_expr("42").unwrap(), Expr::Int(42)));
        assert!(matches!(parse_expr(r#""hi""#).unwrap(), Expr::String(s) if s == "hi"));
        match parse_expr("2.5").unwrap() {
            Expr::Float(f) => assert!((f - 2.5).abs() < f64::EPSILON),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn string_escapes() {
        assert!(
            matches!(parse_expr(r#""a\nb""#).unwrap(), Expr::String(s) if s == "a\nb")
        );
        assert!(
            matches!(parse_expr(r#""say \"hi\"""#).unwrap(), Expr::String(s) if s == "say \"hi\"")
        );
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        assert!(matches!(parse_expr("nullable").unwrap(), Expr::Ident(s) if s == "nullable"));
        assert!(matches!(parse_expr("trueish").unwrap(), Expr::Ident(s) if s == "trueish"));
    }

    #[test]
    fn index_and_field_access() {
        let expr = parse_expr(r#"alert_labels["severity"] == "critical""#).unwrap();
        let Expr::Binary(BinaryOp::Eq, lhs, _) = expr else {
            panic!("expected equality");
        };
        assert!(matches!(*lhs, Expr::Index(_, _)));

        let expr = parse_expr("alert.severity").unwrap();
        assert!(matches!(expr, Expr::Field(_, f) if f == "severity"));
    }

    #[test]
    fn method_calls_lower_to_binary() {
        let expr = parse_expr(r#"alert_summary.contains("disk")"#).unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::Contains, _, _)));

        let expr = parse_expr(r#"alert_id.startsWith("prom-")"#).unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::StartsWith, _, _)));

        let expr = parse_expr(r#"alert_summary.matches("disk|cpu")"#).unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::Matches, _, _)));
    }

    #[test]
    fn size_becomes_len() {
        let expr = parse_expr("size(alert_labels) > 0").unwrap();
        let Expr::Binary(BinaryOp::Gt, lhs, _) = expr else {
            panic!("expected comparison");
        };
        assert!(matches!(*lhs, Expr::Call(name, _) if name == "len"));
    }

    #[test]
    fn in_operator() {
        let expr = parse_expr(r#"alert_severity in ["high", "critical"]"#).unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::In, _, _)));
        // `instance` must stay an identifier.
        assert!(matches!(parse_expr("instance").unwrap(), Expr::Ident(_)));
    }

    #[test]
    fn precedence() {
        // && binds tighter than ||.
        let expr = parse_expr("a || b && c").unwrap();
        let Expr::Binary(BinaryOp::Or, _, rhs) = expr else {
            panic!("expected || at the top");
        };
        assert!(matches!(*rhs, Expr::Binary(BinaryOp::And, _, _)));

        // * binds tighter than +.
        let expr = parse_expr("1 + 2 * 3").unwrap();
        let Expr::Binary(BinaryOp::Add, _, rhs) = expr else {
            panic!("expected + at the top");
        };
        assert!(matches!(*rhs, Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn ternary() {
        let expr = parse_expr(r#"urgent ? "page" : "mail""#).unwrap();
        assert!(matches!(expr, Expr::Ternary(_, _, _)));
    }

    #[test]
    fn unary_minus_and_not() {
        assert!(matches!(
            parse_expr("-3").unwrap(),
            Expr::Unary(UnaryOp::Neg, _)
        ));
        assert!(matches!(
            parse_expr("!(a && b)").unwrap(),
            Expr::Unary(UnaryOp::Not, _)
        ));
        // Binary minus still parses.
        assert!(matches!(
            parse_expr("5 - 3").unwrap(),
            Expr::Binary(BinaryOp::Sub, _, _)
        ));
    }

    #[test]
    fn map_literal() {
        let expr = parse_expr(r#"{"a": 1, b: 2}"#).unwrap();
        let Expr::Map(entries) = expr else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, "b");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("a ==").is_err());
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr(r#""unterminated"#).is_err());
    }
}
