//! Syntax and bracket checks run before any evaluation.
use super::error::ExpressionError;
use super::scan::ARITHMETIC;
use once_cell::sync::Lazy;
use regex::Regex;

/// One or more tokens: `log(a;b)`, a literal with an optional `^literal`,
/// an arithmetic operator or bracket, or a `{n}` reference marker.
static GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:log\(\d+(?:\.\d+)?;\d+(?:\.\d+)?\)|\d+(?:\.\d+)?(?:\^\d+(?:\.\d+)?)?|[+\-*/()]|\{\d+\})+$",
    )
    .expect("grammar regex is valid")
});

/// Canonicalizes `raw` and checks it against the grammar.
///
/// Whitespace is removed and both `,` and `.` become `.`. The checks run in
/// a fixed order: empty input, token grammar, adjacent operators, bracket
/// balance, then token adjacency.
pub fn validate(raw: &str) -> Result<String, ExpressionError> {
    if raw.trim().is_empty() {
        return Err(ExpressionError::EmptyExpression);
    }

    let canonical: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if !GRAMMAR.is_match(&canonical) {
        return Err(ExpressionError::InvalidSyntax(canonical));
    }

    check_operators(&canonical)?;
    check_brackets(&canonical)?;
    check_adjacency(&canonical)?;
    Ok(canonical)
}

fn check_operators(expr: &str) -> Result<(), ExpressionError> {
    let bytes = expr.as_bytes();
    for (i, pair) in bytes.windows(2).enumerate() {
        if ARITHMETIC.contains(&pair[0]) && ARITHMETIC.contains(&pair[1]) {
            return Err(ExpressionError::ConsecutiveOperators {
                position: i,
                pair: expr[i..i + 2].to_string(),
            });
        }
    }
    Ok(())
}

fn check_brackets(expr: &str) -> Result<(), ExpressionError> {
    let mut round = 0i64;
    let mut curly = 0i64;
    let mut last_close_curly = None;

    for (i, byte) in expr.bytes().enumerate() {
        match byte {
            b'(' => round += 1,
            b')' => {
                round -= 1;
                if round < 0 {
                    return Err(ExpressionError::UnbalancedBrackets(format!(
                        "')' at position {i} has no matching '('"
                    )));
                }
            }
            b'{' => {
                curly += 1;
                if curly > 1 {
                    return Err(ExpressionError::UnbalancedBrackets(format!(
                        "reference markers cannot nest (position {i})"
                    )));
                }
                if i > 0 && last_close_curly == Some(i - 1) {
                    return Err(ExpressionError::UnbalancedBrackets(format!(
                        "reference markers cannot follow each other (position {i})"
                    )));
                }
            }
            b'}' => {
                curly -= 1;
                if curly < 0 {
                    return Err(ExpressionError::UnbalancedBrackets(format!(
                        "'}}' at position {i} has no matching '{{'"
                    )));
                }
                last_close_curly = Some(i);
            }
            _ => {}
        }
    }

    if round != 0 {
        return Err(ExpressionError::UnbalancedBrackets(format!("{round} '(' left open")));
    }
    if curly != 0 {
        return Err(ExpressionError::UnbalancedBrackets("reference marker left open".to_string()));
    }
    Ok(())
}

fn ends_operand(byte: u8) -> bool {
    byte.is_ascii_digit() || byte == b')' || byte == b'}'
}

fn starts_group(byte: u8) -> bool {
    matches!(byte, b'(' | b'{' | b'l')
}

/// Rejects token sequences the grammar lets through but that have no
/// arithmetic meaning: operands written side by side (`2(3)`, `(1)(2)`,
/// `{1}2`), empty brackets, and operators without an operand on one side.
fn check_adjacency(expr: &str) -> Result<(), ExpressionError> {
    let bytes = expr.as_bytes();
    let syntax = |detail: String| Err(ExpressionError::InvalidSyntax(format!("{expr}: {detail}")));

    if let Some(&first) = bytes.first() {
        if first == b'*' || first == b'/' {
            return syntax(format!("leading '{}'", first as char));
        }
    }
    if let Some(&last) = bytes.last() {
        if ARITHMETIC.contains(&last) {
            return syntax(format!("trailing '{}'", last as char));
        }
    }

    for (i, pair) in bytes.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let juxtaposed = (ends_operand(a) && starts_group(b)) || ((a == b')' || a == b'}') && b.is_ascii_digit());
        let empty_operand = (a == b'(' && matches!(b, b')' | b'*' | b'/')) || (ARITHMETIC.contains(&a) && b == b')');
        if juxtaposed || empty_operand {
            return syntax(format!("'{}' at position {i}", &expr[i..i + 2]));
        }
    }
    Ok(())
}
