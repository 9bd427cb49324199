//! Position helpers over a flat expression string.
//!
//! Everything here works on byte offsets. Operators, brackets and digits are
//! ASCII, so every offset returned lands on a char boundary.

use super::error::ExpressionError;

pub(crate) const ARITHMETIC: [u8; 4] = [b'+', b'-', b'*', b'/'];

/// Matching `(`/`)` pairs as `(open, close)` offsets, in closing order.
pub(crate) fn paren_pairs(expr: &str) -> Result<Vec<(usize, usize)>, ExpressionError> {
    let mut stack = Vec::new();
    let mut pairs = Vec::new();

    for (i, byte) in expr.bytes().enumerate() {
        match byte {
            b'(' => stack.push(i),
            b')' => match stack.pop() {
                Some(open) => pairs.push((open, i)),
                None => return Err(ExpressionError::MalformedExpression(expr.to_string())),
            },
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ExpressionError::MalformedExpression(expr.to_string()));
    }
    Ok(pairs)
}

/// True if the first and last bytes are one matching bracket pair.
pub(crate) fn is_wrapped(expr: &str, pairs: &[(usize, usize)]) -> bool {
    !expr.is_empty() && pairs.iter().any(|&(open, close)| open == 0 && close == expr.len() - 1)
}

/// Offsets of `op` that are not enclosed by any bracket pair.
pub(crate) fn top_level(expr: &str, op: u8) -> Vec<usize> {
    let mut depth = 0usize;
    let mut found = Vec::new();
    for (i, byte) in expr.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b if b == op && depth == 0 => found.push(i),
            _ => {}
        }
    }
    found
}

/// Offsets of `op` at top level that act as a binary operator. A sign at
/// the start, or right after another operator or an opening bracket,
/// belongs to the operand that follows it.
pub(crate) fn top_level_binary(expr: &str, op: u8) -> Vec<usize> {
    let bytes = expr.as_bytes();
    top_level(expr, op)
        .into_iter()
        .filter(|&i| i > 0 && !matches!(bytes[i - 1], b'+' | b'-' | b'*' | b'/' | b'^' | b'('))
        .collect()
}

/// Offset of the first top-level `log(` call, if any.
pub(crate) fn top_level_log(expr: &str) -> Option<usize> {
    let bytes = expr.as_bytes();
    let mut depth = 0usize;
    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'l' if depth == 0 && bytes[i..].starts_with(b"log(") => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_nest() {
        assert_eq!(paren_pairs("(1+(2))").unwrap(), vec![(3, 5), (0, 6)]);
        assert!(paren_pairs("(1").is_err());
        assert!(paren_pairs("1)").is_err());
    }

    #[test]
    fn wrapped_only_by_a_single_pair() {
        let e = "(1+2)";
        assert!(is_wrapped(e, &paren_pairs(e).unwrap()));
        let e = "(1)+(2)";
        assert!(!is_wrapped(e, &paren_pairs(e).unwrap()));
    }

    #[test]
    fn skips_bracketed_operators() {
        assert_eq!(top_level("1+(2+3)+4", b'+'), vec![1, 7]);
        assert_eq!(top_level("(1-2)", b'-'), Vec::<usize>::new());
    }

    #[test]
    fn signs_are_not_binary() {
        assert_eq!(top_level_binary("-3-2", b'-'), vec![2]);
        assert_eq!(top_level_binary("5--3", b'-'), vec![1]);
        assert_eq!(top_level_binary("2*-3", b'-'), Vec::<usize>::new());
    }

    #[test]
    fn finds_log_outside_brackets() {
        assert_eq!(top_level_log("log(8;2)"), Some(0));
        assert_eq!(top_level_log("(log(8;2))"), None);
    }
}
