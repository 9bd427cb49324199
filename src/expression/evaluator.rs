//! Recursive arithmetic over a reference-free expression.
//!
//! Precedence comes from staged splitting: the string is cut at a top-level
//! `+`/`-` first, then `*`/`/`, then `^` or `log`. Each half is evaluated
//! recursively. Brackets are only stripped when a single pair wraps the
//! whole string.

use super::error::ExpressionError;
use super::scan;
use serde::{Deserialize, Serialize};

/// How the split point is chosen when an operator level has several
/// candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// `+` wins over `-` and `*` wins over `/` wherever they occur, and the
    /// first occurrence of the winner is the split point. `10-3-2`
    /// evaluates as `10-(3-2) = 9`. Results stored by earlier versions were
    /// computed this way.
    #[default]
    Legacy,
    /// Splits at the last operator of the level, which gives conventional
    /// left-to-right evaluation: `10-3-2 = 5`.
    LeftAssociative,
}

/// Each split or bracket strip costs one level, so a flat chain of `n`
/// operators needs `n` levels.
pub const DEFAULT_MAX_NESTING: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    policy: SplitPolicy,
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(SplitPolicy::Legacy, DEFAULT_MAX_NESTING)
    }
}

impl Evaluator {
    pub fn new(policy: SplitPolicy, max_depth: usize) -> Self {
        Self { policy, max_depth }
    }

    pub fn policy(&self) -> SplitPolicy { self.policy }

    pub fn evaluate(&self, expr: &str) -> Result<f64, ExpressionError> {
        self.eval_at(expr, 0)
    }

    fn eval_at(&self, expr: &str, depth: usize) -> Result<f64, ExpressionError> {
        if depth > self.max_depth {
            return Err(ExpressionError::TooDeep(self.max_depth));
        }
        if expr.is_empty() {
            return Err(ExpressionError::MalformedExpression(expr.to_string()));
        }
        if let Some(value) = parse_literal(expr) {
            return Ok(value);
        }

        let pairs = scan::paren_pairs(expr)?;
        if scan::is_wrapped(expr, &pairs) {
            return self.eval_at(&expr[1..expr.len() - 1], depth + 1);
        }

        if let Some((at, op)) = self.split_point(expr, b'+', b'-') {
            let (lhs, rhs) = self.operands(expr, at, depth)?;
            return Ok(if op == b'+' { lhs + rhs } else { lhs - rhs });
        }

        if let Some((at, op)) = self.split_point(expr, b'*', b'/') {
            let (lhs, rhs) = self.operands(expr, at, depth)?;
            if op == b'*' {
                return Ok(lhs * rhs);
            }
            if rhs == 0.0 {
                return Err(ExpressionError::DivisionByZero(expr.to_string()));
            }
            return Ok(lhs / rhs);
        }

        // Right-associative under every policy.
        if let Some(&at) = scan::top_level_binary(expr, b'^').first() {
            let (base, exponent) = self.operands(expr, at, depth)?;
            return Ok(base.powf(exponent));
        }

        // A leading sign that no split consumed applies to the whole rest,
        // e.g. `-(-3)` after a negative value was substituted into `-{1}`.
        if let Some(rest) = expr.strip_prefix('-') {
            return Ok(-self.eval_at(rest, depth + 1)?);
        }
        if let Some(rest) = expr.strip_prefix('+') {
            return self.eval_at(rest, depth + 1);
        }

        if let Some(at) = scan::top_level_log(expr) {
            return self.eval_log(expr, at, &pairs, depth);
        }

        Err(ExpressionError::MalformedExpression(expr.to_string()))
    }

    /// Picks the split offset for one precedence level, `preferred` being
    /// `+` or `*` and `other` being `-` or `/`.
    fn split_point(&self, expr: &str, preferred: u8, other: u8) -> Option<(usize, u8)> {
        let first = scan::top_level_binary(expr, preferred);
        let second = scan::top_level_binary(expr, other);

        match self.policy {
            SplitPolicy::Legacy => first
                .first()
                .map(|&at| (at, preferred))
                .or_else(|| second.first().map(|&at| (at, other))),
            SplitPolicy::LeftAssociative => {
                let a = first.last().map(|&at| (at, preferred));
                let b = second.last().map(|&at| (at, other));
                match (a, b) {
                    (Some(a), Some(b)) => Some(if a.0 > b.0 { a } else { b }),
                    (a, b) => a.or(b),
                }
            }
        }
    }

    fn operands(&self, expr: &str, at: usize, depth: usize) -> Result<(f64, f64), ExpressionError> {
        let lhs = self.eval_at(&expr[..at], depth + 1)?;
        let rhs = self.eval_at(&expr[at + 1..], depth + 1)?;
        Ok((lhs, rhs))
    }

    /// `log(x;b)` is the logarithm of `x` in base `b`. The call has to span
    /// the whole remaining string.
    fn eval_log(&self, expr: &str, at: usize, pairs: &[(usize, usize)], depth: usize) -> Result<f64, ExpressionError> {
        let open = at + 3;
        let close = pairs
            .iter()
            .find(|&&(o, _)| o == open)
            .map(|&(_, c)| c)
            .ok_or_else(|| ExpressionError::MalformedExpression(expr.to_string()))?;

        if at != 0 || close != expr.len() - 1 {
            return Err(ExpressionError::MalformedExpression(expr.to_string()));
        }

        let args = &expr[open + 1..close];
        let (value, base) = args
            .split_once(';')
            .ok_or_else(|| ExpressionError::MalformedExpression(expr.to_string()))?;

        let value = self.eval_at(value, depth + 1)?;
        let base = self.eval_at(base, depth + 1)?;
        Ok(value.log(base))
    }
}

/// Evaluates with the legacy split policy.
pub fn evaluate(expr: &str) -> Result<f64, ExpressionError> {
    Evaluator::default().evaluate(expr)
}

/// Accepts plain decimal numbers (with an optional sign) plus the `inf` and
/// `NaN` spellings produced when such results are substituted back into an
/// expression.
fn parse_literal(expr: &str) -> Option<f64> {
    let body = expr.strip_prefix(['-', '+']).unwrap_or(expr);
    let plain = !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if plain || body == "inf" || body == "NaN" {
        expr.parse().ok()
    } else {
        None
    }
}
