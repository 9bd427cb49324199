//! `{n}` reference markers: scanning and substitution.

use super::error::ExpressionError;
use crate::store::CalcId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("marker regex is valid"));

/// Output of [`resolve`]: the reference-free expression and every id it used.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub expression: String,
    pub dependencies: BTreeSet<CalcId>,
}

/// Every id referenced by `expr`, without fetching anything.
pub fn scan(expr: &str) -> Result<BTreeSet<CalcId>, ExpressionError> {
    MARKER
        .captures_iter(expr)
        .map(|caps| parse_id(&caps[1]))
        .collect()
}

/// Replaces each `{n}` marker with the current result of calculation `n`.
///
/// A marker equal to `self_id` fails with `SelfReference` before `fetch` is
/// called for anything. `fetch` runs once per distinct id, in ascending id
/// order; its errors are returned unchanged.
pub fn resolve<E, F>(expr: &str, self_id: Option<CalcId>, mut fetch: F) -> Result<Resolved, E>
where
    E: From<ExpressionError>,
    F: FnMut(CalcId) -> Result<f64, E>,
{
    let dependencies = scan(expr)?;
    if let Some(id) = self_id.filter(|id| dependencies.contains(id)) {
        return Err(ExpressionError::SelfReference(id).into());
    }

    let mut values = BTreeMap::new();
    for &id in &dependencies {
        values.insert(id, fetch(id)?);
    }

    let mut expression = String::with_capacity(expr.len());
    let mut last = 0;
    for caps in MARKER.captures_iter(expr) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let id = parse_id(digits.as_str())?;
        expression.push_str(&expr[last..whole.start()]);
        if let Some(&value) = values.get(&id) {
            push_literal(&mut expression, value);
        }
        last = whole.end();
    }
    expression.push_str(&expr[last..]);

    Ok(Resolved { expression, dependencies })
}

fn parse_id(digits: &str) -> Result<CalcId, ExpressionError> {
    digits
        .parse::<i64>()
        .map(CalcId)
        .map_err(|_| ExpressionError::InvalidSyntax(format!("{{{digits}}}")))
}

/// Negative values are bracketed so that `2*{1}` stays splittable.
fn push_literal(out: &mut String, value: f64) {
    if value.is_sign_negative() && !value.is_nan() && value != 0.0 {
        out.push('(');
        out.push_str(&value.to_string());
        out.push(')');
    } else if value == 0.0 {
        out.push('0');
    } else {
        out.push_str(&value.to_string());
    }
}
