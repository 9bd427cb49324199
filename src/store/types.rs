use crate::expression::{references, ExpressionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a persisted calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalcId(pub i64);

impl CalcId {
    #[inline(always)]
    pub fn get(&self) -> i64 { self.0 }
}

impl fmt::Display for CalcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CalcId {
    fn from(value: i64) -> Self { Self(value) }
}

/// A stored expression together with its last evaluated result.
///
/// The entity never talks to storage. Reading, recomputing and persisting is
/// the job of [`crate::computation::CalculationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    id: Option<CalcId>,
    pub expression: String,
    pub result: f64,
    pub stale: bool,
}

impl Calculation {
    /// An unsaved calculation. It stays stale until it is evaluated.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            id: None,
            expression: expression.into(),
            result: 0.0,
            stale: true,
        }
    }

    /// Rebuilds a calculation from a persisted row.
    pub fn from_row(id: CalcId, expression: impl Into<String>, result: f64, stale: bool) -> Self {
        Self {
            id: Some(id),
            expression: expression.into(),
            result,
            stale,
        }
    }

    pub fn id(&self) -> Option<CalcId> { self.id }

    /// Assigns the identity handed out by the store. Returns `false` and
    /// leaves the calculation untouched if an id was already set.
    pub fn assign_id(&mut self, id: CalcId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    /// The ids referenced by `{n}` markers in the expression.
    pub fn dependencies(&self) -> Result<BTreeSet<CalcId>, ExpressionError> {
        references::scan(&self.expression)
    }
}

/// A dependency edge: `origin`'s expression references `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub origin: CalcId,
    pub destination: CalcId,
}

impl Relation {
    pub fn new(origin: CalcId, destination: CalcId) -> Self {
        Self { origin, destination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_assigned_once() {
        let mut calc = Calculation::new("1+1");
        assert!(calc.stale);
        assert!(calc.assign_id(CalcId(3)));
        assert!(!calc.assign_id(CalcId(4)));
        assert_eq!(calc.id(), Some(CalcId(3)));
    }

    #[test]
    fn dependencies_come_from_markers() {
        let calc = Calculation::new("{2}+{10}*{2}");
        let deps: Vec<_> = calc.dependencies().unwrap().into_iter().collect();
        assert_eq!(deps, vec![CalcId(2), CalcId(10)]);
    }

    #[test]
    fn serializes_without_dependencies() {
        let calc = Calculation::from_row(CalcId(5), "{1}+2", 7.0, false);
        let json = serde_json::to_value(&calc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 5, "expression": "{1}+2", "result": 7.0, "stale": false })
        );
    }
}
