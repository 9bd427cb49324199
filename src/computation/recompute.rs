//! The storage-free part of a recomputation.
use super::error::CalcError;
use crate::expression::{references, Evaluator};
use crate::store::CalcId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub result: f64,
    pub dependencies: BTreeSet<CalcId>,
}

/// Evaluates `expression` against already fetched dependency values.
///
/// `values` must hold a fresh result for every referenced id; a missing one
/// fails with `NotFound`.
pub fn recompute(
    expression: &str,
    self_id: Option<CalcId>,
    values: &BTreeMap<CalcId, f64>,
    evaluator: &Evaluator,
) -> Result<Evaluated, CalcError> {
    let resolved = references::resolve(expression, self_id, |id| {
        values.get(&id).copied().ok_or(CalcError::NotFound(id))
    })?;
    let result = evaluator.evaluate(&resolved.expression)?;
    Ok(Evaluated {
        result,
        dependencies: resolved.dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionError, SplitPolicy};

    fn table(pairs: &[(i64, f64)]) -> BTreeMap<CalcId, f64> {
        pairs.iter().map(|&(id, v)| (CalcId(id), v)).collect()
    }

    #[test]
    fn combines_dependency_values() {
        let evaluated = recompute("{1}*2+{2}", Some(CalcId(3)), &table(&[(1, 5.0), (2, -1.0)]), &Evaluator::default()).unwrap();
        assert_eq!(evaluated.result, 9.0);
        assert_eq!(evaluated.dependencies, [CalcId(1), CalcId(2)].into_iter().collect());
    }

    #[test]
    fn missing_value_is_not_found() {
        let outcome = recompute("{99}+1", None, &table(&[]), &Evaluator::default());
        assert!(matches!(outcome, Err(CalcError::NotFound(CalcId(99)))));
    }

    #[test]
    fn self_reference_wins_over_missing_values() {
        let outcome = recompute("{7}+1", Some(CalcId(7)), &table(&[]), &Evaluator::default());
        assert!(matches!(
            outcome,
            Err(CalcError::Expression(ExpressionError::SelfReference(CalcId(7))))
        ));
    }

    #[test]
    fn policy_is_honoured() {
        let values = table(&[(1, 10.0)]);
        let legacy = recompute("{1}-3-2", None, &values, &Evaluator::new(SplitPolicy::Legacy, 64)).unwrap();
        let left = recompute("{1}-3-2", None, &values, &Evaluator::new(SplitPolicy::LeftAssociative, 64)).unwrap();
        assert_eq!(legacy.result, 9.0);
        assert_eq!(left.result, 5.0);
    }

    #[test]
    fn division_by_a_zero_dependency() {
        let outcome = recompute("4/{1}", None, &table(&[(1, 0.0)]), &Evaluator::default());
        assert!(matches!(
            outcome,
            Err(CalcError::Expression(ExpressionError::DivisionByZero(_)))
        ));
    }
}
