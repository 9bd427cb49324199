//! A synchronous calculation engine over a [`CalculationStore`].
//!
//! Every public operation takes the store lock for its whole duration, so a
//! read never observes a calculation halfway through a recompute and
//! concurrent cascades are serialized.

use super::error::CalcError;
use super::recompute::{recompute, Evaluated};
use crate::config::EngineConfig;
use crate::expression::{references, validate, Evaluator, ExpressionError};
use crate::graph::{DependencyGraph, GraphError};
use crate::store::{CalcId, Calculation, CalculationStore};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub struct CalculationEngine<S> {
    store: Mutex<S>,
    evaluator: Evaluator,
    config: EngineConfig,
}

impl<S: CalculationStore> CalculationEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store: Mutex::new(store),
            evaluator: Evaluator::new(config.split_policy, config.max_nesting),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Validates, evaluates and stores a new calculation.
    pub fn create(&self, expression: &str) -> Result<Calculation, CalcError> {
        let canonical = validate(expression)?;
        let mut store = self.lock()?;

        let evaluated = self.session(&mut store).evaluate(&canonical, None)?;

        let id = store.atomically(|s| -> Result<CalcId, CalcError> {
            let id = s.save_calculation(&canonical, evaluated.result, false)?;
            DependencyGraph::new(s).record_dependencies(id, &evaluated.dependencies)?;
            Ok(id)
        })?;

        info!(id = %id, expression = %canonical, result = evaluated.result, "calculation created");
        Ok(Calculation::from_row(id, canonical, evaluated.result, false))
    }

    /// Returns the calculation, recomputing it first if it is stale.
    pub fn read(&self, id: CalcId) -> Result<Calculation, CalcError> {
        let mut store = self.lock()?;
        self.session(&mut store).get(id)
    }

    /// Replaces the expression of `id` and marks all of its dependents stale.
    pub fn update(&self, id: CalcId, expression: &str) -> Result<Calculation, CalcError> {
        let canonical = validate(expression)?;
        let mut store = self.lock()?;

        let mut calc = store.get_calculation(id)?.ok_or(CalcError::NotFound(id))?;
        let evaluated = self.session(&mut store).evaluate(&canonical, Some(id))?;
        DependencyGraph::new(&mut *store).ensure_acyclic(id, &evaluated.dependencies)?;

        calc.expression = canonical;
        calc.result = evaluated.result;
        calc.stale = false;

        let marked = store.atomically(|s| -> Result<Vec<CalcId>, CalcError> {
            s.update_calculation(&calc)?;
            let mut graph = DependencyGraph::new(s);
            graph.record_dependencies(id, &evaluated.dependencies)?;
            Ok(graph.cascade_stale(id)?)
        })?;

        info!(id = %id, expression = %calc.expression, result = calc.result, stale_dependents = marked.len(), "calculation updated");
        Ok(calc)
    }

    /// Removes the calculation and its outgoing edges. Its dependents are
    /// marked stale; reading them afterwards fails with `NotFound`.
    pub fn delete(&self, id: CalcId) -> Result<(), CalcError> {
        let mut store = self.lock()?;
        if store.get_calculation(id)?.is_none() {
            return Err(CalcError::NotFound(id));
        }

        let marked = store.atomically(|s| -> Result<Vec<CalcId>, CalcError> {
            s.delete_relations_by_origin(id)?;
            s.delete_calculation(id)?;
            Ok(DependencyGraph::new(s).cascade_stale(id)?)
        })?;

        info!(id = %id, stale_dependents = marked.len(), "calculation deleted");
        Ok(())
    }

    /// Recomputes `id` even if it is fresh. If the result moved, its
    /// dependents are marked stale.
    pub fn recalculate(&self, id: CalcId) -> Result<Calculation, CalcError> {
        let mut store = self.lock()?;
        let calc = store.get_calculation(id)?.ok_or(CalcError::NotFound(id))?;
        let previous = calc.result;

        let refreshed = self.session(&mut store).refresh(calc)?;
        if refreshed.result.to_bits() != previous.to_bits() {
            DependencyGraph::new(&mut *store).cascade_stale(id)?;
        }
        Ok(refreshed)
    }

    /// Runs `f` with exclusive access to the underlying store.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut S) -> T) -> Result<T, CalcError> {
        let mut store = self.lock()?;
        Ok(f(&mut *store))
    }

    pub fn into_store(self) -> Result<S, CalcError> {
        self.store.into_inner().map_err(|e| CalcError::Poisoned(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>, CalcError> {
        self.store.lock().map_err(|e| CalcError::Poisoned(e.to_string()))
    }

    fn session<'a>(&'a self, store: &'a mut S) -> Session<'a, S> {
        Session {
            store,
            evaluator: &self.evaluator,
            max_depth: self.config.max_depth,
            in_progress: Vec::new(),
        }
    }
}

/// One read path through the store: fetch, and recompute whatever is stale
/// on the way.
struct Session<'a, S> {
    store: &'a mut S,
    evaluator: &'a Evaluator,
    max_depth: usize,
    // Ids whose recompute is currently on the stack.
    in_progress: Vec<CalcId>,
}

impl<S: CalculationStore> Session<'_, S> {
    fn get(&mut self, id: CalcId) -> Result<Calculation, CalcError> {
        let calc = self.store.get_calculation(id)?.ok_or(CalcError::NotFound(id))?;
        if !calc.stale {
            return Ok(calc);
        }
        self.refresh(calc)
    }

    fn refresh(&mut self, mut calc: Calculation) -> Result<Calculation, CalcError> {
        let id = calc.id().ok_or(CalcError::NotFound(CalcId::default()))?;

        if self.in_progress.contains(&id) {
            warn!(id = %id, chain = ?self.in_progress, "reference cycle while recomputing");
            return Err(GraphError::CycleDetected(id).into());
        }
        if self.in_progress.len() >= self.max_depth {
            return Err(CalcError::TooDeep(self.max_depth));
        }

        self.in_progress.push(id);
        let outcome = self.evaluate(&calc.expression, Some(id));
        self.in_progress.pop();
        let evaluated = outcome?;

        calc.result = evaluated.result;
        calc.stale = false;
        self.store.update_calculation(&calc)?;
        debug!(id = %id, result = calc.result, "recomputed calculation");
        Ok(calc)
    }

    /// Fetches every referenced calculation (fresh) and evaluates.
    fn evaluate(&mut self, expression: &str, self_id: Option<CalcId>) -> Result<Evaluated, CalcError> {
        let dependencies = references::scan(expression)?;
        if let Some(id) = self_id.filter(|id| dependencies.contains(id)) {
            return Err(ExpressionError::SelfReference(id).into());
        }

        let mut values = BTreeMap::new();
        for dependency in dependencies {
            let fresh = self.get(dependency)?;
            values.insert(dependency, fresh.result);
        }
        recompute(expression, self_id, &values, self.evaluator)
    }
}
