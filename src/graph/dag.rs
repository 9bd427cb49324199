//! dag.rs
//! Dependency edges between stored calculations and stale propagation.
//!
//! The edges live in the store; this type only wraps a store handle with
//! graph algorithms. Every traversal is an explicit queue with a visited set,
//! so a corrupted (cyclic) edge table can never recurse without bound.

use crate::store::{CalcId, CalculationStore, Relation, StoreError};
use std::collections::{BTreeSet, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("dependency cycle through calculation {0}")]
    CycleDetected(CalcId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct DependencyGraph<'s, S> {
    store: &'s mut S,
}

impl<'s, S: CalculationStore> DependencyGraph<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Replaces every outgoing edge of `origin` with one edge per dependency.
    pub fn record_dependencies(&mut self, origin: CalcId, dependencies: &BTreeSet<CalcId>) -> Result<(), GraphError> {
        self.store.delete_relations_by_origin(origin)?;
        for &destination in dependencies {
            self.store.save_relation(Relation::new(origin, destination))?;
        }
        debug!(origin = %origin, count = dependencies.len(), "dependency edges rewritten");
        Ok(())
    }

    /// All direct and transitive dependents of `origin`.
    pub fn downstream_from(&self, origin: CalcId) -> Result<BTreeSet<CalcId>, GraphError> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from(self.store.get_dependents(origin)?);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                queue.extend(self.store.get_dependents(node)?);
            }
        }
        Ok(visited)
    }

    /// Fails with `CycleDetected` if `origin` depending on `dependencies`
    /// would close a loop, i.e. one of them already depends on `origin`.
    pub fn ensure_acyclic(&self, origin: CalcId, dependencies: &BTreeSet<CalcId>) -> Result<(), GraphError> {
        if dependencies.contains(&origin) {
            return Err(GraphError::CycleDetected(origin));
        }
        if dependencies.is_empty() {
            return Ok(());
        }
        let downstream = self.downstream_from(origin)?;
        if let Some(&culprit) = dependencies.iter().find(|id| downstream.contains(id)) {
            warn!(origin = %origin, dependency = %culprit, "rejected edge that would close a cycle");
            return Err(GraphError::CycleDetected(culprit));
        }
        Ok(())
    }

    /// Marks every transitive dependent of `origin` stale and persists it.
    ///
    /// Each dependent is visited once; rows that are already stale are not
    /// rewritten. Returns the ids reached, in breadth-first order.
    pub fn cascade_stale(&mut self, origin: CalcId) -> Result<Vec<CalcId>, GraphError> {
        let mut visited = HashSet::new();
        let mut reached = Vec::new();
        let mut queue = VecDeque::from(self.store.get_dependents(origin)?);

        while let Some(node) = queue.pop_front() {
            if node == origin {
                warn!(origin = %origin, "cascade came back to its origin");
                return Err(GraphError::CycleDetected(origin));
            }
            if !visited.insert(node) {
                continue;
            }

            match self.store.get_calculation(node)? {
                Some(mut calc) => {
                    if !calc.stale {
                        calc.stale = true;
                        self.store.update_calculation(&calc)?;
                    }
                    reached.push(node);
                }
                None => warn!(dependent = %node, "edge from a calculation that no longer exists"),
            }

            queue.extend(self.store.get_dependents(node)?);
        }

        debug!(origin = %origin, marked = reached.len(), "stale flag cascaded");
        Ok(reached)
    }
}
