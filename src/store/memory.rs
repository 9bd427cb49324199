//! In-process store: rows in a `BTreeMap`, edges in a petgraph `DiGraphMap`.

use super::{CalcId, Calculation, CalculationStore, Relation, StoreError};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: BTreeMap<CalcId, Calculation>,
    // Edge direction: origin -> destination.
    edges: DiGraphMap<CalcId, ()>,
    last_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// All stored edges, sorted.
    pub fn relations(&self) -> Vec<Relation> {
        let mut all: Vec<Relation> = self
            .edges
            .all_edges()
            .map(|(origin, destination, _)| Relation::new(origin, destination))
            .collect();
        all.sort();
        all
    }
}

impl CalculationStore for MemoryStore {
    fn save_calculation(&mut self, expression: &str, result: f64, stale: bool) -> Result<CalcId, StoreError> {
        self.last_id += 1;
        let id = CalcId(self.last_id);
        self.rows.insert(id, Calculation::from_row(id, expression, result, stale));
        Ok(id)
    }

    fn get_calculation(&self, id: CalcId) -> Result<Option<Calculation>, StoreError> {
        Ok(self.rows.get(&id).cloned())
    }

    fn update_calculation(&mut self, calculation: &Calculation) -> Result<(), StoreError> {
        let id = calculation.id().ok_or(StoreError::RowNotFound(CalcId::default()))?;
        match self.rows.get_mut(&id) {
            Some(row) => {
                row.expression.clone_from(&calculation.expression);
                row.result = calculation.result;
                row.stale = calculation.stale;
                Ok(())
            }
            None => Err(StoreError::RowNotFound(id)),
        }
    }

    fn delete_calculation(&mut self, id: CalcId) -> Result<(), StoreError> {
        self.rows.remove(&id);
        Ok(())
    }

    fn save_relation(&mut self, relation: Relation) -> Result<(), StoreError> {
        self.edges.add_edge(relation.origin, relation.destination, ());
        Ok(())
    }

    fn get_dependents(&self, destination: CalcId) -> Result<Vec<CalcId>, StoreError> {
        if !self.edges.contains_node(destination) {
            return Ok(Vec::new());
        }
        let mut dependents: Vec<CalcId> = self
            .edges
            .neighbors_directed(destination, Direction::Incoming)
            .collect();
        dependents.sort();
        Ok(dependents)
    }

    fn delete_relations_by_origin(&mut self, origin: CalcId) -> Result<(), StoreError> {
        if !self.edges.contains_node(origin) {
            return Ok(());
        }
        let targets: Vec<CalcId> = self
            .edges
            .neighbors_directed(origin, Direction::Outgoing)
            .collect();
        for destination in targets {
            self.edges.remove_edge(origin, destination);
        }
        Ok(())
    }

    /// Snapshots the whole store (rows and edge map) before running `f`, so
    /// every unit of work costs O(rows + edges) regardless of what `f`
    /// touches. Fine for tests and small embedded graphs; large data sets
    /// belong in [`SqliteStore`](super::SqliteStore).
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.clone();
        let outcome = f(self);
        if outcome.is_err() {
            *self = snapshot;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut store = MemoryStore::new();
        let a = store.save_calculation("1", 1.0, false).unwrap();
        store.delete_calculation(a).unwrap();
        let b = store.save_calculation("2", 2.0, false).unwrap();
        assert_ne!(a, b);
        assert!(store.get_calculation(a).unwrap().is_none());
    }

    #[test]
    fn dependents_follow_incoming_edges() {
        let mut store = MemoryStore::new();
        store.save_relation(Relation::new(CalcId(2), CalcId(1))).unwrap();
        store.save_relation(Relation::new(CalcId(3), CalcId(1))).unwrap();
        store.save_relation(Relation::new(CalcId(3), CalcId(2))).unwrap();

        assert_eq!(store.get_dependents(CalcId(1)).unwrap(), vec![CalcId(2), CalcId(3)]);
        assert_eq!(store.get_dependents(CalcId(2)).unwrap(), vec![CalcId(3)]);
        assert!(store.get_dependents(CalcId(9)).unwrap().is_empty());

        store.delete_relations_by_origin(CalcId(3)).unwrap();
        assert_eq!(store.get_dependents(CalcId(1)).unwrap(), vec![CalcId(2)]);
        assert_eq!(store.relations(), vec![Relation::new(CalcId(2), CalcId(1))]);
    }

    #[test]
    fn update_of_missing_row_fails() {
        let mut store = MemoryStore::new();
        let ghost = Calculation::from_row(CalcId(4), "1", 1.0, false);
        assert!(matches!(store.update_calculation(&ghost), Err(StoreError::RowNotFound(CalcId(4)))));
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let mut store = MemoryStore::new();
        let kept = store.save_calculation("1", 1.0, false).unwrap();

        let outcome: Result<(), StoreError> = store.atomically(|s| {
            s.save_calculation("2", 2.0, false)?;
            s.save_relation(Relation::new(kept, CalcId(99)))?;
            Err(StoreError::RowNotFound(CalcId(99)))
        });

        assert!(outcome.is_err());
        assert_eq!(store.len(), 1);
        assert!(store.relations().is_empty());
    }
}
