//! The persistence gateway consumed by the engine.
//!
//! The engine only sees the [`CalculationStore`] contract. Two
//! implementations ship with the crate: [`MemoryStore`] for embedding and
//! tests, and [`SqliteStore`] for durable storage.
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod types;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{CalcId, Calculation, Relation};

/// Storage contract for calculations and their dependency edges.
pub trait CalculationStore {
    /// Inserts a new row and returns the identity assigned to it.
    fn save_calculation(&mut self, expression: &str, result: f64, stale: bool) -> Result<CalcId, StoreError>;

    fn get_calculation(&self, id: CalcId) -> Result<Option<Calculation>, StoreError>;

    /// Overwrites expression, result and stale flag of an existing row.
    fn update_calculation(&mut self, calculation: &Calculation) -> Result<(), StoreError>;

    fn delete_calculation(&mut self, id: CalcId) -> Result<(), StoreError>;

    fn save_relation(&mut self, relation: Relation) -> Result<(), StoreError>;

    /// Origins of every edge pointing at `destination`, i.e. its direct dependents.
    fn get_dependents(&self, destination: CalcId) -> Result<Vec<CalcId>, StoreError>;

    fn delete_relations_by_origin(&mut self, origin: CalcId) -> Result<(), StoreError>;

    /// Runs `f` as one unit of work. Any error returned by `f` rolls back
    /// every write it made.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>;
}
