//! calcgraph_core: stored arithmetic expressions that reference each other.
//!
//! A calculation is an expression such as `{3}*2+1`, where `{3}` is the
//! current result of calculation 3. When a calculation changes, everything
//! that depends on it (directly or transitively) is flagged stale and is
//! recomputed lazily the next time it is read.
//!
//! The entry point is [`CalculationEngine`], generic over a
//! [`CalculationStore`]:
//!
//! ```no_run
//! use calcgraph_core::{CalculationEngine, EngineConfig, MemoryStore};
//!
//! let engine = CalculationEngine::new(MemoryStore::new(), EngineConfig::default());
//! let base = engine.create("5")?;
//! let id = base.id().expect("persisted");
//! let derived = engine.create(&format!("{{{id}}}+1"))?;
//! engine.update(id, "10")?;
//! assert_eq!(engine.read(derived.id().expect("persisted"))?.result, 11.0);
//! # Ok::<(), calcgraph_core::CalcError>(())
//! ```

pub mod computation;
pub mod config;
pub mod expression;
pub mod graph;
pub mod store;

pub use computation::{CalcError, CalculationEngine, ErrorKind};
pub use config::{Config, ConfigError, EngineConfig, StoreConfig};
pub use expression::{evaluate, validate, ExpressionError, SplitPolicy};
pub use graph::{DependencyGraph, GraphError};
pub use store::{CalcId, Calculation, CalculationStore, MemoryStore, Relation, SqliteStore, StoreError};
