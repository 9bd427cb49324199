//! SQLite-backed store. Table names are taken from [`StoreConfig`] when the
//! store is opened.

use super::{CalcId, Calculation, CalculationStore, Relation, StoreError};
use crate::config::StoreConfig;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    calculations: String,
    relations: String,
}

impl SqliteStore {
    pub fn open_path(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    pub fn open_in_memory(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn,
            calculations: checked_table_name(&config.calculations_table)?,
            relations: checked_table_name(&config.relations_table)?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        // `result` is nullable because SQLite stores NaN as NULL.
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {calcs} (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              expression TEXT NOT NULL,
              result REAL,
              stale INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS {rels} (
              origin INTEGER NOT NULL,
              destination INTEGER NOT NULL,
              PRIMARY KEY (origin, destination)
            );

            CREATE INDEX IF NOT EXISTS idx_{rels}_destination ON {rels}(destination);
            "#,
            calcs = self.calculations,
            rels = self.relations,
        ))?;
        debug!(calculations = %self.calculations, relations = %self.relations, "sqlite schema ready");
        Ok(())
    }
}

fn checked_table_name(name: &str) -> Result<String, StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name.to_string())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

impl CalculationStore for SqliteStore {
    fn save_calculation(&mut self, expression: &str, result: f64, stale: bool) -> Result<CalcId, StoreError> {
        self.conn.execute(
            &format!("INSERT INTO {} (expression, result, stale) VALUES (?1, ?2, ?3)", self.calculations),
            params![expression, result, stale],
        )?;
        Ok(CalcId(self.conn.last_insert_rowid()))
    }

    fn get_calculation(&self, id: CalcId) -> Result<Option<Calculation>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT id, expression, result, stale FROM {} WHERE id = ?1", self.calculations),
                params![id.get()],
                |r| {
                    let result: Option<f64> = r.get(2)?;
                    Ok(Calculation::from_row(
                        CalcId(r.get(0)?),
                        r.get::<_, String>(1)?,
                        result.unwrap_or(f64::NAN),
                        r.get(3)?,
                    ))
                },
            )
            .optional()?;
        Ok(row)
    }

    fn update_calculation(&mut self, calculation: &Calculation) -> Result<(), StoreError> {
        let id = calculation.id().ok_or(StoreError::RowNotFound(CalcId::default()))?;
        let changed = self.conn.execute(
            &format!("UPDATE {} SET expression = ?1, result = ?2, stale = ?3 WHERE id = ?4", self.calculations),
            params![calculation.expression, calculation.result, calculation.stale, id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::RowNotFound(id));
        }
        Ok(())
    }

    fn delete_calculation(&mut self, id: CalcId) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.calculations),
            params![id.get()],
        )?;
        Ok(())
    }

    fn save_relation(&mut self, relation: Relation) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {} (origin, destination) VALUES (?1, ?2)", self.relations),
            params![relation.origin.get(), relation.destination.get()],
        )?;
        Ok(())
    }

    fn get_dependents(&self, destination: CalcId) -> Result<Vec<CalcId>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT origin FROM {} WHERE destination = ?1 ORDER BY origin",
            self.relations
        ))?;
        let rows = stmt.query_map(params![destination.get()], |r| r.get::<_, i64>(0))?;

        let mut dependents = Vec::new();
        for origin in rows {
            dependents.push(CalcId(origin?));
        }
        Ok(dependents)
    }

    fn delete_relations_by_origin(&mut self, origin: CalcId) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE origin = ?1", self.relations),
            params![origin.get()],
        )?;
        Ok(())
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(StoreError::from(e)))?;

        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| E::from(StoreError::from(e)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
