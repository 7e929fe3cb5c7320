//! Writer for throwaway databases in the store's on-disk layout.
//!
//! The store itself never writes; this exists for tests in this and
//! downstream crates, which enable the `testing` feature.

use std::path::{Path, PathBuf};

use mcat_core::{NdArray, RunDescription, RunId, Scalar, Value};
use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, params, params_from_iter};

use crate::StoreResult;
use crate::npy;

const SCHEMA: &str = "
CREATE TABLE experiments (
    exp_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    sample_name TEXT,
    start_time INTEGER,
    end_time INTEGER,
    run_counter INTEGER,
    format_string TEXT
);
CREATE TABLE runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    exp_id INTEGER,
    name TEXT,
    result_table_name TEXT,
    result_counter INTEGER,
    run_timestamp INTEGER,
    completed_timestamp INTEGER,
    is_completed BOOL,
    parameters TEXT,
    guid TEXT,
    run_description TEXT,
    snapshot TEXT,
    captured_run_id INTEGER,
    captured_counter INTEGER,
    parent_datasets TEXT,
    FOREIGN KEY(exp_id) REFERENCES experiments(exp_id)
);
";

/// A run created by [`FixtureDb::add_run`].
#[derive(Debug, Clone)]
pub struct FixtureRun {
    pub run_id: RunId,
    pub table_name: String,
}

pub struct FixtureDb {
    path: PathBuf,
    conn: Connection,
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> ToSqlOutput<'static> {
    use rusqlite::types::Value as Sql;
    let sql = match value {
        Value::Scalar(Scalar::Null) => Sql::Null,
        Value::Scalar(Scalar::Numeric(v)) => Sql::Real(*v),
        Value::Scalar(Scalar::Text(s)) => Sql::Text(s.clone()),
        Value::Scalar(Scalar::Complex(c)) => {
            Sql::Blob(npy::encode(&NdArray::full_complex(&[], *c)))
        }
        Value::Array(a) => Sql::Blob(npy::encode(a)),
    };
    ToSqlOutput::Owned(sql)
}

impl FixtureDb {
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { path, conn })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_experiment(&self, name: &str, sample_name: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO experiments (name, sample_name, run_counter, format_string) \
             VALUES (?1, ?2, 0, '{}-{}-{}')",
            params![name, sample_name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Register a run and create its results table with one typed column per paramspec.
    pub fn add_run(
        &self,
        exp_id: i64,
        guid: &str,
        description: &RunDescription,
        run_timestamp: Option<f64>,
        completed_timestamp: Option<f64>,
    ) -> StoreResult<FixtureRun> {
        self.conn.execute(
            "INSERT INTO runs (exp_id, name, result_counter, run_timestamp, \
             completed_timestamp, is_completed, guid, run_description) \
             VALUES (?1, 'results', 0, ?2, ?3, ?4, ?5, ?6)",
            params![
                exp_id,
                run_timestamp,
                completed_timestamp,
                completed_timestamp.is_some(),
                guid,
                description.to_json()?
            ],
        )?;
        let run_id = self.conn.last_insert_rowid();
        let table_name = format!("results-{exp_id}-{run_id}");
        self.conn.execute(
            "UPDATE runs SET result_table_name = ?1 WHERE run_id = ?2",
            params![table_name, run_id],
        )?;

        let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
        for spec in description.paramspecs() {
            columns.push(format!("{} {}", quote(&spec.name), spec.param_type.as_str()));
        }
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote(&table_name),
            columns.join(", ")
        ))?;

        Ok(FixtureRun {
            run_id: RunId::new(run_id),
            table_name,
        })
    }

    /// Insert one results row; unnamed columns stay NULL.
    pub fn insert_row(&self, table: &str, cells: &[(&str, Value)]) -> StoreResult<()> {
        let names = cells
            .iter()
            .map(|(name, _)| quote(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=cells.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            names,
            placeholders
        );
        self.conn
            .execute(&sql, params_from_iter(cells.iter().map(|(_, v)| to_sql(v))))?;
        Ok(())
    }

    pub fn set_snapshot(&self, run_id: RunId, snapshot: &serde_json::Value) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE runs SET snapshot = ?1 WHERE run_id = ?2",
            params![snapshot.to_string(), run_id.get()],
        )?;
        Ok(())
    }

    /// Attach a user metadata column to the run table and set it for one run.
    pub fn add_run_metadata(&self, run_id: RunId, key: &str, value: &str) -> StoreResult<()> {
        let exists: bool = self
            .conn
            .prepare("SELECT 1 FROM pragma_table_info('runs') WHERE name = ?1")?
            .exists(params![key])?;
        if !exists {
            self.conn
                .execute_batch(&format!("ALTER TABLE runs ADD COLUMN {} TEXT;", quote(key)))?;
        }
        self.conn.execute(
            &format!("UPDATE runs SET {} = ?1 WHERE run_id = ?2", quote(key)),
            params![value, run_id.get()],
        )?;
        Ok(())
    }
}
