//! SQLite-backed measurement store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use mcat_core::{Guid, RunDescription, RunId, Scalar, Value};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, warn};

use crate::npy;
use crate::store::MeasurementStore;
use crate::types::{DatasetInfo, ExperimentInfo, RunLayout, RunRecord, timestamp_from_unix};
use crate::{StoreError, StoreResult};

/// Columns of the `runs` table that belong to the store itself. Anything
/// else on a run row is user metadata.
const RUN_COLUMNS: &[&str] = &[
    "run_id",
    "exp_id",
    "name",
    "result_table_name",
    "result_counter",
    "run_timestamp",
    "completed_timestamp",
    "is_completed",
    "parameters",
    "guid",
    "run_description",
    "snapshot",
    "captured_run_id",
    "captured_counter",
    "parent_datasets",
];

const RUN_SELECT: &str = "SELECT run_id, exp_id, name, result_table_name, guid, \
     run_timestamp, completed_timestamp, run_description FROM runs";

/// How cells of a results column are decoded, from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Text,
    Array,
    Complex,
    Dynamic,
}

impl ColumnKind {
    fn from_decl(decl: &str) -> Self {
        match decl.trim().to_ascii_lowercase().as_str() {
            "numeric" | "integer" | "int" | "real" | "float" | "double" => ColumnKind::Numeric,
            "text" | "varchar" | "char" => ColumnKind::Text,
            "array" | "blob" => ColumnKind::Array,
            "complex" => ColumnKind::Complex,
            _ => ColumnKind::Dynamic,
        }
    }
}

/// Read-only handle on one database file.
///
/// The connection lives exactly as long as the store value.
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StoreError::DatabaseNotFound { path });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags)?;
        debug!(path = %path.display(), "opened measurement database");
        Ok(Self { path, conn })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn column_kinds(&self, table: &str) -> StoreResult<HashMap<String, ColumnKind>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let mut rows = stmt.query([])?;
        let mut kinds = HashMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            let decl: Option<String> = row.get(2)?;
            kinds.insert(name, ColumnKind::from_decl(decl.as_deref().unwrap_or("")));
        }
        Ok(kinds)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRun> {
    Ok(RawRun {
        run_id: row.get(0)?,
        exp_id: row.get(1)?,
        name: row.get(2)?,
        result_table_name: row.get(3)?,
        guid: row.get(4)?,
        run_timestamp: row.get(5)?,
        completed_timestamp: row.get(6)?,
        run_description: row.get(7)?,
    })
}

/// Run row before GUID validation.
struct RawRun {
    run_id: i64,
    exp_id: i64,
    name: Option<String>,
    result_table_name: String,
    guid: String,
    run_timestamp: Option<f64>,
    completed_timestamp: Option<f64>,
    run_description: String,
}

impl RawRun {
    fn into_record(self) -> StoreResult<RunRecord> {
        Ok(RunRecord {
            run_id: RunId::new(self.run_id),
            exp_id: self.exp_id,
            guid: Guid::parse(&self.guid)?,
            name: self.name,
            result_table_name: self.result_table_name,
            run_timestamp: self.run_timestamp.and_then(timestamp_from_unix),
            completed_timestamp: self.completed_timestamp.and_then(timestamp_from_unix),
            run_description: self.run_description,
        })
    }
}

fn decode_cell(value: ValueRef<'_>, kind: ColumnKind, column: &str) -> StoreResult<Value> {
    let malformed = |reason: String| StoreError::MalformedBlob {
        column: column.to_string(),
        reason,
    };
    let cell = match value {
        ValueRef::Null => Value::Scalar(Scalar::Null),
        ValueRef::Integer(i) => Value::Scalar(Scalar::Numeric(i as f64)),
        ValueRef::Real(f) => Value::Scalar(Scalar::Numeric(f)),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            match kind {
                ColumnKind::Numeric => match text.trim().parse::<f64>() {
                    Ok(v) => Value::Scalar(Scalar::Numeric(v)),
                    Err(_) => Value::Scalar(Scalar::Text(text)),
                },
                _ => Value::Scalar(Scalar::Text(text)),
            }
        }
        ValueRef::Blob(bytes) => {
            let array = npy::decode(bytes).map_err(|source| StoreError::Npy {
                column: column.to_string(),
                source,
            })?;
            match kind {
                ColumnKind::Complex => {
                    if array.len() != 1 {
                        return Err(malformed(format!(
                            "complex cell holds {} elements",
                            array.len()
                        )));
                    }
                    let scalar = array
                        .scalars()
                        .next()
                        .ok_or_else(|| malformed("empty complex cell".to_string()))?;
                    match scalar {
                        Scalar::Numeric(v) => Value::Scalar(Scalar::Complex(
                            mcat_core::Complex::new(v, 0.0),
                        )),
                        other => Value::Scalar(other),
                    }
                }
                _ => Value::Array(array),
            }
        }
    };
    Ok(cell)
}

fn json_from_sql(value: ValueRef<'_>) -> Option<serde_json::Value> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(serde_json::Value::from(i)),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        ValueRef::Text(bytes) => Some(serde_json::Value::String(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
        ValueRef::Blob(_) => None,
    }
}

impl MeasurementStore for SqliteStore {
    fn runs(&self) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!("{RUN_SELECT} ORDER BY run_id"))?;
        let raw = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = raw.len(), "scanned run table");
        raw.into_iter().map(RawRun::into_record).collect()
    }

    fn run(&self, run_id: RunId) -> StoreResult<RunRecord> {
        let raw = self
            .conn
            .query_row(
                &format!("{RUN_SELECT} WHERE run_id = ?1"),
                params![run_id.get()],
                run_from_row,
            )
            .optional()?
            .ok_or(StoreError::RunIdNotFound { run_id })?;
        raw.into_record()
    }

    fn experiments(&self) -> StoreResult<HashMap<i64, ExperimentInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT exp_id, name, sample_name FROM experiments")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                ExperimentInfo {
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    sample_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                },
            ))
        })?;
        let mut out = HashMap::new();
        for row in rows {
            let (exp_id, info) = row?;
            out.insert(exp_id, info);
        }
        Ok(out)
    }

    fn run_id_from_guid(&self, guid: &Guid) -> StoreResult<RunId> {
        self.conn
            .query_row(
                "SELECT run_id FROM runs WHERE guid = ?1",
                params![guid.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(RunId::new)
            .ok_or_else(|| StoreError::GuidNotFound { guid: guid.clone() })
    }

    fn guid_from_run_id(&self, run_id: RunId) -> StoreResult<Guid> {
        let guid: String = self
            .conn
            .query_row(
                "SELECT guid FROM runs WHERE run_id = ?1",
                params![run_id.get()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::RunIdNotFound { run_id })?;
        Ok(Guid::parse(&guid)?)
    }

    fn run_layout(&self, run_id: RunId) -> StoreResult<RunLayout> {
        let record = self.run(run_id)?;
        let description = RunDescription::from_json(&record.run_description)?;
        Ok(RunLayout {
            description,
            table_name: record.result_table_name,
        })
    }

    fn parameter_tree_values(&self, table: &str, columns: &[&str]) -> StoreResult<Vec<Vec<Value>>> {
        let Some(first) = columns.first() else {
            return Ok(Vec::new());
        };
        let kinds = self.column_kinds(table)?;
        let column_kinds = columns
            .iter()
            .map(|c| {
                kinds
                    .get(*c)
                    .copied()
                    .ok_or_else(|| StoreError::UnknownColumn {
                        table: table.to_string(),
                        column: c.to_string(),
                    })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let select = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IS NOT NULL",
            select,
            quote_ident(table),
            quote_ident(first)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for (i, (column, kind)) in columns.iter().zip(&column_kinds).enumerate() {
                cells.push(decode_cell(row.get_ref(i)?, *kind, column)?);
            }
            out.push(cells);
        }
        debug!(table, parameter = *first, rows = out.len(), "fetched parameter tree");
        Ok(out)
    }

    fn dataset_info(&self, run_id: RunId) -> StoreResult<DatasetInfo> {
        let record = self.run(run_id)?;
        let number_of_results: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&record.result_table_name)),
            [],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare("SELECT * FROM runs WHERE run_id = ?1")?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params![run_id.get()])?;
        let row = rows.next()?.ok_or(StoreError::RunIdNotFound { run_id })?;

        let mut metadata = BTreeMap::new();
        let mut snapshot = None;
        for (i, name) in names.iter().enumerate() {
            let value = row.get_ref(i)?;
            if name == "snapshot" {
                if let ValueRef::Text(bytes) = value {
                    let parsed = serde_json::from_slice(bytes).map_err(|e| {
                        StoreError::MalformedSnapshot {
                            run_id,
                            reason: e.to_string(),
                        }
                    })?;
                    snapshot = Some(parsed);
                }
                continue;
            }
            if RUN_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            match json_from_sql(value) {
                Some(v) => {
                    metadata.insert(name.clone(), v);
                }
                None if matches!(value, ValueRef::Blob(_)) => {
                    warn!(run_id = %run_id, column = %name, "skipping binary run metadata");
                }
                None => {}
            }
        }

        Ok(DatasetInfo {
            number_of_results: number_of_results.max(0) as u64,
            metadata,
            snapshot,
        })
    }
}
