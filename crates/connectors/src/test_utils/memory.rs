//! An in-memory store that understands exactly the statements the sync
//! engine renders, so engine and orchestrator tests run without a server.
//!
//! Tables must be declared with [`MemoryStore::with_table`]; statements
//! against an undeclared table fail the way a missing relation would.
//! Rows inserted through an `INSERT` are keyed on their first column.

use crate::{
    adapter::StoreConnector,
    error::AdapterError,
    sql::base::{
        error::DbError,
        store::{SourceStore, TargetStore, TargetTransaction},
    },
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    records::row::{FieldValue, SourceRow},
};
use planner::query::dialect::DialectKind;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Exists,
    Insert,
    Update,
    Upsert,
}

#[derive(Debug, Clone)]
pub struct Executed {
    pub kind: StatementKind,
    pub table: String,
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Failure {
    kind: StatementKind,
    table: String,
    /// Matching statements allowed to succeed before failing.
    after: usize,
    seen: usize,
}

type Tables = HashMap<String, Vec<SourceRow>>;

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    log: Vec<Executed>,
    commits: Vec<usize>,
    rollbacks: usize,
    failures: Vec<Failure>,
}

impl State {
    fn record(&mut self, executed: Executed) -> Result<(), DbError> {
        let failure = self.failures.iter_mut().find(|f| {
            f.kind == executed.kind && f.table.eq_ignore_ascii_case(&executed.table)
        });
        let failed = match failure {
            Some(f) if f.seen >= f.after => true,
            Some(f) => {
                f.seen += 1;
                false
            }
            None => false,
        };
        let message = format!("injected {:?} failure on {}", executed.kind, executed.table);
        self.log.push(executed);
        if failed {
            return Err(DbError::Unknown(message));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    kind: DialectKind,
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DialectKind::Postgres)
    }
}

impl MemoryStore {
    pub fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_table(self, name: &str, rows: Vec<SourceRow>) -> Self {
        self.lock().tables.insert(name.to_ascii_lowercase(), rows);
        self
    }

    /// Fails every `kind` statement against `table`.
    pub fn fail_on(self, kind: StatementKind, table: &str) -> Self {
        self.fail_after(kind, table, 0)
    }

    /// Lets `after` matching statements through, then fails the rest.
    pub fn fail_after(self, kind: StatementKind, table: &str, after: usize) -> Self {
        self.lock().failures.push(Failure {
            kind,
            table: table.to_string(),
            after,
            seen: 0,
        });
        self
    }

    pub fn rows(&self, table: &str) -> Vec<SourceRow> {
        self.lock()
            .tables
            .get(&table.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.lock().log.clone()
    }

    pub fn count(&self, kind: StatementKind) -> usize {
        self.lock().log.iter().filter(|e| e.kind == kind).count()
    }

    /// Rows handled (existence checks plus native upserts) by each
    /// committed transaction, in commit order.
    pub fn commits(&self) -> Vec<usize> {
        self.lock().commits.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<SourceRow>, DbError> {
        let Parsed::Select {
            table,
            columns,
            date,
        } = Parsed::parse(sql)?
        else {
            return Err(DbError::Unknown(format!("not a query: {sql}")));
        };

        let mut state = self.lock();
        state.record(Executed {
            kind: StatementKind::Select,
            table: table.clone(),
            sql: sql.to_string(),
            params: params.to_vec(),
        })?;
        let rows = table_rows(&state.tables, &table)?;

        let in_window = |row: &SourceRow| match (&date, params) {
            (Some(date), [start, end]) => {
                let value = row.get_value(date);
                compare(&value, start).is_some_and(|o| o != Ordering::Less)
                    && compare(&value, end) == Some(Ordering::Less)
            }
            _ => true,
        };

        Ok(rows
            .iter()
            .filter(|row| in_window(*row))
            .map(|row| {
                SourceRow::new(
                    columns
                        .iter()
                        .map(|c| FieldValue {
                            name: c.clone(),
                            value: row.get_value(c),
                        })
                        .collect(),
                )
            })
            .collect())
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn TargetTransaction + 'a>, DbError> {
        let staged = self.lock().tables.clone();
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged,
            handled: 0,
            finished: false,
        }))
    }
}

pub struct MemoryTransaction {
    store: MemoryStore,
    staged: Tables,
    handled: usize,
    finished: bool,
}

#[async_trait]
impl TargetTransaction for MemoryTransaction {
    async fn exists(&mut self, sql: &str, params: &[Value]) -> Result<bool, DbError> {
        let Parsed::Exists { table, key } = Parsed::parse(sql)? else {
            return Err(DbError::Unknown(format!("not an existence check: {sql}")));
        };
        self.store.lock().record(Executed {
            kind: StatementKind::Exists,
            table: table.clone(),
            sql: sql.to_string(),
            params: params.to_vec(),
        })?;
        self.handled += 1;

        let wanted = params.first().cloned().unwrap_or(Value::Null);
        Ok(table_rows(&self.staged, &table)?
            .iter()
            .any(|row| !wanted.is_null() && row.get_value(&key) == wanted))
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let parsed = Parsed::parse(sql)?;
        let (kind, table) = match &parsed {
            Parsed::Insert {
                table,
                upsert: true,
                ..
            } => (StatementKind::Upsert, table.clone()),
            Parsed::Insert { table, .. } => (StatementKind::Insert, table.clone()),
            Parsed::Update { table, .. } => (StatementKind::Update, table.clone()),
            _ => return Err(DbError::Unknown(format!("not a write: {sql}"))),
        };
        self.store.lock().record(Executed {
            kind,
            table: table.clone(),
            sql: sql.to_string(),
            params: params.to_vec(),
        })?;
        if kind == StatementKind::Upsert {
            self.handled += 1;
        }

        let rows = self
            .staged
            .get_mut(&table.to_ascii_lowercase())
            .ok_or_else(|| missing_table(&table))?;

        match parsed {
            Parsed::Insert {
                columns, upsert, ..
            } => {
                let key = columns.first().cloned().unwrap_or_default();
                let new_row = SourceRow::new(
                    columns
                        .iter()
                        .zip(params.iter().cloned())
                        .map(|(name, value)| FieldValue {
                            name: name.clone(),
                            value,
                        })
                        .collect(),
                );
                let key_value = new_row.get_value(&key);
                match rows.iter_mut().find(|r| r.get_value(&key) == key_value) {
                    Some(existing) if upsert => *existing = new_row,
                    Some(_) => {
                        return Err(DbError::Unknown(format!(
                            "duplicate key value {key_value} in {table}"
                        )));
                    }
                    None => rows.push(new_row),
                }
                Ok(1)
            }
            Parsed::Update { set, key, .. } => {
                let key_value = params.last().cloned().unwrap_or(Value::Null);
                let mut affected = 0;
                for row in rows.iter_mut().filter(|r| r.get_value(&key) == key_value) {
                    for (column, value) in set.iter().zip(params.iter()) {
                        match row
                            .field_values
                            .iter_mut()
                            .find(|f| f.name.eq_ignore_ascii_case(column))
                        {
                            Some(field) => field.value = value.clone(),
                            None => row.field_values.push(FieldValue {
                                name: column.clone(),
                                value: value.clone(),
                            }),
                        }
                    }
                    affected += 1;
                }
                Ok(affected)
            }
            _ => Ok(0),
        }
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DbError> {
        self.finished = true;
        let mut state = self.store.lock();
        state.tables = std::mem::take(&mut self.staged);
        state.commits.push(self.handled);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DbError> {
        self.finished = true;
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.store.lock().rollbacks += 1;
        }
    }
}

/// Hands out the same pair of memory stores to every run. With
/// [`MemoryConnector::unreachable`] opening either side fails.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    pub source: MemoryStore,
    pub target: MemoryStore,
    unreachable: bool,
}

impl MemoryConnector {
    pub fn new(source: MemoryStore, target: MemoryStore) -> Self {
        Self {
            source,
            target,
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            source: MemoryStore::default(),
            target: MemoryStore::default(),
            unreachable: true,
        }
    }

    fn check(&self) -> Result<(), AdapterError> {
        if self.unreachable {
            return Err(DbError::Unknown("connection refused".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn open_source(&self) -> Result<Arc<dyn SourceStore>, AdapterError> {
        self.check()?;
        Ok(Arc::new(self.source.clone()))
    }

    async fn open_target(&self) -> Result<Arc<dyn TargetStore>, AdapterError> {
        self.check()?;
        Ok(Arc::new(self.target.clone()))
    }
}

fn missing_table(table: &str) -> DbError {
    DbError::Unknown(format!("relation \"{table}\" does not exist"))
}

fn table_rows<'t>(tables: &'t Tables, table: &str) -> Result<&'t Vec<SourceRow>, DbError> {
    tables
        .get(&table.to_ascii_lowercase())
        .ok_or_else(|| missing_table(table))
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::TimestampNaive(x), Value::TimestampNaive(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::TimestampNaive(y)) => Some(x.naive_utc().cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

enum Parsed {
    Select {
        table: String,
        columns: Vec<String>,
        date: Option<String>,
    },
    Exists {
        table: String,
        key: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        upsert: bool,
    },
    Update {
        table: String,
        set: Vec<String>,
        key: String,
    },
}

impl Parsed {
    fn parse(sql: &str) -> Result<Self, DbError> {
        let unsupported = || DbError::Unknown(format!("unsupported statement: {sql}"));
        let lhs = |clause: &str, op: &str| {
            clause
                .split_once(op)
                .map(|(l, _)| l.trim().to_string())
                .ok_or_else(unsupported)
        };

        if let Some(rest) = sql.strip_prefix("SELECT ") {
            let (columns, rest) = rest.split_once(" FROM ").ok_or_else(unsupported)?;
            let (table, clause) = match rest.split_once(" WHERE ") {
                Some((table, clause)) => (table, Some(clause)),
                None => (rest, None),
            };
            let table = table.trim().to_string();
            return match (columns.trim(), clause) {
                ("1", Some(clause)) => Ok(Parsed::Exists {
                    table,
                    key: lhs(clause, " = ")?,
                }),
                (columns, clause) => Ok(Parsed::Select {
                    table,
                    columns: split_list(columns),
                    date: clause.map(|c| lhs(c, " >= ")).transpose()?,
                }),
            };
        }

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (table, rest) = rest.split_once(" (").ok_or_else(unsupported)?;
            let (columns, rest) = rest.split_once(')').ok_or_else(unsupported)?;
            return Ok(Parsed::Insert {
                table: table.trim().to_string(),
                columns: split_list(columns),
                upsert: rest.contains(" ON CONFLICT") || rest.contains(" ON DUPLICATE KEY"),
            });
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (table, rest) = rest.split_once(" SET ").ok_or_else(unsupported)?;
            let (assignments, clause) = rest.split_once(" WHERE ").ok_or_else(unsupported)?;
            let set = assignments
                .split(", ")
                .map(|a| lhs(a, " = "))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Parsed::Update {
                table: table.trim().to_string(),
                set,
                key: lhs(clause, " = ")?,
            });
        }

        Err(unsupported())
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|c| c.trim().to_string()).collect()
}
