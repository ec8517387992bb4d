//! Test doubles shared by the revision unit tests

use crate::executor::{DbError, Executor};
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every statement it is asked to run; queries always fail
#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    /// Fail any statement containing `needle`
    pub(crate) fn failing_on(needle: &str) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        }
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str) -> Result<(), DbError> {
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(DbError::Query(format!("statement failed: {sql}")));
            }
        }
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(sql.to_string());
        }
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, DbError> {
        self.record(query)?;
        Ok(0)
    }

    fn query_one(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<Row, DbError> {
        Err(DbError::Other("recording executor returns no rows".to_string()))
    }

    fn query_all(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        Err(DbError::Other("recording executor returns no rows".to_string()))
    }

    fn batch_execute(&self, sql: &str) -> Result<(), DbError> {
        self.record(sql)
    }
}

/// Write a TOML revision file and return its path
pub(crate) fn write_revision(
    dir: &Path,
    file: &str,
    previous_version: Option<&str>,
    up: &str,
    down: &str,
) -> PathBuf {
    let mut contents = String::new();
    if let Some(previous) = previous_version {
        contents.push_str(&format!("previous_version = \"{previous}\"\n"));
    }
    contents.push_str(&format!("up = {up:?}\ndown = {down:?}\n"));

    let path = dir.join(file);
    #[allow(clippy::expect_used)]
    fs::write(&path, contents).expect("write revision file");
    path
}
