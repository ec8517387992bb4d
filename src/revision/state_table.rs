//! PostgreSQL state table backing the persistence facade
//!
//! One row per namespace holds the current revision:
//!
//! | column             | type                       |
//! |--------------------|----------------------------|
//! | `namespace`        | `TEXT UNIQUE NOT NULL`     |
//! | `previous_version` | `TEXT`                     |
//! | `version`          | `TEXT NOT NULL`            |
//! | `file`             | `TEXT NOT NULL`            |
//! | `created_at`       | `TIMESTAMP NOT NULL`       |
//! | `updated_at`       | `TIMESTAMP NOT NULL`       |
//!
//! The exclusive lock is a table lock taken inside the caller's transaction, so it is
//! released by `COMMIT`/`ROLLBACK` and explicit release is a no-op.

use crate::executor::Executor;
use crate::logger::Logger;
use crate::revision::persistence::PersistenceFacade;
use crate::revision::{Revision, RevisionError};
use regex::Regex;
use sea_query::{Alias, ColumnDef, Expr, PostgresQueryBuilder, Table, TableCreateStatement};

/// Default state table name
pub const DEFAULT_TABLE: &str = "revisions";

/// `PostgreSQL` implementation of [`PersistenceFacade`]
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    table: String,
    logger: Logger,
}

impl PostgresPersistence {
    /// Use table `revisions`
    pub fn new() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            logger: Logger::default().child("state_table"),
        }
    }

    /// Use a custom table name
    ///
    /// # Errors
    ///
    /// Returns `RevisionError::InvalidIdentifier` unless `table` is a plain SQL identifier
    /// (`[A-Za-z_][A-Za-z0-9_]*`); the name is interpolated into statements.
    pub fn with_table(table: impl Into<String>) -> Result<Self, RevisionError> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            table,
            ..Self::new()
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for the state table
    pub fn create_table_statement(&self) -> TableCreateStatement {
        Table::create()
            .table(Alias::new(self.table.clone()))
            .if_not_exists()
            .col(ColumnDef::new("namespace").text().not_null().unique_key())
            .col(ColumnDef::new("previous_version").text().null())
            .col(ColumnDef::new("version").text().not_null())
            .col(ColumnDef::new("file").text().not_null())
            .col(
                ColumnDef::new("created_at")
                    .timestamp()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(
                ColumnDef::new("updated_at")
                    .timestamp()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .to_owned()
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT file, version, previous_version, created_at::text, updated_at::text \
             FROM {} WHERE namespace = $1",
            self.table
        )
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (namespace, previous_version, version, file) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (namespace) DO UPDATE SET \
             previous_version = EXCLUDED.previous_version, \
             version = EXCLUDED.version, \
             file = EXCLUDED.file, \
             updated_at = NOW()",
            self.table
        )
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE namespace = $1", self.table)
    }

    fn lock_sql(&self) -> String {
        format!("LOCK TABLE ONLY {} IN EXCLUSIVE MODE", self.table)
    }
}

impl Default for PostgresPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Executor + ?Sized> PersistenceFacade<C> for PostgresPersistence {
    fn initialize(&self, client: &C) -> Result<(), RevisionError> {
        let sql = self.create_table_statement().build(PostgresQueryBuilder);
        client.execute(&sql, &[])?;
        Ok(())
    }

    fn acquire_exclusive_lock(&self, client: &C) -> Result<(), RevisionError> {
        self.logger
            .debug(format_args!("locking table {}", self.table));
        client.execute(&self.lock_sql(), &[])?;
        Ok(())
    }

    fn release_exclusive_lock(&self, _client: &C) -> Result<(), RevisionError> {
        Ok(())
    }

    fn fetch_current_revision(
        &self,
        client: &C,
        namespace: &str,
    ) -> Result<Option<Revision>, RevisionError> {
        let rows = client.query_all(&self.select_sql(), &[&namespace])?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(Revision::from_row(row)?)),
            _ => Err(RevisionError::MultipleRevisionsFound {
                namespace: namespace.to_string(),
                count: rows.len(),
            }),
        }
    }

    fn set_current_revision(
        &self,
        client: &C,
        namespace: &str,
        revision: &Revision,
    ) -> Result<(), RevisionError> {
        client.execute(
            &self.upsert_sql(),
            &[
                &namespace,
                &revision.previous_version,
                &revision.version,
                &revision.file,
            ],
        )?;
        self.logger.debug(format_args!(
            "namespace {namespace} now at {} ({})",
            revision.file, revision.version
        ));
        Ok(())
    }

    fn remove_namespace(&self, client: &C, namespace: &str) -> Result<(), RevisionError> {
        client.execute(&self.delete_sql(), &[&namespace])?;
        self.logger
            .debug(format_args!("namespace {namespace} reset to base"));
        Ok(())
    }
}

fn validate_identifier(name: &str) -> Result<(), RevisionError> {
    let valid = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map(|re| re.is_match(name))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(RevisionError::InvalidIdentifier(name.to_string()))
    }
}
