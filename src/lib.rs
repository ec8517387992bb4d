//! # Revisions
//!
//! Verifiable, hash-chained database revisions for PostgreSQL on the `may` runtime.
//!
//! Revision files form a linked chain: every file declares the version it extends and
//! every version commits to the content of all revisions before it. The current revision
//! of each namespace is stored in the database, and upgrades/downgrades run under an
//! exclusive lock inside a single transaction.
//!
//! See the [`revision`] module for the engine and [`startup`] for the one-call entry points.

pub mod config;
pub mod connection;
pub mod executor;
pub mod logger;
pub mod revision;
pub mod transaction;

#[cfg(feature = "tracing")]
mod telemetry;

pub use config::{DatabaseSettings, RevisionsConfig};
pub use connection::{
    connect, validate_connection_string, ConnectionError, ConnectionManager,
    PostgresConnectionManager,
};
pub use executor::{DbError, Executor, PgExecutor};
pub use logger::Logger;
pub use revision::{
    compute_version, hash, startup, DowngradePath, HashAlgorithm, MemoryConnectionManager,
    MemoryPersistence, Migrator, NewRevisionRequest, Operation, OperationError,
    PersistenceFacade, PostgresPersistence, RegistrySource, Revision, RevisionError,
    RevisionModule, RevisionRequest, RevisionSource, RevisionState, RevisionStatus, TomlSource,
    UpgradePath, DEFAULT_HASH_ALGORITHM,
};
pub use transaction::{IsolationLevel, Transaction, TransactionError};
