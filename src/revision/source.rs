//! Revision sources: turning a revision file into `{previous_version, up, down}`
//!
//! The loader only deals with file discovery and hashing. How the forward and backward
//! operations of a file are materialized is up to a [`RevisionSource`]:
//!
//! - [`TomlSource`] reads `*.revision.toml` files holding SQL scripts
//! - [`RegistrySource`](crate::revision::RegistrySource) pairs files with Rust closures
//!   registered in-process

use crate::executor::Executor;
use crate::revision::RevisionError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Error type returned by user operations; propagated unchanged as the error source
pub type OperationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A forward or backward revision operation run against the transactional client `C`
pub trait Operation<C: ?Sized>: Send + Sync {
    /// Run the operation
    ///
    /// # Errors
    ///
    /// Any error aborts the enclosing upgrade/downgrade.
    fn run(&self, client: &C) -> Result<(), OperationError>;
}

impl<C, F> Operation<C> for F
where
    C: ?Sized,
    F: Fn(&C) -> Result<(), OperationError> + Send + Sync,
{
    fn run(&self, client: &C) -> Result<(), OperationError> {
        self(client)
    }
}

/// What a source extracts from one revision file
pub struct RevisionDefinition<C: ?Sized> {
    pub previous_version: Option<String>,
    pub up: Arc<dyn Operation<C>>,
    pub down: Arc<dyn Operation<C>>,
}

impl<C: ?Sized> fmt::Debug for RevisionDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionDefinition")
            .field("previous_version", &self.previous_version)
            .finish_non_exhaustive()
    }
}

/// Contents and extension of a freshly generated revision file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTemplate {
    pub extension: String,
    pub contents: String,
}

/// Maps a revision file to its definition
pub trait RevisionSource<C: ?Sized>: Send + Sync {
    /// Extensions (without dot) of files this source understands, e.g. `toml` for
    /// `001_init.revision.toml`
    fn extensions(&self) -> Vec<String>;

    /// Parse `contents`, the bytes read from `path`
    ///
    /// # Errors
    ///
    /// Returns `RevisionError::MalformedRevisionFile` if the file does not declare valid
    /// operations.
    fn load(&self, path: &Path, contents: &[u8]) -> Result<RevisionDefinition<C>, RevisionError>;

    /// Body for a new revision extending `previous_version`; `None` if the source cannot
    /// author files
    fn template(&self, _previous_version: Option<&str>, _description: &str) -> Option<RevisionTemplate> {
        None
    }
}

/// A SQL script run through [`Executor::batch_execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlOperation {
    sql: String,
}

impl SqlOperation {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<C: Executor + ?Sized> Operation<C> for SqlOperation {
    fn run(&self, client: &C) -> Result<(), OperationError> {
        if self.sql.trim().is_empty() {
            return Ok(());
        }
        client.batch_execute(&self.sql)?;
        Ok(())
    }
}

/// Keys of a TOML revision file
const KEY_PREVIOUS_VERSION: &str = "previous_version";
const KEY_UP: &str = "up";
const KEY_DOWN: &str = "down";

/// Reads `*.revision.toml` files
///
/// ```toml
/// previous_version = "9f86d08..."   # omitted for the first revision
/// up = """
/// ALTER TABLE users ADD COLUMN email TEXT;
/// """
/// down = """
/// ALTER TABLE users DROP COLUMN email;
/// """
/// ```
///
/// Empty `up`/`down` scripts are valid and do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlSource;

impl TomlSource {
    pub const EXTENSION: &'static str = "toml";

    /// Parse a TOML revision body into its declared previous version and SQL scripts
    ///
    /// # Errors
    ///
    /// Returns `RevisionError::MalformedRevisionFile` for invalid TOML, a non-string
    /// `previous_version`, or a missing/non-string `up`/`down`.
    pub fn parse(
        file: &str,
        contents: &[u8],
    ) -> Result<(Option<String>, SqlOperation, SqlOperation), RevisionError> {
        let text = std::str::from_utf8(contents)
            .map_err(|e| RevisionError::malformed(file, format!("not valid UTF-8: {e}")))?;
        let table: toml::Table = text
            .parse()
            .map_err(|e| RevisionError::malformed(file, format!("invalid TOML: {e}")))?;

        let previous_version = match table.get(KEY_PREVIOUS_VERSION) {
            None => None,
            Some(toml::Value::String(version)) => Some(version.clone()),
            Some(other) => {
                return Err(RevisionError::malformed(
                    file,
                    format!(
                        "{KEY_PREVIOUS_VERSION} must be a string, found {}",
                        other.type_str()
                    ),
                ))
            }
        };

        let script = |key: &str| match table.get(key) {
            Some(toml::Value::String(sql)) => Ok(SqlOperation::new(sql.clone())),
            Some(other) => Err(RevisionError::malformed(
                file,
                format!("{key} must be a string, found {}", other.type_str()),
            )),
            None => Err(RevisionError::malformed(
                file,
                format!("revision file missing {key} script"),
            )),
        };

        Ok((previous_version, script(KEY_UP)?, script(KEY_DOWN)?))
    }
}

impl<C: Executor + ?Sized> RevisionSource<C> for TomlSource {
    fn extensions(&self) -> Vec<String> {
        vec![Self::EXTENSION.to_string()]
    }

    fn load(&self, path: &Path, contents: &[u8]) -> Result<RevisionDefinition<C>, RevisionError> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let (previous_version, up, down) = Self::parse(&file, contents)?;

        Ok(RevisionDefinition {
            previous_version,
            up: Arc::new(up),
            down: Arc::new(down),
        })
    }

    fn template(&self, previous_version: Option<&str>, description: &str) -> Option<RevisionTemplate> {
        let mut contents = String::new();
        for line in description.lines() {
            contents.push_str("# ");
            contents.push_str(line);
            contents.push('\n');
        }
        if let Some(previous) = previous_version {
            contents.push_str(&format!("{KEY_PREVIOUS_VERSION} = \"{previous}\"\n"));
        }
        contents.push_str(&format!("{KEY_UP} = \"\"\"\n\"\"\"\n"));
        contents.push_str(&format!("{KEY_DOWN} = \"\"\"\n\"\"\"\n"));

        Some(RevisionTemplate {
            extension: Self::EXTENSION.to_string(),
            contents,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::revision::testing::RecordingExecutor;

    fn parse(contents: &str) -> Result<(Option<String>, SqlOperation, SqlOperation), RevisionError> {
        TomlSource::parse("001_test.revision.toml", contents.as_bytes())
    }

    #[test]
    fn test_parse_root_revision() {
        let (previous, up, down) = parse(
            r#"
up = "CREATE TABLE users (id SERIAL PRIMARY KEY);"
down = "DROP TABLE users;"
"#,
        )
        .unwrap();

        assert_eq!(previous, None);
        assert_eq!(up.sql(), "CREATE TABLE users (id SERIAL PRIMARY KEY);");
        assert_eq!(down.sql(), "DROP TABLE users;");
    }

    #[test]
    fn test_parse_previous_version() {
        let (previous, _, _) = parse(
            r#"
previous_version = "abc123"
up = ""
down = ""
"#,
        )
        .unwrap();
        assert_eq!(previous.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_non_string_previous_version_is_malformed() {
        let err = parse("previous_version = 42\nup = \"\"\ndown = \"\"\n").unwrap_err();
        assert!(matches!(err, RevisionError::MalformedRevisionFile { .. }));
        assert!(err.to_string().contains("previous_version must be a string"));
    }

    #[test]
    fn test_missing_up_is_malformed() {
        let err = parse("down = \"DROP TABLE users;\"\n").unwrap_err();
        assert!(err.to_string().contains("missing up"));
    }

    #[test]
    fn test_missing_down_is_malformed() {
        let err = parse("up = \"CREATE TABLE users ();\"\n").unwrap_err();
        assert!(err.to_string().contains("missing down"));
    }

    #[test]
    fn test_non_string_down_is_malformed() {
        let err = parse("up = \"\"\ndown = [\"DROP TABLE users;\"]\n").unwrap_err();
        assert!(err.to_string().contains("down must be a string"));
    }

    #[test]
    fn test_invalid_toml_is_malformed() {
        let err = parse("up = \n").unwrap_err();
        assert!(matches!(err, RevisionError::MalformedRevisionFile { .. }));
    }

    #[test]
    fn test_sql_operation_runs_script() {
        let executor = RecordingExecutor::default();
        let op = SqlOperation::new("CREATE TABLE t ();");
        Operation::<RecordingExecutor>::run(&op, &executor).unwrap();
        assert_eq!(executor.statements(), vec!["CREATE TABLE t ();".to_string()]);
    }

    #[test]
    fn test_empty_sql_operation_is_noop() {
        let executor = RecordingExecutor::default();
        Operation::<RecordingExecutor>::run(&SqlOperation::new("  \n"), &executor).unwrap();
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_template_round_trips_through_parse() {
        let template = RevisionSource::<RecordingExecutor>::template(
            &TomlSource,
            Some("abc123"),
            "add email column",
        )
        .expect("toml source has a template");

        assert_eq!(template.extension, "toml");
        assert!(template.contents.starts_with("# add email column\n"));

        let (previous, up, down) = parse(&template.contents).unwrap();
        assert_eq!(previous.as_deref(), Some("abc123"));
        assert_eq!(up.sql(), "");
        assert_eq!(down.sql(), "");
    }

    #[test]
    fn test_root_template_has_no_previous_version() {
        let template =
            RevisionSource::<RecordingExecutor>::template(&TomlSource, None, "init").unwrap();
        assert!(!template.contents.contains("previous_version"));
        assert_eq!(parse(&template.contents).unwrap().0, None);
    }
}
