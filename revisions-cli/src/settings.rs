//! Effective settings: config file, environment and command-line flags

use crate::cli::GlobalArgs;
use anyhow::Context;
use revisions::config::RevisionsConfig;
use revisions::RevisionRequest;
use std::path::{Path, PathBuf};

/// Database URL variables, checked in order when `--database-url` is absent
pub const DATABASE_URL_VARS: [&str; 2] = ["REVISIONS_DATABASE_URL", "DATABASE_URL"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    /// `directory` is already resolved against the config file or the flag
    pub config: RevisionsConfig,
}

impl Settings {
    /// Merge `args` over the config file and the environment
    ///
    /// Precedence, highest first: flags, `REVISIONS_DATABASE_URL`/`DATABASE_URL` (URL only),
    /// `REVISIONS__*` variables, the config file, defaults.
    pub fn resolve(args: &GlobalArgs) -> anyhow::Result<Self> {
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(RevisionsConfig::config_path);
        let config = RevisionsConfig::load_from(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;

        let url = std::env::var_os(DATABASE_URL_VARS[0])
            .or_else(|| std::env::var_os(DATABASE_URL_VARS[1]))
            .and_then(|v| v.into_string().ok());

        Ok(Self::merge(config_path, config, args, url))
    }

    /// Apply flag and URL overrides to an already loaded config
    pub fn merge(
        config_path: PathBuf,
        mut config: RevisionsConfig,
        args: &GlobalArgs,
        env_url: Option<String>,
    ) -> Self {
        config.directory = match &args.directory {
            Some(directory) => directory.clone(),
            None => config.resolved_directory(&config_path),
        };
        if let Some(namespace) = &args.namespace {
            config.namespace.clone_from(namespace);
        }
        if let Some(url) = args.database_url.clone().or(env_url) {
            config.database.url = url;
        }

        Self {
            config_path,
            config,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn request(&self) -> RevisionRequest {
        RevisionRequest::new(self.config.namespace.clone(), self.config.directory.clone())
    }
}
