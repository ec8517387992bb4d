//! Command handlers
//!
//! `init` and `new` only touch the filesystem. Every other command opens one connection
//! and runs inside a single transaction.

use crate::cli::GlobalArgs;
use crate::settings::Settings;
use anyhow::{bail, Context};
use colored::Colorize;
use revisions::config::RevisionsConfig;
use revisions::{
    startup, ConnectionManager, Migrator, NewRevisionRequest, PostgresConnectionManager,
    PostgresPersistence, Revision, RevisionModule, RevisionRequest, RevisionState,
    RevisionStatus, TomlSource, Transaction,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What `init` created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub directory: PathBuf,
}

/// `version --json` output
#[derive(Debug, Serialize)]
struct VersionReport<'a> {
    namespace: &'a str,
    current: Option<&'a Revision>,
}

/// Write a config file at `config_path` from the global flags and create its revisions directory
///
/// Refuses to overwrite an existing file unless `force` is set. The environment is not
/// consulted, so the written file only holds what was asked for plus defaults.
pub fn init(config_path: &Path, args: &GlobalArgs, force: bool) -> anyhow::Result<InitReport> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let mut config = RevisionsConfig::default();
    if let Some(namespace) = &args.namespace {
        config.namespace.clone_from(namespace);
    }
    if let Some(directory) = &args.directory {
        config.directory.clone_from(directory);
    }
    if let Some(url) = &args.database_url {
        config.database.url.clone_from(url);
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(config_path, config.to_toml()?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    let directory = config.resolved_directory(config_path);
    fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    log::info!(
        "initialized {} (namespace {})",
        config_path.display(),
        config.namespace
    );
    Ok(InitReport {
        config_path: config_path.to_path_buf(),
        directory,
    })
}

/// Create a revision file extending the current tip; returns its path
pub fn new_revision(settings: &Settings, description: &str) -> anyhow::Result<PathBuf> {
    let directory = settings.directory();
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    let path = migrator(settings)?.new_revision(&NewRevisionRequest::new(directory, description))?;
    Ok(path)
}

/// Print the current revision of the namespace
pub fn version(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let manager = connect(settings)?;
    let migrator = migrator(settings)?;
    let namespace = settings.config.namespace.as_str();

    let current = in_session(&manager, |manager| {
        Ok(manager.transaction(|client| migrator.current_revision(client, namespace))?)
    })?;

    if json {
        let report = VersionReport {
            namespace,
            current: current.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_current(current.as_ref()));
    }
    Ok(())
}

/// Print every revision of the chain with its state
pub fn list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let manager = connect(settings)?;
    let migrator = migrator(settings)?;
    let request = settings.request();

    let status = in_session(&manager, |manager| {
        Ok(manager.transaction(|client| migrator.status(client, &request))?)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(&status));
    }
    Ok(())
}

/// Apply every pending revision
pub fn up(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let manager = connect(settings)?;
    let migrator = migrator(settings)?;
    let request = settings.request();
    in_session(&manager, |manager| upgrade(manager, &migrator, &request, dry_run))
}

fn upgrade(
    manager: &PostgresConnectionManager,
    migrator: &Migrator<Transaction>,
    request: &RevisionRequest,
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let plan = manager.transaction(|client| migrator.plan_upgrade(client, request))?;
        if plan.is_noop() {
            println!("No pending revisions to apply");
        } else {
            println!("Would apply {} revision(s):", plan.pending.len());
            print!("{}", render_files(&plan.pending));
        }
        return Ok(());
    }

    println!("Applying revisions...");
    let path = startup::run_upgrade(manager, migrator, request)?;
    if path.is_noop() {
        println!("{} Already up to date", "✓".green());
    } else {
        print!("{}", render_files(&path.pending));
        println!(
            "{} Applied {} revision(s)",
            "✓".green(),
            path.pending.len()
        );
    }
    Ok(())
}

/// Revert the current revision
pub fn down(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let manager = connect(settings)?;
    let migrator = migrator(settings)?;
    let request = settings.request();
    in_session(&manager, |manager| downgrade(manager, &migrator, &request, dry_run))
}

fn downgrade(
    manager: &PostgresConnectionManager,
    migrator: &Migrator<Transaction>,
    request: &RevisionRequest,
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let plan = manager.transaction(|client| migrator.plan_downgrade(client, request))?;
        if plan.is_noop() {
            println!("No applied revisions to revert");
        } else {
            println!("Would revert:");
            print!("{}", render_files(&plan.pending));
            println!("New current revision: {}", render_version(plan.final_revision.as_ref()));
        }
        return Ok(());
    }

    println!("Reverting revision...");
    let path = startup::run_downgrade(manager, migrator, request)?;
    if path.is_noop() {
        println!("{} Nothing to revert", "✓".green());
    } else {
        print!("{}", render_files(&path.pending));
        println!(
            "{} Now at {}",
            "✓".green(),
            render_version(path.final_revision.as_ref())
        );
    }
    Ok(())
}

/// Run `f` and shut `manager` down afterwards, whether or not `f` succeeded
///
/// An error from `f` wins over an error while shutting down.
pub fn in_session<M, T, F>(manager: &M, f: F) -> anyhow::Result<T>
where
    M: ConnectionManager,
    F: FnOnce(&M) -> anyhow::Result<T>,
{
    let result = f(manager);
    let shutdown = manager.shutdown();
    let value = result?;
    shutdown.context("error closing database connection")?;
    Ok(value)
}

fn connect(settings: &Settings) -> anyhow::Result<PostgresConnectionManager> {
    let url = &settings.config.database.url;
    let manager = PostgresConnectionManager::connect(url)
        .context("error connecting to database")?
        .with_isolation_level(settings.config.database.isolation_level);
    Ok(manager)
}

fn migrator(settings: &Settings) -> anyhow::Result<Migrator<Transaction>> {
    let persistence = PostgresPersistence::with_table(settings.config.database.table.clone())?;
    Ok(
        Migrator::<Transaction>::new(Arc::new(persistence), Arc::new(TomlSource))
            .with_hash_algorithm(settings.config.hash_algorithm),
    )
}

/// `file (version)` or `base`
pub fn render_version(revision: Option<&Revision>) -> String {
    match revision {
        Some(revision) => {
            let mut line = format!("{} ({})", revision.file, short(&revision.version));
            if let Some(updated_at) = revision.updated_at {
                line.push_str(&format!(", updated {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC")));
            }
            line
        }
        None => "base".to_string(),
    }
}

/// Full details of the current revision for `version`
pub fn render_current(revision: Option<&Revision>) -> String {
    let Some(revision) = revision else {
        return "base\n".to_string();
    };

    let mut out = format!("File:             {}\n", revision.file);
    out.push_str(&format!("Version:          {}\n", revision.version));
    out.push_str(&format!(
        "Previous version: {}\n",
        revision.previous_version.as_deref().unwrap_or("none (root)")
    ));
    if let Some(created_at) = revision.created_at {
        out.push_str(&format!(
            "Created:          {}\n",
            created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(updated_at) = revision.updated_at {
        out.push_str(&format!(
            "Updated:          {}\n",
            updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    out
}

/// One line per entry plus a summary
pub fn render_status(status: &RevisionStatus) -> String {
    let mut out = format!("Namespace: {}\n", status.namespace.bold());
    if status.entries.is_empty() {
        out.push_str("No revisions found\n");
        return out;
    }

    for entry in &status.entries {
        let marker = match entry.state {
            RevisionState::Applied => "✓".green(),
            RevisionState::Current => "→".cyan().bold(),
            RevisionState::Pending => "·".yellow(),
        };
        out.push_str(&format!(
            "  {marker} {} {} [{}]\n",
            short(&entry.version),
            entry.file,
            entry.state
        ));
    }
    out.push_str(&format!(
        "Summary: {} applied, {} pending\n",
        status.applied_count(),
        status.pending_count()
    ));
    out
}

fn render_files<C: ?Sized>(modules: &[RevisionModule<C>]) -> String {
    modules
        .iter()
        .enumerate()
        .map(|(i, module)| format!("  {}. {}\n", i + 1, module.file()))
        .collect()
}

fn short(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}
