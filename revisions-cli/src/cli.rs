//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "revisions")]
#[command(about = "Hash-chained database revisions")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: $REVISIONS_CONFIG or revisions.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database connection URL (default: $REVISIONS_DATABASE_URL or $DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Namespace whose current revision is read and written
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Revisions directory
    #[arg(long, global = true)]
    pub directory: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new revision file extending the current tip
    New {
        /// What the revision does (e.g., "add users table")
        description: String,
    },

    /// Show the current revision
    Version {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List every revision with its state (applied, current, pending)
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply all pending revisions
    Up {
        /// Dry run - show what would be applied without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert the current revision
    Down {
        /// Dry run - show what would be reverted without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a config file and create the revisions directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "revisions",
            "up",
            "--dry-run",
            "--namespace",
            "billing",
            "-v",
        ]);
        assert!(matches!(cli.command, Commands::Up { dry_run: true }));
        assert_eq!(cli.global.namespace.as_deref(), Some("billing"));
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["revisions", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_new_requires_description() {
        assert!(Cli::try_parse_from(["revisions", "new"]).is_err());
        let cli = Cli::parse_from(["revisions", "new", "add users"]);
        assert!(matches!(cli.command, Commands::New { ref description } if description == "add users"));
    }
}
