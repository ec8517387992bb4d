//! Revisions CLI library
//!
//! The `revisions` binary (main.rs) parses arguments and dispatches to [`commands`].

pub mod cli;
pub mod commands;
pub mod settings;
