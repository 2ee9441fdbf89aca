//! Subcommand arguments and handlers

pub mod apply;
pub mod show;
pub mod sync;

use std::path::PathBuf;

use clap::Args;
use colored::*;

use relsync::{JournalEntry, SyncError, SyncOutcome};

/// Dataset and owner record every command works on
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Dataset file (JSON)
    #[arg(long)]
    pub data: PathBuf,

    /// Owner record id within the dataset
    #[arg(long)]
    pub record: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: RecordArgs,

    /// Only show this relation
    #[arg(long)]
    pub relation: Option<String>,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: RecordArgs,

    /// Relation to synchronise
    #[arg(long)]
    pub relation: String,

    /// Desired ids, comma separated (empty to unlink everything)
    #[arg(long, allow_hyphen_values = true)]
    pub ids: String,

    /// Null the foreign key instead of deleting the join row on unlink
    #[arg(long)]
    pub keep_rows: bool,

    /// Print the operations without writing the dataset
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: RecordArgs,

    /// Property assignment, e.g. `tagsIds=1,2,3` (repeatable)
    #[arg(long = "set", value_name = "PROPERTY=IDS", required = true)]
    pub assignments: Vec<String>,

    /// Fire the after-insert event instead of after-update
    #[arg(long)]
    pub insert: bool,

    /// Print the operations without writing the dataset
    #[arg(long)]
    pub dry_run: bool,
}

pub(crate) fn print_outcome(relation: &str, outcome: &SyncOutcome) {
    if outcome.is_noop() {
        println!("{} {}", relation.bold(), "unchanged".dimmed());
        return;
    }

    println!("{}", relation.bold());
    for id in &outcome.unlinked {
        println!("  {} {}", "-".red(), id.to_string().red());
    }
    for id in &outcome.linked {
        println!("  {} {}", "+".green(), id.to_string().green());
    }
}

/// Show the work that stood before a relation failed to sync
pub(crate) fn print_partial(err: &SyncError) {
    if let SyncError::DanglingReference {
        relation, partial, ..
    } = err
    {
        println!("{}", "Partially applied:".yellow());
        print_outcome(relation, partial);
    }
}

pub(crate) fn print_journal(journal: &[JournalEntry]) {
    if journal.is_empty() {
        return;
    }

    println!("{}", "Operations:".dimmed());
    for entry in journal {
        println!("  {}", entry.to_string().dimmed());
    }
}
