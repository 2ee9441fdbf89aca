//! `relsync sync`

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use relsync::{MemoryHost, RelationBehavior, normalize};

use super::{SyncArgs, print_journal, print_outcome, print_partial};
use crate::cli::{load_dataset, parse_id_list, resolve_config};

pub fn handle_sync_command(config: Option<&Path>, args: SyncArgs) -> Result<()> {
    let mut dataset = load_dataset(&args.target.data)?;
    let config = resolve_config(config, &dataset)?;
    let desired = normalize(&parse_id_list(&args.ids)).context("Invalid --ids value")?;

    let (result, wrote) = {
        let host = MemoryHost::new(&mut dataset, &args.target.record)?;
        let mut behavior = RelationBehavior::new(host, config)?;

        let result = behavior.sync(&args.relation, &desired, !args.keep_rows);

        print_journal(behavior.host().journal());
        (result, !behavior.host().journal().is_empty())
    };

    match &result {
        Ok(outcome) => print_outcome(&args.relation, outcome),
        Err(err) => print_partial(err),
    }

    // Writes issued before a failure stand, so they are saved either way
    if args.dry_run {
        println!("{}", "Dry run: dataset not written".yellow());
    } else if wrote {
        dataset.save(&args.target.data)?;
    }

    result
        .map(|_| ())
        .with_context(|| format!("Failed to sync relation '{}'", args.relation))
}
