//! `relsync apply`

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use relsync::{CommitListener, LifecycleEvent, MemoryHost, RelationBehavior};

use super::{ApplyArgs, print_journal, print_outcome, print_partial};
use crate::cli::{load_dataset, parse_id_list, resolve_config};

/// Split `tagsIds=1,2` into the property and its raw id list
fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let (property, ids) = raw
        .split_once('=')
        .with_context(|| format!("Expected PROPERTY=IDS, got '{}'", raw))?;

    let property = property.trim();
    if property.is_empty() {
        anyhow::bail!("Missing property name in '{}'", raw);
    }

    Ok((property, ids))
}

pub fn handle_apply_command(config: Option<&Path>, args: ApplyArgs) -> Result<()> {
    let mut dataset = load_dataset(&args.target.data)?;
    let config = resolve_config(config, &dataset)?;

    let assignments = args
        .assignments
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    let event = if args.insert {
        LifecycleEvent::AfterInsert
    } else {
        LifecycleEvent::AfterUpdate
    };

    let (result, wrote) = {
        let host = MemoryHost::new(&mut dataset, &args.target.record)?;
        let mut behavior = RelationBehavior::new(host, config)?;

        for (property, ids) in &assignments {
            if !behavior.can_set_property(property) {
                anyhow::bail!("'{}' is not a relation property", property);
            }
            behavior
                .set(property, &parse_id_list(ids))
                .with_context(|| format!("Failed to assign '{}'", property))?;
        }

        let result = behavior.after_commit(event);

        print_journal(behavior.host().journal());
        (result, !behavior.host().journal().is_empty())
    };

    match &result {
        Ok(results) if results.is_empty() => println!("{}", "No relation changes".dimmed()),
        Ok(results) => {
            for (relation, outcome) in results {
                print_outcome(relation, outcome);
            }
        }
        Err(err) => print_partial(err),
    }

    // Relations synced before a failure stay synced, so their writes are kept
    if args.dry_run {
        println!("{}", "Dry run: dataset not written".yellow());
    } else if wrote {
        dataset.save(&args.target.data)?;
    }

    result
        .map(|_| ())
        .with_context(|| format!("Failed to synchronise relations on {}", event))
}
