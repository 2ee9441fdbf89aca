//! `relsync show`

use std::path::Path;

use anyhow::Result;
use colored::*;

use relsync::{MemoryHost, RelationBehavior};

use super::ShowArgs;
use crate::cli::{load_dataset, resolve_config};

pub fn handle_show_command(config: Option<&Path>, args: ShowArgs) -> Result<()> {
    let mut dataset = load_dataset(&args.target.data)?;
    let config = resolve_config(config, &dataset)?;

    let host = MemoryHost::new(&mut dataset, &args.target.record)?;
    let mut behavior = RelationBehavior::new(host, config)?;

    let relations: Vec<String> = match args.relation {
        Some(relation) => vec![relation],
        None => behavior.registry().relations().to_vec(),
    };

    println!("Record {}", args.target.record.cyan());
    for relation in relations {
        let ids = behavior.relation_ids(&relation)?;
        let property = behavior.registry().property_name(&relation);
        let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();

        println!(
            "  {} ({}): [{}]",
            relation.bold(),
            property.dimmed(),
            rendered.join(", ")
        );
    }

    Ok(())
}
