//! Information item management: add, update, rm, list.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use secvault_core::{InformationItem, VaultRepository};

use crate::output::{create_table, matches_filter};
use crate::report_save;

#[derive(Subcommand)]
pub enum Command {
    /// Add an information item (overwrites an existing name)
    Add {
        /// Unique name of the item
        name: String,
        /// The value to store encrypted
        value: String,
    },

    /// Replace the item at a position
    Update {
        /// Position as shown by `info list`
        index: usize,
        name: String,
        value: String,
    },

    /// Remove the item at a position
    Rm {
        /// Position as shown by `info list`
        index: usize,
    },

    /// List information items
    List {
        /// Only show items whose name or value contains this
        #[arg(long)]
        filter: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    index: usize,
    name: &'a str,
    value: &'a str,
}

pub fn execute(repo: &mut VaultRepository, command: &Command) -> Result<()> {
    match command {
        Command::Add { name, value } => {
            let status = repo
                .add_information(name, value)
                .context("Failed to add information item")?;
            report_save(status);
            println!("Added \"{name}\".");
        }
        Command::Update { index, name, value } => {
            let status = repo
                .update_information(
                    *index,
                    InformationItem {
                        name: name.clone(),
                        value: value.clone(),
                    },
                )
                .context("Failed to update information item")?;
            report_save(status);
            println!("Updated item {index}.");
        }
        Command::Rm { index } => {
            let status = repo
                .delete_information(*index)
                .context("Failed to remove information item")?;
            report_save(status);
            println!("Removed item {index}.");
        }
        Command::List { filter, json } => {
            let items: Vec<InfoOutput<'_>> = repo
                .information()?
                .iter()
                .enumerate()
                .filter(|(_, item)| {
                    matches_filter(&[&item.name, &item.value], filter.as_deref())
                })
                .map(|(index, item)| InfoOutput {
                    index,
                    name: &item.name,
                    value: &item.value,
                })
                .collect();

            if *json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                let mut table = create_table(&["#", "Name", "Value"]);
                for item in &items {
                    table.add_row(vec![&item.index.to_string(), item.name, item.value]);
                }
                println!("{table}");
            }
        }
    }
    Ok(())
}
