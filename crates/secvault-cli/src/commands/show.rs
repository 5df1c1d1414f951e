//! Show command - both collections at once.

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;

use secvault_core::VaultRepository;

use crate::output::{create_table, mask, matches_filter};

#[derive(ClapArgs)]
pub struct Args {
    /// Only show entries containing this substring
    #[arg(long)]
    pub filter: Option<String>,

    /// Show credential passwords in clear text
    #[arg(long)]
    pub reveal: bool,

    /// Output as JSON (always clear text)
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ShowOutput {
    information: Vec<InfoEntry>,
    credentials: Vec<CredEntry>,
}

#[derive(Serialize)]
struct InfoEntry {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct CredEntry {
    site: String,
    user: String,
    pass: String,
}

pub fn execute(repo: &VaultRepository, args: &Args) -> Result<()> {
    let filter = args.filter.as_deref();

    let information: Vec<InfoEntry> = repo
        .information()?
        .iter()
        .filter(|i| matches_filter(&[&i.name, &i.value], filter))
        .map(|i| InfoEntry {
            name: i.name.clone(),
            value: i.value.clone(),
        })
        .collect();

    let credentials: Vec<CredEntry> = repo
        .credentials()?
        .iter()
        .filter(|c| matches_filter(&[&c.site, &c.user], filter))
        .map(|c| CredEntry {
            site: c.site.clone(),
            user: c.user.clone(),
            pass: c.pass.clone(),
        })
        .collect();

    if args.json {
        let output = ShowOutput {
            information,
            credentials,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut info_table = create_table(&["Name", "Value"]);
    for i in &information {
        info_table.add_row(vec![&i.name, &i.value]);
    }
    println!("Information:\n{info_table}\n");

    let mut cred_table = create_table(&["Site", "User", "Password"]);
    for c in &credentials {
        cred_table.add_row(vec![
            c.site.clone(),
            c.user.clone(),
            mask(&c.pass, args.reveal),
        ]);
    }
    println!("Credentials:\n{cred_table}");
    Ok(())
}
