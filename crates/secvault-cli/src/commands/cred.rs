//! Credential management: add, update, rm, list.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use secvault_core::{Credential, VaultRepository};

use crate::output::{create_table, mask, matches_filter};
use crate::report_save;

#[derive(Subcommand)]
pub enum Command {
    /// Add a credential (duplicate sites are fine)
    Add {
        /// Site this credential belongs to
        site: String,
        /// Username or account identifier
        user: String,
        /// Password; omit to be prompted
        pass: Option<String>,
    },

    /// Replace the credential at a position
    Update {
        /// Position as shown by `cred list`
        index: usize,
        site: String,
        user: String,
        /// Password; omit to be prompted
        pass: Option<String>,
    },

    /// Remove the credential at a position
    Rm {
        /// Position as shown by `cred list`
        index: usize,
    },

    /// List credentials
    List {
        /// Only show credentials whose site or user contains this
        #[arg(long)]
        filter: Option<String>,

        /// Show passwords in clear text
        #[arg(long)]
        reveal: bool,

        /// Output as JSON (always clear text)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct CredOutput<'a> {
    index: usize,
    site: &'a str,
    user: &'a str,
    pass: &'a str,
}

fn entry_password(pass: Option<&String>) -> Result<String> {
    match pass {
        Some(pass) => Ok(pass.clone()),
        None => rpassword::prompt_password("Password for this credential: ")
            .context("Failed to read credential password"),
    }
}

pub fn execute(repo: &mut VaultRepository, command: &Command) -> Result<()> {
    match command {
        Command::Add { site, user, pass } => {
            let pass = entry_password(pass.as_ref())?;
            let status = repo
                .add_credential(site, user, &pass)
                .context("Failed to add credential")?;
            report_save(status);
            println!("Added credential for {site}.");
        }
        Command::Update {
            index,
            site,
            user,
            pass,
        } => {
            let pass = entry_password(pass.as_ref())?;
            let status = repo
                .update_credential(
                    *index,
                    Credential {
                        site: site.clone(),
                        user: user.clone(),
                        pass,
                    },
                )
                .context("Failed to update credential")?;
            report_save(status);
            println!("Updated credential {index}.");
        }
        Command::Rm { index } => {
            let status = repo
                .delete_credential(*index)
                .context("Failed to remove credential")?;
            report_save(status);
            println!("Removed credential {index}.");
        }
        Command::List {
            filter,
            reveal,
            json,
        } => {
            let creds: Vec<CredOutput<'_>> = repo
                .credentials()?
                .iter()
                .enumerate()
                .filter(|(_, c)| matches_filter(&[&c.site, &c.user], filter.as_deref()))
                .map(|(index, c)| CredOutput {
                    index,
                    site: &c.site,
                    user: &c.user,
                    pass: &c.pass,
                })
                .collect();

            if *json {
                println!("{}", serde_json::to_string_pretty(&creds)?);
            } else {
                let mut table = create_table(&["#", "Site", "User", "Password"]);
                for c in &creds {
                    table.add_row(vec![
                        c.index.to_string(),
                        c.site.to_owned(),
                        c.user.to_owned(),
                        mask(c.pass, *reveal),
                    ]);
                }
                println!("{table}");
            }
        }
    }
    Ok(())
}
