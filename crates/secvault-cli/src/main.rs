#![deny(unsafe_code)]

mod commands;
mod output;
mod picker;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use secvault_core::{SaveStatus, VaultError, VaultRepository, select_backend};

use crate::commands::{cred, export, forget, info, lock, select, show, status};
use crate::picker::CliPicker;

/// Command-line interface for SecVault personal vaults
#[derive(Parser)]
#[command(name = "secvault")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Where is my vault, and which backend is in use?
    secvault status

    # Point the vault at an existing file (user gesture)
    secvault --file ~/vault.dat select

    # Add a credential (pipe password from a secret manager)
    echo \"$SECRET\" | secvault --password-stdin cred add example.com alice

    # Show everything as a table
    secvault show

    # Dated backup copy next to the primary save
    secvault export --dir ~/backups
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Application data directory (handle record, fallback store)
    #[arg(long, env = "SECVAULT_DATA_DIR", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Vault file for gestures that pick one; omitting it cancels the
    /// gesture
    #[arg(long, value_name = "FILE", global = true)]
    file: Option<PathBuf>,

    /// Use the key-value fallback store instead of a vault file
    #[arg(long, global = true)]
    fallback: bool,

    /// Master password (insecure, prefer --password-stdin or SECVAULT_PASSWORD)
    #[arg(long, env = "SECVAULT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Read master password from stdin (single line)
    #[arg(long, conflicts_with = "password", global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend capability and vault availability
    Status,

    /// Select an existing vault file (user gesture, needs --file)
    Select,

    /// Lock the vault: flush, wipe, clear the retained handle
    Lock,

    /// Forget the retained handle and staged data without saving
    Forget,

    /// Manage information items
    #[command(subcommand)]
    Info(info::Command),

    /// Manage website credentials
    #[command(subcommand)]
    Cred(cred::Command),

    /// Show both collections
    Show(show::Args),

    /// Save and write a dated backup copy
    Export(export::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    let mut repo = open_repository(&cli)?;

    match &cli.command {
        Commands::Status => status::execute(&mut repo, cli.quiet),
        Commands::Select => select::execute(&mut repo),
        Commands::Lock => {
            let unlocked = unlock_if_vault_exists(&mut repo, &cli)?;
            lock::execute(&mut repo, unlocked)
        }
        Commands::Forget => forget::execute(&mut repo),
        Commands::Info(command) => {
            unlock(&mut repo, &cli)?;
            info::execute(&mut repo, command)
        }
        Commands::Cred(command) => {
            unlock(&mut repo, &cli)?;
            cred::execute(&mut repo, command)
        }
        Commands::Show(args) => {
            unlock(&mut repo, &cli)?;
            show::execute(&repo, args)
        }
        Commands::Export(args) => {
            unlock(&mut repo, &cli)?;
            export::execute(&mut repo, args)
        }
    }
}

fn setup_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("secvault={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_repository(cli: &Cli) -> Result<VaultRepository> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => directories::ProjectDirs::from("com", "SecVault", "secvault")
            .context("Could not determine an application data directory")?
            .data_dir()
            .to_path_buf(),
    };

    let storage = select_backend(&data_dir, cli.fallback)
        .context("No usable storage backend on this host")?;
    let picker = CliPicker::new(cli.file.clone());

    let repo = VaultRepository::new(storage, Box::new(picker));
    tracing::debug!(
        data_dir = %data_dir.display(),
        backend = %repo.backend_kind(),
        "opened vault repository"
    );
    Ok(repo)
}

/// Probe for an existing vault, then unlock with the acquired
/// password. A fresh vault is created when none exists.
fn unlock(repo: &mut VaultRepository, cli: &Cli) -> Result<()> {
    let found = probe(repo)?;
    let password = get_passphrase(cli, found)?;
    repo.unlock(&password).map_err(map_unlock_error)?;
    Ok(())
}

/// Like [`unlock`], but reports whether a vault existed; `lock` on a
/// host with no vault at all is a no-op rather than a prompt.
fn unlock_if_vault_exists(repo: &mut VaultRepository, cli: &Cli) -> Result<bool> {
    if !probe(repo)? {
        return Ok(false);
    }
    let password = get_passphrase(cli, true)?;
    repo.unlock(&password).map_err(map_unlock_error)?;
    Ok(true)
}

fn probe(repo: &mut VaultRepository) -> Result<bool> {
    match repo.startup_probe() {
        Ok(found) => Ok(found),
        Err(VaultError::Storage(secvault_core::error::StorageError::PermissionDenied)) => {
            bail!(
                "The vault file is no longer accessible; its handle has been cleared. \
                 Run `secvault --file <FILE> select` to pick it again."
            )
        }
        Err(e) => Err(e).context("Failed to probe for an existing vault"),
    }
}

fn map_unlock_error(e: VaultError) -> anyhow::Error {
    match e {
        VaultError::WrongPassword => anyhow::anyhow!("Incorrect master password"),
        other => anyhow::Error::new(other).context("Failed to unlock the vault"),
    }
}

fn get_passphrase(cli: &Cli, vault_exists: bool) -> Result<String> {
    if let Some(password) = &cli.password {
        return Ok(password.clone());
    }

    if cli.password_stdin {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read password from stdin")?;
        let password = buffer.lines().next().unwrap_or("").to_owned();
        if password.is_empty() {
            bail!("Empty password on stdin");
        }
        return Ok(password);
    }

    let prompt = if vault_exists {
        "Master password: "
    } else {
        "Master password for new vault: "
    };
    rpassword::prompt_password(prompt).context("Failed to read password")
}

/// Report a save outcome the user should know about.
pub(crate) fn report_save(status: SaveStatus) {
    if status == SaveStatus::Cancelled {
        eprintln!(
            "Warning: no save target selected; changes are not persisted. \
             Re-run with --file <FILE> or --fallback."
        );
    }
}
