//! Export command - save, then write a dated standalone backup copy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use secvault_core::{ExportOutcome, VaultError, VaultRepository};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory to write the backup into (default: current directory)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

pub fn execute(repo: &mut VaultRepository, args: &Args) -> Result<()> {
    match repo.export_snapshot(&args.dir) {
        Ok(ExportOutcome::Exported(path)) => {
            println!("Exported backup to {}", path.display());
            Ok(())
        }
        Ok(ExportOutcome::Cancelled) => {
            eprintln!(
                "Warning: no save target selected; nothing was exported. \
                 Re-run with --file <FILE> or --fallback."
            );
            Ok(())
        }
        Err(VaultError::BackupFailed(e)) => {
            // The primary save already succeeded; only the copy failed.
            eprintln!("Warning: vault saved, but the backup copy could not be written: {e}");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to export the vault"),
    }
}
