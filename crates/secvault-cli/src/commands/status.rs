//! Status command - backend capability notice and vault availability.

use anyhow::Result;

use secvault_core::VaultRepository;

pub fn execute(repo: &mut VaultRepository, quiet: bool) -> Result<()> {
    let backend = repo.backend_kind();
    let found = match repo.startup_probe() {
        Ok(found) => found,
        Err(e) => {
            // A permission problem already cleared the handle; the
            // status report should say so rather than fail.
            if !quiet {
                eprintln!("Note: {e}");
            }
            false
        }
    };

    println!("Backend: {backend}");
    if found {
        println!("Vault: found (enter your password to unlock)");
    } else {
        println!("Vault: none known yet");
        if !quiet {
            println!("Hint: `secvault --file <FILE> select` to pick an existing vault file,");
            println!("      or any mutating command to create a fresh one.");
        }
    }
    Ok(())
}
