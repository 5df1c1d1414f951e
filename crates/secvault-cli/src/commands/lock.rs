//! Lock command - flush, wipe, clear the retained handle.

use anyhow::Result;

use secvault_core::VaultRepository;

pub fn execute(repo: &mut VaultRepository, was_unlocked: bool) -> Result<()> {
    repo.lock()?;
    if was_unlocked {
        println!("Vault locked and saved.");
    } else {
        println!("No vault to lock.");
    }
    Ok(())
}
