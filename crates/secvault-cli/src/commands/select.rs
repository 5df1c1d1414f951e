//! Select command - the explicit user-gesture vault selection path.

use anyhow::Result;

use secvault_core::VaultRepository;

pub fn execute(repo: &mut VaultRepository) -> Result<()> {
    if repo.select_existing_vault()? {
        println!("Vault file selected. Enter your password to unlock.");
    } else {
        // Cancellation is not an error.
        println!("No vault file selected.");
    }
    Ok(())
}
