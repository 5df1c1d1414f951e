//! Forget command - drop the retained handle and staged data without
//! touching the vault file itself.

use anyhow::Result;

use secvault_core::VaultRepository;

pub fn execute(repo: &mut VaultRepository) -> Result<()> {
    repo.forget_vault()?;
    println!("Forgot the vault file handle. The vault file itself is untouched.");
    Ok(())
}
