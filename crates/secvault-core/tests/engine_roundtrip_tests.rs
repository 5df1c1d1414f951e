//! End-to-end tests of the vault engine: create, mutate, lock, unlock
//! and reload across both storage backends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use secvault_core::storage::{CapabilityFileBackend, FallbackStore, StorageError};
use secvault_core::vault::DECRYPTION_FAILED_PLACEHOLDER;
use secvault_core::{
    Credential, ExportOutcome, HandlePicker, InformationItem, NoPicker, SaveStatus, SessionState,
    VaultError, VaultRepository,
};
use tempfile::TempDir;

/// Picker that always returns one fixed path, like a user who picks
/// the same file every time.
struct FixedPicker(PathBuf);

impl HandlePicker for FixedPicker {
    fn pick_existing(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(Some(self.0.clone()))
    }

    fn pick_save_target(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(Some(self.0.clone()))
    }
}

fn fallback_repo(data_dir: &Path) -> VaultRepository {
    VaultRepository::new(
        Box::new(FallbackStore::open(data_dir).unwrap()),
        Box::new(NoPicker),
    )
}

fn file_repo(data_dir: &Path, vault_file: &Path) -> VaultRepository {
    VaultRepository::new(
        Box::new(CapabilityFileBackend::open(data_dir).unwrap()),
        Box::new(FixedPicker(vault_file.to_path_buf())),
    )
}

fn populate(repo: &mut VaultRepository) {
    repo.add_information("A", "1").unwrap();
    repo.add_credential("s.com", "u", "pw").unwrap();
}

#[test]
fn fallback_roundtrip_across_lock() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    assert!(!repo.startup_probe().unwrap());
    repo.unlock("P").unwrap();
    populate(&mut repo);
    repo.lock().unwrap();
    assert_eq!(repo.state(), SessionState::Locked);

    // Fresh process: probe finds the vault, the right password
    // restores identical plaintext.
    let mut repo = fallback_repo(dir.path());
    assert!(repo.startup_probe().unwrap());
    repo.unlock("P").unwrap();
    assert_eq!(
        repo.information().unwrap(),
        &[InformationItem {
            name: "A".into(),
            value: "1".into()
        }]
    );
    assert_eq!(
        repo.credentials().unwrap(),
        &[Credential {
            site: "s.com".into(),
            user: "u".into(),
            pass: "pw".into()
        }]
    );
}

#[test]
fn file_backend_roundtrip_with_reselection() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let vault_file = dir.path().join("vault.dat");

    let mut repo = file_repo(&data_dir, &vault_file);
    repo.unlock("P").unwrap();
    populate(&mut repo);
    // Lock flushes, wipes, and clears the retained handle.
    repo.lock().unwrap();
    assert!(vault_file.exists());

    // With the handle cleared, startup finds nothing; the explicit
    // user-gesture selection path brings the vault back.
    let mut repo = file_repo(&data_dir, &vault_file);
    assert!(!repo.startup_probe().unwrap());
    assert!(repo.select_existing_vault().unwrap());
    repo.unlock("P").unwrap();
    assert_eq!(repo.information().unwrap().len(), 1);
    assert_eq!(repo.credentials().unwrap().len(), 1);
}

#[test]
fn wrong_password_never_mutates_stored_document() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    populate(&mut repo);
    repo.lock().unwrap();

    let store_file = dir.path().join("fallback-store.json");
    let before = fs::read(&store_file).unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.startup_probe().unwrap();
    assert!(matches!(repo.unlock("wrong"), Err(VaultError::WrongPassword)));
    assert_eq!(repo.state(), SessionState::Locked);
    assert!(repo.information().is_err());

    // Byte-identical except for the staged cache the probe wrote;
    // compare the durable document entry itself.
    let after = fs::read(&store_file).unwrap();
    let before: serde_json::Value = serde_json::from_slice(&before).unwrap();
    let after: serde_json::Value = serde_json::from_slice(&after).unwrap();
    assert_eq!(before["vaultData"], after["vaultData"]);
}

#[test]
fn wrong_password_then_retry_succeeds_without_reselection() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    populate(&mut repo);
    repo.lock().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.startup_probe().unwrap();
    assert!(matches!(repo.unlock("wrong"), Err(VaultError::WrongPassword)));

    // The staged cache survives the failed attempt.
    repo.unlock("P").unwrap();
    assert_eq!(repo.information().unwrap().len(), 1);
}

#[test]
fn delete_preserves_order_of_remaining_items() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    repo.add_information("zulu", "1").unwrap();
    repo.add_information("alpha", "2").unwrap();
    repo.add_information("mike", "3").unwrap();
    repo.delete_information(1).unwrap();
    repo.lock().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.startup_probe().unwrap();
    repo.unlock("P").unwrap();

    let names: Vec<&str> = repo
        .information()
        .unwrap()
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(names, ["zulu", "mike"]);
    assert_eq!(repo.information().unwrap()[1].value, "3");
}

#[test]
fn corrupted_field_degrades_to_placeholder_on_reload() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    repo.add_information("good", "kept").unwrap();
    repo.add_information("bad", "lost").unwrap();
    repo.lock().unwrap();

    // Corrupt exactly one ciphertext field inside the stored document.
    let store_file = dir.path().join("fallback-store.json");
    let mut store: serde_json::Value =
        serde_json::from_slice(&fs::read(&store_file).unwrap()).unwrap();
    let mut doc: serde_json::Value =
        serde_json::from_str(store["vaultData"].as_str().unwrap()).unwrap();
    doc["information"]["bad"] = serde_json::Value::String("AAAAtampered".into());
    store["vaultData"] = serde_json::Value::String(doc.to_string());
    fs::write(&store_file, serde_json::to_vec(&store).unwrap()).unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.startup_probe().unwrap();
    repo.unlock("P").unwrap();

    // Look entries up by name: the corruption step above rewrote the
    // document through serde_json::Value, which re-sorts object keys.
    let info = repo.information().unwrap();
    let by_name = |name: &str| {
        info.iter()
            .find(|i| i.name == name)
            .map(|i| i.value.as_str())
    };
    assert_eq!(by_name("good"), Some("kept"));
    assert_eq!(by_name("bad"), Some(DECRYPTION_FAILED_PLACEHOLDER));
}

#[test]
fn durable_state_matches_last_completed_save() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    // Every mutation is its own full save; the stored document must
    // reflect the final in-memory state, not any interleaving.
    repo.add_information("a", "1").unwrap();
    repo.add_information("b", "2").unwrap();
    repo.add_information("a", "3").unwrap();
    repo.delete_information(1).unwrap();

    let mut reloaded = fallback_repo(dir.path());
    reloaded.startup_probe().unwrap();
    reloaded.unlock("P").unwrap();
    assert_eq!(
        reloaded.information().unwrap(),
        &[InformationItem {
            name: "a".into(),
            value: "3".into()
        }]
    );
}

#[test]
fn lock_wipes_key_and_collections() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    populate(&mut repo);
    repo.lock().unwrap();

    assert_eq!(repo.state(), SessionState::Locked);
    assert!(matches!(repo.information(), Err(VaultError::Locked)));
    assert!(matches!(repo.credentials(), Err(VaultError::Locked)));
}

#[test]
fn empty_inputs_are_rejected_before_any_save() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();

    assert!(matches!(
        repo.add_information("", "v"),
        Err(VaultError::EmptyInput("name"))
    ));
    assert!(matches!(
        repo.add_information("n", ""),
        Err(VaultError::EmptyInput("value"))
    ));
    assert!(matches!(
        repo.add_credential("s", "u", ""),
        Err(VaultError::EmptyInput("pass"))
    ));

    // Nothing was persisted.
    assert!(!dir.path().join("fallback-store.json").exists());
}

#[test]
fn crud_requires_unlocked_session() {
    let dir = TempDir::new().unwrap();
    let mut repo = fallback_repo(dir.path());

    assert!(matches!(
        repo.add_information("n", "v"),
        Err(VaultError::Locked)
    ));
    assert!(matches!(repo.delete_credential(0), Err(VaultError::Locked)));
}

#[test]
fn update_information_rename_collision_is_last_write_wins() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    repo.add_information("first", "1").unwrap();
    repo.add_information("second", "2").unwrap();

    // Rename "second" to "first": the old "first" goes away.
    repo.update_information(
        1,
        InformationItem {
            name: "first".into(),
            value: "updated".into(),
        },
    )
    .unwrap();

    assert_eq!(
        repo.information().unwrap(),
        &[InformationItem {
            name: "first".into(),
            value: "updated".into()
        }]
    );
}

#[test]
fn update_and_delete_credential_by_position() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    repo.add_credential("s.com", "alice", "pw1").unwrap();
    repo.add_credential("s.com", "bob", "pw2").unwrap();

    repo.update_credential(
        0,
        Credential {
            site: "s.com".into(),
            user: "alice".into(),
            pass: "rotated".into(),
        },
    )
    .unwrap();
    repo.delete_credential(1).unwrap();

    let creds = repo.credentials().unwrap();
    assert_eq!(creds.len(), 1);
    assert_eq!(creds[0].pass, "rotated");

    assert!(matches!(
        repo.delete_credential(5),
        Err(VaultError::InvalidIndex(5))
    ));
}

#[test]
fn export_snapshot_writes_dated_backup() {
    let dir = TempDir::new().unwrap();
    let export_dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    populate(&mut repo);

    let path = match repo.export_snapshot(export_dir.path()).unwrap() {
        ExportOutcome::Exported(path) => path,
        ExportOutcome::Cancelled => panic!("fallback backend never cancels"),
    };
    let date = chrono::Local::now().format("%Y-%m-%d");
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("vault-backup-{date}.json")
    );

    // The backup is a complete standalone document.
    let doc: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert!(doc["masterHash"].is_string());
    assert!(doc["information"]["A"].is_string());
    assert_eq!(doc["credentials"][0]["site"], "s.com");
}

#[test]
fn export_with_cancelled_primary_save_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let export_dir = dir.path().join("backups");
    fs::create_dir_all(&export_dir).unwrap();

    // File backend with no retained handle and a picker the user
    // dismisses: the primary save cannot land.
    let mut repo = VaultRepository::new(
        Box::new(CapabilityFileBackend::open(&data_dir).unwrap()),
        Box::new(NoPicker),
    );
    repo.unlock("P").unwrap();
    assert_eq!(
        repo.add_information("A", "1").unwrap(),
        SaveStatus::Cancelled
    );

    assert_eq!(
        repo.export_snapshot(&export_dir).unwrap(),
        ExportOutcome::Cancelled
    );
    // No backup copy appeared, and no vault reached durable storage.
    assert_eq!(fs::read_dir(&export_dir).unwrap().count(), 0);
    let mut fresh = VaultRepository::new(
        Box::new(CapabilityFileBackend::open(&data_dir).unwrap()),
        Box::new(NoPicker),
    );
    assert!(!fresh.startup_probe().unwrap());
}

#[test]
fn export_backup_failure_does_not_roll_back_primary_save() {
    let dir = TempDir::new().unwrap();

    let mut repo = fallback_repo(dir.path());
    repo.unlock("P").unwrap();
    populate(&mut repo);

    let missing = dir.path().join("does-not-exist");
    assert!(matches!(
        repo.export_snapshot(&missing),
        Err(VaultError::BackupFailed(_))
    ));

    // The primary save went through regardless.
    let mut reloaded = fallback_repo(dir.path());
    assert!(reloaded.startup_probe().unwrap());
    reloaded.unlock("P").unwrap();
    assert_eq!(reloaded.information().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn revoked_permission_demotes_to_no_vault_known() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let vault_file = dir.path().join("vault.dat");

    let mut repo = file_repo(&data_dir, &vault_file);
    repo.unlock("P").unwrap();
    populate(&mut repo);
    // Keep the handle alive: no lock, just drop the repository.
    drop(repo);

    let mut perms = fs::metadata(&vault_file).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&vault_file, perms).unwrap();

    let mut repo = file_repo(&data_dir, &vault_file);
    assert!(matches!(
        repo.startup_probe(),
        Err(VaultError::Storage(StorageError::PermissionDenied))
    ));

    // The stale handle was discarded: the next probe reports no vault
    // rather than failing again.
    let mut repo = file_repo(&data_dir, &vault_file);
    assert!(!repo.startup_probe().unwrap());

    let mut perms = fs::metadata(&vault_file).unwrap().permissions();
    perms.set_readonly(false);
    fs::set_permissions(&vault_file, perms).unwrap();
}
