//! Integration tests for the hardware-backed vault.

use std::sync::Arc;

use cipherstack::crypto::{Argon2Params, CryptoEngine};
use cipherstack::errors::{CipherStackError, Result};
use cipherstack::vault::{
    FileStore, HardwareKeystore, HardwareVault, MemoryStore, PreferenceStore, SoftwareKeystore,
    WrappedBlob,
};
use tempfile::TempDir;
use zeroize::Zeroizing;

fn light_engine() -> CryptoEngine {
    CryptoEngine::new(Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

fn memory_vault() -> HardwareVault<SoftwareKeystore, MemoryStore> {
    HardwareVault::with_engine(SoftwareKeystore::new(), MemoryStore::new(), light_engine())
}

/// Shares one software key between several vault handles, the way the
/// OS keystore outlives a process.
#[derive(Clone)]
struct SharedKeystore(Arc<SoftwareKeystore>);

impl HardwareKeystore for SharedKeystore {
    fn has_key(&self) -> Result<bool> {
        self.0.has_key()
    }

    fn generate_non_exportable_key(&self) -> Result<()> {
        self.0.generate_non_exportable_key()
    }

    fn wrap(&self, plaintext: &[u8]) -> Result<WrappedBlob> {
        self.0.wrap(plaintext)
    }

    fn unwrap(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.0.unwrap(iv, ciphertext)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn save_load_rename_delete_lifecycle() {
    let vault = memory_vault();

    let meta = vault.save("  bank ", "BlueHorse-42!").unwrap();
    assert_eq!(meta.alias, "bank");

    let secret = vault.load("bank").unwrap().unwrap();
    assert_eq!(secret.as_str(), "BlueHorse-42!");

    vault.rename("bank", "savings").unwrap();
    assert!(vault.load("bank").unwrap().is_none());
    assert_eq!(
        vault.load("savings").unwrap().unwrap().as_str(),
        "BlueHorse-42!"
    );

    assert!(vault.delete("savings").unwrap());
    assert!(!vault.delete("savings").unwrap());
    assert!(vault.list().unwrap().is_empty());
}

#[test]
fn aliases_are_independent() {
    let vault = memory_vault();
    vault.save("a", "first").unwrap();
    vault.save("b", "second").unwrap();
    vault.save("a", "replaced").unwrap();

    assert_eq!(vault.load("a").unwrap().unwrap().as_str(), "replaced");
    assert_eq!(vault.load("b").unwrap().unwrap().as_str(), "second");
}

#[test]
fn list_is_sorted_and_carries_strength() {
    let vault = memory_vault();
    vault.save("zeta", "x").unwrap();
    vault.save("alpha", "correct horse battery staple 9!").unwrap();
    vault.save("mid", "hunter2").unwrap();

    let list = vault.list().unwrap();
    let aliases: Vec<&str> = list.iter().map(|m| m.alias.as_str()).collect();
    assert_eq!(aliases, vec!["alpha", "mid", "zeta"]);
    assert!(list[0].strength_score > list[2].strength_score);
}

#[test]
fn stored_blobs_never_contain_the_secret() {
    let vault = memory_vault();
    vault.save("note", "plain-text-marker").unwrap();

    let store = vault.store();
    for key in store.keys().unwrap() {
        let value = store.get(&key).unwrap().unwrap();
        assert!(!value.contains("plain-text-marker"), "{key}");
    }
}

#[test]
fn rename_semantics() {
    let vault = memory_vault();
    vault.save("one", "1").unwrap();
    vault.save("two", "2").unwrap();

    assert!(matches!(
        vault.rename("missing", "x"),
        Err(CipherStackError::AliasNotFound(_))
    ));
    assert!(matches!(
        vault.rename("one", "two"),
        Err(CipherStackError::AliasAlreadyExists(_))
    ));

    vault.rename("one", "one").unwrap();
    assert_eq!(vault.load("one").unwrap().unwrap().as_str(), "1");
    assert_eq!(vault.load("two").unwrap().unwrap().as_str(), "2");
}

#[test]
fn invalid_aliases_are_rejected() {
    let vault = memory_vault();
    let too_long = "x".repeat(129);
    for alias in ["", "   ", "tab\there", too_long.as_str()] {
        assert!(
            matches!(
                vault.save(alias, "s"),
                Err(CipherStackError::InvalidAlias(_))
            ),
            "{alias:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Persistence and key loss
// ---------------------------------------------------------------------------

#[test]
fn file_backed_vault_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let keystore = SharedKeystore(Arc::new(SoftwareKeystore::new()));

    {
        let store = FileStore::in_dir(dir.path()).unwrap();
        let vault = HardwareVault::with_engine(keystore.clone(), store, light_engine());
        vault.save("db", "postgres://localhost/app").unwrap();
    }

    let store = FileStore::in_dir(dir.path()).unwrap();
    let vault = HardwareVault::with_engine(keystore, store, light_engine());
    assert_eq!(
        vault.load("db").unwrap().unwrap().as_str(),
        "postgres://localhost/app"
    );
}

#[test]
fn concurrent_handles_on_one_directory_keep_every_save() {
    let dir = TempDir::new().unwrap();
    let keystore = SharedKeystore(Arc::new(SoftwareKeystore::new()));

    let writers: Vec<_> = (0..6)
        .map(|i| {
            let path = dir.path().to_path_buf();
            let keystore = keystore.clone();
            std::thread::spawn(move || {
                // Each thread opens the vault like a separate CLI run.
                let store = FileStore::in_dir(&path).unwrap();
                let vault = HardwareVault::with_engine(keystore, store, light_engine());
                vault.save(&format!("svc{i}"), &format!("token-{i}")).unwrap();
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    let store = FileStore::in_dir(dir.path()).unwrap();
    let vault = HardwareVault::with_engine(keystore, store, light_engine());
    assert_eq!(vault.list().unwrap().len(), 6);
    for i in 0..6 {
        assert_eq!(
            vault.load(&format!("svc{i}")).unwrap().unwrap().as_str(),
            format!("token-{i}")
        );
    }
}

#[test]
fn a_different_hardware_key_cannot_open_the_vault() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileStore::in_dir(dir.path()).unwrap();
        let vault = HardwareVault::with_engine(SoftwareKeystore::new(), store, light_engine());
        vault.save("db", "secret").unwrap();
    }

    // Fresh keystore: has no key at all.
    let store = FileStore::in_dir(dir.path()).unwrap();
    let vault = HardwareVault::with_engine(SoftwareKeystore::new(), store, light_engine());
    assert!(matches!(
        vault.load("db"),
        Err(CipherStackError::VaultSeedUnavailable)
    ));
    // Metadata is still readable.
    assert_eq!(vault.list().unwrap().len(), 1);
}

#[test]
fn destroyed_key_makes_entries_unrecoverable() {
    let vault = memory_vault();
    vault.save("bank", "BlueHorse").unwrap();

    vault.keystore().destroy_key();
    assert!(matches!(
        vault.load("bank"),
        Err(CipherStackError::VaultSeedUnavailable)
    ));
    assert!(matches!(
        vault.save("other", "x"),
        Err(CipherStackError::VaultSeedUnavailable)
    ));
}

#[test]
fn initialize_creates_seed_once() {
    let vault = memory_vault();
    vault.initialize().unwrap();
    let seed = vault.store().get("vault.seed").unwrap().unwrap();

    vault.initialize().unwrap();
    vault.save("x", "y").unwrap();
    assert_eq!(vault.store().get("vault.seed").unwrap().unwrap(), seed);
}
