//! Named secrets encrypted under a hardware-wrapped seed.
//!
//! On first use a random 256-bit seed is generated, wrapped by the
//! `HardwareKeystore` and persisted in wrapped form only. Every save/load
//! unwraps it, renders it as 64 lowercase hex characters and hands that to
//! `CryptoEngine` as the password for the fixed
//! `AES_GCM -> TWOFISH_CBC -> SERPENT_CBC` chain. The seed and its hex
//! rendering are zeroized as soon as the call returns.
//!
//! Losing the wrapping key loses every entry. There is no export path.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::progress::NoProgress;
use crate::crypto::secure_memory::estimate_strength;
use crate::crypto::{Algorithm, CryptoEngine};
use crate::errors::{CipherStackError, Result};

use super::entry::{VaultEntry, VaultEntryMetadata};
use super::keystore::{HardwareKeystore, WrappedBlob};
use super::store::PreferenceStore;

/// Store key of the wrapped seed.
pub const SEED_KEY: &str = "vault.seed";

/// Store key claimed by whoever is creating the seed.
pub const SEED_CLAIM_KEY: &str = "vault.seed.claim";

/// Store key prefix of every entry.
pub const ENTRY_PREFIX: &str = "vault.entry.";

/// Longest accepted alias, in characters.
pub const MAX_ALIAS_LEN: usize = 128;

const SEED_LEN: usize = 32;

/// A claim older than this was left by a crashed creator.
const STALE_CLAIM: Duration = Duration::from_secs(30);

/// How long to wait for another handle to finish creating the seed.
const CLAIM_WAIT: Duration = Duration::from_secs(45);

const CLAIM_POLL: Duration = Duration::from_millis(50);

/// The vault handle. Cheap to hold; all state lives in the keystore and
/// the store.
pub struct HardwareVault<K, S> {
    keystore: K,
    store: S,
    engine: CryptoEngine,
    seed_lock: Mutex<()>,
}

impl<K, S> HardwareVault<K, S>
where
    K: HardwareKeystore,
    S: PreferenceStore,
{
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Vault with default Argon2 parameters.
    pub fn new(keystore: K, store: S) -> Self {
        Self::with_engine(keystore, store, CryptoEngine::default())
    }

    /// Vault using a specific engine (tests pass light Argon2 params).
    pub fn with_engine(keystore: K, store: S, engine: CryptoEngine) -> Self {
        Self {
            keystore,
            store,
            engine,
            seed_lock: Mutex::new(()),
        }
    }

    /// Create the seed now instead of on the first save.
    pub fn initialize(&self) -> Result<()> {
        self.unwrap_or_create_seed().map(drop)
    }

    pub fn keystore(&self) -> &K {
        &self.keystore
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Encrypt and store `secret` under `alias`, replacing any existing
    /// entry. Nothing is written unless encryption succeeded.
    pub fn save(&self, alias: &str, secret: &str) -> Result<VaultEntryMetadata> {
        let alias = validate_alias(alias)?;

        let blob = {
            let password = self.seed_password()?;
            self.engine.encrypt(
                secret.as_bytes(),
                &password,
                &Algorithm::VAULT_CHAIN,
                false,
                &mut NoProgress,
            )?
        };

        let strength = estimate_strength(secret);
        let entry = VaultEntry {
            alias,
            timestamp: Utc::now(),
            strength_score: strength.score,
            strength_label: strength.label,
            blob,
        };
        self.put_entry(&entry)?;

        tracing::debug!(alias = %entry.alias, "vault entry saved");
        Ok(entry.metadata())
    }

    /// Decrypt the secret stored under `alias`, or `None` if there is none.
    pub fn load(&self, alias: &str) -> Result<Option<Zeroizing<String>>> {
        let alias = validate_alias(alias)?;
        let Some(entry) = self.get_entry(&alias)? else {
            return Ok(None);
        };

        let password = self.seed_password()?;
        let secret = self
            .engine
            .decrypt_text(&entry.blob, &password, &mut NoProgress)?;

        tracing::debug!(alias = %alias, "vault entry loaded");
        Ok(Some(secret))
    }

    /// Move an entry to a new alias. The encrypted blob moves unchanged.
    ///
    /// The entry is written under `new` before `old` is removed. If the
    /// removal fails the new copy is deleted again and the error returned,
    /// so a failed rename leaves only the old alias.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old = validate_alias(old)?;
        let new = validate_alias(new)?;

        let mut entry = self
            .get_entry(&old)?
            .ok_or_else(|| CipherStackError::AliasNotFound(old.clone()))?;
        if old == new {
            return Ok(());
        }
        if self.get_entry(&new)?.is_some() {
            return Err(CipherStackError::AliasAlreadyExists(new));
        }

        entry.alias = new;
        self.put_entry(&entry)?;
        if let Err(e) = self.store.delete(&entry_key(&old)) {
            if let Err(undo) = self.store.delete(&entry_key(&entry.alias)) {
                tracing::warn!(alias = %entry.alias, error = %undo, "could not undo rename");
            }
            return Err(e);
        }

        tracing::debug!(from = %old, to = %entry.alias, "vault entry renamed");
        Ok(())
    }

    /// Remove an entry. Returns `true` if it existed.
    pub fn delete(&self, alias: &str) -> Result<bool> {
        let alias = validate_alias(alias)?;
        let removed = self.store.delete(&entry_key(&alias))?;
        tracing::debug!(alias = %alias, removed, "vault entry delete");
        Ok(removed)
    }

    /// Metadata of every entry, sorted by alias. Decrypts nothing.
    pub fn list(&self) -> Result<Vec<VaultEntryMetadata>> {
        let mut list = Vec::new();
        for key in self.store.keys()? {
            let Some(alias) = key.strip_prefix(ENTRY_PREFIX) else {
                continue;
            };
            if let Some(entry) = self.get_entry(alias)? {
                list.push(entry.metadata());
            }
        }

        list.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(list)
    }

    /// Returns `true` if an entry exists. Metadata-only.
    pub fn contains(&self, alias: &str) -> Result<bool> {
        let alias = validate_alias(alias)?;
        Ok(self.store.get(&entry_key(&alias))?.is_some())
    }

    // ------------------------------------------------------------------
    // Seed handling
    // ------------------------------------------------------------------

    /// The unwrapped seed as lowercase hex.
    fn seed_password(&self) -> Result<Zeroizing<String>> {
        const HEX: &[u8; 16] = b"0123456789abcdef";

        let seed = self.unwrap_or_create_seed()?;

        // Full capacity up front so the string never reallocates and
        // leaves an unwiped copy behind.
        let mut hex = Zeroizing::new(String::with_capacity(SEED_LEN * 2));
        for byte in seed.iter() {
            hex.push(char::from(HEX[usize::from(byte >> 4)]));
            hex.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
        Ok(hex)
    }

    /// Unwrap the stored seed, creating it first if there is none.
    ///
    /// The mutex covers handles in this process. Handles in other
    /// processes sharing the store serialize on `SEED_CLAIM_KEY`: only the
    /// claim holder may generate the wrapping key and the seed, everyone
    /// else waits for the seed to appear.
    fn unwrap_or_create_seed(&self) -> Result<Zeroizing<Vec<u8>>> {
        let _guard = self
            .seed_lock
            .lock()
            .map_err(|_| CipherStackError::KeystoreError("vault seed lock poisoned".into()))?;

        let deadline = Instant::now() + CLAIM_WAIT;
        loop {
            if let Some(json) = self.store.get(SEED_KEY)? {
                return self.unwrap_seed(&json);
            }

            if self.store.put_if_absent(SEED_CLAIM_KEY, &Utc::now().to_rfc3339())? {
                let created = self.create_seed();
                self.store.delete(SEED_CLAIM_KEY)?;
                return created;
            }

            self.clear_stale_claim()?;
            if Instant::now() >= deadline {
                return Err(CipherStackError::KeystoreError(
                    "timed out waiting for another process to create the vault seed".into(),
                ));
            }
            thread::sleep(CLAIM_POLL);
        }
    }

    fn unwrap_seed(&self, json: &str) -> Result<Zeroizing<Vec<u8>>> {
        if !self.keystore.has_key()? {
            return Err(CipherStackError::VaultSeedUnavailable);
        }
        let blob: WrappedBlob = serde_json::from_str(json)
            .map_err(|e| CipherStackError::StoreError(format!("{SEED_KEY}: {e}")))?;
        let seed = self
            .keystore
            .unwrap(&blob.iv, &blob.ciphertext)
            .map_err(|_| CipherStackError::VaultSeedUnavailable)?;
        if seed.len() != SEED_LEN {
            return Err(CipherStackError::VaultSeedUnavailable);
        }
        Ok(seed)
    }

    /// Only called while holding the claim.
    fn create_seed(&self) -> Result<Zeroizing<Vec<u8>>> {
        // The previous holder may have finished between our read and claim.
        if let Some(json) = self.store.get(SEED_KEY)? {
            return self.unwrap_seed(&json);
        }

        if !self.keystore.has_key()? {
            self.keystore.generate_non_exportable_key()?;
        }

        let mut seed = Zeroizing::new(vec![0u8; SEED_LEN]);
        rand::rng().fill_bytes(&mut seed);

        let blob = self.keystore.wrap(&seed)?;
        let json = serde_json::to_string(&blob)
            .map_err(|e| CipherStackError::SerializationError(format!("wrapped seed: {e}")))?;
        if !self.store.put_if_absent(SEED_KEY, &json)? {
            return Err(CipherStackError::KeystoreError(
                "vault seed appeared while creating it".into(),
            ));
        }

        tracing::debug!("generated new vault seed");
        Ok(seed)
    }

    /// Drop a claim whose holder has evidently died.
    fn clear_stale_claim(&self) -> Result<()> {
        let Some(stamp) = self.store.get(SEED_CLAIM_KEY)? else {
            return Ok(());
        };
        let stale = match DateTime::parse_from_rfc3339(stamp.trim()) {
            Ok(at) => (Utc::now() - at.with_timezone(&Utc))
                .to_std()
                .is_ok_and(|age| age > STALE_CLAIM),
            Err(_) => true,
        };
        if stale {
            tracing::warn!(claimed_at = %stamp, "removing stale vault seed claim");
            self.store.delete(SEED_CLAIM_KEY)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry storage
    // ------------------------------------------------------------------

    fn get_entry(&self, alias: &str) -> Result<Option<VaultEntry>> {
        self.store
            .get(&entry_key(alias))?
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| CipherStackError::StoreError(format!("entry '{alias}': {e}")))
            })
            .transpose()
    }

    fn put_entry(&self, entry: &VaultEntry) -> Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| CipherStackError::SerializationError(format!("vault entry: {e}")))?;
        self.store.put(&entry_key(&entry.alias), &json)
    }
}

fn entry_key(alias: &str) -> String {
    format!("{ENTRY_PREFIX}{alias}")
}

/// Trim and check an alias.
///
/// Must be non-empty, at most `MAX_ALIAS_LEN` characters, and free of
/// control characters.
pub fn validate_alias(alias: &str) -> Result<String> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Err(CipherStackError::InvalidAlias(
            "alias cannot be empty".into(),
        ));
    }
    if alias.chars().count() > MAX_ALIAS_LEN {
        return Err(CipherStackError::InvalidAlias(format!(
            "alias cannot exceed {MAX_ALIAS_LEN} characters"
        )));
    }
    if alias.chars().any(char::is_control) {
        return Err(CipherStackError::InvalidAlias(
            "alias cannot contain control characters".into(),
        ));
    }
    Ok(alias.to_string())
}
