//! Opaque string key-value stores backing the vault.
//!
//! The vault keeps its wrapped seed and every entry as JSON strings under
//! fixed keys, so any `get`/`put`/`delete` map will do.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;

use crate::errors::{CipherStackError, Result};

/// A persistent string map.
///
/// Each `put`, `put_if_absent` and `delete` is atomic on its own key and
/// independent of every other key, also across processes sharing a
/// `FileStore` directory. Nothing spans keys.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Store `value` only if `key` is unset. Returns `true` if it was
    /// stored; exactly one of several racing callers wins.
    fn put_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    /// Returns `true` if the key existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

fn poisoned() -> CipherStackError {
    CipherStackError::StoreError("store lock poisoned".into())
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store, gone when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.map.write().map_err(|_| poisoned())?.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.map.read().map_err(|_| poisoned())?.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Suffix of every value file.
const VALUE_EXT: &str = "val";

/// One file per key in a directory.
///
/// File names are the hex encoding of the key, so any key is a safe name.
/// Writes go to a uniquely named temp file in the same directory which is
/// then renamed over (or, for `put_if_absent`, linked without replacing)
/// the target. Readers see the old value or the new one, never a mix, and
/// writers to different keys never touch each other's files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the backing directory. It is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open `<vault_dir>/store`, creating it if needed.
    pub fn in_dir(vault_dir: &Path) -> Result<Self> {
        let store = Self::new(vault_dir.join("store"));
        store.ensure_dir()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", hex_encode(key.as_bytes())))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    /// Write `value` to a fresh owner-only temp file beside the target.
    fn stage(&self, value: &str) -> Result<NamedTempFile> {
        self.ensure_dir()?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.value_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CipherStackError::StoreError(format!("read '{key}': {e}"))),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.stage(value)?
            .persist(self.value_path(key))
            .map_err(|e| CipherStackError::StoreError(format!("write '{key}': {}", e.error)))?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        match self.stage(value)?.persist_noclobber(self.value_path(key)) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(CipherStackError::StoreError(format!(
                "create '{key}': {}",
                e.error
            ))),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CipherStackError::StoreError(format!("delete '{key}': {e}"))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            // Staging files and strangers in the directory are skipped.
            let Some(stem) = name
                .to_str()
                .and_then(|n| n.strip_suffix(VALUE_EXT))
                .and_then(|n| n.strip_suffix('.'))
            else {
                continue;
            };
            if let Some(key) = hex_decode(stem).and_then(|b| String::from_utf8(b).ok()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0F)]));
    }
    out
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn exercise(store: &dyn PreferenceStore) {
        assert_eq!(store.get("a").unwrap(), None);
        store.put("b", "2").unwrap();
        store.put("a", "1").unwrap();
        store.put("a", "one").unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);

        assert!(!store.put_if_absent("a", "other").unwrap());
        assert!(store.put_if_absent("c", "3").unwrap());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn memory_store_behaves_like_a_map() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_behaves_like_a_map() {
        let dir = TempDir::new().unwrap();
        exercise(&FileStore::new(dir.path().join("nested")));
    }

    #[test]
    fn file_store_persists_across_handles() {
        let dir = TempDir::new().unwrap();

        FileStore::new(dir.path()).put("vault.entry.k", "v").unwrap();
        let reopened = FileStore::new(dir.path());
        assert_eq!(
            reopened.get("vault.entry.k").unwrap().as_deref(),
            Some("v")
        );

        // Only the value file remains; no staging leftovers.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn keys_with_path_characters_are_safe() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("s"));
        let key = "vault.entry.../../etc/passwd";
        store.put(key, "x").unwrap();

        assert_eq!(store.keys().unwrap(), vec![key]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("absent"));
        assert!(store.keys().unwrap().is_empty());
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!store.delete("k").unwrap());
    }

    #[test]
    fn separate_handles_writing_different_keys_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(dir.path().join("shared"));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    // Own handle per thread, like separate CLI processes.
                    let store = FileStore::new(path.as_path());
                    for j in 0..20 {
                        store
                            .put(&format!("vault.entry.a{i}_{j}"), &format!("{i}/{j}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let store = FileStore::new(path.as_path());
        assert_eq!(store.keys().unwrap().len(), 160);
        assert_eq!(store.get("vault.entry.a7_19").unwrap().as_deref(), Some("7/19"));
    }

    #[test]
    fn exactly_one_racing_put_if_absent_wins() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(dir.path().to_path_buf());

        let racers: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    FileStore::new(path.as_path())
                        .put_if_absent("vault.seed", &format!("seed-{i}"))
                        .unwrap()
                })
            })
            .collect();
        let winners = racers
            .into_iter()
            .map(|r| r.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        let stored = FileStore::new(path.as_path()).get("vault.seed").unwrap();
        assert!(stored.unwrap().starts_with("seed-"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileStore::in_dir(dir.path()).unwrap();
        store.put("k", "v").unwrap();

        let dir_mode = fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        let file_mode = fs::metadata(store.value_path("k"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn hex_names_round_trip() {
        assert_eq!(hex_encode(b"vault.seed"), "7661756c742e73656564");
        assert_eq!(hex_decode("7661756c742e73656564").unwrap(), b"vault.seed");
        assert!(hex_decode("abc").is_none());
        assert!(hex_decode("zz").is_none());
    }
}
