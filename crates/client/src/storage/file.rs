//! File-backed storage backends.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::{KeyValueStore, SecureStore, SecurityLevel, StorageError};

const SECRETS_FILE: &str = "secrets.json";

/// Key-value storage with one file per key.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        write_atomic(&self.path_for(key), value.as_bytes()).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Secret storage in a single JSON file with owner-only permissions.
///
/// This is the fallback for hosts without an OS credential facility. The
/// file is protected only by filesystem permissions, which is weaker than a
/// keychain; constructing one logs a warning to make that explicit.
pub struct FileSecureStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the secrets file.
    lock: Mutex<()>,
}

impl FileSecureStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(SECRETS_FILE);
        warn!(
            path = %path.display(),
            "No platform credential store configured, keeping tokens in a permission-restricted file"
        );
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SecureStore for FileSecureStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut secrets = self.read_all().await?;
        Ok(secrets.remove(key).map(SecretString::from))
    }

    async fn set(&self, key: &str, value: Option<&SecretString>) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut secrets = self.read_all().await?;
        match value {
            Some(value) => {
                secrets.insert(key.to_string(), value.expose_secret().to_string());
            }
            None => {
                if secrets.remove(key).is_none() {
                    return Ok(());
                }
            }
        }
        write_atomic(&self.path, &serde_json::to_vec(&secrets)?).await
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Fallback
    }
}

/// Map a storage key to a safe file name (`@cart` becomes `_cart`).
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // A leftover temp file may carry wider permissions; never reuse it.
    let tmp = path.with_extension("tmp");
    if let Err(e) = tokio::fs::remove_file(&tmp).await
        && e.kind() != ErrorKind::NotFound
    {
        return Err(e.into());
    }

    let mut file = owner_only_options().open(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Options for a new file readable by its owner only, from the moment it
/// is created.
fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}
