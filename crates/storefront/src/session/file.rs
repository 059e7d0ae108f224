//! JSON-file session store.
//!
//! The whole session is kept in memory and written back to disk on every
//! change. Writes go to a uniquely named sibling temp file which is then
//! renamed over the target, so a crash never leaves a half-written session
//! behind. The file is readable by its owner only.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionError, SessionKey, SessionStore};

/// Session store persisted as a flat JSON object.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open (or lazily create) the session file at `path`.
    ///
    /// A missing file is an empty session. Values stored under legacy
    /// camelCase token names are moved to the current names and the file
    /// is rewritten.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let mut values: BTreeMap<String, String> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let migrated = migrate_legacy_keys(&mut values);
        let store = Self {
            path,
            values: RwLock::new(values),
        };

        if migrated {
            tracing::debug!(path = %store.path.display(), "Migrated legacy session keys");
            let values = store.values.read().await;
            persist(&store.path, &values).await?;
        }

        Ok(store)
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Move legacy token entries to their current names.
///
/// A value already present under the current name wins.
fn migrate_legacy_keys(values: &mut BTreeMap<String, String>) -> bool {
    let mut changed = false;
    for key in SessionKey::ALL {
        let Some(legacy) = key.legacy_name() else {
            continue;
        };
        if let Some(value) = values.remove(legacy) {
            values.entry(key.as_str().to_owned()).or_insert(value);
            changed = true;
        }
    }
    changed
}

async fn persist(path: &Path, values: &BTreeMap<String, String>) -> Result<(), SessionError> {
    let json = serde_json::to_vec_pretty(values)?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomically(&path, &json))
        .await
        .map_err(std::io::Error::other)??;
    Ok(())
}

/// Write through a uniquely named, owner-only sibling and rename it over
/// `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        Ok(self.values.read().await.get(key.as_str()).cloned())
    }

    async fn set(&self, key: SessionKey, value: String) -> Result<(), SessionError> {
        let mut values = self.values.write().await;
        values.insert(key.as_str().to_owned(), value);
        persist(&self.path, &values).await
    }

    async fn remove(&self, key: SessionKey) -> Result<(), SessionError> {
        let mut values = self.values.write().await;
        if values.remove(key.as_str()).is_some() {
            persist(&self.path, &values).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        let mut values = self.values.write().await;
        values.clear();
        persist(&self.path, &values).await
    }
}
