use crate::errors::StoreError;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError},
};
use tokio::{
    fs,
    sync::{Mutex, OwnedMutexGuard},
};

/// Reads a JSON document. A missing file yields `T::default()`; a file that
/// does not parse is reported as malformed, never replaced.
pub async fn load_document<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    Ok(load_existing(path).await?.unwrap_or_default())
}

/// Like [`load_document`], but reports a missing file as `None` so callers can
/// tell it apart from a document whose content equals the default.
pub async fn load_existing<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::io(path, err)),
    }
}

/// Writes a JSON document pretty-printed, through a sibling temp file renamed
/// over the target.
pub async fn persist_document<T>(path: &Path, document: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| StoreError::io(parent, err))?;
    }

    let payload = serde_json::to_vec_pretty(document).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    fs::write(&tmp, payload)
        .await
        .map_err(|err| StoreError::io(&tmp, err))?;
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, err));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// One async mutex per document path. Holders of the guard own the
/// read-modify-write cycle for that document.
#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl DocumentLocks {
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}
