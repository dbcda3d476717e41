use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

use super::{check_revision, Document, DocumentStore, Revision, Versioned};
use crate::errors::ServiceError;

/// How a replace reaches the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Write a sibling temp file, sync it, then rename over the target.
    /// A failed write leaves the previous document in place.
    #[default]
    Atomic,
    /// Truncate and rewrite the target directly.
    InPlace,
}

/// File-backed single-slot JSON document store.
///
/// Reads take no lock. Writes are serialized within the process so that a
/// revision check and the write that follows it cannot interleave with
/// another writer.
pub struct JsonFileStore {
    file_path: PathBuf,
    mode: WriteMode,
    pretty: bool,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path` with atomic writes and compact JSON.
    /// The file itself is not created; the parent directory is.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        Self::with_options(path, WriteMode::Atomic, false).await
    }

    pub async fn with_options<P: Into<PathBuf>>(
        path: P,
        mode: WriteMode,
        pretty: bool,
    ) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::storage(&format!("create {}", parent.display()), e))?;
        }
        Ok(Arc::new(Self { file_path, mode, pretty, write_lock: Mutex::new(()) }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Serialize and store any `Serialize` value. Serialization happens
    /// before the file is touched, so a failure leaves the old document intact.
    pub async fn replace_with<T>(&self, value: &T) -> Result<Revision, ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = self.encode(value)?;
        let _guard = self.write_lock.lock().await;
        self.write_bytes(&bytes).await?;
        Ok(Revision::of_bytes(&bytes))
    }

    /// Write `seed` only when no document exists yet. Returns whether it wrote.
    pub async fn seed_if_missing(&self, seed: &Document) -> Result<bool, ServiceError> {
        let bytes = self.encode(seed)?;
        let _guard = self.write_lock.lock().await;
        let exists = fs::try_exists(&self.file_path)
            .await
            .map_err(|e| ServiceError::storage(&self.describe("stat"), e))?;
        if exists {
            return Ok(false);
        }
        self.write_bytes(&bytes).await?;
        Ok(true)
    }

    fn describe(&self, op: &str) -> String {
        format!("{op} {}", self.file_path.display())
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| ServiceError::storage("serialize document", e))
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, ServiceError> {
        fs::read(&self.file_path)
            .await
            .map_err(|e| ServiceError::storage(&self.describe("read"), e))
    }

    /// Revision of what is on disk now; `None` when the file does not exist.
    async fn current_revision(&self) -> Result<Option<Revision>, ServiceError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => Ok(Some(Revision::of_bytes(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::storage(&self.describe("read"), e)),
        }
    }

    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), ServiceError> {
        match self.mode {
            WriteMode::Atomic => self.write_atomic(bytes).await?,
            WriteMode::InPlace => fs::write(&self.file_path, bytes)
                .await
                .map_err(|e| ServiceError::storage(&self.describe("write"), e))?,
        }
        debug!(path = %self.file_path.display(), bytes = bytes.len(), mode = ?self.mode, "document written");
        Ok(())
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), ServiceError> {
        let tmp = self.temp_path();
        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &self.file_path).await
        }
        .await;
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(&self.describe("write"), e));
        }
        // the rename is only durable once the directory entry is
        let dir = self.file_path.parent().filter(|p| !p.as_os_str().is_empty());
        sync_dir(dir.unwrap_or_else(|| Path::new(".")))
            .await
            .map_err(|e| ServiceError::storage(&self.describe("sync directory of"), e))
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.file_path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

/// Flush a directory's entries to disk.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load_versioned(&self) -> Result<Versioned, ServiceError> {
        let bytes = self.read_bytes().await?;
        Versioned::from_bytes(bytes, &self.describe("parse"))
    }

    async fn replace_matching(
        &self,
        expected: Option<&[Revision]>,
        doc: &Document,
    ) -> Result<Revision, ServiceError> {
        let bytes = self.encode(doc)?;
        let _guard = self.write_lock.lock().await;
        if expected.is_some() {
            let current = self.current_revision().await?;
            check_revision(expected, current.as_ref())?;
        }
        self.write_bytes(&bytes).await?;
        Ok(Revision::of_bytes(&bytes))
    }
}
