//! Persistence backends for the encrypted ledger blob
//!
//! A backend stores exactly one opaque string. It knows nothing about
//! accounts or encryption; [`super::AccountLedger`] layers both on top.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, sync::RwLock};
use uuid::Uuid;

use super::errors::LedgerError;
use crate::Result;

/// Storage for the single encrypted ledger blob.
#[async_trait]
pub trait LedgerBackend: Send + Sync + std::fmt::Debug {
    /// Read the stored blob, or `None` if nothing has been written yet.
    async fn read(&self) -> Result<Option<String>>;

    /// Replace the stored blob.
    ///
    /// Readers must observe either the previous blob or the new one in full.
    async fn write(&self, blob: &str) -> Result<()>;
}

/// Keeps the blob in a file, replacing it atomically on every write.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

fn storage_error(reason: impl Into<String>, source: std::io::Error) -> crate::Error {
    LedgerError::Storage {
        reason: reason.into(),
        source: Some(source),
    }
    .into()
}

#[async_trait]
impl LedgerBackend for FileBackend {
    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(
                format!("failed to read {}", self.path.display()),
                e,
            )),
        }
    }

    async fn write(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("failed to create ledger directory", e))?;
        }

        // Write the new blob beside the old one, then swap it in with a rename.
        let temp = self.temp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(blob.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(storage_error(
                format!("failed to write {}", self.path.display()),
                e,
            ));
        }
        Ok(())
    }
}

/// Volatile backend for tests and throwaway instances.
#[derive(Debug, Default)]
pub struct InMemory {
    blob: RwLock<Option<String>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob, e.g. to simulate a corrupt file.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RwLock::new(Some(blob.into())),
        }
    }
}

#[async_trait]
impl LedgerBackend for InMemory {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.blob.read().await.clone())
    }

    async fn write(&self, blob: &str) -> Result<()> {
        *self.blob.write().await = Some(blob.to_string());
        Ok(())
    }
}
