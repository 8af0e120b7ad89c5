//! File registry operations
//!
//! List, store, retrieve, remove and preview files in a user's namespace.
//! Every path comes from [`FileNamespace`]; nothing here builds a storage
//! path on its own.
//!
//! Files can be addressed either by their stored name (exact and stable) or
//! by the name they were uploaded under. When several uploads share an
//! original name, the newest one wins.

pub mod errors;
pub mod preview;
pub mod types;

use std::{path::PathBuf, sync::Arc, time::SystemTime};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::io::AsyncWriteExt;

pub use errors::FileError;
pub use preview::{ContentKind, PreviewType, previewable};
pub use types::StoredFile;

use crate::{
    Clock, Result,
    namespace::{FileNamespace, is_absent},
};
use types::{RANDOM_SUFFIX_LENGTH, decode_stored_name, display_name, encode_stored_name};

/// Default per-upload size cap (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Longest original filename accepted on upload, in bytes.
///
/// Leaves room for the generated prefix within the usual 255-byte limit.
pub const MAX_ORIGINAL_NAME_BYTES: usize = 200;

fn io_error(reason: impl Into<String>, source: std::io::Error) -> crate::Error {
    FileError::Io {
        reason: reason.into(),
        source,
    }
    .into()
}

fn not_found(name: &str) -> crate::Error {
    FileError::NotFound {
        name: name.to_string(),
    }
    .into()
}

fn to_utc(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

/// An opened file ready to be streamed back to the client.
#[derive(Debug)]
pub struct RetrievedFile {
    pub file: tokio::fs::File,
    pub info: StoredFile,
}

/// File operations over the per-user namespace.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    namespace: FileNamespace,
    clock: Arc<dyn Clock>,
}

impl FileRegistry {
    pub fn new(namespace: FileNamespace, clock: Arc<dyn Clock>) -> Self {
        Self { namespace, clock }
    }

    pub fn namespace(&self) -> &FileNamespace {
        &self.namespace
    }

    /// List a user's files in directory order.
    ///
    /// A user without a directory simply has no files. Hidden entries
    /// (including unfinished uploads) and anything that is not a regular
    /// file are skipped.
    pub async fn list(&self, username: &str) -> Result<Vec<StoredFile>> {
        let Some(dir) = self.namespace.existing_user_dir(username).await? else {
            return Ok(Vec::new());
        };

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(format!("failed to read {}", dir.display()), e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(format!("failed to read {}", dir.display()), e))?
        {
            let stored_name = entry.file_name().to_string_lossy().into_owned();
            if stored_name.starts_with('.') {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Removed between readdir and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(format!("failed to stat {stored_name}"), e)),
            };
            if !meta.is_file() {
                continue;
            }
            files.push(describe(&stored_name, &meta));
        }
        Ok(files)
    }

    /// Store an in-memory upload under a freshly generated name.
    ///
    /// The size cap is checked before anything touches the disk.
    pub async fn store(
        &self,
        username: &str,
        original_name: &str,
        content: &[u8],
        max_size: u64,
    ) -> Result<StoredFile> {
        let size = content.len() as u64;
        if size > max_size {
            return Err(FileError::TooLarge {
                size,
                max: max_size,
            }
            .into());
        }

        let mut upload = self.begin_upload(username, original_name, max_size).await?;
        upload.write(content).await?;
        upload.finish().await
    }

    /// Start writing an upload that arrives in chunks.
    ///
    /// The file is written to a hidden temporary name and renamed into place
    /// by [`Upload::finish`], so a listing never shows a half-written upload.
    pub async fn begin_upload(
        &self,
        username: &str,
        original_name: &str,
        max_size: u64,
    ) -> Result<Upload> {
        if original_name.len() > MAX_ORIGINAL_NAME_BYTES {
            return Err(FileError::InvalidName {
                reason: format!("name longer than {MAX_ORIGINAL_NAME_BYTES} bytes"),
            }
            .into());
        }
        FileNamespace::validate_component(original_name)?;

        let stored_name = self.generate_stored_name(original_name);
        let target = self.namespace.resolve(username, &stored_name).await?;
        let temp = self
            .namespace
            .resolve(username, &format!(".{stored_name}.part"))
            .await?;

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await
            .map_err(|e| io_error(format!("failed to create {}", temp.display()), e))?;

        Ok(Upload {
            username: username.to_string(),
            original_name: original_name.to_string(),
            stored_name,
            temp,
            target,
            file,
            written: 0,
            max_size,
            committed: false,
        })
    }

    /// Open a file for reading.
    pub async fn retrieve(&self, username: &str, filename: &str) -> Result<RetrievedFile> {
        let (path, info) = self.locate(username, filename).await?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if is_absent(&e) => return Err(not_found(filename)),
            Err(e) => return Err(io_error(format!("failed to open {}", info.stored_name), e)),
        };
        Ok(RetrievedFile { file, info })
    }

    /// Delete a file.
    pub async fn remove(&self, username: &str, filename: &str) -> Result<StoredFile> {
        let (path, info) = self.locate(username, filename).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted {} for {username}", info.stored_name);
                Ok(info)
            }
            Err(e) if is_absent(&e) => Err(not_found(filename)),
            Err(e) => Err(io_error(format!("failed to delete {}", info.stored_name), e)),
        }
    }

    /// Open a file for inline preview.
    ///
    /// Missing files are reported before unsupported types.
    pub async fn preview(
        &self,
        username: &str,
        filename: &str,
    ) -> Result<(PreviewType, RetrievedFile)> {
        let retrieved = self.retrieve(username, filename).await?;
        let preview = previewable(&retrieved.info.name)?;
        Ok((preview, retrieved))
    }

    fn generate_stored_name(&self, original_name: &str) -> String {
        let mut random = [0u8; RANDOM_SUFFIX_LENGTH / 2];
        rand::thread_rng().fill_bytes(&mut random);
        encode_stored_name(self.clock.now_millis(), &hex::encode(random), original_name)
    }

    /// Find the file a client name refers to.
    ///
    /// An exact stored name wins; otherwise the newest upload whose original
    /// name matches. Never creates the user's directory.
    async fn locate(&self, username: &str, filename: &str) -> Result<(PathBuf, StoredFile)> {
        let Some(path) = self.namespace.resolve_existing(username, filename).await? else {
            return Err(not_found(filename));
        };
        if let Ok(meta) = tokio::fs::symlink_metadata(&path).await
            && meta.is_file()
        {
            let stored_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| filename.to_string());
            return Ok((path, describe(&stored_name, &meta)));
        }

        if FileNamespace::validate_component(filename).is_err() {
            return Err(not_found(filename));
        }

        let newest = self
            .list(username)
            .await?
            .into_iter()
            .filter(|file| file.name == filename)
            .max_by_key(|file| {
                let millis = decode_stored_name(&file.stored_name).map(|p| p.millis);
                (millis, file.stored_name.clone())
            });

        let Some(file) = newest else {
            return Err(not_found(filename));
        };
        match self
            .namespace
            .resolve_existing(username, &file.stored_name)
            .await?
        {
            Some(path) => Ok((path, file)),
            None => Err(not_found(filename)),
        }
    }
}

fn describe(stored_name: &str, meta: &std::fs::Metadata) -> StoredFile {
    let modified_at = to_utc(meta.modified()).unwrap_or_default();
    let created_at = to_utc(meta.created()).unwrap_or(modified_at);
    let name = display_name(stored_name).to_string();
    StoredFile {
        file_type: types::file_type_of(&name),
        name,
        stored_name: stored_name.to_string(),
        size: meta.len(),
        created_at,
        modified_at,
    }
}

/// An upload in progress.
///
/// Dropping it before [`Upload::finish`] removes the temporary file.
#[derive(Debug)]
pub struct Upload {
    username: String,
    original_name: String,
    stored_name: String,
    temp: PathBuf,
    target: PathBuf,
    file: tokio::fs::File,
    written: u64,
    max_size: u64,
    committed: bool,
}

impl Upload {
    /// Bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a chunk, failing once the total passes the size cap.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let size = self.written + chunk.len() as u64;
        if size > self.max_size {
            return Err(FileError::TooLarge {
                size,
                max: self.max_size,
            }
            .into());
        }
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| io_error(format!("failed to write {}", self.stored_name), e))?;
        self.written = size;
        Ok(())
    }

    /// Flush the upload to disk and move it to its final name.
    pub async fn finish(mut self) -> Result<StoredFile> {
        self.file
            .sync_all()
            .await
            .map_err(|e| io_error(format!("failed to store {}", self.stored_name), e))?;
        tokio::fs::rename(&self.temp, &self.target)
            .await
            .map_err(|e| io_error(format!("failed to store {}", self.stored_name), e))?;
        self.committed = true;

        let meta = tokio::fs::metadata(&self.target)
            .await
            .map_err(|e| io_error(format!("failed to stat {}", self.stored_name), e))?;
        tracing::info!(
            "Stored {} for {} as {} ({} bytes)",
            self.original_name,
            self.username,
            self.stored_name,
            self.written
        );
        Ok(describe(&self.stored_name, &meta))
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}
