//! Per-user file namespace
//!
//! The only place that turns a username and a client-supplied filename into
//! an on-disk path. Every file operation goes through [`FileNamespace::resolve`],
//! which confines the result to `<root>/<username>`:
//!
//! - names are normalized lexically; `..` may not climb above the user root
//! - absolute paths, drive prefixes, empty names and NUL bytes are rejected
//! - existing path components are canonicalized so a symlink cannot point
//!   outside the user directory
//!
//! User directories are created lazily the first time something is written.
//! Lookups through [`FileNamespace::resolve_existing`] never create them.

pub mod errors;

use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

pub use errors::NamespaceError;

use crate::Result;

fn invalid(reason: &'static str) -> crate::Error {
    NamespaceError::InvalidPath { reason }.into()
}

fn io_error(reason: impl Into<String>, source: std::io::Error) -> crate::Error {
    NamespaceError::Io {
        reason: reason.into(),
        source,
    }
    .into()
}

/// Storage root holding one directory per user.
#[derive(Debug, Clone)]
pub struct FileNamespace {
    root: PathBuf,
}

impl FileNamespace {
    /// Open (creating if needed) the storage root.
    ///
    /// The root is canonicalized so every resolved path is absolute.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| io_error(format!("failed to create {}", root.display()), e))?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| io_error(format!("failed to canonicalize {}", root.display()), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that `name` is usable as exactly one path component.
    ///
    /// This is the rule for usernames and for names given to new files.
    pub fn validate_component(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if name.contains('\0') {
            return Err(invalid("NUL byte in name"));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(invalid("path separator in name"));
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(c)), None) if c == OsStr::new(name) => Ok(()),
            _ => Err(invalid("not a plain file name")),
        }
    }

    /// Path of a user's directory, without touching the filesystem.
    pub fn user_dir(&self, username: &str) -> Result<PathBuf> {
        Self::validate_component(username)?;
        Ok(self.root.join(username))
    }

    /// Path of a user's directory if it already exists.
    pub async fn existing_user_dir(&self, username: &str) -> Result<Option<PathBuf>> {
        let dir = self.user_dir(username)?;
        match tokio::fs::symlink_metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(dir)),
            Ok(_) => Err(invalid("user directory is not a directory")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(format!("failed to stat {}", dir.display()), e)),
        }
    }

    /// Create the user's directory if absent and return it.
    ///
    /// Idempotent. Fails if the directory turns out to be a link to
    /// somewhere outside the storage root.
    pub async fn ensure_user_dir(&self, username: &str) -> Result<PathBuf> {
        let dir = self.user_dir(username)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(format!("failed to create {}", dir.display()), e))?;
        let real = tokio::fs::canonicalize(&dir)
            .await
            .map_err(|e| io_error(format!("failed to canonicalize {}", dir.display()), e))?;
        if real != dir {
            tracing::warn!("User directory for {username} resolves outside the storage root");
            return Err(invalid("user directory escapes storage root"));
        }
        Ok(dir)
    }

    /// Resolve a client-supplied filename to an absolute path inside the
    /// user's directory, creating the directory if needed.
    pub async fn resolve(&self, username: &str, filename: &str) -> Result<PathBuf> {
        let relative = normalize_logged(username, filename)?;
        let user_dir = self.ensure_user_dir(username).await?;
        let path = user_dir.join(relative);
        self.confine(username, &user_dir, &path).await?;
        Ok(path)
    }

    /// Like [`FileNamespace::resolve`] for reads.
    ///
    /// Returns `None` when the user has no directory yet, in which case
    /// nothing by that name can exist.
    pub async fn resolve_existing(
        &self,
        username: &str,
        filename: &str,
    ) -> Result<Option<PathBuf>> {
        let relative = normalize_logged(username, filename)?;
        let Some(user_dir) = self.existing_user_dir(username).await? else {
            return Ok(None);
        };
        let path = user_dir.join(relative);
        self.confine(username, &user_dir, &path).await?;
        Ok(Some(path))
    }

    /// Follow whatever part of `path` already exists and make sure it stays
    /// under `user_dir`.
    async fn confine(&self, username: &str, user_dir: &Path, path: &Path) -> Result<()> {
        let mut ancestor = path;
        loop {
            match tokio::fs::canonicalize(ancestor).await {
                Ok(real) if real.starts_with(user_dir) => return Ok(()),
                Ok(_) => {
                    tracing::warn!("Rejected symlink escape {} for {username}", path.display());
                    return Err(invalid("path escapes user directory"));
                }
                // A regular file used as a directory is as absent as a missing one.
                Err(e) if is_absent(&e) => {
                    // A dangling link could still be written through.
                    if let Ok(meta) = tokio::fs::symlink_metadata(ancestor).await
                        && meta.file_type().is_symlink()
                    {
                        tracing::warn!("Rejected dangling symlink {} for {username}", path.display());
                        return Err(invalid("path escapes user directory"));
                    }
                    match ancestor.parent() {
                        Some(parent) if parent.starts_with(user_dir) => ancestor = parent,
                        _ => return Err(invalid("path escapes user directory")),
                    }
                }
                Err(e) => {
                    return Err(io_error(format!("failed to resolve {}", ancestor.display()), e));
                }
            }
        }
    }
}

pub(crate) fn is_absent(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

fn normalize_logged(username: &str, filename: &str) -> Result<PathBuf> {
    normalize(filename).inspect_err(|_| {
        tracing::warn!("Rejected path {filename:?} for {username}");
    })
}

/// Lexically normalize a client filename into a relative path.
///
/// `.` is dropped and `..` pops the previous component; popping past the
/// start, any root or prefix, and an empty result are all rejected.
fn normalize(filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(invalid("empty name"));
    }
    if filename.contains('\0') {
        return Err(invalid("NUL byte in name"));
    }

    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(filename).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Err(invalid("absolute path")),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(invalid("path escapes user directory"));
                }
            }
            Component::Normal(part) => parts.push(part),
        }
    }

    if parts.is_empty() {
        return Err(invalid("empty name"));
    }
    Ok(parts.into_iter().collect())
}
