use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::error::AppError;

/// URL prefix under which stored uploads are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Extensions recognized as images when listing the upload directory.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

// 1. UploadStore Contract
/// UploadStore
///
/// The abstract contract for storing user-uploaded images. The filesystem store
/// is used in production and `MockUploadStore` in handler tests.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persists `bytes` under a fresh, collision-free name and returns its public URL.
    ///
    /// Rejects anything but jpeg, png, gif and webp with `UnsupportedMediaType`;
    /// nothing is written in that case.
    async fn put(&self, bytes: Bytes, mime: &str) -> Result<String, AppError>;

    /// Public URLs of every stored image.
    async fn list(&self) -> Result<Vec<String>, AppError>;
}

/// ext_from_mime
///
/// Maps an accepted image MIME type to the extension used on disk.
pub fn ext_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

// 2. The Real Implementation (local filesystem)
/// LocalUploadStore
///
/// Writes uploads into a directory that the router also serves under `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalUploadStore {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: UPLOADS_URL_PREFIX.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }
}

/// Writes `bytes` to the freshly created file at `path`. On failure the partial
/// file is removed so it never shows up in `list`.
pub async fn write_or_discard<W>(path: &Path, mut writer: W, bytes: &[u8]) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;

    if let Err(err) = written {
        drop(writer);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial upload");
        }
        return Err(err.into());
    }
    Ok(())
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    /// put
    ///
    /// The file name is a random UUID plus the extension derived from the MIME
    /// type, opened with `create_new` so an existing file is never overwritten.
    async fn put(&self, bytes: Bytes, mime: &str) -> Result<String, AppError> {
        let ext = ext_from_mime(mime)
            .ok_or_else(|| AppError::UnsupportedMediaType(mime.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&file_name);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_discard(&path, file, &bytes).await?;

        tracing::info!(file = %file_name, size = bytes.len(), "image stored");
        Ok(self.public_url(&file_name))
    }

    /// list
    ///
    /// Creates the directory when missing, so a fresh install lists nothing
    /// instead of failing. Sorted by file name.
    async fn list(&self) -> Result<Vec<String>, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !is_image_file(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names.iter().map(|name| self.public_url(name)).collect())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockUploadStore
///
/// Keeps uploads in memory so the upload handlers can be tested without a
/// filesystem. Applies the same MIME rule as the real store.
#[derive(Default)]
pub struct MockUploadStore {
    /// When true, accepted uploads fail with a simulated storage error.
    pub should_fail: bool,
    stored: Mutex<Vec<(String, Bytes)>>,
}

impl MockUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// URLs and contents of everything stored so far.
    pub fn stored(&self) -> Vec<(String, Bytes)> {
        self.stored
            .lock()
            .map(|stored| stored.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UploadStore for MockUploadStore {
    async fn put(&self, bytes: Bytes, mime: &str) -> Result<String, AppError> {
        let ext = ext_from_mime(mime)
            .ok_or_else(|| AppError::UnsupportedMediaType(mime.to_string()))?;
        if self.should_fail {
            return Err(AppError::Storage("Mock Storage Error: Simulation requested".to_string()));
        }

        let url = format!("{}/{}.{}", UPLOADS_URL_PREFIX, Uuid::new_v4(), ext);
        if let Ok(mut stored) = self.stored.lock() {
            stored.push((url.clone(), bytes));
        }
        Ok(url)
    }

    async fn list(&self) -> Result<Vec<String>, AppError> {
        if self.should_fail {
            return Err(AppError::Storage("Mock Storage Error: Simulation requested".to_string()));
        }
        Ok(self.stored().into_iter().map(|(url, _)| url).collect())
    }
}

/// StorageState
///
/// The concrete type used to share the upload store across the application state.
pub type StorageState = Arc<dyn UploadStore>;
