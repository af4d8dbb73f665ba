//! Artifact persistence.
//!
//! Images land under the images directory by file name; design metadata is a
//! single file under the data directory, overwritten on every export. A later
//! write with the same name replaces the earlier file. Design metadata is
//! written exactly as received, so numbers and keys survive unchanged.

use crate::config::ServerConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Destination for exported artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write an image under `file_name` and return where it went.
    fn save_image(&self, file_name: &str, bytes: Vec<u8>) -> BoxFuture<'_, StoreResult<PathBuf>>;

    /// Replace the design metadata file and return where it went.
    fn save_design(&self, design: &Value) -> BoxFuture<'_, StoreResult<PathBuf>>;
}

/// Check that `name` is a single plain path component.
pub fn validate_file_name(name: &str) -> StoreResult<&str> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidFileName(name.to_string()));
    }
    Ok(name)
}

/// Pretty-printed JSON of the design metadata, as written to disk.
pub fn design_json(design: &Value) -> StoreResult<String> {
    serde_json::to_string_pretty(design).map_err(StoreError::Serialization)
}

/// Stores artifacts as flat files.
pub struct FileStore {
    images_dir: PathBuf,
    data_dir: PathBuf,
    design_file: String,
}

impl FileStore {
    pub fn new(config: &ServerConfig) -> StoreResult<Self> {
        let images_dir = absolute(&config.images_path())?;
        let data_dir = absolute(&config.data_path())?;
        validate_file_name(&config.design_file)?;
        Ok(Self {
            images_dir,
            data_dir,
            design_file: config.design_file.clone(),
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn design_path(&self) -> PathBuf {
        self.data_dir.join(&self.design_file)
    }
}

impl ArtifactStore for FileStore {
    fn save_image(&self, file_name: &str, bytes: Vec<u8>) -> BoxFuture<'_, StoreResult<PathBuf>> {
        let target = validate_file_name(file_name).map(|name| self.images_dir.join(name));
        Box::pin(async move {
            let target = target?;
            ensure_dir(&self.images_dir).await?;
            write_replacing(&target, &bytes).await?;
            Ok(target)
        })
    }

    fn save_design(&self, design: &Value) -> BoxFuture<'_, StoreResult<PathBuf>> {
        let json = design_json(design);
        let target = self.design_path();
        Box::pin(async move {
            let json = json?;
            ensure_dir(&self.data_dir).await?;
            write_replacing(&target, json.as_bytes()).await?;
            Ok(target)
        })
    }
}

fn absolute(path: &Path) -> StoreResult<PathBuf> {
    std::path::absolute(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Create `dir` and its parents. An existing directory is success.
async fn ensure_dir(dir: &Path) -> StoreResult<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Write through a temporary sibling and rename it over `target`, so a failed
/// write never leaves a truncated file at `target`.
async fn write_replacing(target: &Path, bytes: &[u8]) -> StoreResult<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::InvalidFileName(target.display().to_string()))?;
    let temp = target.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(source) = tokio::fs::write(&temp, bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::Io { path: temp, source });
    }
    if let Err(source) = tokio::fs::rename(&temp, target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::Io {
            path: target.to_path_buf(),
            source,
        });
    }
    debug!("Wrote {} bytes to {}", bytes.len(), target.display());
    Ok(())
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents stored at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, path: PathBuf, bytes: Vec<u8>) -> StoreResult<PathBuf> {
        let mut files = self
            .files
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        files.insert(path.clone(), bytes);
        Ok(path)
    }
}

impl ArtifactStore for MemoryStore {
    fn save_image(&self, file_name: &str, bytes: Vec<u8>) -> BoxFuture<'_, StoreResult<PathBuf>> {
        let result = validate_file_name(file_name)
            .and_then(|name| self.put(Path::new("images").join(name), bytes));
        Box::pin(async move { result })
    }

    fn save_design(&self, design: &Value) -> BoxFuture<'_, StoreResult<PathBuf>> {
        let result = design_json(design)
            .and_then(|json| self.put(PathBuf::from("data/design-data.json"), json.into_bytes()));
        Box::pin(async move { result })
    }
}
