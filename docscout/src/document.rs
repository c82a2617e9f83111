use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::filters::document_kind;

/// The two families of documents the scanner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Spreadsheet workbooks (`xlsx`, `xls`)
    Tabular,
    /// PDF documents, scanned page by page
    PageText,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Tabular => f.write_str("Excel"),
            DocumentKind::PageText => f.write_str("PDF"),
        }
    }
}

/// Somewhere the raw bytes of a document can be read from.
///
/// Reading is the first suspension point of a scan; implementations should
/// not block the runtime.
#[async_trait]
pub trait ByteSource: Send + Sync + fmt::Debug {
    async fn read_all(&self) -> io::Result<Vec<u8>>;
}

/// Reads a document from the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read_all(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Serves a document from bytes already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

/// A document selected for scanning.
///
/// Cloning is cheap; the byte source is shared. The scanner only ever
/// borrows a handle, so result sinks can use [`DocumentHandle::read_bytes`]
/// afterwards to export the original file.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    name: String,
    path: Option<PathBuf>,
    kind: DocumentKind,
    size: u64,
    source: Arc<dyn ByteSource>,
}

impl DocumentHandle {
    /// Creates a handle over an arbitrary byte source
    pub fn new(
        name: impl Into<String>,
        kind: DocumentKind,
        size: u64,
        source: Arc<dyn ByteSource>,
    ) -> Self {
        Self {
            name: name.into(),
            path: None,
            kind,
            size,
            source,
        }
    }

    /// Creates a handle for a file on disk, deriving the kind from its
    /// extension. Returns `Ok(None)` for unsupported extensions.
    pub fn from_path(path: &Path) -> io::Result<Option<Self>> {
        let Some(kind) = document_kind(path) else {
            return Ok(None);
        };
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Some(Self {
            name,
            path: Some(path.to_path_buf()),
            kind,
            size,
            source: Arc::new(FileSource::new(path)),
        }))
    }

    /// Creates a handle over in-memory bytes, deriving the kind from `name`.
    /// Returns `None` for unsupported extensions.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Option<Self> {
        let name = name.into();
        let kind = document_kind(Path::new(&name))?;
        let bytes: Arc<[u8]> = bytes.into();
        Some(Self::new(
            name,
            kind,
            bytes.len() as u64,
            Arc::new(MemorySource::new(bytes)),
        ))
    }

    /// Display name, used to prefix every error about this document
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location on disk, when the document came from the filesystem
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Size in bytes as declared when the handle was created
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads the full contents of the document
    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        self.source.read_all().await
    }
}
