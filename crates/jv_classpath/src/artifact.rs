//! Handles to compiled class artifacts.
//!
//! A handle only knows how to produce the raw bytes of one class and where
//! they live. Decoding happens later, on demand, in the metadata provider.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::result::ZipError;
use zip::ZipArchive;

/// Independent byte stream over one artifact's contents.
pub type ByteStream = Box<dyn Read + Send>;

/// One compiled class stored on the classpath.
pub trait Artifact: fmt::Debug + Send + Sync {
    /// Opens a fresh stream; every call starts at the first byte.
    fn open(&self) -> io::Result<ByteStream>;

    fn location(&self) -> ArtifactLocation;

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        let mut stream = self.open()?;
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

pub type ArtifactHandle = Arc<dyn Artifact>;

/// URL-like address of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactLocation {
    File(PathBuf),
    ArchiveEntry { archive: PathBuf, entry: String },
    Memory(String),
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::File(path) => write!(f, "file:{}", path.display()),
            ArtifactLocation::ArchiveEntry { archive, entry } => {
                write!(f, "jar:file:{}!/{}", archive.display(), entry)
            }
            ArtifactLocation::Memory(label) => write!(f, "memory:{label}"),
        }
    }
}

/// A `.class` file inside an exploded classpath directory.
#[derive(Debug, Clone)]
pub struct ClassFileArtifact {
    path: PathBuf,
}

impl ClassFileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Artifact for ClassFileArtifact {
    fn open(&self) -> io::Result<ByteStream> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn location(&self) -> ArtifactLocation {
        ArtifactLocation::File(self.path.clone())
    }
}

/// A class entry stored in a `.jar`/`.zip` archive.
///
/// The archive is reopened on every [`Artifact::open`] call so concurrent
/// readers never share a cursor.
#[derive(Debug, Clone)]
pub struct ArchiveEntryArtifact {
    archive: PathBuf,
    entry: String,
}

impl ArchiveEntryArtifact {
    pub fn new(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl Artifact for ArchiveEntryArtifact {
    fn open(&self) -> io::Result<ByteStream> {
        let file = File::open(&self.archive)?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_to_io)?;
        let mut entry = archive.by_name(&self.entry).map_err(zip_to_io)?;
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        Ok(Box::new(Cursor::new(buffer)))
    }

    fn location(&self) -> ArtifactLocation {
        ArtifactLocation::ArchiveEntry {
            archive: self.archive.clone(),
            entry: self.entry.clone(),
        }
    }
}

/// Class bytes held in memory, e.g. classes embedded in the compiler binary.
#[derive(Debug, Clone)]
pub struct MemoryArtifact {
    label: String,
    bytes: Arc<[u8]>,
}

impl MemoryArtifact {
    pub fn new(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }
}

impl Artifact for MemoryArtifact {
    fn open(&self) -> io::Result<ByteStream> {
        Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(&self.bytes)))))
    }

    fn location(&self) -> ArtifactLocation {
        ArtifactLocation::Memory(self.label.clone())
    }
}

struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn zip_to_io(error: ZipError) -> io::Error {
    match error {
        ZipError::Io(error) => error,
        ZipError::FileNotFound => io::Error::new(io::ErrorKind::NotFound, error),
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
