//! Populates an [`ArtifactRegistry`] from classpath directories and archives.
//!
//! Only file names are inspected here; class bytes are read later, when a
//! name is actually resolved. Earlier classpath entries shadow later ones.

use crate::artifact::{ArchiveEntryArtifact, ArtifactHandle, ClassFileArtifact};
use crate::config::ResolverConfig;
use crate::naming::{
    derive_function_name_with_prefix, derive_package_name, derive_type_name, LayoutError,
    CLASS_FILE_SUFFIX,
};
use crate::registry::{ArtifactRegistry, RegistryBuilder, RegistryError};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

const SKIPPED_CLASS_FILES: [&str; 2] = ["module-info.class", "package-info.class"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while scanning {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("unexpected classpath layout: {0}")]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Default)]
pub struct ClasspathScanner {
    config: ResolverConfig,
}

impl ClasspathScanner {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Scans every entry in order and freezes the result.
    pub fn scan_classpath<I, P>(&self, entries: I) -> Result<ArtifactRegistry, ScanError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut builder = RegistryBuilder::new();
        for entry in entries {
            self.scan_entry(entry.as_ref(), &mut builder)?;
        }
        Ok(builder.build())
    }

    /// Scans one classpath entry; missing entries are ignored like `javac` does.
    pub fn scan_entry(&self, path: &Path, builder: &mut RegistryBuilder) -> Result<usize, ScanError> {
        if path.is_dir() {
            return self.scan_directory(path, builder);
        }
        if path.is_file() && self.is_archive(path) {
            return self.scan_archive(path, builder);
        }
        debug!(path = %path.display(), "skipping classpath entry");
        Ok(0)
    }

    /// Registers every class file below `root`. Returns the number registered.
    pub fn scan_directory(
        &self,
        root: &Path,
        builder: &mut RegistryBuilder,
    ) -> Result<usize, ScanError> {
        let mut registered = 0;
        let mut dirs = vec![root.to_path_buf()];
        while let Some(dir) = dirs.pop() {
            let entries = fs::read_dir(&dir).map_err(|source| ScanError::Io {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| ScanError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|source| ScanError::Io {
                    path: path.clone(),
                    source,
                })?;
                if file_type.is_dir() {
                    dirs.push(path);
                    continue;
                }

                let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
                    continue;
                };
                if !self.is_class_file(file_name) {
                    continue;
                }

                let artifact: ArtifactHandle = Arc::new(ClassFileArtifact::new(path.clone()));
                if self.register(&path, root, file_name, artifact, builder)? {
                    registered += 1;
                }
            }
        }

        debug!(root = %root.display(), registered, "scanned class directory");
        Ok(registered)
    }

    /// Registers every class entry of a jar/zip archive.
    pub fn scan_archive(
        &self,
        path: &Path,
        builder: &mut RegistryBuilder,
    ) -> Result<usize, ScanError> {
        let file = File::open(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| ScanError::Zip {
            path: path.to_path_buf(),
            source,
        })?;

        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();

        let mut registered = 0;
        for name in names {
            if self.config.skip_meta_inf && is_meta_inf(&name) {
                trace!(archive = %path.display(), entry = %name, "skipping META-INF entry");
                continue;
            }
            let file_name = name.rsplit('/').next().unwrap_or(&name);
            if !self.is_class_file(file_name) {
                continue;
            }

            let artifact: ArtifactHandle = Arc::new(ArchiveEntryArtifact::new(path, name.as_str()));
            if self.register(Path::new(&name), Path::new(""), file_name, artifact, builder)? {
                registered += 1;
            }
        }

        debug!(archive = %path.display(), registered, "scanned class archive");
        Ok(registered)
    }

    fn register(
        &self,
        path: &Path,
        root: &Path,
        file_name: &str,
        artifact: ArtifactHandle,
        builder: &mut RegistryBuilder,
    ) -> Result<bool, ScanError> {
        if file_name.starts_with(&self.config.function_class_prefix) {
            let name =
                derive_function_name_with_prefix(path, root, &self.config.function_class_prefix)?;
            if builder.contains_function(&name) {
                trace!(%name, "function shadowed by earlier classpath entry");
                return Ok(false);
            }
            builder.register_function(name, artifact)?;
        } else {
            let name = derive_type_name(path, root)?;
            if builder.contains_type(&name) {
                trace!(%name, "type shadowed by earlier classpath entry");
                return Ok(false);
            }
            if let Some(package) = derive_package_name(path, root)? {
                builder.register_package(package)?;
            }
            builder.register_type(name, artifact)?;
        }
        Ok(true)
    }

    fn is_class_file(&self, file_name: &str) -> bool {
        file_name.ends_with(CLASS_FILE_SUFFIX) && !SKIPPED_CLASS_FILES.contains(&file_name)
    }

    fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| self.config.is_archive_extension(ext))
            .unwrap_or(false)
    }
}

fn is_meta_inf(name: &str) -> bool {
    if name.starts_with("META-INF/") {
        return true;
    }
    if let Some(stripped) = name.strip_prefix("classes/") {
        return is_meta_inf(stripped);
    }
    false
}
