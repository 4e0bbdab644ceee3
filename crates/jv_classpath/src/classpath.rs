//! Classpath view handed to metadata providers while they decode.

use crate::artifact::{ArtifactHandle, ArtifactLocation, ByteStream};
use crate::registry::ArtifactRegistry;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassPathError {
    #[error("IO error while opening {location}: {source}")]
    Io {
        location: ArtifactLocation,
        #[source]
        source: io::Error,
    },
}

/// Lookup contract a metadata provider uses to fetch class bytes by name.
pub trait ClassPath {
    /// Opens the bytes of `qualified_name`, or `None` when it is unknown.
    fn open_bytes(&self, qualified_name: &str) -> Result<Option<ByteStream>, ClassPathError>;

    fn locate(&self, qualified_name: &str) -> Option<ArtifactLocation>;

    /// Releases resources held by the classpath. Safe to call repeatedly.
    fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View<'a> {
    Types,
    Function(&'a str),
}

/// [`ClassPath`] backed by the registry's artifact tables.
#[derive(Debug, Clone, Copy)]
pub struct CompiledClassPath<'a> {
    registry: &'a ArtifactRegistry,
    view: View<'a>,
}

impl<'a> CompiledClassPath<'a> {
    /// View over the registered classes and interfaces.
    pub fn types(registry: &'a ArtifactRegistry) -> Self {
        Self {
            registry,
            view: View::Types,
        }
    }

    /// View used while decoding the function `function_name`.
    ///
    /// That name opens the function class; every other name resolves
    /// against the registered types, so a provider can follow references
    /// such as parameter types.
    pub fn for_function(registry: &'a ArtifactRegistry, function_name: &'a str) -> Self {
        Self {
            registry,
            view: View::Function(function_name),
        }
    }

    fn artifact(&self, qualified_name: &str) -> Option<&'a ArtifactHandle> {
        match self.view {
            View::Function(function_name) if function_name == qualified_name => {
                self.registry.function_artifact(qualified_name)
            }
            View::Types | View::Function(_) => self.registry.type_artifact(qualified_name),
        }
    }
}

impl ClassPath for CompiledClassPath<'_> {
    fn open_bytes(&self, qualified_name: &str) -> Result<Option<ByteStream>, ClassPathError> {
        let Some(artifact) = self.artifact(qualified_name) else {
            return Ok(None);
        };
        artifact
            .open()
            .map(Some)
            .map_err(|source| ClassPathError::Io {
                location: artifact.location(),
                source,
            })
    }

    fn locate(&self, qualified_name: &str) -> Option<ArtifactLocation> {
        self.artifact(qualified_name)
            .map(|artifact| artifact.location())
    }
}
