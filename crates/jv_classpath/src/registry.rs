//! Name-to-artifact tables consulted by the compiled type resolver.

use crate::artifact::ArtifactHandle;
use crate::naming::{enclosing_packages, is_qualified_name};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("'{name}' is not a qualified name")]
    InvalidName { name: String },
    #[error("{kind} '{name}' is registered twice")]
    Duplicate { kind: &'static str, name: String },
}

/// Immutable registry of compiled artifacts, keyed by canonical dotted name.
///
/// Built once through [`RegistryBuilder`] and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    types: HashMap<String, ArtifactHandle>,
    functions: HashMap<String, ArtifactHandle>,
    packages: HashSet<String>,
}

impl ArtifactRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn type_artifact(&self, name: &str) -> Option<&ArtifactHandle> {
        self.types.get(name)
    }

    pub fn function_artifact(&self, name: &str) -> Option<&ArtifactHandle> {
        self.functions.get(name)
    }

    pub fn contains_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn type_names(&self) -> BTreeSet<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    pub fn function_names(&self) -> BTreeSet<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn package_names(&self) -> BTreeSet<&str> {
        self.packages.iter().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.functions.is_empty() && self.packages.is_empty()
    }
}

/// Collects registrations before freezing them into an [`ArtifactRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: ArtifactRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class or interface.
    ///
    /// Packages are not inferred from `name`, since a nested class such as
    /// `a.Outer.Inner` would otherwise make `a.Outer` a package. Callers
    /// record the class's package through [`Self::register_package`].
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        artifact: ArtifactHandle,
    ) -> Result<&mut Self, RegistryError> {
        let name = checked_name(name.into())?;
        if self.registry.types.contains_key(&name) {
            return Err(RegistryError::Duplicate { kind: "type", name });
        }
        self.registry.types.insert(name, artifact);
        Ok(self)
    }

    /// Registers a function class under the function's own name, together
    /// with the packages enclosing it.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        artifact: ArtifactHandle,
    ) -> Result<&mut Self, RegistryError> {
        let name = checked_name(name.into())?;
        if self.registry.functions.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                kind: "function",
                name,
            });
        }
        self.add_enclosing_packages(&name);
        self.registry.functions.insert(name, artifact);
        Ok(self)
    }

    pub fn register_package(&mut self, name: impl Into<String>) -> Result<&mut Self, RegistryError> {
        let name = checked_name(name.into())?;
        self.add_enclosing_packages(&name);
        self.registry.packages.insert(name);
        Ok(self)
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.registry.types.contains_key(name)
    }

    pub fn contains_function(&self, name: &str) -> bool {
        self.registry.functions.contains_key(name)
    }

    pub fn build(self) -> ArtifactRegistry {
        self.registry
    }

    fn add_enclosing_packages(&mut self, name: &str) {
        for package in enclosing_packages(name) {
            if !self.registry.packages.contains(package) {
                self.registry.packages.insert(package.to_string());
            }
        }
    }
}

fn checked_name(name: String) -> Result<String, RegistryError> {
    if is_qualified_name(&name) {
        Ok(name)
    } else {
        Err(RegistryError::InvalidName { name })
    }
}
