//! Entry points the checker uses to resolve names against compiled classes.

use crate::classpath::{ClassPath, CompiledClassPath};
use crate::config::ResolverConfig;
use crate::metadata::{
    ClassFileDecoder, ClassMetadata, DecodeError, FieldMetadata, MetadataProvider, MethodMetadata,
};
use crate::registry::ArtifactRegistry;
use crate::signature::{
    to_constructor_definition, to_method_definition, JvmConstructorDefinition,
    JvmMethodDefinition,
};
use crate::types::{to_type_usage, TypeUsage};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("function class for '{name}' has an unsupported shape: {reason}")]
    UnsupportedArtifactShape { name: String, reason: String },
    #[error("function '{name}' lacks parameter names: {detail}")]
    MissingDebugInfo { name: String, detail: String },
    #[error("failed to decode '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },
}

/// Name resolution against a source of type and function definitions.
///
/// Absent names resolve to `Ok(None)`; errors are reserved for artifacts
/// that exist but cannot be turned into definitions.
pub trait TypeResolver {
    fn exist_package(&self, name: &str) -> bool;

    fn resolve_absolute_type_name(&self, name: &str)
        -> Result<Option<NodeTypeDefinition>, ResolveError>;

    fn resolve_absolute_function_name(
        &self,
        name: &str,
    ) -> Result<Option<FunctionDefinition>, ResolveError>;
}

/// Resolves names against previously compiled class artifacts.
#[derive(Debug, Clone)]
pub struct CompiledTypeResolver<P = ClassFileDecoder> {
    registry: Arc<ArtifactRegistry>,
    provider: P,
    config: ResolverConfig,
}

impl CompiledTypeResolver<ClassFileDecoder> {
    pub fn new(registry: Arc<ArtifactRegistry>) -> Self {
        Self::with_provider(registry, ClassFileDecoder::new())
    }
}

impl<P: MetadataProvider> CompiledTypeResolver<P> {
    pub fn with_provider(registry: Arc<ArtifactRegistry>, provider: P) -> Self {
        Self {
            registry,
            provider,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    fn load(&self, name: &str, class_path: &dyn ClassPath) -> Result<ClassMetadata, ResolveError> {
        let result = self.provider.load(name, class_path);
        class_path.close();
        result.map_err(|source| {
            debug!(name = %name, error = %source, "failed to decode compiled artifact");
            ResolveError::Decode {
                name: name.to_string(),
                source,
            }
        })
    }

    fn build_function(
        &self,
        name: &str,
        class: ClassMetadata,
    ) -> Result<FunctionDefinition, ResolveError> {
        let unsupported = |reason: String| ResolveError::UnsupportedArtifactShape {
            name: name.to_string(),
            reason,
        };

        let [invoke] = class.methods.as_slice() else {
            return Err(unsupported(format!(
                "expected exactly one declared method, found {}",
                class.methods.len()
            )));
        };
        if invoke.name != self.config.invoke_method_name {
            return Err(unsupported(format!(
                "declared method is '{}', expected '{}'",
                invoke.name, self.config.invoke_method_name
            )));
        }

        let names = invoke
            .local_variable_names
            .as_ref()
            .ok_or_else(|| ResolveError::MissingDebugInfo {
                name: name.to_string(),
                detail: format!("'{}' has no local variable table", invoke.name),
            })?;

        let mut parameters = Vec::with_capacity(invoke.parameter_types.len());
        for (index, ty) in invoke.parameter_types.iter().enumerate() {
            let parameter_name = invoke
                .parameter_slot(index)
                .and_then(|slot| names.get(slot))
                .ok_or_else(|| ResolveError::MissingDebugInfo {
                    name: name.to_string(),
                    detail: format!("no local variable name for parameter {index}"),
                })?;
            parameters.push(FormalParameter::new(parameter_name, to_type_usage(ty)));
        }

        Ok(FunctionDefinition {
            name: name.to_string(),
            return_type: to_type_usage(&invoke.return_type),
            parameters,
            invocation: to_method_definition(&class, invoke),
        })
    }
}

impl<P: MetadataProvider> TypeResolver for CompiledTypeResolver<P> {
    fn exist_package(&self, name: &str) -> bool {
        self.registry.contains_package(name)
    }

    fn resolve_absolute_type_name(
        &self,
        name: &str,
    ) -> Result<Option<NodeTypeDefinition>, ResolveError> {
        if self.registry.type_artifact(name).is_none() {
            debug!(name = %name, "type not found on compiled classpath");
            return Ok(None);
        }
        let class = self.load(name, &CompiledClassPath::types(&self.registry))?;
        debug!(name = %name, methods = class.methods.len(), "resolved compiled type");
        Ok(Some(NodeTypeDefinition::new(class)))
    }

    fn resolve_absolute_function_name(
        &self,
        name: &str,
    ) -> Result<Option<FunctionDefinition>, ResolveError> {
        if self.registry.function_artifact(name).is_none() {
            debug!(name = %name, "function not found on compiled classpath");
            return Ok(None);
        }
        let class = self.load(name, &CompiledClassPath::for_function(&self.registry, name))?;
        let function = self.build_function(name, class)?;
        debug!(
            name = %name,
            parameters = function.parameters.len(),
            "resolved compiled function"
        );
        Ok(Some(function))
    }
}

/// A named, typed parameter recovered from debug information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalParameter {
    pub name: String,
    pub ty: TypeUsage,
}

impl FormalParameter {
    pub fn new(name: impl Into<String>, ty: TypeUsage) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Top-level function loaded from a compiled function class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    name: String,
    return_type: TypeUsage,
    parameters: Vec<FormalParameter>,
    invocation: JvmMethodDefinition,
}

impl FunctionDefinition {
    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &TypeUsage {
        &self.return_type
    }

    pub fn parameters(&self) -> &[FormalParameter] {
        &self.parameters
    }

    /// Method the generated code calls to run this function.
    pub fn invocation(&self) -> &JvmMethodDefinition {
        &self.invocation
    }
}

/// Type definition backed by decoded class metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeDefinition {
    class: ClassMetadata,
}

impl NodeTypeDefinition {
    pub fn new(class: ClassMetadata) -> Self {
        Self { class }
    }

    /// Dotted binary name (`a.b.Outer$Inner`).
    pub fn binary_name(&self) -> &str {
        &self.class.name
    }

    /// Canonical name (`a.b.Outer.Inner`).
    pub fn qualified_name(&self) -> String {
        self.class.name.replace('$', ".")
    }

    pub fn is_interface(&self) -> bool {
        self.class.access_flags.is_interface()
    }

    pub fn superclass(&self) -> Option<&str> {
        self.class.super_name.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.class.interfaces
    }

    pub fn fields(&self) -> &[FieldMetadata] {
        &self.class.fields
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodMetadata> {
        self.class
            .methods
            .iter()
            .filter(move |method| method.name == name)
    }

    pub fn method_definitions(&self) -> Vec<JvmMethodDefinition> {
        self.class
            .methods
            .iter()
            .map(|method| to_method_definition(&self.class, method))
            .collect()
    }

    pub fn constructor_definitions(&self) -> Vec<JvmConstructorDefinition> {
        self.class
            .constructors
            .iter()
            .map(|constructor| to_constructor_definition(&self.class, constructor))
            .collect()
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.class
    }
}
