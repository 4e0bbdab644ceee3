//! Compiled classpath resolution for the jv compiler.
//!
//! Turns class files produced by earlier compilations (or shipped in
//! libraries) into the definitions the checker and code generator consume:
//! [`NodeTypeDefinition`] for classes, [`FunctionDefinition`] for compiled
//! top-level functions, and JVM descriptors for member references.
//!
//! A typical setup scans the classpath once and shares the frozen registry:
//!
//! ```no_run
//! use std::sync::Arc;
//! use jv_classpath::{ClasspathScanner, CompiledTypeResolver, ResolverConfig, TypeResolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ClasspathScanner::new(ResolverConfig::default())
//!     .scan_classpath(["out/classes", "lib/runtime.jar"])?;
//! let resolver = CompiledTypeResolver::new(Arc::new(registry));
//! if let Some(function) = resolver.resolve_absolute_function_name("me.util.sum")? {
//!     println!("{} -> {}", function.qualified_name(), function.return_type());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod classpath;
pub mod config;
pub mod metadata;
pub mod naming;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod signature;
pub mod types;

pub use artifact::{
    ArchiveEntryArtifact, Artifact, ArtifactHandle, ArtifactLocation, ByteStream,
    ClassFileArtifact, MemoryArtifact,
};
pub use classpath::{ClassPath, ClassPathError, CompiledClassPath};
pub use config::{ConfigError, ResolverConfig};
pub use metadata::{
    ClassFileDecoder, ClassMetadata, DecodeError, LocalVariableNames, MetadataProvider,
    MethodMetadata,
};
pub use naming::{derive_function_name, derive_type_name, LayoutError};
pub use registry::{ArtifactRegistry, RegistryBuilder, RegistryError};
pub use resolver::{
    CompiledTypeResolver, FormalParameter, FunctionDefinition, NodeTypeDefinition, ResolveError,
    TypeResolver,
};
pub use scan::{ClasspathScanner, ScanError};
pub use signature::{
    calc_constructor_signature, calc_method_signature, calc_signature, JvmConstructorDefinition,
    JvmMethodDefinition,
};
pub use types::{to_type_usage, PrimitiveKind, StructuredType, TypeUsage};
