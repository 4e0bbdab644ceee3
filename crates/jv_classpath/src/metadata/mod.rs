//! Decoded class metadata and the provider contract that produces it.
//!
//! The resolver never inspects class bytes itself. It asks a
//! [`MetadataProvider`] to load a class through a [`ClassPath`], and the
//! provider answers with a [`ClassMetadata`] snapshot. [`ClassFileDecoder`]
//! is the provider used by the compiler; tests and embedders may plug in
//! their own.

mod classfile;

pub use classfile::{parse_class, ClassFileDecoder, ClassParseError};

use crate::artifact::ArtifactLocation;
use crate::classpath::{ClassPath, ClassPathError};
use crate::types::StructuredType;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use thiserror::Error;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

/// Loads class metadata by qualified name.
pub trait MetadataProvider: Send + Sync {
    /// Decodes the class named `qualified_name`, pulling its bytes (and those
    /// of any class it needs to consult) from `class_path`.
    fn load(
        &self,
        qualified_name: &str,
        class_path: &dyn ClassPath,
    ) -> Result<ClassMetadata, DecodeError>;
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("class {name} is not available on the classpath")]
    NotFound { name: String },
    #[error("failed to open class {name}: {source}")]
    ClassPath {
        name: String,
        #[source]
        source: ClassPathError,
    },
    #[error("IO error while reading {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed class file {location}: {source}")]
    ClassFile {
        location: String,
        #[source]
        source: ClassParseError,
    },
}

/// Raw `access_flags` of a class, field or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    pub fn is_public(self) -> bool {
        self.contains(ACC_PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.contains(ACC_PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(ACC_STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(ACC_FINAL)
    }

    pub fn is_interface(self) -> bool {
        self.contains(ACC_INTERFACE)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(ACC_ABSTRACT)
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Snapshot of one decoded class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMetadata {
    /// Dotted binary name, nested classes keep their `$`.
    pub name: String,
    pub access_flags: AccessFlags,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldMetadata>,
    /// Declared methods, constructors and static initialisers excluded.
    pub methods: Vec<MethodMetadata>,
    pub constructors: Vec<MethodMetadata>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access_flags: AccessFlags(ACC_PUBLIC),
            super_name: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constructor(mut self, constructor: MethodMetadata) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn package(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    pub name: String,
    pub access_flags: AccessFlags,
    pub ty: StructuredType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    pub name: String,
    pub access_flags: AccessFlags,
    pub parameter_types: Vec<StructuredType>,
    pub return_type: StructuredType,
    /// Present only when the class was compiled with local variable debug info.
    pub local_variable_names: Option<LocalVariableNames>,
}

impl MethodMetadata {
    pub fn new(
        name: impl Into<String>,
        access_flags: u16,
        parameter_types: Vec<StructuredType>,
        return_type: StructuredType,
    ) -> Self {
        Self {
            name: name.into(),
            access_flags: AccessFlags(access_flags),
            parameter_types,
            return_type,
            local_variable_names: None,
        }
    }

    pub fn with_local_variable_names(mut self, names: LocalVariableNames) -> Self {
        self.local_variable_names = Some(names);
        self
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.is_static()
    }

    /// Local variable slot holding parameter `index`.
    ///
    /// Slot 0 is the receiver of instance methods; `long` and `double`
    /// parameters take two slots.
    pub fn parameter_slot(&self, index: usize) -> Option<u16> {
        if index >= self.parameter_types.len() {
            return None;
        }
        let receiver = if self.is_static() { 0 } else { 1 };
        let preceding: u16 = self.parameter_types[..index]
            .iter()
            .map(StructuredType::slot_width)
            .sum();
        Some(receiver + preceding)
    }
}

/// `LocalVariableTable` contents keyed by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariableNames {
    by_slot: BTreeMap<u16, String>,
}

impl LocalVariableNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` for `slot` unless the slot already has one.
    pub fn insert(&mut self, slot: u16, name: impl Into<String>) {
        self.by_slot.entry(slot).or_insert_with(|| name.into());
    }

    pub fn get(&self, slot: u16) -> Option<&str> {
        self.by_slot.get(&slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u16, S)> for LocalVariableNames {
    fn from_iter<I: IntoIterator<Item = (u16, S)>>(iter: I) -> Self {
        let mut names = Self::new();
        for (slot, name) in iter {
            names.insert(slot, name);
        }
        names
    }
}

pub(crate) fn describe_location(location: Option<ArtifactLocation>, name: &str) -> String {
    match location {
        Some(location) => location.to_string(),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveKind;

    fn int() -> StructuredType {
        StructuredType::Primitive(PrimitiveKind::Int)
    }

    fn long() -> StructuredType {
        StructuredType::Primitive(PrimitiveKind::Long)
    }

    #[test]
    fn static_parameter_slots_start_at_zero() {
        let method = MethodMetadata::new(
            "invoke",
            ACC_PUBLIC | ACC_STATIC,
            vec![int(), StructuredType::reference("java.lang.String")],
            StructuredType::Primitive(PrimitiveKind::Boolean),
        );
        assert_eq!(method.parameter_slot(0), Some(0));
        assert_eq!(method.parameter_slot(1), Some(1));
        assert_eq!(method.parameter_slot(2), None);
    }

    #[test]
    fn instance_parameter_slots_skip_receiver() {
        let method = MethodMetadata::new(
            "invoke",
            ACC_PUBLIC,
            vec![int(), int()],
            StructuredType::Primitive(PrimitiveKind::Void),
        );
        assert_eq!(method.parameter_slot(0), Some(1));
        assert_eq!(method.parameter_slot(1), Some(2));
    }

    #[test]
    fn wide_parameters_take_two_slots() {
        let method = MethodMetadata::new(
            "invoke",
            ACC_STATIC,
            vec![long(), int(), StructuredType::Primitive(PrimitiveKind::Double), int()],
            StructuredType::Primitive(PrimitiveKind::Void),
        );
        assert_eq!(method.parameter_slot(1), Some(2));
        assert_eq!(method.parameter_slot(2), Some(3));
        assert_eq!(method.parameter_slot(3), Some(5));
    }

    #[test]
    fn first_name_per_slot_wins() {
        let names: LocalVariableNames = [(0u16, "x"), (0, "shadow"), (1, "y")].into_iter().collect();
        assert_eq!(names.get(0), Some("x"));
        assert_eq!(names.get(1), Some("y"));
        assert_eq!(names.get(2), None);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn package_of_class() {
        assert_eq!(ClassMetadata::new("a.b.C").package(), "a.b");
        assert_eq!(ClassMetadata::new("Top").package(), "");
    }
}
