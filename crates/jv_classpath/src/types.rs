//! Type shapes shared by the class-file decoder and the compiler front-end.
//!
//! [`StructuredType`] is what the metadata provider reports for a descriptor,
//! [`TypeUsage`] is what the rest of the compiler consumes. The two are kept
//! as separate enums so the provider contract can evolve without touching the
//! checker-facing API.

use crate::signature::calc_signature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The nine JVM primitive kinds, `void` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Void,
    ];

    /// Looks up a primitive by its Java source name (`int`, `boolean`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Looks up a primitive by its single-character descriptor.
    pub fn from_descriptor(tag: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.descriptor() as u8 == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Void => 'V',
        }
    }

    /// Number of local variable slots a value of this kind occupies.
    pub fn slot_width(self) -> u16 {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => 2,
            PrimitiveKind::Void => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded shape of a type as reported by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructuredType {
    Primitive(PrimitiveKind),
    Array(Box<StructuredType>),
    /// Dotted binary class name, e.g. `java.util.Map$Entry`.
    Reference(String),
}

impl StructuredType {
    pub fn reference(name: impl Into<String>) -> Self {
        StructuredType::Reference(name.into())
    }

    pub fn array_of(element: StructuredType) -> Self {
        StructuredType::Array(Box::new(element))
    }

    /// Local variable slots taken by a parameter of this type.
    pub fn slot_width(&self) -> u16 {
        match self {
            StructuredType::Primitive(kind) => kind.slot_width(),
            StructuredType::Array(_) | StructuredType::Reference(_) => 1,
        }
    }
}

/// Compiler-facing type usage built from a [`StructuredType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeUsage {
    Primitive(PrimitiveKind),
    Array(Box<TypeUsage>),
    Reference(String),
}

impl TypeUsage {
    pub fn reference(name: impl Into<String>) -> Self {
        TypeUsage::Reference(name.into())
    }

    pub fn array_of(element: TypeUsage) -> Self {
        TypeUsage::Array(Box::new(element))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeUsage::Array(_))
    }

    /// `void` counts as primitive, as it does in `java.lang.Class`.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeUsage::Primitive(_))
    }

    /// True only for class/interface references; arrays answer false.
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeUsage::Reference(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeUsage::Primitive(PrimitiveKind::Void))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeUsage::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&TypeUsage> {
        match self {
            TypeUsage::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            TypeUsage::Reference(name) => Some(name),
            _ => None,
        }
    }

    pub fn array_dimensions(&self) -> usize {
        let mut dimensions = 0;
        let mut current = self;
        while let TypeUsage::Array(element) = current {
            dimensions += 1;
            current = element;
        }
        dimensions
    }

    /// Binary descriptor of this usage (`I`, `[Z`, `Ljava/lang/String;`).
    pub fn jvm_signature(&self) -> String {
        calc_signature(&StructuredType::from(self))
    }
}

impl fmt::Display for TypeUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeUsage::Primitive(kind) => write!(f, "{kind}"),
            TypeUsage::Array(element) => write!(f, "{element}[]"),
            TypeUsage::Reference(name) => f.write_str(name),
        }
    }
}

impl From<&TypeUsage> for StructuredType {
    fn from(value: &TypeUsage) -> Self {
        match value {
            TypeUsage::Primitive(kind) => StructuredType::Primitive(*kind),
            TypeUsage::Array(element) => {
                StructuredType::Array(Box::new(StructuredType::from(element.as_ref())))
            }
            TypeUsage::Reference(name) => StructuredType::Reference(name.clone()),
        }
    }
}

impl From<&StructuredType> for TypeUsage {
    fn from(value: &StructuredType) -> Self {
        to_type_usage(value)
    }
}

/// Structural translation from provider types to compiler types.
pub fn to_type_usage(ty: &StructuredType) -> TypeUsage {
    match ty {
        StructuredType::Primitive(kind) => TypeUsage::Primitive(*kind),
        StructuredType::Array(element) => TypeUsage::Array(Box::new(to_type_usage(element))),
        StructuredType::Reference(name) => TypeUsage::Reference(name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_of_boolean() -> TypeUsage {
        to_type_usage(&StructuredType::array_of(StructuredType::Primitive(
            PrimitiveKind::Boolean,
        )))
    }

    fn array_of_array_of_string() -> TypeUsage {
        to_type_usage(&StructuredType::array_of(StructuredType::array_of(
            StructuredType::reference("java.lang.String"),
        )))
    }

    #[test]
    fn array_usage_queries() {
        for usage in [array_of_boolean(), array_of_array_of_string()] {
            assert!(usage.is_array());
            assert!(!usage.is_primitive());
            assert!(!usage.is_reference());
            assert!(!usage.is_void());
            assert!(usage.as_reference().is_none());
            assert!(usage.as_primitive().is_none());
        }
    }

    #[test]
    fn array_usage_signatures() {
        assert_eq!(array_of_boolean().jvm_signature(), "[Z");
        assert_eq!(
            array_of_array_of_string().jvm_signature(),
            "[[Ljava/lang/String;"
        );
        assert_eq!(array_of_array_of_string().array_dimensions(), 2);
        assert_eq!(
            array_of_array_of_string().as_array(),
            Some(&TypeUsage::array_of(TypeUsage::reference("java.lang.String")))
        );
    }

    #[test]
    fn usage_and_decoded_type_share_descriptors() {
        let decoded = StructuredType::array_of(StructuredType::reference("a.Outer$Inner"));
        let usage = to_type_usage(&decoded);
        assert_eq!(usage.jvm_signature(), "[La/Outer$Inner;");
        assert_eq!(usage.jvm_signature(), calc_signature(&decoded));
        assert_eq!(StructuredType::from(&usage), decoded);
    }

    #[test]
    fn void_is_primitive() {
        let usage = to_type_usage(&StructuredType::Primitive(PrimitiveKind::Void));
        assert!(usage.is_void());
        assert!(usage.is_primitive());
        assert_eq!(usage.as_primitive(), Some(PrimitiveKind::Void));
    }

    #[test]
    fn primitive_lookup_recognises_exactly_nine_names() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
            assert_eq!(
                PrimitiveKind::from_descriptor(kind.descriptor() as u8),
                Some(kind)
            );
        }
        assert_eq!(PrimitiveKind::from_name("String"), None);
        assert_eq!(PrimitiveKind::from_name("Integer"), None);
        assert_eq!(PrimitiveKind::from_descriptor(b'L'), None);
    }

    #[test]
    fn display_uses_source_form() {
        assert_eq!(array_of_array_of_string().to_string(), "java.lang.String[][]");
        assert_eq!(array_of_boolean().to_string(), "boolean[]");
    }

    #[test]
    fn wide_primitives_take_two_slots() {
        assert_eq!(StructuredType::Primitive(PrimitiveKind::Long).slot_width(), 2);
        assert_eq!(StructuredType::Primitive(PrimitiveKind::Double).slot_width(), 2);
        assert_eq!(StructuredType::Primitive(PrimitiveKind::Int).slot_width(), 1);
        assert_eq!(StructuredType::reference("a.B").slot_width(), 1);
    }
}
