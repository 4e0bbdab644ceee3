//! Binary descriptors and member references for code generation.

use crate::metadata::{ClassMetadata, MethodMetadata};
use crate::naming::canonical_to_internal;
use crate::types::StructuredType;

pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Member reference a code generator needs to emit `invoke*` instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JvmMethodDefinition {
    /// Internal owner name, e.g. `java/lang/String`.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JvmConstructorDefinition {
    pub owner: String,
    pub descriptor: String,
}

impl JvmConstructorDefinition {
    pub fn name(&self) -> &'static str {
        CONSTRUCTOR_NAME
    }
}

/// Descriptor of a single type (`Z`, `[I`, `Ljava/lang/String;`).
pub fn calc_signature(ty: &StructuredType) -> String {
    let mut out = String::new();
    write_signature(ty, &mut out);
    out
}

fn write_signature(ty: &StructuredType, out: &mut String) {
    match ty {
        StructuredType::Primitive(kind) => out.push(kind.descriptor()),
        StructuredType::Array(element) => {
            out.push('[');
            write_signature(element, out);
        }
        StructuredType::Reference(name) => {
            out.push('L');
            out.push_str(&canonical_to_internal(name));
            out.push(';');
        }
    }
}

/// `(<parameters>)<return>` descriptor of a method.
pub fn calc_method_signature(method: &MethodMetadata) -> String {
    let mut out = parameter_list(&method.parameter_types);
    write_signature(&method.return_type, &mut out);
    out
}

/// Constructor descriptor; the return type is always `V`.
pub fn calc_constructor_signature(constructor: &MethodMetadata) -> String {
    let mut out = parameter_list(&constructor.parameter_types);
    out.push('V');
    out
}

fn parameter_list(parameters: &[StructuredType]) -> String {
    let mut out = String::from("(");
    for parameter in parameters {
        write_signature(parameter, &mut out);
    }
    out.push(')');
    out
}

pub fn to_method_definition(owner: &ClassMetadata, method: &MethodMetadata) -> JvmMethodDefinition {
    JvmMethodDefinition {
        owner: canonical_to_internal(&owner.name),
        name: method.name.clone(),
        descriptor: calc_method_signature(method),
        is_static: method.is_static(),
    }
}

pub fn to_constructor_definition(
    owner: &ClassMetadata,
    constructor: &MethodMetadata,
) -> JvmConstructorDefinition {
    JvmConstructorDefinition {
        owner: canonical_to_internal(&owner.name),
        descriptor: calc_constructor_signature(constructor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ACC_PUBLIC, ACC_STATIC};
    use crate::types::PrimitiveKind;
    use test_case::test_case;

    #[test_case(PrimitiveKind::Boolean, "Z" ; "boolean")]
    #[test_case(PrimitiveKind::Byte, "B" ; "byte")]
    #[test_case(PrimitiveKind::Char, "C" ; "char")]
    #[test_case(PrimitiveKind::Short, "S" ; "short")]
    #[test_case(PrimitiveKind::Int, "I" ; "int")]
    #[test_case(PrimitiveKind::Long, "J" ; "long")]
    #[test_case(PrimitiveKind::Float, "F" ; "float")]
    #[test_case(PrimitiveKind::Double, "D" ; "double")]
    #[test_case(PrimitiveKind::Void, "V" ; "void")]
    fn primitive_descriptors(kind: PrimitiveKind, expected: &str) {
        assert_eq!(calc_signature(&StructuredType::Primitive(kind)), expected);
    }

    #[test]
    fn reference_descriptor() {
        assert_eq!(
            calc_signature(&StructuredType::reference("java.lang.String")),
            "Ljava/lang/String;"
        );
    }

    #[test]
    fn nested_arrays_prefix_one_bracket_per_level() {
        let mut ty = StructuredType::Primitive(PrimitiveKind::Int);
        for depth in 1..=4 {
            ty = StructuredType::array_of(ty);
            let signature = calc_signature(&ty);
            assert_eq!(signature, format!("{}I", "[".repeat(depth)));
        }

        let element = StructuredType::reference("a.B");
        assert_eq!(
            calc_signature(&StructuredType::array_of(element.clone())),
            format!("[{}", calc_signature(&element))
        );
    }

    fn concat_method() -> MethodMetadata {
        MethodMetadata::new(
            "concat",
            ACC_PUBLIC,
            vec![
                StructuredType::reference("java.lang.String"),
                StructuredType::array_of(StructuredType::Primitive(PrimitiveKind::Long)),
            ],
            StructuredType::reference("java.lang.String"),
        )
    }

    #[test]
    fn method_descriptor_follows_declaration_order() {
        assert_eq!(
            calc_method_signature(&concat_method()),
            "(Ljava/lang/String;[J)Ljava/lang/String;"
        );
    }

    #[test]
    fn constructor_descriptor_forces_void_return() {
        let constructor = MethodMetadata::new(
            CONSTRUCTOR_NAME,
            ACC_PUBLIC,
            vec![StructuredType::Primitive(PrimitiveKind::Int)],
            StructuredType::reference("java.lang.Object"),
        );
        assert_eq!(calc_constructor_signature(&constructor), "(I)V");
    }

    #[test]
    fn member_definitions_use_internal_owner() {
        let owner = ClassMetadata::new("me.example.Text$Builder");
        let method = to_method_definition(&owner, &concat_method());
        assert_eq!(method.owner, "me/example/Text$Builder");
        assert_eq!(method.name, "concat");
        assert!(!method.is_static);

        let helper = MethodMetadata::new(
            "of",
            ACC_PUBLIC | ACC_STATIC,
            Vec::new(),
            StructuredType::Primitive(PrimitiveKind::Void),
        );
        let helper = to_method_definition(&owner, &helper);
        assert!(helper.is_static);
        assert_eq!(helper.descriptor, "()V");

        let constructor = MethodMetadata::new(
            CONSTRUCTOR_NAME,
            ACC_PUBLIC,
            Vec::new(),
            StructuredType::Primitive(PrimitiveKind::Void),
        );
        let constructor = to_constructor_definition(&owner, &constructor);
        assert_eq!(constructor.owner, "me/example/Text$Builder");
        assert_eq!(constructor.name(), "<init>");
        assert_eq!(constructor.descriptor, "()V");
    }
}
