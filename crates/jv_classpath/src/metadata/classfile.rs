use super::{
    describe_location, AccessFlags, ClassMetadata, DecodeError, FieldMetadata,
    LocalVariableNames, MethodMetadata, MetadataProvider,
};
use crate::classpath::ClassPath;
use crate::naming::internal_to_canonical;
use crate::signature::CONSTRUCTOR_NAME;
use crate::types::{PrimitiveKind, StructuredType};
use std::io::Read;
use thiserror::Error;
use tracing::trace;

const STATIC_INITIALIZER_NAME: &str = "<clinit>";

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),
    #[error("malformed modified UTF-8 at byte {offset}")]
    InvalidModifiedUtf8 { offset: usize },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Metadata provider backed by the built-in class file reader.
///
/// Only the parts the resolver needs are decoded: the class header, field
/// and method descriptors, and the `LocalVariableTable` of each method body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileDecoder;

impl ClassFileDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataProvider for ClassFileDecoder {
    fn load(
        &self,
        qualified_name: &str,
        class_path: &dyn ClassPath,
    ) -> Result<ClassMetadata, DecodeError> {
        let location = describe_location(class_path.locate(qualified_name), qualified_name);
        let mut stream = class_path
            .open_bytes(qualified_name)
            .map_err(|source| DecodeError::ClassPath {
                name: qualified_name.to_string(),
                source,
            })?
            .ok_or_else(|| DecodeError::NotFound {
                name: qualified_name.to_string(),
            })?;

        let mut buffer = Vec::new();
        stream
            .read_to_end(&mut buffer)
            .map_err(|source| DecodeError::Io {
                location: location.clone(),
                source,
            })?;

        trace!(name = %qualified_name, %location, bytes = buffer.len(), "decoding class file");
        parse_class(&buffer).map_err(|source| DecodeError::ClassFile { location, source })
    }
}

pub fn parse_class(bytes: &[u8]) -> Result<ClassMetadata, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let index = reader.read_u2()?;
        interfaces.push(internal_to_canonical(&constant_pool.class_name(index)?));
    }

    let mut fields = Vec::new();
    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;

        let name = constant_pool.utf8(name_index)?;
        let descriptor = constant_pool.utf8(descriptor_index)?;
        fields.push(FieldMetadata {
            name: name.to_string(),
            access_flags: AccessFlags(access_flags),
            ty: parse_field_descriptor(descriptor)?,
        });

        skip_attributes(&mut reader, attributes_count)?;
    }

    let mut methods = Vec::new();
    let mut constructors = Vec::new();
    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;

        let name = constant_pool.utf8(name_index)?;
        let descriptor = constant_pool.utf8(descriptor_index)?;
        let (parameter_types, return_type) = parse_method_descriptor(descriptor)?;

        let mut local_variable_names = None;
        for _ in 0..attributes_count {
            let attribute_name_index = reader.read_u2()?;
            let attribute_length = reader.read_u4()? as usize;
            let slice = reader.read_slice(attribute_length)?;
            if constant_pool.utf8(attribute_name_index)? == "Code" {
                local_variable_names = read_code_attribute(slice, &constant_pool)?;
            }
        }

        let method = MethodMetadata {
            name: name.to_string(),
            access_flags: AccessFlags(access_flags),
            parameter_types,
            return_type,
            local_variable_names,
        };
        match name {
            STATIC_INITIALIZER_NAME => {}
            CONSTRUCTOR_NAME => constructors.push(method),
            _ => methods.push(method),
        }
    }

    // Class attributes carry nothing the resolver needs.
    let attributes_count = reader.read_u2()?;
    skip_attributes(&mut reader, attributes_count)?;

    let name = internal_to_canonical(&constant_pool.class_name(this_class)?);
    let super_name = if super_class == 0 {
        None
    } else {
        Some(internal_to_canonical(&constant_pool.class_name(super_class)?))
    };

    Ok(ClassMetadata {
        name,
        access_flags: AccessFlags(access_flags),
        super_name,
        interfaces,
        fields,
        methods,
        constructors,
    })
}

/// Extracts the `LocalVariableTable` nested in a `Code` attribute.
fn read_code_attribute(
    code: &[u8],
    constant_pool: &ConstantPool,
) -> Result<Option<LocalVariableNames>, ClassParseError> {
    let mut reader = ClassReader::new(code);
    reader.read_u2()?; // max_stack
    reader.read_u2()?; // max_locals
    let code_length = reader.read_u4()? as usize;
    reader.skip(code_length)?;
    let exception_table_length = reader.read_u2()? as usize;
    reader.skip(exception_table_length * 8)?;

    let mut entries = Vec::new();
    let mut found = false;
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u2()?;
        let attribute_length = reader.read_u4()? as usize;
        let slice = reader.read_slice(attribute_length)?;
        if constant_pool.utf8(attribute_name_index)? != "LocalVariableTable" {
            continue;
        }
        found = true;
        let mut table = ClassReader::new(slice);
        let table_length = table.read_u2()?;
        for _ in 0..table_length {
            let start_pc = table.read_u2()?;
            table.read_u2()?; // length
            let name_index = table.read_u2()?;
            table.read_u2()?; // descriptor_index
            let slot = table.read_u2()?;
            entries.push((start_pc, slot, constant_pool.utf8(name_index)?.to_string()));
        }
    }

    if !found {
        return Ok(None);
    }

    // Parameters are live from pc 0; later scopes may reuse their slots.
    entries.sort_by_key(|(start_pc, _, _)| *start_pc);
    Ok(Some(
        entries
            .into_iter()
            .map(|(_, slot, name)| (slot, name))
            .collect(),
    ))
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

/// Decodes a `CONSTANT_Utf8` payload.
///
/// Class files encode NUL as `C0 80` and supplementary characters as
/// surrogate pairs of three-byte sequences. Unpaired surrogates become
/// U+FFFD.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ClassParseError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        let lead = bytes[start];
        let continuation = |offset: usize| -> Result<u16, ClassParseError> {
            match bytes.get(start + offset) {
                Some(byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
                _ => Err(ClassParseError::InvalidModifiedUtf8 { offset: start }),
            }
        };
        match lead {
            0x00..=0x7F => {
                units.push(u16::from(lead));
                pos += 1;
            }
            0xC0..=0xDF => {
                units.push((u16::from(lead & 0x1F) << 6) | continuation(1)?);
                pos += 2;
            }
            0xE0..=0xEF => {
                let high = u16::from(lead & 0x0F) << 12;
                units.push(high | (continuation(1)? << 6) | continuation(2)?);
                pos += 3;
            }
            _ => return Err(ClassParseError::InvalidModifiedUtf8 { offset: start }),
        }
    }
    Ok(String::from_utf16_lossy(&units))
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(decode_modified_utf8(bytes)?)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.to_string()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFEBABE;
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

fn parse_field_descriptor(descriptor: &str) -> Result<StructuredType, ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    let ty = parser.parse_type()?;
    if parser.remaining() != 0 {
        return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
    }
    Ok(ty)
}

fn parse_method_descriptor(
    descriptor: &str,
) -> Result<(Vec<StructuredType>, StructuredType), ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect(b'(')?;
    let mut parameters = Vec::new();
    while !parser.peek(b')')? {
        parameters.push(parser.parse_type()?);
    }
    parser.expect(b')')?;
    let return_type = if parser.peek(b'V')? {
        parser.pos += 1;
        StructuredType::Primitive(PrimitiveKind::Void)
    } else {
        parser.parse_type()?
    };

    if parser.remaining() != 0 {
        return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
    }
    Ok((parameters, return_type))
}

struct DescriptorParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn peek(&self, expected: u8) -> Result<bool, ClassParseError> {
        self.bytes
            .get(self.pos)
            .map(|byte| *byte == expected)
            .ok_or_else(|| ClassParseError::InvalidDescriptor("truncated descriptor".into()))
    }

    fn expect(&mut self, expected: u8) -> Result<(), ClassParseError> {
        if !self.peek(expected)? {
            return Err(ClassParseError::InvalidDescriptor(format!(
                "expected '{}' in descriptor",
                expected as char
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn parse_type(&mut self) -> Result<StructuredType, ClassParseError> {
        let start = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| ClassParseError::InvalidDescriptor("truncated descriptor".into()))?;
        match start {
            b'L' => self.parse_reference_type(),
            b'[' => {
                self.pos += 1;
                Ok(StructuredType::array_of(self.parse_type()?))
            }
            // `V` is only legal as a return type and handled by the caller.
            tag => match PrimitiveKind::from_descriptor(tag) {
                Some(kind) if kind != PrimitiveKind::Void => {
                    self.pos += 1;
                    Ok(StructuredType::Primitive(kind))
                }
                _ => Err(ClassParseError::InvalidDescriptor(format!(
                    "unexpected descriptor tag '{}'",
                    tag as char
                ))),
            },
        }
    }

    fn parse_reference_type(&mut self) -> Result<StructuredType, ClassParseError> {
        self.expect(b'L')?;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b';' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(ClassParseError::InvalidDescriptor(
                "unterminated reference descriptor".into(),
            ));
        }
        let name = String::from_utf8(self.bytes[start..self.pos].to_vec())?;
        self.pos += 1; // consume ';'
        Ok(StructuredType::Reference(internal_to_canonical(&name)))
    }
}
