//! Minimal class file writer for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

pub struct MethodSpec {
    access: u16,
    name: String,
    descriptor: String,
    has_code: bool,
    locals: Option<Vec<(u16, u16, String, String)>>,
}

impl MethodSpec {
    pub fn new(access: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            has_code: true,
            locals: None,
        }
    }

    pub fn abstract_method(access: u16, name: &str, descriptor: &str) -> Self {
        Self {
            has_code: false,
            ..Self::new(access | ACC_ABSTRACT, name, descriptor)
        }
    }

    /// Adds a `LocalVariableTable` entry live from pc 0.
    pub fn local(self, slot: u16, name: &str, descriptor: &str) -> Self {
        self.scoped_local(0, slot, name, descriptor)
    }

    pub fn scoped_local(mut self, start_pc: u16, slot: u16, name: &str, descriptor: &str) -> Self {
        self.locals.get_or_insert_with(Vec::new).push((
            start_pc,
            slot,
            name.to_string(),
            descriptor.to_string(),
        ));
        self
    }

    /// Emits an empty `LocalVariableTable`.
    pub fn empty_locals(mut self) -> Self {
        self.locals = Some(Vec::new());
        self
    }
}

pub struct ClassFileBuilder {
    access: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(u16, String, String)>,
    methods: Vec<MethodSpec>,
    long_constants: Vec<i64>,
}

impl ClassFileBuilder {
    /// `internal_name` uses slashes, e.g. `me/example/Point`.
    pub fn new(internal_name: &str) -> Self {
        Self {
            access: ACC_PUBLIC,
            this_class: internal_name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            long_constants: Vec::new(),
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn interface(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields
            .push((access, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a `CONSTANT_Long`, which occupies two constant pool slots.
    pub fn long_constant(mut self, value: i64) -> Self {
        self.long_constants.push(value);
        self
    }

    pub fn default_constructor(self) -> Self {
        self.method(MethodSpec::new(ACC_PUBLIC, "<init>", "()V"))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = ConstantPool::default();
        let mut body = Vec::new();

        for value in &self.long_constants {
            pool.long(*value);
        }

        put_u2(&mut body, self.access);
        put_u2(&mut body, pool.class(&self.this_class));
        let super_index = match &self.super_class {
            Some(name) => pool.class(name),
            None => 0,
        };
        put_u2(&mut body, super_index);

        put_u2(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            put_u2(&mut body, pool.class(interface));
        }

        put_u2(&mut body, self.fields.len() as u16);
        for (access, name, descriptor) in &self.fields {
            put_u2(&mut body, *access);
            put_u2(&mut body, pool.utf8(name));
            put_u2(&mut body, pool.utf8(descriptor));
            put_u2(&mut body, 0);
        }

        put_u2(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            put_u2(&mut body, method.access);
            put_u2(&mut body, pool.utf8(&method.name));
            put_u2(&mut body, pool.utf8(&method.descriptor));
            if !method.has_code {
                put_u2(&mut body, 0);
                continue;
            }
            put_u2(&mut body, 1);
            let code = code_attribute(method, &mut pool);
            put_u2(&mut body, pool.utf8("Code"));
            put_u4(&mut body, code.len() as u32);
            body.extend_from_slice(&code);
        }

        // SourceFile attribute, skipped by the decoder.
        put_u2(&mut body, 1);
        put_u2(&mut body, pool.utf8("SourceFile"));
        put_u4(&mut body, 2);
        put_u2(&mut body, pool.utf8("Generated.jv"));

        let mut out = Vec::new();
        put_u4(&mut out, 0xCAFE_BABE);
        put_u2(&mut out, 0);
        put_u2(&mut out, 52);
        put_u2(&mut out, pool.next_index);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }

    /// Writes the class below `root` following its package layout.
    pub fn write_to(&self, root: &Path, file_name: &str) -> std::path::PathBuf {
        let package = self
            .this_class
            .rsplit_once('/')
            .map(|(package, _)| package)
            .unwrap_or("");
        let dir = root.join(package);
        fs::create_dir_all(&dir).expect("create package directory");
        let path = dir.join(file_name);
        fs::write(&path, self.to_bytes()).expect("write class file");
        path
    }
}

fn code_attribute(method: &MethodSpec, pool: &mut ConstantPool) -> Vec<u8> {
    let mut code = Vec::new();
    put_u2(&mut code, 2); // max_stack
    put_u2(&mut code, 8); // max_locals
    put_u4(&mut code, 1);
    code.push(0xB1); // return
    put_u2(&mut code, 0); // exception_table_length

    match &method.locals {
        None => put_u2(&mut code, 0),
        Some(locals) => {
            put_u2(&mut code, 1);
            put_u2(&mut code, pool.utf8("LocalVariableTable"));
            put_u4(&mut code, 2 + 10 * locals.len() as u32);
            put_u2(&mut code, locals.len() as u16);
            for (start_pc, slot, name, descriptor) in locals {
                put_u2(&mut code, *start_pc);
                put_u2(&mut code, 1);
                put_u2(&mut code, pool.utf8(name));
                put_u2(&mut code, pool.utf8(descriptor));
                put_u2(&mut code, *slot);
            }
        }
    }
    code
}

struct ConstantPool {
    bytes: Vec<u8>,
    next_index: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next_index: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

impl ConstantPool {
    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        self.bytes.push(1);
        put_u2(&mut self.bytes, value.len() as u16);
        self.bytes.extend_from_slice(value.as_bytes());
        let index = self.allocate(1);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        if let Some(index) = self.classes.get(internal_name) {
            return *index;
        }
        let name_index = self.utf8(internal_name);
        self.bytes.push(7);
        put_u2(&mut self.bytes, name_index);
        let index = self.allocate(1);
        self.classes.insert(internal_name.to_string(), index);
        index
    }

    fn long(&mut self, value: i64) -> u16 {
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.allocate(2)
    }

    fn allocate(&mut self, slots: u16) -> u16 {
        let index = self.next_index;
        self.next_index += slots;
        index
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Writes a jar containing `entries` (entry name, bytes).
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = fs::File::create(path).expect("create jar");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, bytes) in entries {
        writer.start_file(*name, options).expect("start jar entry");
        writer.write_all(bytes).expect("write jar entry");
    }
    writer.finish().expect("finish jar");
}
