//! Mapping from on-disk class file layout to canonical dotted names.

use std::path::{Path, MAIN_SEPARATOR};
use thiserror::Error;

pub const CLASS_FILE_SUFFIX: &str = ".class";
/// Top-level functions compile to `<FUNCTION_CLASS_PREFIX><name>.class`.
pub const FUNCTION_CLASS_PREFIX: &str = "Function_";
/// Name of the single method carried by a function class.
pub const INVOKE_METHOD_NAME: &str = "invoke";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{path} is not located below classpath root {root}")]
    OutsideRoot { path: String, root: String },
    #[error("{path} is not a class file")]
    NotAClassFile { path: String },
    #[error("{path} is not a function class (expected prefix '{prefix}')")]
    NotAFunctionClass { path: String, prefix: String },
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8 { path: String },
}

/// Derives the canonical type name of `path` relative to `root`.
///
/// `/root/a/b/C$D.class` under `/root` becomes `a.b.C.D`.
pub fn derive_type_name(path: &Path, root: &Path) -> Result<String, LayoutError> {
    let path = path_str(path)?;
    let root = path_str(root)?;
    let relative = relative_to_root(path, root)?;
    let stem = relative
        .strip_suffix(CLASS_FILE_SUFFIX)
        .ok_or_else(|| LayoutError::NotAClassFile {
            path: path.to_string(),
        })?;
    Ok(strip_leading_dot(dotted(stem)))
}

/// Derives the function name of a function class using the default prefix.
pub fn derive_function_name(path: &Path, root: &Path) -> Result<String, LayoutError> {
    derive_function_name_with_prefix(path, root, FUNCTION_CLASS_PREFIX)
}

/// Derives the function name of a function class.
///
/// The enclosing directory supplies the namespace; the file name minus
/// `prefix` and the class suffix supplies the simple name, so
/// `/root/pkg/Function_foo.class` under `/root` becomes `pkg.foo`.
pub fn derive_function_name_with_prefix(
    path: &Path,
    root: &Path,
    prefix: &str,
) -> Result<String, LayoutError> {
    let display = path.display().to_string();
    let parent = path.parent().ok_or_else(|| LayoutError::OutsideRoot {
        path: display.clone(),
        root: root.display().to_string(),
    })?;
    let parent = path_str(parent)?;
    let root = path_str(root)?;
    let namespace = relative_to_root(parent, root)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LayoutError::NonUtf8 {
            path: display.clone(),
        })?;
    let simple = file_name
        .strip_suffix(CLASS_FILE_SUFFIX)
        .ok_or_else(|| LayoutError::NotAClassFile {
            path: display.clone(),
        })?
        .strip_prefix(prefix)
        .ok_or_else(|| LayoutError::NotAFunctionClass {
            path: display,
            prefix: prefix.to_string(),
        })?;

    let mut name = dotted(namespace);
    name.push('.');
    name.push_str(simple);
    Ok(strip_leading_dot(name))
}

/// Package of the class file at `path`, taken from its directory below
/// `root`. Classes directly under the root are in the unnamed package.
///
/// `/root/a/b/C$D.class` under `/root` is in `a.b`, never `a.b.C`.
pub fn derive_package_name(path: &Path, root: &Path) -> Result<Option<String>, LayoutError> {
    let Some(parent) = path.parent() else {
        return Ok(None);
    };
    let parent = path_str(parent)?;
    let root = path_str(root)?;
    let is_separator = |ch: char| ch == '/' || ch == MAIN_SEPARATOR;
    if parent.trim_end_matches(is_separator) == root.trim_end_matches(is_separator) {
        return Ok(None);
    }
    let namespace = relative_to_root(parent, root)?;
    let package = strip_leading_dot(dotted(namespace));
    Ok(Some(package).filter(|package| !package.is_empty()))
}

/// `java.lang.String` -> `java/lang/String`
pub fn canonical_to_internal(name: &str) -> String {
    name.replace('.', "/")
}

/// `java/lang/String` -> `java.lang.String`
pub fn internal_to_canonical(name: &str) -> String {
    name.replace('/', ".")
}

/// Every enclosing package of a dotted name, outermost first.
pub fn enclosing_packages(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('.').map(move |(idx, _)| &name[..idx])
}

/// Dotted identifier without empty segments.
pub fn is_qualified_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(|segment| !segment.is_empty())
}

fn path_str(path: &Path) -> Result<&str, LayoutError> {
    path.to_str().ok_or_else(|| LayoutError::NonUtf8 {
        path: path.display().to_string(),
    })
}

fn relative_to_root<'a>(path: &'a str, root: &str) -> Result<&'a str, LayoutError> {
    if path.len() <= root.len() || !path.starts_with(root) {
        return Err(LayoutError::OutsideRoot {
            path: path.to_string(),
            root: root.to_string(),
        });
    }
    Ok(&path[root.len()..])
}

fn dotted(relative: &str) -> String {
    relative
        .chars()
        .map(|ch| match ch {
            '/' | '$' => '.',
            ch if ch == MAIN_SEPARATOR => '.',
            ch => ch,
        })
        .collect()
}

fn strip_leading_dot(name: String) -> String {
    match name.strip_prefix('.') {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}
