//! YAML document store
//!
//! Loads YAML files into `serde_yaml::Value` trees and writes them back.
//! Mapping key order is preserved in both directions, so an edited
//! document diffs cleanly against the file it came from.
//!
//! Serialization is controlled by an explicit [`DumpOptions`] value rather
//! than global state. It lists the long-form text fields that must always be
//! emitted as multi-line strings. serde_yaml writes a multi-line string as a
//! literal block scalar (`|`) unless its content needs quoting, for example
//! a line that ends in whitespace, in which case it is double-quoted.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{CoreError, Result};

/// Serializer configuration for a [`YamlStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    literal_fields: Vec<Vec<String>>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always emit the string at `path` as a multi-line value
    ///
    /// A single-line value gets a trailing newline. The scalar style is left
    /// to serde_yaml: usually `|`, double-quoted when the text requires it.
    pub fn literal(mut self, path: &[&str]) -> Self {
        self.literal_fields
            .push(path.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn literal_fields(&self) -> impl Iterator<Item = &[String]> {
        self.literal_fields.iter().map(Vec::as_slice)
    }
}

/// Reads and writes YAML documents with a fixed [`DumpOptions`]
#[derive(Debug, Clone, Default)]
pub struct YamlStore {
    options: DumpOptions,
}

impl YamlStore {
    pub fn new(options: DumpOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    /// Load and parse a YAML file
    pub fn load(&self, path: &Path) -> Result<Value> {
        let content = read_file(path)?;
        parse(&content, path)
    }

    /// Serialize a document, applying the configured string styles
    pub fn serialize(&self, value: &Value) -> Result<String> {
        let mut value = value.clone();
        for field in self.options.literal_fields() {
            let segments: Vec<&str> = field.iter().map(String::as_str).collect();
            if let Some(Value::String(s)) = get_mut(&mut value, &segments) {
                if !s.contains('\n') {
                    s.push('\n');
                }
            }
        }
        Ok(serde_yaml::to_string(&value)?)
    }

    /// Serialize a document and write it to `path`, replacing any existing file
    pub fn dump(&self, value: &Value, path: &Path) -> Result<()> {
        let content = self.serialize(value)?;
        write_atomic(path, &content)
    }
}

/// Read a file to a string
pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CoreError::io(path, e))
}

/// Parse YAML content; `path` is only used for error reporting
pub fn parse(content: &str, path: &Path) -> Result<Value> {
    serde_yaml::from_str(content).map_err(|source| CoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temporary file in the same directory, then rename it
/// over `path`, so readers never see a partial file
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| CoreError::io(parent, e))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| CoreError::io(temp_file.path(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| CoreError::io(path, e.error))?;
    Ok(())
}

/// Get a nested value by key path
pub fn get<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Get a nested value mutably by key path
pub fn get_mut<'a>(value: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(value, |current, key| current.get_mut(*key))
}

/// Get a nested string, failing if it is absent or not a string
pub fn get_str<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str> {
    match get(value, path) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(CoreError::field_type(path.join("."), "string")),
        None => Err(CoreError::missing("document", path.join("."))),
    }
}

/// Set a nested value, creating missing intermediate mappings
pub fn set(value: &mut Value, path: &[&str], new_value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *value = new_value;
        return Ok(());
    };

    let mut current = value;
    for (depth, key) in parents.iter().enumerate() {
        let map = as_mapping_mut(current, &path[..depth])?;
        if !map.contains_key(*key) {
            map.insert(Value::from(*key), Value::Mapping(Mapping::new()));
        }
        current = map
            .get_mut(*key)
            .ok_or_else(|| CoreError::missing("document", path[..=depth].join(".")))?;
    }

    as_mapping_mut(current, parents)?.insert(Value::from(*last), new_value);
    Ok(())
}

fn as_mapping_mut<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Mapping> {
    if value.is_null() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(map) => Ok(map),
        _ => {
            let field = if path.is_empty() {
                "<root>".to_string()
            } else {
                path.join(".")
            };
            Err(CoreError::field_type(field, "mapping"))
        }
    }
}
