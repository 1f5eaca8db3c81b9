use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Whether a field holds a list of author entries or a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    List,
    Single,
}

impl FieldKind {
    pub fn is_list(self) -> bool {
        matches!(self, FieldKind::List)
    }

    pub fn of_value(value: &Value) -> Self {
        if value.is_array() {
            FieldKind::List
        } else {
            FieldKind::Single
        }
    }
}

/// Record model keyed by field identifier. List fields are addressed by
/// (field, index).
pub trait RecordStore {
    /// Whether `field` belongs to the store schema.
    fn has_field(&self, field: &str) -> bool;

    fn get(&self, field: &str) -> Option<&Value>;

    fn set(&mut self, field: &str, value: Value);

    fn get_index(&self, field: &str, index: usize) -> Option<&Value> {
        self.get(field)?.as_array()?.get(index)
    }

    /// Overwrite one element of a list field. Returns false when the field is
    /// not a list or the index is out of range; nothing is written then.
    fn set_index(&mut self, field: &str, index: usize, entry: Value) -> bool;
}

/// In-memory store backed by a JSON document on disk.
#[derive(Debug, Clone, Default)]
pub struct JsonRecordStore {
    path: Option<PathBuf>,
    fields: Map<String, Value>,
    schema: BTreeSet<String>,
}

impl JsonRecordStore {
    #[cfg(test)]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self {
            path: None,
            fields,
            schema: BTreeSet::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read record store at {}", path.display()))?;
        let fields = parse_document(&raw)
            .with_context(|| format!("failed to parse record store at {}", path.display()))?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            fields,
            schema: BTreeSet::new(),
        })
    }

    /// Declare fields that belong to the schema even before they hold a value.
    pub fn with_schema<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.schema = fields.into_iter().collect();
        self
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.fields)
            .context("failed to serialize record store")?;
        out.push('\n');
        Ok(out)
    }

    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow!("record store has no backing file"))?;
        let data = self.to_json_pretty()?;
        write_atomic(path, data.as_bytes())
    }
}

impl RecordStore for JsonRecordStore {
    fn has_field(&self, field: &str) -> bool {
        !field.is_empty() && (self.fields.contains_key(field) || self.schema.contains(field))
    }

    fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    fn set_index(&mut self, field: &str, index: usize, entry: Value) -> bool {
        let Some(slot) = self
            .fields
            .get_mut(field)
            .and_then(Value::as_array_mut)
            .and_then(|entries| entries.get_mut(index))
        else {
            return false;
        };
        *slot = entry;
        true
    }
}

fn parse_document(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(fields) => Ok(fields),
        other => bail!(
            "expected a JSON object at the top level, found {}",
            json_type_name(&other)
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write `data` to a sibling temp file, sync it, then rename over `target`.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent dir {}", parent.display()))?;

    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("authslot");

    let mut counter: u32 = 0;
    let temp_path = loop {
        let candidate = if counter == 0 {
            parent.join(format!(".{file_name}.tmp"))
        } else {
            parent.join(format!(".{file_name}.{counter}.tmp"))
        };
        if !candidate.exists() {
            break candidate;
        }
        counter += 1;
    };

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| {
                format!(
                    "failed to create temporary file {} for atomic write",
                    temp_path.display()
                )
            })?;

        file.write_all(data)
            .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync temporary file {}", temp_path.display()))?;
    }

    fs::rename(&temp_path, target).with_context(|| {
        format!(
            "failed to rename temporary file {} to {}",
            temp_path.display(),
            target.display()
        )
    })?;

    if let Ok(dir_file) = fs::File::open(parent) {
        let _ = dir_file.sync_all();
    }

    Ok(())
}
