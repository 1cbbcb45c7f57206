/*!
 * Structured records ("notes") and field mappings.
 *
 * A [`Record`] is read from the host application and never modified in place.
 * Translation produces a new record through the duplicator instead.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque record identifier, stable within a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an identifier supplied by the host application
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a record created by duplication
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single named text field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// A record with ordered named text fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of this record
    pub id: RecordId,

    /// Fields in their original order
    pub fields: Vec<Field>,
}

impl Record {
    /// Create an empty record
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(id),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// One source field and the target field that receives its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMappingEntry {
    pub source: String,
    pub target: String,
}

impl FieldMappingEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Which fields participate in translation and where the results land
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    entries: Vec<FieldMappingEntry>,
}

impl FieldMapping {
    pub fn new(entries: Vec<FieldMappingEntry>) -> Self {
        Self { entries }
    }

    /// Map each named field onto itself (e.g. Front→Front, Back→Back)
    pub fn identity<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names
                .into_iter()
                .map(|n| {
                    let name = n.into();
                    FieldMappingEntry::new(name.clone(), name)
                })
                .collect(),
        }
    }

    /// Add a mapping entry, builder style
    pub fn map(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.entries.push(FieldMappingEntry::new(source, target));
        self
    }

    pub fn entries(&self) -> &[FieldMappingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the field is written to by any entry
    pub fn is_target(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.target == name)
    }

    /// First field named by the mapping that the record lacks
    pub fn first_missing_field<'a>(&'a self, record: &Record) -> Option<&'a str> {
        self.entries
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .find(|name| !record.has_field(name))
    }

    /// Reject mappings that would write two translations into one field
    pub fn duplicate_target(&self) -> Option<&str> {
        self.entries.iter().enumerate().find_map(|(i, entry)| {
            self.entries[..i]
                .iter()
                .any(|earlier| earlier.target == entry.target)
                .then_some(entry.target.as_str())
        })
    }
}
