//! Record types built from a field specification.
//!
//! A [`RecordType`] is an immutable, ordered list of field names, optionally
//! extending the fields of a parent type. A [`Record`] is one instance of such a
//! type: every declared field is either unset or holds a JSON value.
//!
//! ```rust,ignore
//! let base = RecordType::new("spider url")?;
//! let item = base.extend("title")?;
//! let record = item.build([("title", json!("welcome")), ("url", json!(response.url()))])?;
//! ```
//!
//! Unset fields read back as `Ok(None)`, an explicit null as `Ok(Some(&Value::Null))`.
//! Only set fields are serialized.

use std::{fmt, sync::Arc};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Anything that can name the fields of a record type.
///
/// A single string is split on whitespace, sequences are taken as-is.
pub trait FieldNames {
    fn into_field_names(self) -> Vec<String>;
}

impl FieldNames for &str {
    fn into_field_names(self) -> Vec<String> {
        self.split_whitespace().map(str::to_string).collect()
    }
}

impl FieldNames for String {
    fn into_field_names(self) -> Vec<String> {
        self.as_str().into_field_names()
    }
}

impl<S: AsRef<str>> FieldNames for &[S] {
    fn into_field_names(self) -> Vec<String> {
        self.iter().map(|name| name.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> FieldNames for [S; N] {
    fn into_field_names(self) -> Vec<String> {
        self.iter().map(|name| name.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> FieldNames for Vec<S> {
    fn into_field_names(self) -> Vec<String> {
        self.as_slice().into_field_names()
    }
}

/// Builds a record type from `field_names`, appended to the fields of `parent` if given.
pub fn make_record_type<F: FieldNames>(
    field_names: F,
    parent: Option<&RecordType>,
) -> Result<RecordType> {
    let own = field_names.into_field_names();
    let name = format!(
        "{}[{}]",
        parent.map_or("Record", |p| p.name()),
        own.join(" ")
    );

    let mut fields: Vec<String> = parent.map(|p| p.fields().to_vec()).unwrap_or_default();
    for field in own {
        if fields.contains(&field) {
            return Err(Error::DuplicateField {
                field,
                record: name,
            });
        }
        fields.push(field);
    }

    Ok(RecordType(Arc::new(RecordTypeInner {
        name,
        fields,
        parent: parent.cloned(),
    })))
}

#[derive(Clone)]
pub struct RecordType(Arc<RecordTypeInner>);

struct RecordTypeInner {
    name: String,
    fields: Vec<String>,
    parent: Option<RecordType>,
}

impl RecordType {
    pub fn new<F: FieldNames>(field_names: F) -> Result<Self> {
        make_record_type(field_names, None)
    }

    /// A new type with this type's fields followed by `field_names`.
    pub fn extend<F: FieldNames>(&self, field_names: F) -> Result<Self> {
        make_record_type(field_names, Some(self))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn fields(&self) -> &[String] {
        &self.0.fields
    }

    pub fn parent(&self) -> Option<&RecordType> {
        self.0.parent.as_ref()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.0.fields.iter().position(|f| f == field)
    }

    /// A record of this type with every field unset.
    pub fn empty(&self) -> Record {
        Record {
            record_type: self.clone(),
            values: vec![None; self.0.fields.len()],
        }
    }

    /// A record with the given `(field, value)` pairs set, all other fields unset.
    pub fn build<I, K, V>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.empty();
        for (field, value) in values {
            record.set(field.as_ref(), value)?;
        }
        Ok(record)
    }

    fn unknown_field(&self, field: &str) -> Error {
        Error::UnknownField {
            field: field.to_string(),
            record: self.0.name.clone(),
        }
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.0.name)
            .field("fields", &self.0.fields)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct Record {
    record_type: RecordType,
    values: Vec<Option<Value>>,
}

impl Record {
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// The value of `field`, `None` while the field is unset.
    pub fn get(&self, field: &str) -> Result<Option<&Value>> {
        self.record_type
            .position(field)
            .map(|idx| self.values[idx].as_ref())
            .ok_or_else(|| self.record_type.unknown_field(field))
    }

    pub fn set<V: Into<Value>>(&mut self, field: &str, value: V) -> Result<()> {
        let idx = self
            .record_type
            .position(field)
            .ok_or_else(|| self.record_type.unknown_field(field))?;
        self.values[idx] = Some(value.into());
        Ok(())
    }

    /// Returns the field to the unset state, yielding its previous value.
    pub fn unset(&mut self, field: &str) -> Result<Option<Value>> {
        let idx = self
            .record_type
            .position(field)
            .ok_or_else(|| self.record_type.unknown_field(field))?;
        Ok(self.values[idx].take())
    }

    pub fn is_set(&self, field: &str) -> Result<bool> {
        self.get(field).map(|value| value.is_some())
    }

    /// Set fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.record_type
            .fields()
            .iter()
            .zip(&self.values)
            .filter_map(|(field, value)| value.as_ref().map(|v| (field.as_str(), v)))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.values.iter().filter(|v| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        let mut map = serde_json::Map::new();
        for (field, value) in record.record_type.fields().iter().zip(record.values) {
            if let Some(value) = value {
                map.insert(field.clone(), value);
            }
        }
        Value::Object(map)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_type.name())?;
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}
