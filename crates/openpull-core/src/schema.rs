use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScrapeError;

/// Expected JSON kind of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    /// Top-level kind check. `null` is handled by the caller: an explicit
    /// null is a valid "not found" marker for every kind.
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

/// One declared output field: name plus expected kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Caller-supplied description of the expected extraction output.
///
/// A flat map of top-level field names to expected kinds. Used twice: once
/// to steer the model (rendered into the prompt by
/// [`describe`](Self::describe)) and once to validate what came back
/// ([`validate`](Self::validate)). Deserializable, so schemas can live in
/// JSON files:
///
/// ```json
/// {"fields": [{"name": "title", "kind": "string"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub fields: Vec<FieldSpec>,
}

impl ExtractionSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field. Declaration order is preserved in the prompt.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the field list for inclusion in a model prompt.
    ///
    /// One `- name (kind)` line per field, in declaration order.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for spec in &self.fields {
            out.push_str("- ");
            out.push_str(&spec.name);
            out.push_str(" (");
            out.push_str(spec.kind.as_str());
            out.push_str(")\n");
        }
        out
    }

    /// Validate decoded model output against this schema.
    ///
    /// Every declared field must be present, either with a value of the
    /// declared kind or as an explicit `null` ("not found"). Top-level keys
    /// that were never declared are rejected outright; nested structure
    /// inside object/array values is not walked.
    ///
    /// A schema with no declared fields rejects every key, since each one is
    /// undeclared. [`parse_response`](crate::parse::parse_response) treats
    /// such a schema as "no schema" and skips validation entirely; callers
    /// invoking `validate` directly should gate on
    /// [`is_empty`](Self::is_empty) if they want the same leniency.
    pub fn validate(&self, data: &serde_json::Map<String, Value>) -> Result<(), ScrapeError> {
        for spec in &self.fields {
            match data.get(&spec.name) {
                None => {
                    return Err(ScrapeError::SchemaValidation(format!(
                        "declared field `{}` missing from model output (expected a value or explicit null)",
                        spec.name
                    )));
                }
                Some(Value::Null) => {}
                Some(value) if spec.kind.matches(value) => {}
                Some(value) => {
                    return Err(ScrapeError::SchemaValidation(format!(
                        "field `{}`: expected {}, got {}",
                        spec.name,
                        spec.kind.as_str(),
                        json_kind_name(value)
                    )));
                }
            }
        }

        for key in data.keys() {
            if !self.fields.iter().any(|spec| spec.name == *key) {
                return Err(ScrapeError::SchemaValidation(format!(
                    "undeclared top-level field `{key}` in model output"
                )));
            }
        }

        Ok(())
    }
}

fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
