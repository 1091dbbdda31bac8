//! Declarative payload schemas.
//!
//! Every station describes what it accepts as a list of [`Schema`] shapes.
//! The first shape whose declared keys are all present decides whether a
//! payload is well formed. Matching never fails loudly: anything
//! structurally unexpected is simply `false`.

use serde_json::{Map, Value};

/// Whether keys outside the declared fields are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// The key set must equal the declared field names.
    Exact,
    /// The declared field names must be present; extra keys are ignored.
    Superset,
}

/// Check applied to a single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    /// Any value, the key just has to exist.
    Present,
    String,
    /// A JSON integer. Booleans and floats do not qualify.
    Integer,
    List,
    /// Literal equality, e.g. a station discriminator.
    Equals(Value),
    /// A nested object matching its own schema.
    Object(Schema),
}

impl FieldCheck {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldCheck::Present => true,
            FieldCheck::String => value.is_string(),
            FieldCheck::Integer => value.is_i64() || value.is_u64(),
            FieldCheck::List => value.is_array(),
            FieldCheck::Equals(expected) => value == expected,
            FieldCheck::Object(schema) => schema.matches(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub check: FieldCheck,
}

/// One accepted payload shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    keys: KeyPolicy,
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn exact() -> Self {
        Self {
            keys: KeyPolicy::Exact,
            fields: Vec::new(),
        }
    }

    pub fn superset() -> Self {
        Self {
            keys: KeyPolicy::Superset,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str, check: FieldCheck) -> Self {
        self.fields.retain(|rule| rule.name != name);
        self.fields.push(FieldRule { name, check });
        self
    }

    pub fn present(self, name: &'static str) -> Self {
        self.field(name, FieldCheck::Present)
    }

    pub fn string(self, name: &'static str) -> Self {
        self.field(name, FieldCheck::String)
    }

    pub fn integer(self, name: &'static str) -> Self {
        self.field(name, FieldCheck::Integer)
    }

    pub fn list(self, name: &'static str) -> Self {
        self.field(name, FieldCheck::List)
    }

    pub fn equals(self, name: &'static str, expected: impl Into<Value>) -> Self {
        self.field(name, FieldCheck::Equals(expected.into()))
    }

    pub fn object(self, name: &'static str, schema: Schema) -> Self {
        self.field(name, FieldCheck::Object(schema))
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.keys
    }

    pub fn matches(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|object| self.matches_object(object))
    }

    /// Whether every declared field name is a key of `object`.
    pub fn declares_all(&self, object: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .all(|rule| object.contains_key(rule.name))
    }

    pub fn matches_object(&self, object: &Map<String, Value>) -> bool {
        let keys_ok = match self.keys {
            // Field names are unique, so equal length plus presence means equal sets.
            KeyPolicy::Exact => object.len() == self.fields.len(),
            KeyPolicy::Superset => true,
        };

        keys_ok
            && self.fields.iter().all(|rule| {
                object
                    .get(rule.name)
                    .is_some_and(|value| rule.check.accepts(value))
            })
    }
}

/// The set of mutually exclusive shapes a station accepts for one record kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSchema {
    shapes: Vec<Schema>,
}

impl PayloadSchema {
    pub fn single(schema: Schema) -> Self {
        Self {
            shapes: vec![schema],
        }
    }

    pub fn one_of(shapes: Vec<Schema>) -> Self {
        Self { shapes }
    }

    pub fn validate(&self, payload: &Value) -> bool {
        payload
            .as_object()
            .is_some_and(|object| self.validate_object(object))
    }

    /// Shapes are tried in order; the first one whose keys are all present
    /// gives the verdict, later shapes are not consulted.
    pub fn validate_object(&self, object: &Map<String, Value>) -> bool {
        self.shapes
            .iter()
            .find(|shape| shape.declares_all(object))
            .is_some_and(|shape| shape.matches_object(object))
    }
}
