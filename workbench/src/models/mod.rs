//! Domain models shared by the mapper, the API client and the task drivers.
//!
//! - [`FieldDefinition`] - what Drupal says about a node field
//! - [`FieldValue`] - one element of a field payload, in Drupal's JSON shape
//! - [`NodePayload`] - body of a node create or update request

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// =============================================================================
// Field Definitions
// =============================================================================

/// Storage type of a field, as far as mapping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    EntityReference,
    TypedRelation,
    /// Plain text, numbers, dates, EDTF, ... anything carried as `{value}`.
    Text,
}

impl FieldType {
    /// Classify a Drupal field storage type.
    pub fn from_drupal(storage_type: &str) -> Self {
        match storage_type {
            "entity_reference" => FieldType::EntityReference,
            "typed_relation" => FieldType::TypedRelation,
            _ => FieldType::Text,
        }
    }
}

/// The kind of entity a reference field points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetType {
    TaxonomyTerm,
    Node,
    Other(String),
}

impl From<String> for TargetType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "taxonomy_term" => TargetType::TaxonomyTerm,
            "node" => TargetType::Node,
            _ => TargetType::Other(value),
        }
    }
}

impl From<&str> for TargetType {
    fn from(value: &str) -> Self {
        TargetType::from(value.to_string())
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::TaxonomyTerm => f.write_str("taxonomy_term"),
            TargetType::Node => f.write_str("node"),
            TargetType::Other(name) => f.write_str(name),
        }
    }
}

/// Maximum number of values a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Unlimited,
    Limited(usize),
}

impl Cardinality {
    /// Drupal encodes unlimited as -1.
    pub fn from_drupal(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Cardinality::Unlimited),
            n if n >= 1 => Some(Cardinality::Limited(n as usize)),
            _ => None,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Cardinality::Unlimited => None,
            Cardinality::Limited(n) => Some(*n),
        }
    }
}

/// Immutable description of one field of the configured content type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub target_type: Option<TargetType>,
    pub cardinality: Cardinality,
    pub required: bool,
    pub label: String,
}

impl FieldDefinition {
    /// A text field, mostly for tests and ad hoc tooling.
    pub fn text(name: impl Into<String>, cardinality: Cardinality) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type: FieldType::Text,
            target_type: None,
            cardinality,
            required: false,
        }
    }

    /// A reference field of the given type.
    pub fn reference(
        name: impl Into<String>,
        field_type: FieldType,
        target_type: TargetType,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            field_type,
            target_type: Some(target_type),
            ..Self::text(name, cardinality)
        }
    }

    /// Target type of references, defaulting to taxonomy terms.
    pub fn target_type_or_default(&self) -> TargetType {
        self.target_type.clone().unwrap_or(TargetType::TaxonomyTerm)
    }
}

/// Field definitions keyed by machine name.
pub type FieldDefinitions = HashMap<String, FieldDefinition>;

// =============================================================================
// Field Values
// =============================================================================

/// Attributes Drupal adds to reference values it returns, but which are not
/// part of the value's identity.
pub const TRANSPORT_ATTRIBUTES: [&str; 2] = ["url", "target_uuid"];

/// One element of a field payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    TypedRelation {
        target_id: String,
        target_type: TargetType,
        #[serde(rename = "rel_type")]
        relation_type: String,
    },
    EntityReference {
        target_id: String,
        target_type: TargetType,
    },
    Text {
        value: String,
    },
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text {
            value: value.into(),
        }
    }

    pub fn entity_reference(target_id: impl Into<String>, target_type: TargetType) -> Self {
        FieldValue::EntityReference {
            target_id: target_id.into(),
            target_type,
        }
    }

    pub fn typed_relation(
        relation_type: impl Into<String>,
        target_id: impl Into<String>,
        target_type: TargetType,
    ) -> Self {
        FieldValue::TypedRelation {
            target_id: target_id.into(),
            target_type,
            relation_type: relation_type.into(),
        }
    }

    /// Whether adding `self` to a list that holds `other` would duplicate it.
    ///
    /// Entity references are the same when they point at the same target;
    /// typed relations must also share the relation type. Text values are
    /// never treated as duplicates.
    pub fn duplicates(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (
                FieldValue::EntityReference { target_id: a, .. },
                FieldValue::EntityReference { target_id: b, .. },
            ) => a == b,
            (FieldValue::TypedRelation { .. }, FieldValue::TypedRelation { .. }) => self == other,
            _ => false,
        }
    }

    /// Build a value from an element of a field array returned by Drupal.
    ///
    /// Returns `None` when the element lacks the attributes the field type
    /// needs.
    pub fn from_remote(definition: &FieldDefinition, remote: &Value) -> Option<Self> {
        let mut object = remote.as_object()?.clone();
        strip_transport_attributes(&mut object);

        match definition.field_type {
            FieldType::Text => {
                let value = scalar_to_string(object.get("value")?)?;
                Some(FieldValue::Text { value })
            }
            FieldType::EntityReference => Some(FieldValue::EntityReference {
                target_id: scalar_to_string(object.get("target_id")?)?,
                target_type: remote_target_type(&object, definition),
            }),
            FieldType::TypedRelation => Some(FieldValue::TypedRelation {
                target_id: scalar_to_string(object.get("target_id")?)?,
                target_type: remote_target_type(&object, definition),
                relation_type: scalar_to_string(object.get("rel_type")?)?,
            }),
        }
    }
}

/// Remove `url` and `target_uuid` from a remote value object.
pub fn strip_transport_attributes(object: &mut Map<String, Value>) {
    for attribute in TRANSPORT_ATTRIBUTES {
        object.remove(attribute);
    }
}

fn remote_target_type(object: &Map<String, Value>, definition: &FieldDefinition) -> TargetType {
    object
        .get("target_type")
        .and_then(Value::as_str)
        .map(TargetType::from)
        .unwrap_or_else(|| definition.target_type_or_default())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordered values of one field.
pub type FieldPayload = Vec<FieldValue>;

// =============================================================================
// Node Payload
// =============================================================================

/// `{target_id, target_type}` pointing at the node's bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTypeRef {
    pub target_id: String,
    pub target_type: &'static str,
}

/// `{value: bool}`, used for the node's published status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoolValue {
    pub value: bool,
}

/// Body of a node create (POST) or update (PATCH) request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePayload {
    #[serde(rename = "type")]
    pub node_type: Vec<NodeTypeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<FieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<BoolValue>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldPayload>,
}

impl NodePayload {
    /// Payload for a new node.
    pub fn for_create(content_type: &str, title: &str, published: bool) -> Self {
        Self {
            title: Some(vec![FieldValue::text(title)]),
            status: Some(vec![BoolValue { value: published }]),
            ..Self::for_update(content_type)
        }
    }

    /// Payload for a partial update: bundle only, fields added later.
    pub fn for_update(content_type: &str) -> Self {
        Self {
            node_type: vec![NodeTypeRef {
                target_id: content_type.to_string(),
                target_type: "node_type",
            }],
            title: None,
            status: None,
            fields: BTreeMap::new(),
        }
    }
}
