//! CSV cell → Drupal field payload mapping.
//!
//! Behaviour depends on the field's cardinality class and on whether the node
//! already exists:
//!
//! | Cardinality | Create                         | Update                                   |
//! |-------------|--------------------------------|------------------------------------------|
//! | 1           | first value                    | replace with first value                 |
//! | N > 1       | first N values                 | existing + new, up to N in total         |
//! | unlimited   | all values                     | existing + all new values                |
//!
//! Reference fields skip values already present when updating; text fields do
//! not. Truncation is reported as a [`MappingWarning`], never as an error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::models::{Cardinality, FieldDefinition, FieldPayload, FieldType, FieldValue};
use crate::parser::CsvRow;

use super::values::parse_cell;

/// Something the mapper dropped or could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingWarning {
    /// More values than the field can take; the surplus was dropped.
    ValuesTruncated {
        field: String,
        cardinality: usize,
        kept: usize,
        dropped: usize,
    },
    /// The node already holds the maximum number of values.
    FieldFull { field: String, cardinality: usize },
    /// A typed-relation item not in `namespace:relation:id` form.
    MalformedTypedRelation { field: String, item: String },
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingWarning::ValuesTruncated {
                field,
                cardinality,
                kept,
                dropped,
            } => write!(
                f,
                "Field {} allows {} value(s); kept {}, dropped {}",
                field, cardinality, kept, dropped
            ),
            MappingWarning::FieldFull { field, cardinality } => write!(
                f,
                "Field {} already holds its maximum of {} value(s); left unchanged",
                field, cardinality
            ),
            MappingWarning::MalformedTypedRelation { field, item } => write!(
                f,
                "Field {}: '{}' is not a namespace:relation:id value; skipped",
                field, item
            ),
        }
    }
}

/// Result of mapping one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedField {
    /// `None` leaves the field out of the request.
    pub payload: Option<FieldPayload>,
    pub warnings: Vec<MappingWarning>,
}

/// Cardinality bucket used as a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardinalityClass {
    Single,
    Bounded,
    Unlimited,
}

impl From<Cardinality> for CardinalityClass {
    fn from(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::Limited(1) => CardinalityClass::Single,
            Cardinality::Limited(_) => CardinalityClass::Bounded,
            Cardinality::Unlimited => CardinalityClass::Unlimited,
        }
    }
}

/// Parsed values of one cell plus what the transforms need to know about it.
#[derive(Debug)]
struct Incoming<'a> {
    field: &'a str,
    cardinality: Cardinality,
    values: Vec<FieldValue>,
    warnings: Vec<MappingWarning>,
}

type CreateFn = fn(Incoming<'_>) -> MappedField;
type UpdateFn = fn(Incoming<'_>, &[FieldValue], bool) -> MappedField;

/// Transforms for one `(field type, cardinality class)` pair.
#[derive(Clone, Copy)]
struct Rule {
    create: CreateFn,
    update: UpdateFn,
    /// Skip incoming values already present on the node.
    skip_duplicates: bool,
}

/// The dispatch table.
fn rule_for(field_type: FieldType, class: CardinalityClass) -> Rule {
    use CardinalityClass::{Bounded, Single, Unlimited};

    let reference = |create: CreateFn, update: UpdateFn| Rule {
        create,
        update,
        skip_duplicates: true,
    };
    let text = |create: CreateFn, update: UpdateFn| Rule {
        create,
        update,
        skip_duplicates: false,
    };

    match (field_type, class) {
        (FieldType::EntityReference, Single) => reference(create_single, update_single),
        (FieldType::EntityReference, Bounded) => reference(create_bounded, update_bounded),
        (FieldType::EntityReference, Unlimited) => reference(create_unlimited, update_unlimited),
        (FieldType::TypedRelation, Single) => reference(create_single, update_single),
        (FieldType::TypedRelation, Bounded) => reference(create_bounded, update_bounded),
        (FieldType::TypedRelation, Unlimited) => reference(create_unlimited, update_unlimited),
        (FieldType::Text, Single) => text(create_single, update_single),
        (FieldType::Text, Bounded) => text(create_bounded, update_bounded),
        (FieldType::Text, Unlimited) => text(create_unlimited, update_unlimited),
    }
}

/// Map one CSV cell to a field payload.
///
/// `existing` is `None` when creating a node and the node's current values
/// for this field (possibly empty) when updating one. Empty cells produce no
/// payload and no warning.
pub fn map_field(
    row: &CsvRow,
    field_name: &str,
    definition: &FieldDefinition,
    existing: Option<&[FieldValue]>,
    subdelimiter: &str,
) -> MappedField {
    let Some(cell) = row.non_empty(field_name) else {
        return MappedField::default();
    };

    let mut warnings = Vec::new();
    let values = parse_cell(definition, cell, subdelimiter, &mut warnings);
    if values.is_empty() {
        return MappedField {
            payload: None,
            warnings,
        };
    }

    let incoming = Incoming {
        field: field_name,
        cardinality: definition.cardinality,
        values,
        warnings,
    };
    let rule = rule_for(definition.field_type, definition.cardinality.into());
    match existing {
        None => (rule.create)(incoming),
        Some(existing) => (rule.update)(incoming, existing, rule.skip_duplicates),
    }
}

/// Map every column of `row` that names a known field.
///
/// Columns in `reserved` and columns without a definition are ignored.
/// `existing` holds the node's current values when updating.
pub fn map_row(
    row: &CsvRow,
    definitions: &HashMap<String, FieldDefinition>,
    existing: Option<&HashMap<String, FieldPayload>>,
    subdelimiter: &str,
    reserved: &[&str],
) -> (BTreeMap<String, FieldPayload>, Vec<MappingWarning>) {
    let mut fields = BTreeMap::new();
    let mut warnings = Vec::new();

    for column in row.columns() {
        if reserved.contains(&column) {
            continue;
        }
        let Some(definition) = definitions.get(column) else {
            continue;
        };
        let current = existing.map(|values| values.get(column).map_or(&[][..], Vec::as_slice));
        let mapped = map_field(row, column, definition, current, subdelimiter);
        warnings.extend(mapped.warnings);
        if let Some(payload) = mapped.payload {
            fields.insert(column.to_string(), payload);
        }
    }

    (fields, warnings)
}

// =============================================================================
// Create transforms
// =============================================================================

fn create_single(incoming: Incoming<'_>) -> MappedField {
    keep_first(incoming, 1)
}

fn create_bounded(incoming: Incoming<'_>) -> MappedField {
    let limit = incoming.cardinality.limit().unwrap_or(usize::MAX);
    keep_first(incoming, limit)
}

fn create_unlimited(incoming: Incoming<'_>) -> MappedField {
    MappedField {
        payload: Some(incoming.values),
        warnings: incoming.warnings,
    }
}

/// Keep the first `limit` values, warning about the rest.
fn keep_first(mut incoming: Incoming<'_>, limit: usize) -> MappedField {
    if incoming.values.len() > limit {
        incoming.warnings.push(MappingWarning::ValuesTruncated {
            field: incoming.field.to_string(),
            cardinality: limit,
            kept: limit,
            dropped: incoming.values.len() - limit,
        });
        incoming.values.truncate(limit);
    }
    MappedField {
        payload: Some(incoming.values),
        warnings: incoming.warnings,
    }
}

// =============================================================================
// Update transforms
// =============================================================================

fn update_single(incoming: Incoming<'_>, _existing: &[FieldValue], _: bool) -> MappedField {
    keep_first(incoming, 1)
}

fn update_bounded(
    mut incoming: Incoming<'_>,
    existing: &[FieldValue],
    skip_duplicates: bool,
) -> MappedField {
    let limit = incoming.cardinality.limit().unwrap_or(usize::MAX);
    let room = limit.saturating_sub(existing.len());
    if room == 0 {
        incoming.warnings.push(MappingWarning::FieldFull {
            field: incoming.field.to_string(),
            cardinality: limit,
        });
        return MappedField {
            payload: None,
            warnings: incoming.warnings,
        };
    }

    let mut additions = new_values(incoming.values, existing, skip_duplicates);
    if additions.len() > room {
        incoming.warnings.push(MappingWarning::ValuesTruncated {
            field: incoming.field.to_string(),
            cardinality: limit,
            kept: room,
            dropped: additions.len() - room,
        });
        additions.truncate(room);
    }

    append(existing, additions, incoming.warnings)
}

fn update_unlimited(
    incoming: Incoming<'_>,
    existing: &[FieldValue],
    skip_duplicates: bool,
) -> MappedField {
    let additions = new_values(incoming.values, existing, skip_duplicates);
    append(existing, additions, incoming.warnings)
}

/// Incoming values worth adding, in input order.
fn new_values(
    incoming: Vec<FieldValue>,
    existing: &[FieldValue],
    skip_duplicates: bool,
) -> Vec<FieldValue> {
    if !skip_duplicates {
        return incoming;
    }
    let mut additions: Vec<FieldValue> = Vec::with_capacity(incoming.len());
    for value in incoming {
        let seen = existing
            .iter()
            .chain(additions.iter())
            .any(|present| value.duplicates(present));
        if !seen {
            additions.push(value);
        }
    }
    additions
}

fn append(
    existing: &[FieldValue],
    additions: Vec<FieldValue>,
    warnings: Vec<MappingWarning>,
) -> MappedField {
    if additions.is_empty() {
        // Nothing new: leave the field as it is.
        return MappedField {
            payload: None,
            warnings,
        };
    }
    let mut payload = existing.to_vec();
    payload.extend(additions);
    MappedField {
        payload: Some(payload),
        warnings,
    }
}
