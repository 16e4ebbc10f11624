//! Splitting CSV cells into field values.

use crate::models::{FieldDefinition, FieldType, FieldValue, TargetType};

use super::mapper::MappingWarning;

/// Split a cell on the subdelimiter, dropping empty pieces.
pub fn split_values<'a>(value: &'a str, subdelimiter: &str) -> Vec<&'a str> {
    if subdelimiter.is_empty() {
        let value = value.trim();
        return if value.is_empty() { Vec::new() } else { vec![value] };
    }
    value
        .split(subdelimiter)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Parse `namespace:relation:target_id` items, e.g. `relators:aut:45`.
///
/// The relation type is everything before the last colon. Items without a
/// relation type or target id are returned in the second list, in input order.
pub fn split_typed_relation_string(
    value: &str,
    subdelimiter: &str,
    target_type: &TargetType,
) -> (Vec<FieldValue>, Vec<String>) {
    let mut parsed = Vec::new();
    let mut malformed = Vec::new();

    for item in split_values(value, subdelimiter) {
        match item.rsplit_once(':') {
            Some((relation_type, target_id))
                if relation_type.contains(':')
                    && !target_id.trim().is_empty()
                    && relation_type.split(':').all(|p| !p.trim().is_empty()) =>
            {
                parsed.push(FieldValue::typed_relation(
                    relation_type.trim(),
                    target_id.trim(),
                    target_type.clone(),
                ));
            }
            _ => malformed.push(item.to_string()),
        }
    }

    (parsed, malformed)
}

/// Turn a non-empty cell into field values for `definition`.
///
/// Malformed typed-relation items are reported in `warnings` and skipped.
pub fn parse_cell(
    definition: &FieldDefinition,
    cell: &str,
    subdelimiter: &str,
    warnings: &mut Vec<MappingWarning>,
) -> Vec<FieldValue> {
    match definition.field_type {
        FieldType::Text => split_values(cell, subdelimiter)
            .into_iter()
            .map(FieldValue::text)
            .collect(),
        FieldType::EntityReference => {
            let target_type = definition.target_type_or_default();
            split_values(cell, subdelimiter)
                .into_iter()
                .map(|id| FieldValue::entity_reference(id, target_type.clone()))
                .collect()
        }
        FieldType::TypedRelation => {
            let (values, malformed) = split_typed_relation_string(
                cell,
                subdelimiter,
                &definition.target_type_or_default(),
            );
            warnings.extend(
                malformed
                    .into_iter()
                    .map(|item| MappingWarning::MalformedTypedRelation {
                        field: definition.name.clone(),
                        item,
                    }),
            );
            values
        }
    }
}
