//! Transformation module.
//!
//! This module turns CSV rows into Drupal field payloads:
//! - Mapper: cardinality/type dispatch for one field or a whole row
//! - Values: splitting cells and parsing typed relations
//! - Preprocess: external commands that rewrite cells first

pub mod mapper;
pub mod preprocess;
pub mod values;

pub use mapper::{map_field, map_row, CardinalityClass, MappedField, MappingWarning};
pub use preprocess::{apply_preprocessors, run_preprocessor};
pub use values::{split_typed_relation_string, split_values};
