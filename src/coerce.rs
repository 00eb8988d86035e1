//! Mapping from the caller-facing [`Scalar`] set onto the engine's [`RowValues`] set.

use crate::types::{RowValues, Scalar};

const TIMESTAMP_FORMAT: &str = "%F %T%.f";

/// Convert one slot value into the representation bound to the statement.
///
/// The mapping is total: every `Scalar` has exactly one engine representation.
/// ```rust
/// use sql_fragment::prelude::*;
///
/// assert_eq!(coerce(Scalar::Bool(true)), RowValues::Text("true".into()));
/// assert_eq!(coerce(Scalar::Absent), RowValues::Null);
/// ```
#[must_use]
pub fn coerce(value: Scalar) -> RowValues {
    match value {
        Scalar::Text(s) => RowValues::Text(s),
        Scalar::Int(i) => RowValues::Int(i),
        Scalar::Float(f) => RowValues::Float(f),
        Scalar::Bool(b) => RowValues::Text(if b { "true" } else { "false" }.to_owned()),
        Scalar::Null | Scalar::Absent => RowValues::Null,
        Scalar::Blob(bytes) => RowValues::Blob(bytes),
        Scalar::Bytes(view) => RowValues::Blob(view.as_bytes().to_vec()),
        Scalar::Timestamp(dt) => RowValues::Text(dt.format(TIMESTAMP_FORMAT).to_string()),
        Scalar::Json(json) => RowValues::Text(json.to_string()),
    }
}
