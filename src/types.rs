use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlFragmentError;

/// Values that can be interpolated into a fragment slot.
///
/// This is the caller-facing input set. Some kinds (`Bool`, `Absent`, `Bytes`, `Timestamp`,
/// `Json`) have no direct engine representation and are coerced during flattening:
/// ```rust
/// use sql_fragment::prelude::*;
///
/// let nickname: Option<&str> = None;
/// let values = vec![Scalar::from(1), Scalar::from("alice"), Scalar::from(nickname)];
/// assert_eq!(values[2], Scalar::Absent);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Text/string value
    Text(String),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Boolean value, bound as `"true"` / `"false"`
    Bool(bool),
    /// Explicit NULL
    Null,
    /// Missing value (e.g. `Option::None`), bound as NULL
    Absent,
    /// Owned binary data
    Blob(Vec<u8>),
    /// Window over a shared byte buffer
    Bytes(ByteView),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// JSON value
    Json(JsonValue),
}

/// Offset/length window over a shared byte buffer.
///
/// Only the addressed bytes are ever bound, never the whole backing allocation.
#[derive(Debug, Clone)]
pub struct ByteView {
    buffer: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl ByteView {
    /// Create a view of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::ParameterError` if the window does not fit inside the buffer.
    pub fn new(
        buffer: impl Into<Arc<[u8]>>,
        offset: usize,
        len: usize,
    ) -> Result<Self, SqlFragmentError> {
        let buffer = buffer.into();
        match offset.checked_add(len) {
            Some(end) if end <= buffer.len() => Ok(Self {
                buffer,
                offset,
                len,
            }),
            _ => Err(SqlFragmentError::ParameterError(format!(
                "byte view at offset {offset} with length {len} exceeds buffer of {} bytes",
                buffer.len()
            ))),
        }
    }

    /// View covering the entire buffer.
    #[must_use]
    pub fn whole(buffer: impl Into<Arc<[u8]>>) -> Self {
        let buffer = buffer.into();
        let len = buffer.len();
        Self {
            buffer,
            offset: 0,
            len,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.len]
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the backing buffer, which may be larger than the view.
    #[must_use]
    pub fn backing_len(&self) -> usize {
        self.buffer.len()
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

macro_rules! scalar_from {
    ($($t:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from($v: $t) -> Self {
                    $body
                }
            }
        )*
    };
}

scalar_from! {
    String => |v| Scalar::Text(v),
    &str => |v| Scalar::Text(v.to_owned()),
    &String => |v| Scalar::Text(v.clone()),
    i64 => |v| Scalar::Int(v),
    i32 => |v| Scalar::Int(i64::from(v)),
    i16 => |v| Scalar::Int(i64::from(v)),
    u32 => |v| Scalar::Int(i64::from(v)),
    u16 => |v| Scalar::Int(i64::from(v)),
    u8 => |v| Scalar::Int(i64::from(v)),
    f64 => |v| Scalar::Float(v),
    f32 => |v| Scalar::Float(f64::from(v)),
    bool => |v| Scalar::Bool(v),
    Vec<u8> => |v| Scalar::Blob(v),
    &[u8] => |v| Scalar::Blob(v.to_vec()),
    ByteView => |v| Scalar::Bytes(v),
    NaiveDateTime => |v| Scalar::Timestamp(v),
    JsonValue => |v| Scalar::Json(v),
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Absent, Into::into)
    }
}

/// Values the storage engine accepts as parameters and returns in rows.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let RowValues::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Interpret the value as a boolean, accepting the `"true"`/`"false"` encoding used for
    /// bound booleans as well as `0`/`1` integers.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Text(s) if s == "true" => Some(true),
            RowValues::Text(s) if s == "false" => Some(false),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}
