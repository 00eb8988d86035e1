//! Turning a fragment tree into one flat parameterized statement.

use std::fmt::Write;

use crate::coerce::coerce;
use crate::fragment::{Fragment, Slot};
use crate::types::RowValues;

/// Placeholder syntax written for each bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// Anonymous positional `?`.
    #[default]
    Anonymous,
    /// SQLite-style numbered `?1`, `?2`, ...
    Numbered,
    /// PostgreSQL-style `$1`, `$2`, ...
    Dollar,
}

/// Flat SQL text plus its parameters, in placeholder order.
///
/// Only produced by flattening a [`Fragment`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    text: String,
    parameters: Vec<RowValues>,
}

impl PreparedStatement {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parameters(&self) -> &[RowValues] {
        &self.parameters
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Vec<RowValues>) {
        (self.text, self.parameters)
    }
}

/// Flatten with anonymous `?` placeholders.
#[must_use]
pub fn flatten(root: Fragment) -> PreparedStatement {
    flatten_with(root, PlaceholderStyle::Anonymous)
}

/// Flatten with the given placeholder style.
///
/// Nested fragments are spliced depth-first, left to right, so the n-th placeholder in the
/// text always refers to the n-th parameter.
#[must_use]
pub fn flatten_with(root: Fragment, style: PlaceholderStyle) -> PreparedStatement {
    let mut out = Flattener {
        text: String::with_capacity(root.literal_len() + 2 * root.placeholder_count()),
        parameters: Vec::with_capacity(root.placeholder_count()),
        style,
    };
    out.splice(root);
    PreparedStatement {
        text: out.text,
        parameters: out.parameters,
    }
}

struct Flattener {
    text: String,
    parameters: Vec<RowValues>,
    style: PlaceholderStyle,
}

impl Flattener {
    fn splice(&mut self, fragment: Fragment) {
        let (segments, slots) = fragment.into_parts();
        let mut segments = segments.into_iter();

        for slot in slots {
            if let Some(segment) = segments.next() {
                self.text.push_str(&segment);
            }
            match slot {
                Slot::Fragment(inner) => self.splice(inner),
                Slot::Value(value) => {
                    self.parameters.push(coerce(value));
                    self.write_placeholder();
                }
            }
        }

        // trailing literal
        for segment in segments {
            self.text.push_str(&segment);
        }
    }

    fn write_placeholder(&mut self) {
        let index = self.parameters.len();
        match self.style {
            PlaceholderStyle::Anonymous => self.text.push('?'),
            PlaceholderStyle::Numbered => {
                let _ = write!(self.text, "?{index}");
            }
            PlaceholderStyle::Dollar => {
                let _ = write!(self.text, "${index}");
            }
        }
    }
}
