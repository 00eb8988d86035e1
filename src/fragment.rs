//! Immutable SQL fragments: literal text interleaved with values or nested fragments.
//!
//! Literal text is only ever taken as `&'static str`, so it comes from program text and
//! never from runtime input. Everything else enters through a [`Slot`] and is bound as a
//! parameter when the fragment is flattened.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlFragmentError;
use crate::executor::Mapped;
use crate::results::DbRow;
use crate::types::{ByteView, Scalar};

/// Literal emitted by [`Fragment::join`] for an empty list; `x IN (NULL)` matches no row.
pub const EMPTY_LIST_SENTINEL: &str = "NULL";

/// Default separator used by [`Fragment::join`].
pub const LIST_SEPARATOR: &str = ", ";

/// One interpolation point of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Bound as a positional parameter.
    Value(Scalar),
    /// Spliced in place; its literals and slots become part of the parent.
    Fragment(Fragment),
}

impl From<Fragment> for Slot {
    fn from(fragment: Fragment) -> Self {
        Slot::Fragment(fragment)
    }
}

macro_rules! slot_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Slot {
                fn from(value: $t) -> Self {
                    Slot::Value(Scalar::from(value))
                }
            }
        )*
    };
}

slot_from_scalar!(
    String,
    &str,
    &String,
    i64,
    i32,
    i16,
    u32,
    u16,
    u8,
    f64,
    f32,
    bool,
    Vec<u8>,
    &[u8],
    ByteView,
    NaiveDateTime,
    JsonValue,
);

impl From<Scalar> for Slot {
    fn from(value: Scalar) -> Self {
        Slot::Value(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Slot {
    fn from(value: Option<T>) -> Self {
        Slot::Value(Scalar::from(value))
    }
}

/// A node of a query tree.
///
/// Holds `n + 1` literal segments around `n` slots. Build one with the [`sql!`](crate::sql)
/// macro, [`Fragment::builder`], or the list helpers:
/// ```rust
/// use sql_fragment::prelude::*;
///
/// let ids = Fragment::join([3, 5, 8]);
/// let status = "open";
/// let query = sql!("SELECT id FROM ticket WHERE id IN (" {ids} ") AND status = " {status});
///
/// let stmt = flatten(query);
/// assert_eq!(stmt.text(), "SELECT id FROM ticket WHERE id IN (?, ?, ?) AND status = ?");
/// assert_eq!(stmt.parameters().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    segments: Vec<Cow<'static, str>>,
    slots: Vec<Slot>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl Fragment {
    /// The canonical empty fragment: one empty literal and no slots.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            segments: vec![Cow::Borrowed("")],
            slots: Vec::new(),
        }
    }

    /// A fragment made of literal text only.
    #[must_use]
    pub fn literal(text: &'static str) -> Self {
        Self {
            segments: vec![Cow::Borrowed(text)],
            slots: Vec::new(),
        }
    }

    /// Start building a fragment piece by piece.
    #[must_use]
    pub fn builder() -> FragmentBuilder {
        FragmentBuilder::new()
    }

    /// Join items with `", "`.
    ///
    /// An empty input yields the `NULL` literal instead of nothing, so `IN (...)` stays valid
    /// and matches no row.
    #[must_use]
    pub fn join<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Slot>,
    {
        Self::join_with(items, LIST_SEPARATOR)
    }

    /// Join items with a custom literal separator.
    #[must_use]
    pub fn join_with<I, T>(items: I, separator: &'static str) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Slot>,
    {
        let slots: Vec<Slot> = items.into_iter().map(Into::into).collect();
        if slots.is_empty() {
            return Self::literal(EMPTY_LIST_SENTINEL);
        }

        let mut segments = Vec::with_capacity(slots.len() + 1);
        segments.push(Cow::Borrowed(""));
        segments.extend((1..slots.len()).map(|_| Cow::Borrowed(separator)));
        segments.push(Cow::Borrowed(""));
        Self { segments, slots }
    }

    /// True iff this is exactly the canonical empty shape.
    ///
    /// A fragment that merely renders to empty text (e.g. one wrapping an empty fragment)
    /// is not empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.segments.len() == 1 && self.segments[0].is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Cow<'static, str>] {
        &self.segments
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of placeholders this fragment flattens to, nested fragments included.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Value(_) => 1,
                Slot::Fragment(inner) => inner.placeholder_count(),
            })
            .sum()
    }

    /// Total literal length, nested fragments included.
    pub(crate) fn literal_len(&self) -> usize {
        let own: usize = self.segments.iter().map(|s| s.len()).sum();
        let nested: usize = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Value(_) => 0,
                Slot::Fragment(inner) => inner.literal_len(),
            })
            .sum();
        own + nested
    }

    pub(crate) fn into_parts(self) -> (Vec<Cow<'static, str>>, Vec<Slot>) {
        (self.segments, self.slots)
    }

    /// Attach a row mapper, applied to each returned row after the cardinality check.
    pub fn map_rows<F, T>(self, mapper: F) -> Mapped<F>
    where
        F: FnMut(DbRow) -> Result<T, SqlFragmentError>,
    {
        Mapped::new(self, mapper)
    }
}

/// Incremental fragment construction.
///
/// Adjacent literals merge and adjacent slots get an empty literal between them, so the
/// built fragment always holds one more segment than slots.
#[derive(Debug)]
pub struct FragmentBuilder {
    segments: Vec<Cow<'static, str>>,
    slots: Vec<Slot>,
}

impl Default for FragmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: vec![Cow::Borrowed("")],
            slots: Vec::new(),
        }
    }

    /// Append literal SQL text.
    #[must_use]
    pub fn sql(mut self, text: &'static str) -> Self {
        if text.is_empty() {
            return self;
        }
        if let Some(last) = self.segments.last_mut() {
            if last.is_empty() {
                *last = Cow::Borrowed(text);
            } else {
                last.to_mut().push_str(text);
            }
        }
        self
    }

    /// Append a value or nested fragment.
    #[must_use]
    pub fn push(mut self, slot: impl Into<Slot>) -> Self {
        self.slots.push(slot.into());
        self.segments.push(Cow::Borrowed(""));
        self
    }

    #[must_use]
    pub fn build(self) -> Fragment {
        Fragment {
            segments: self.segments,
            slots: self.slots,
        }
    }
}
