//! Strongly-typed identifiers: [`FieldKey`], [`ColumnId`], and the
//! [`MarkerList`] type alias.

use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt;

/// Unique name of an output field.
///
/// Keys are chosen by the contributor that declares the field and are
/// unique within their kind (history or volume). The registry keeps
/// insertion order, so the key doubles as the stable identity used for
/// column layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(String);

impl FieldKey {
    /// Create a key from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a derived key by prepending `prefix` (e.g. `"REL_"`).
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self(format!("{prefix}{}", self.0))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Dense column index of an active volume field.
///
/// Assigned once during filtering, in first-registered order among the
/// requested fields. `ColumnId(n)` is the n-th column of the results table
/// and of every file written from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u32);

impl ColumnId {
    /// The column as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ColumnId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Names of the surface markers a per-surface history field is split over.
///
/// Uses `SmallVec<[String; 4]>` since monitored marker lists are short;
/// longer lists spill to the heap transparently.
pub type MarkerList = SmallVec<[String; 4]>;
