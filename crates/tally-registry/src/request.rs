//! Requested output lists and the result of checking them against a
//! registry.

/// Ordered, de-duplicated list of requested field names or groups.
///
/// Order is significant: screen columns appear in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestList {
    names: Vec<String>,
}

impl RequestList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless it is already present. Returns whether it was
    /// added.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Whether `name` is requested.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Requested names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Requested names as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Number of requested names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` if nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Keep the entries for which `keep` returns `true`; return the rest
    /// in their original order.
    pub(crate) fn split_off_unmatched(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut dropped = Vec::new();
        self.names.retain(|n| {
            if keep(n) {
                true
            } else {
                dropped.push(n.clone());
                false
            }
        });
        dropped
    }
}

impl<S: Into<String>> FromIterator<S> for RequestList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for name in iter {
            list.push(name);
        }
        list
    }
}

impl<S: Into<String>> Extend<S> for RequestList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.push(name);
        }
    }
}

/// Outcome of reconciling a [`RequestList`] with a registry.
///
/// Unmatched entries are not errors: they are removed from the list and
/// reported here so the caller can tell the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestReport {
    /// Entries that matched at least one field, in request order.
    pub kept: Vec<String>,
    /// Entries that matched nothing and were removed, in request order.
    pub dropped: Vec<String>,
}

impl RequestReport {
    /// `true` if every request matched.
    pub fn all_matched(&self) -> bool {
        self.dropped.is_empty()
    }
}
