//! Output field descriptors: [`HistoryField`], [`VolumeField`] and their
//! classification enums.

use crate::id::{ColumnId, FieldKey};

/// Which registry a field lives in. Keys are unique per scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldScope {
    /// Session-wide scalars, one value per iteration.
    History,
    /// Per-entity values, one column per active field.
    Volume,
}

impl std::fmt::Display for FieldScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::History => write!(f, "history"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// How a history value is rendered on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScreenFormat {
    /// Rounded to an integer (iteration counters, linear solver counts).
    Integer,
    /// Fixed-point notation.
    Fixed,
    /// Scientific notation.
    Scientific,
}

impl ScreenFormat {
    /// Minimum column width used in tabular history output.
    pub fn min_width(self) -> usize {
        match self {
            Self::Integer => 10,
            Self::Fixed | Self::Scientific => 20,
        }
    }
}

/// Semantic classification of a history field.
///
/// The kind decides which convergence test applies to a monitored field
/// and which derived fields are generated for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A plain value with no convergence semantics.
    Value,
    /// A log10-scaled solver residual.
    Residual,
    /// An integrated coefficient (lift, drag, ...).
    Coefficient,
    /// A residual derived by the session from other fields.
    AutoResidual,
    /// A coefficient derived by the session from other fields.
    AutoCoefficient,
}

impl FieldKind {
    /// `true` for [`Residual`](Self::Residual) and
    /// [`AutoResidual`](Self::AutoResidual).
    pub fn is_residual(self) -> bool {
        matches!(self, Self::Residual | Self::AutoResidual)
    }

    /// `true` only for [`Coefficient`](Self::Coefficient).
    ///
    /// Derived coefficients are excluded: they never seed further derived
    /// fields and never drive the Cauchy test directly.
    pub fn is_coefficient(self) -> bool {
        matches!(self, Self::Coefficient)
    }
}

/// A scalar, session-wide quantity reported once per iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryField {
    /// Unique key within the history registry.
    pub key: FieldKey,
    /// Label used in screen and file headers.
    pub label: String,
    /// Tag used for bulk request filtering and header layout.
    pub group: String,
    /// Screen rendering.
    pub format: ScreenFormat,
    /// Semantic type.
    pub kind: FieldKind,
    /// Current value, written by exactly one producer per iteration.
    pub value: f64,
    /// Free-form description for field listings.
    pub description: String,
}

impl HistoryField {
    /// Create a field with a zero initial value.
    pub fn new(
        key: impl Into<FieldKey>,
        label: impl Into<String>,
        format: ScreenFormat,
        group: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            group: group.into(),
            format,
            kind,
            value: 0.0,
            description: description.into(),
        }
    }

    /// Whether a request entry selects this field by key or by group.
    pub fn matches(&self, requested: &str) -> bool {
        self.key.as_str() == requested || self.group == requested
    }
}

/// A per-entity quantity reported once per entity per snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeField {
    /// Unique key within the volume registry.
    pub key: FieldKey,
    /// Label written as the column name.
    pub label: String,
    /// Tag used for bulk request filtering.
    pub group: String,
    /// Column in the results table; `None` while the field is not requested.
    pub offset: Option<ColumnId>,
    /// Free-form description for field listings.
    pub description: String,
}

impl VolumeField {
    /// Create an inactive field (no column assigned).
    pub fn new(
        key: impl Into<FieldKey>,
        label: impl Into<String>,
        group: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            group: group.into(),
            offset: None,
            description: description.into(),
        }
    }

    /// Whether a request entry selects this field by key or by group.
    pub fn matches(&self, requested: &str) -> bool {
        self.key.as_str() == requested || self.group == requested
    }

    /// `true` once a column has been assigned.
    pub fn is_active(&self) -> bool {
        self.offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_kinds() {
        assert!(FieldKind::Residual.is_residual());
        assert!(FieldKind::AutoResidual.is_residual());
        assert!(!FieldKind::Coefficient.is_residual());
        assert!(!FieldKind::Value.is_residual());
    }

    #[test]
    fn only_plain_coefficient_is_coefficient() {
        assert!(FieldKind::Coefficient.is_coefficient());
        assert!(!FieldKind::AutoCoefficient.is_coefficient());
        assert!(!FieldKind::Residual.is_coefficient());
    }

    #[test]
    fn history_field_matches_key_or_group() {
        let f = HistoryField::new(
            "RMS_DENSITY",
            "rms[Rho]",
            ScreenFormat::Fixed,
            "RMS_RES",
            FieldKind::Residual,
            "",
        );
        assert!(f.matches("RMS_DENSITY"));
        assert!(f.matches("RMS_RES"));
        assert!(!f.matches("MAX_RES"));
        assert_eq!(f.value, 0.0);
    }

    #[test]
    fn volume_field_starts_inactive() {
        let f = VolumeField::new("DENSITY", "Density", "SOLUTION", "");
        assert!(!f.is_active());
        assert_eq!(f.offset, None);
    }

    #[test]
    fn min_width_by_format() {
        assert_eq!(ScreenFormat::Integer.min_width(), 10);
        assert_eq!(ScreenFormat::Scientific.min_width(), 20);
    }
}
