//! Fields the session derives from contributor-declared history fields.
//!
//! Called once after every contributor has declared its fields. The
//! returned [`DerivedLayout`] records which source fields feed which
//! derived ones, so the per-iteration postprocessing does not rescan the
//! registry.

use std::collections::BTreeMap;

use tally_core::{FieldKey, FieldKind, HistoryField, RegistryError, ScreenFormat};
use tally_signal::WindowKind;

use crate::history::HistoryRegistry;

/// Key of the inner-loop Cauchy value.
pub const CAUCHY_KEY: &str = "CAUCHY";
/// Key of the windowed time-convergence Cauchy value.
pub const TIME_WND_CAUCHY_KEY: &str = "TIME_WND_CAUCHY";
/// Prefix of relative residual keys.
pub const REL_PREFIX: &str = "REL_";
/// Prefix of group-average residual keys.
pub const AVG_PREFIX: &str = "AVG_";
/// Prefix of plain time-average keys.
pub const TAVG_PREFIX: &str = "TAVG_";

/// Options controlling which derived fields exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct DerivedOptions<'a> {
    /// Declare time averages for every coefficient.
    pub time_domain: bool,
    /// Field monitored by the inner Cauchy test; labels `CAUCHY`.
    pub convergence_field: Option<&'a str>,
    /// Field monitored by the windowed test; labels `TIME_WND_CAUCHY`.
    pub window_field: Option<&'a str>,
    /// Declare only `CAUCHY` and `TIME_WND_CAUCHY`, as a multizone driver
    /// does.
    pub cauchy_only: bool,
}

/// Source fields of each derived family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedLayout {
    /// Residual fields that have a `REL_` companion, in declaration order.
    pub residuals: Vec<FieldKey>,
    /// Residual groups with an `AVG_` field and their members, sorted by
    /// group name.
    pub residual_groups: Vec<(String, Vec<FieldKey>)>,
    /// Coefficient fields with time-average companions, in declaration
    /// order. Empty unless the run is time-domain.
    pub coefficients: Vec<FieldKey>,
}

/// Short name used in the `AVG_<group>` label.
pub fn average_group_short(group: &str) -> String {
    match group {
        "BGS_RES" => "bgs".to_string(),
        "RMS_RES" => "rms".to_string(),
        "MAX_RES" => "max".to_string(),
        other => other.to_lowercase(),
    }
}

/// Declare relative residuals, group averages, time averages and the two
/// Cauchy fields.
pub fn declare_derived(
    registry: &mut HistoryRegistry,
    options: &DerivedOptions<'_>,
) -> Result<DerivedLayout, RegistryError> {
    let mut layout = DerivedLayout::default();
    let mut groups: BTreeMap<String, Vec<FieldKey>> = BTreeMap::new();
    let mut relative = Vec::new();
    let mut averaged = Vec::new();

    for field in registry.iter().filter(|_| !options.cauchy_only) {
        match field.kind {
            FieldKind::Residual => {
                relative.push(HistoryField::new(
                    field.key.prefixed(REL_PREFIX),
                    format!("rel{}", field.label),
                    field.format,
                    format!("{REL_PREFIX}{}", field.group),
                    FieldKind::AutoResidual,
                    "Relative residual.",
                ));
                groups
                    .entry(field.group.clone())
                    .or_default()
                    .push(field.key.clone());
                layout.residuals.push(field.key.clone());
            }
            FieldKind::Coefficient if options.time_domain => {
                averaged.push(HistoryField::new(
                    field.key.prefixed(TAVG_PREFIX),
                    format!("tavg[{}]", field.label),
                    field.format,
                    format!("{TAVG_PREFIX}{}", field.group),
                    FieldKind::AutoCoefficient,
                    "Time averaged values.",
                ));
                for kind in WindowKind::ALL {
                    averaged.push(HistoryField::new(
                        field.key.prefixed(kind.field_prefix()),
                        format!("{}[{}]", kind.label_prefix(), field.label),
                        field.format,
                        format!("{}{}", kind.field_prefix(), field.group),
                        FieldKind::AutoCoefficient,
                        kind.description(),
                    ));
                }
                layout.coefficients.push(field.key.clone());
            }
            _ => {}
        }
    }

    for f in relative {
        registry.add(f)?;
    }
    for (group, members) in groups {
        registry.add(HistoryField::new(
            format!("{AVG_PREFIX}{group}"),
            format!("avg[{}]", average_group_short(&group)),
            ScreenFormat::Fixed,
            format!("{AVG_PREFIX}{group}"),
            FieldKind::AutoResidual,
            "Average residual over all solution variables.",
        ))?;
        layout.residual_groups.push((group, members));
    }
    for f in averaged {
        registry.add(f)?;
    }

    let label_of = |name: Option<&str>| -> String {
        name.map(|n| registry.get(n).map_or_else(|| n.to_string(), |f| f.label.clone()))
            .unwrap_or_default()
    };
    let cauchy_label = format!("C[{}]", label_of(options.convergence_field));
    let window_label = format!("t_wnd_C[{}]", label_of(options.window_field));
    registry.add(HistoryField::new(
        CAUCHY_KEY,
        cauchy_label,
        ScreenFormat::Scientific,
        CAUCHY_KEY,
        FieldKind::AutoCoefficient,
        "Cauchy residual value of the monitored field.",
    ))?;
    registry.add(HistoryField::new(
        TIME_WND_CAUCHY_KEY,
        window_label,
        ScreenFormat::Scientific,
        TIME_WND_CAUCHY_KEY,
        FieldKind::AutoCoefficient,
        "Cauchy residual value of the windowed monitored field.",
    ))?;

    Ok(layout)
}
