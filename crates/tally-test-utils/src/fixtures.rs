//! Reusable contributor fixtures.
//!
//! - [`ResidualDecay`]: log10 residuals falling linearly with the inner
//!   iteration, restarting every time step.
//! - [`OscillatingCoefficient`]: a coefficient oscillating over time
//!   iterations, optionally with noise and a NaN at a chosen iteration.
//! - [`FlowVolume`]: volume and surface fields exercising every
//!   [`VolumeSink`] operation.

use tally_core::{
    ContributorError, FieldContributor, FieldKind, HistoryDeclare, HistoryField, HistorySink,
    IterationInfo, ScreenFormat, VolumeDeclare, VolumeField, VolumeSink,
};

use crate::noise;

/// Residuals `start - rate * inner`, offset by `-0.5` per key in
/// declaration order.
///
/// Keys are declared as `Residual` fields in the `RMS_RES` group with
/// labels `rms[<suffix>]`.
pub struct ResidualDecay {
    pub keys: Vec<String>,
    pub start: f64,
    pub rate: f64,
}

impl ResidualDecay {
    pub fn new(keys: &[&str], start: f64, rate: f64) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            start,
            rate,
        }
    }

    /// The log10 residual at `inner`.
    pub fn at(&self, inner: u64) -> f64 {
        self.start - self.rate * inner as f64
    }
}

impl FieldContributor for ResidualDecay {
    fn name(&self) -> &str {
        "residual-decay"
    }

    fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
        for key in &self.keys {
            let suffix = key.trim_start_matches("RMS_").to_lowercase();
            fields.add(HistoryField::new(
                key.as_str(),
                format!("rms[{suffix}]"),
                ScreenFormat::Fixed,
                "RMS_RES",
                FieldKind::Residual,
                "Root-mean square residual.",
            ))?;
        }
        Ok(())
    }

    fn load_history(
        &self,
        iteration: &IterationInfo,
        out: &mut dyn HistorySink,
    ) -> Result<(), ContributorError> {
        for (i, key) in self.keys.iter().enumerate() {
            out.set(key, self.at(iteration.inner) - i as f64 * 0.5)?;
        }
        Ok(())
    }
}

/// Coefficient `mean + amplitude * sin(2 pi t / period) + noise`, where
/// `t` is the time iteration, plus a per-surface split of the same value
/// over `markers`.
pub struct OscillatingCoefficient {
    pub key: String,
    pub label: String,
    pub mean: f64,
    pub amplitude: f64,
    pub period: f64,
    pub sigma: f64,
    pub seed: u64,
    pub markers: Vec<String>,
    /// Report NaN from this time iteration on.
    pub nan_from: Option<u64>,
}

impl OscillatingCoefficient {
    pub fn new(key: &str, label: &str, mean: f64, amplitude: f64, period: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            mean,
            amplitude,
            period,
            sigma: 0.0,
            seed: 0,
            markers: Vec::new(),
            nan_from: None,
        }
    }

    pub fn with_noise(mut self, seed: u64, sigma: f64) -> Self {
        self.seed = seed;
        self.sigma = sigma;
        self
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn nan_from(mut self, time: u64) -> Self {
        self.nan_from = Some(time);
        self
    }

    /// The coefficient at time iteration `time`.
    pub fn at(&self, time: u64) -> f64 {
        if self.nan_from.is_some_and(|t| time >= t) {
            return f64::NAN;
        }
        let phase = 2.0 * std::f64::consts::PI * time as f64 / self.period;
        self.mean + self.amplitude * phase.sin() + noise(self.seed, time, self.sigma)
    }

    fn surface_key(&self) -> String {
        format!("SURFACE_{}", self.key)
    }
}

impl FieldContributor for OscillatingCoefficient {
    fn name(&self) -> &str {
        &self.key
    }

    fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
        fields.add(HistoryField::new(
            self.key.as_str(),
            self.label.as_str(),
            ScreenFormat::Fixed,
            "AERO_COEFF",
            FieldKind::Coefficient,
            "Aerodynamic coefficient.",
        ))?;
        if !self.markers.is_empty() {
            fields.add_per_surface(
                HistoryField::new(
                    self.surface_key(),
                    self.label.as_str(),
                    ScreenFormat::Fixed,
                    "AERO_COEFF_SURF",
                    FieldKind::Coefficient,
                    "Aerodynamic coefficient per surface.",
                ),
                &self.markers,
            )?;
        }
        Ok(())
    }

    fn load_history(
        &self,
        iteration: &IterationInfo,
        out: &mut dyn HistorySink,
    ) -> Result<(), ContributorError> {
        let value = self.at(iteration.time);
        out.set(&self.key, value)?;
        let n = self.markers.len();
        let surface_key = self.surface_key();
        for marker in 0..n {
            out.set_surface(&surface_key, marker, value / n as f64)?;
        }
        Ok(())
    }
}

/// Volume and surface fields of a synthetic flow.
///
/// Entity `e` has density `1 + e`, velocity `2e` and Mach `0.01 e`;
/// `MEAN_MACH` is the running time average of Mach. Surface vertices
/// report a pressure coefficient of `-0.1 * (marker + 1)`.
#[derive(Default)]
pub struct FlowVolume;

impl FieldContributor for FlowVolume {
    fn name(&self) -> &str {
        "flow-volume"
    }

    fn declare_history(&self, _fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
        Ok(())
    }

    fn declare_volume(&self, fields: &mut dyn VolumeDeclare) -> Result<(), ContributorError> {
        fields.add(VolumeField::new("DENSITY", "Density", "SOLUTION", "Density"))?;
        fields.add(VolumeField::new("VELOCITY_X", "Velocity_x", "PRIMITIVE", "x-velocity"))?;
        fields.add(VolumeField::new("MACH", "Mach", "PRIMITIVE", "Mach number"))?;
        fields.add(VolumeField::new("MEAN_MACH", "MeanMach", "TIME_AVERAGE", "Mean Mach number"))?;
        fields.add(VolumeField::new(
            "PRESSURE_COEFF",
            "Pressure_Coefficient",
            "PRIMITIVE",
            "Pressure coefficient",
        ))?;
        Ok(())
    }

    fn load_history(
        &self,
        _iteration: &IterationInfo,
        _out: &mut dyn HistorySink,
    ) -> Result<(), ContributorError> {
        Ok(())
    }

    fn load_volume(&self, entity: usize, out: &mut dyn VolumeSink) -> Result<(), ContributorError> {
        let e = entity as f64;
        out.set("DENSITY", 1.0 + e)?;
        out.set("VELOCITY_X", 2.0 * e)?;
        out.set("MACH", 0.01 * e)?;
        let mach = out.get("MACH")?;
        out.set_running_average("MEAN_MACH", mach)?;
        Ok(())
    }

    fn load_surface(
        &self,
        _entity: usize,
        marker: usize,
        _vertex: usize,
        out: &mut dyn VolumeSink,
    ) -> Result<(), ContributorError> {
        out.set("PRESSURE_COEFF", -0.1 * (marker as f64 + 1.0))?;
        Ok(())
    }
}
