// Acceleration fit: v = a·t through the origin (ball released from rest)
use crate::constants::{GRAVITY, MIN_SAMPLES_FOR_FIT};
use crate::error::{AnalysisError, Result};
use crate::types::FilteredSample;

/// Estimated and theoretical acceleration for one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitResult {
    /// Least-squares slope of speed over time; non-finite when undefined
    pub a_estimated: f64,
    /// g·sin(θ) for the configured slope angle
    pub a_theory: f64,
}

impl FitResult {
    /// The fitted acceleration, or `None` when the regression was degenerate.
    pub fn estimate(&self) -> Option<f64> {
        self.a_estimated.is_finite().then_some(self.a_estimated)
    }

    /// `v = <a> · t`, or `None` when there is no fit to show.
    pub fn equation(&self) -> Option<String> {
        self.estimate().map(|a| format!("v = {:.4} · t", a))
    }
}

/// Theoretical acceleration of a body sliding down a frictionless incline.
pub fn theoretical_acceleration(slope_angle_deg: f64) -> f64 {
    GRAVITY * slope_angle_deg.to_radians().sin()
}

/// Fits a single acceleration to a filtered velocity series.
#[derive(Clone, Copy, Debug, Default)]
pub struct KinematicFitter {
    slope_angle_deg: f64,
}

impl KinematicFitter {
    pub fn new(slope_angle_deg: f64) -> Self {
        Self { slope_angle_deg }
    }

    /// `a = Σ tᵢ·vᵢ / Σ tᵢ²` over the samples where both `t` and `v` are finite.
    ///
    /// Requires at least three samples; fewer is reported as
    /// [`AnalysisError::InsufficientData`] and no fit is attempted.
    pub fn fit(&self, samples: &[FilteredSample]) -> Result<FitResult> {
        if samples.len() < MIN_SAMPLES_FOR_FIT {
            return Err(AnalysisError::InsufficientData {
                found: samples.len(),
                required: MIN_SAMPLES_FOR_FIT,
            });
        }

        let (num, den) = samples
            .iter()
            .map(|s| (s.t, s.speed()))
            .filter(|(t, v)| t.is_finite() && v.is_finite())
            .fold((0.0_f64, 0.0_f64), |(num, den), (t, v)| {
                (num + t * v, den + t * t)
            });

        let a_estimated = if den != 0.0 { num / den } else { f64::NAN };
        let a_theory = theoretical_acceleration(self.slope_angle_deg);

        log::info!(
            "Fit over {} samples: a_estimated={:.4}, a_theory={:.4}",
            samples.len(),
            a_estimated,
            a_theory
        );

        Ok(FitResult {
            a_estimated,
            a_theory,
        })
    }
}
