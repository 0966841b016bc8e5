//! Constant-velocity Kalman filter over the ball position in meters.
//!
//! State vector: `[x, vx, y, vy]ᵀ`, measurement: `[x, y]ᵀ`.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};

use crate::constants::{
    MEASUREMENT_NOISE, MIN_PREDICT_DT_SEC, PROCESS_NOISE_POS, PROCESS_NOISE_VEL, SEED_COVARIANCE,
    SINGULAR_DETERMINANT, SINGULAR_INVERSE_DIAGONAL, UNSEEDED_COVARIANCE,
};
use crate::types::MotionState;

/// 2D position/velocity estimator fed with calibrated ball centroids.
#[derive(Clone, Debug)]
pub struct MotionEstimator {
    state: Vector4<f64>,
    covariance: Matrix4<f64>,
    process_noise: Matrix4<f64>,
    measurement_noise: Matrix2<f64>,
    seeded: bool,
}

impl Default for MotionEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self {
            state: Vector4::zeros(),
            covariance: Matrix4::identity() * UNSEEDED_COVARIANCE,
            process_noise: Matrix4::from_diagonal(&Vector4::new(
                PROCESS_NOISE_POS,
                PROCESS_NOISE_VEL,
                PROCESS_NOISE_POS,
                PROCESS_NOISE_VEL,
            )),
            measurement_noise: Matrix2::identity() * MEASUREMENT_NOISE,
            seeded: false,
        }
    }

    /// Transition matrix F for the given time step.
    ///
    /// ```text
    /// | 1  dt 0  0  |
    /// | 0  1  0  0  |
    /// | 0  0  1  dt |
    /// | 0  0  0  1  |
    /// ```
    fn transition_matrix(dt: f64) -> Matrix4<f64> {
        Matrix4::new(
            1.0, dt, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, dt, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Observation matrix H (x and y are measured, velocities are not).
    fn observation_matrix() -> Matrix2x4<f64> {
        Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// Reset the state to a measured position at rest.
    pub fn seed(&mut self, z: [f64; 2]) {
        self.state = Vector4::new(z[0], 0.0, z[1], 0.0);
        self.covariance = Matrix4::identity() * SEED_COVARIANCE;
        self.seeded = true;
    }

    /// Advance the state by `dt` seconds: `x ← F x`, `P ← F P Fᵗ + Q`.
    ///
    /// `dt` is floored at 1 ms.
    pub fn predict(&mut self, dt: f64) {
        let dt = dt.max(MIN_PREDICT_DT_SEC);
        let f = Self::transition_matrix(dt);
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    /// Correct the state with a measured position in meters.
    pub fn update(&mut self, z: [f64; 2]) {
        let h = Self::observation_matrix();
        let ht = h.transpose();

        let innovation = Vector2::new(z[0], z[1]) - h * self.state;
        let innovation_cov = h * self.covariance * ht + self.measurement_noise;
        let gain: Matrix4x2<f64> = self.covariance * ht * invert_innovation(&innovation_cov);

        self.state += gain * innovation;
        self.covariance = (Matrix4::identity() - gain * h) * self.covariance;
    }

    pub fn state(&self) -> MotionState {
        MotionState {
            x: self.state[0],
            vx: self.state[1],
            y: self.state[2],
            vy: self.state[3],
        }
    }

    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.covariance
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

/// Closed-form 2×2 inverse of the innovation covariance.
///
/// A determinant magnitude below 1e-12 yields `1e12·I` instead of an error.
pub fn invert_innovation(s: &Matrix2<f64>) -> Matrix2<f64> {
    let (a, b) = (s[(0, 0)], s[(0, 1)]);
    let (c, d) = (s[(1, 0)], s[(1, 1)]);
    let det = a * d - b * c;

    if det.abs() < SINGULAR_DETERMINANT {
        log::debug!("Singular innovation covariance (det={:e}), using fallback", det);
        return Matrix2::identity() * SINGULAR_INVERSE_DIAGONAL;
    }

    Matrix2::new(d / det, -b / det, -c / det, a / det)
}
