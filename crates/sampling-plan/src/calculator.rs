//! Sample-size calculator
//!
//! Attribute-sampling size for a proportion with finite-population
//! correction:
//!
//! ```text
//! n0 = z² · p · (1 − p) / e²
//! n  = n0 / (1 + (n0 − 1) / N)
//! ```
//!
//! Pure and cheap, so request layers can call it on every parameter change
//! for a live preview.

use crate::config::validate_statistics;
use crate::error::PlanError;
use serde::{Deserialize, Serialize};

/// Proportion used when no expected error rate is known
pub const DEFAULT_PROPORTION: f64 = 0.5;

/// Slack absorbed before rounding up, so `73.000000000001` stays 73
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// Inputs of one sample-size calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSizeRequest {
    /// Number of eligible rows (N)
    pub population_size: usize,
    /// Two-sided confidence level
    pub confidence_level: f64,
    /// Tolerable error (e)
    pub margin_of_error: f64,
    /// Expected error rate
    pub expected_error_rate: f64,
    /// Use `max(expected, 0.5)` as the proportion
    pub conservative: bool,
}

impl SampleSizeRequest {
    /// Create request with no expected error rate
    #[inline]
    #[must_use]
    pub fn new(population_size: usize, confidence_level: f64, margin_of_error: f64) -> Self {
        Self {
            population_size,
            confidence_level,
            margin_of_error,
            expected_error_rate: 0.0,
            conservative: false,
        }
    }

    /// With expected error rate
    #[inline]
    #[must_use]
    pub fn with_expected_error_rate(mut self, rate: f64) -> Self {
        self.expected_error_rate = rate;
        self
    }

    /// With conservative proportion
    #[inline]
    #[must_use]
    pub fn with_conservative(mut self, conservative: bool) -> Self {
        self.conservative = conservative;
        self
    }

    /// Proportion p fed into the variance term
    #[must_use]
    pub fn proportion(&self) -> f64 {
        if self.conservative {
            self.expected_error_rate.max(DEFAULT_PROPORTION)
        } else if self.expected_error_rate > 0.0 {
            self.expected_error_rate
        } else {
            DEFAULT_PROPORTION
        }
    }

    /// Compute the required sample count, clamped to `[0, N]`
    ///
    /// # Errors
    /// [`PlanError::InvalidConfiguration`] if confidence is outside (0, 1),
    /// margin is outside (0, 0.99] or the expected rate is outside [0, 1)
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn calculate(&self) -> Result<usize, PlanError> {
        validate_statistics(
            self.confidence_level,
            self.margin_of_error,
            self.expected_error_rate,
        )?;

        if self.population_size == 0 {
            return Ok(0);
        }

        let z = z_score(self.confidence_level)?;
        let p = self.proportion();
        let e = self.margin_of_error;
        let n0 = z * z * p * (1.0 - p) / (e * e);

        let population = self.population_size as f64;
        let corrected = n0 / (1.0 + (n0 - 1.0) / population);

        let rounded = (corrected - ROUNDING_TOLERANCE).ceil().max(0.0);
        Ok((rounded as usize).min(self.population_size))
    }
}

/// Required sample count for a population
///
/// # Errors
/// See [`SampleSizeRequest::calculate`]
pub fn calculate_sample_size(
    population_size: usize,
    confidence_level: f64,
    margin_of_error: f64,
    expected_error_rate: f64,
) -> Result<usize, PlanError> {
    SampleSizeRequest::new(population_size, confidence_level, margin_of_error)
        .with_expected_error_rate(expected_error_rate)
        .calculate()
}

/// Two-sided z-score for a confidence level
///
/// # Errors
/// [`PlanError::InvalidConfiguration`] if the level is outside (0, 1)
pub fn z_score(confidence_level: f64) -> Result<f64, PlanError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(PlanError::invalid(format!(
            "confidence level must be in (0, 1), got {confidence_level}"
        )));
    }
    Ok(inverse_normal_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}

/// Inverse standard-normal CDF (Acklam's rational approximation)
///
/// Relative error below 1.2e-9 over (0, 1). Returns ±∞ at the endpoints
/// and NaN outside [0, 1].
#[must_use]
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
