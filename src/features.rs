use rustfft::{num_complex::Complex64, FftPlanner};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("price window is empty")]
    Empty,
    #[error("price window has a zero maximum")]
    ZeroMaximum,
    #[error("price window maximum {0} is not a positive number")]
    InvalidMaximum(f64),
}

/// Turns a price window into its normalized spectrum.
///
/// Prices are divided by the window maximum so they fall in `(0, 1]`, transformed with a
/// forward FFT, and every bin is divided by the window length.
pub struct SpectralFeaturizer {
    planner: FftPlanner<f64>,
}

impl SpectralFeaturizer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    pub fn transform(&mut self, prices: &[f32]) -> Result<Vec<Complex64>, FeatureError> {
        let mut buffer = normalize(prices)?
            .into_iter()
            .map(|value| Complex64::new(value, 0.0))
            .collect::<Vec<_>>();

        let width = buffer.len();
        self.planner.plan_fft_forward(width).process(&mut buffer);

        let scale = width as f64;
        for bin in buffer.iter_mut() {
            *bin /= scale;
        }

        Ok(buffer)
    }
}

impl Default for SpectralFeaturizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Divides every price by the window maximum.
pub fn normalize(prices: &[f32]) -> Result<Vec<f64>, FeatureError> {
    if prices.is_empty() {
        return Err(FeatureError::Empty);
    }

    let max = prices
        .iter()
        .map(|price| *price as f64)
        .fold(f64::NEG_INFINITY, f64::max);

    if max == 0.0 {
        return Err(FeatureError::ZeroMaximum);
    }
    if !(max > 0.0) || !max.is_finite() {
        return Err(FeatureError::InvalidMaximum(max));
    }

    Ok(prices.iter().map(|price| *price as f64 / max).collect())
}
