// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA over `period`, upper = middle + k*σ, lower = middle - k*σ,
// where σ is the population standard deviation of the same window.
//
// All three bands share the SMA's offset (`period - 1`).
// =============================================================================

use serde::Serialize;

use super::series::{IndicatorKind, IndicatorSeries};
use super::sma::calculate_sma;

pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_BOLLINGER_MULTIPLIER: f64 = 2.0;

/// Upper, middle and lower band series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
}

/// Latest reading of all three bands plus the normalised width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle * 100; `None` when the middle band is zero.
    pub width: Option<f64>,
}

impl BollingerBands {
    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }

    pub fn latest(&self) -> Option<BollingerReading> {
        let upper = self.upper.last()?;
        let middle = self.middle.last()?;
        let lower = self.lower.last()?;
        let width = if middle == 0.0 {
            None
        } else {
            Some((upper - lower) / middle * 100.0)
        };
        Some(BollingerReading {
            upper,
            middle,
            lower,
            width,
        })
    }
}

/// Calculate Bollinger Bands over every full window of `closes`.
///
/// Returns empty bands when `period == 0` or there are fewer than `period`
/// closes.
pub fn calculate_bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let sma = calculate_sma(closes, period);
    let n = closes.len();

    let mut upper = Vec::with_capacity(sma.len());
    let mut lower = Vec::with_capacity(sma.len());

    for (window, &middle) in closes.windows(period.max(1)).zip(sma.values()) {
        let sigma = population_std_dev(window, middle);
        upper.push(middle + multiplier * sigma);
        lower.push(middle - multiplier * sigma);
    }

    let offset = sma.offset();
    let middle = IndicatorSeries::new(
        IndicatorKind::BollingerMiddle,
        period,
        offset,
        n,
        sma.values().to_vec(),
    );

    BollingerBands {
        upper: IndicatorSeries::new(IndicatorKind::BollingerUpper, period, offset, n, upper),
        middle,
        lower: IndicatorSeries::new(IndicatorKind::BollingerLower, period, offset, n, lower),
    }
}

/// Population standard deviation (divides by N, not N - 1).
///
/// Returns `None` for an empty slice.
pub fn standard_deviation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(population_std_dev(values, mean))
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
