// =============================================================================
// MACD: Moving Average Convergence / Divergence
// =============================================================================
//
//   MACD_i = EMA12_i - EMA26_i
//
// EMA-12 is defined from input index 11, EMA-26 only from index 25. The two
// series are paired by input index over the range where both exist, so the
// MACD line starts at index 25.
// =============================================================================

use super::ema::calculate_ema;
use super::series::{IndicatorKind, IndicatorSeries};

pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;

/// Standard 12/26 MACD line for `closes`.
pub fn calculate_macd(closes: &[f64]) -> IndicatorSeries {
    calculate_macd_with(closes, MACD_FAST_PERIOD, MACD_SLOW_PERIOD)
}

/// MACD line for arbitrary fast/slow EMA periods.
///
/// Returns an empty series when either EMA is undefined or `fast >= slow`.
pub fn calculate_macd_with(closes: &[f64], fast: usize, slow: usize) -> IndicatorSeries {
    if fast == 0 || fast >= slow {
        return IndicatorSeries::empty(IndicatorKind::Macd, slow, closes.len());
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    if slow_ema.is_empty() {
        return IndicatorSeries::empty(IndicatorKind::Macd, slow, closes.len());
    }

    let start = slow_ema.offset();
    let values = slow_ema
        .indexed()
        .filter_map(|(i, slow_v)| fast_ema.at(i).map(|fast_v| fast_v - slow_v))
        .collect();

    IndicatorSeries::new(IndicatorKind::Macd, slow, start, closes.len(), values)
}
