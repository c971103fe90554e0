// =============================================================================
// Feature Vector: predictor input assembled from indicator readings
// =============================================================================
//
// The predictor collaborator expects a fixed set of named fields in a fixed
// order. Field names and order below are part of that contract:
//
//   Volume, Stock, MA_20, MA_50, MA_200, RSI, MACD,
//   BB_Upper, BB_Middle, BB_Lower, Prev_Close_1, Prev_Close_7, Prev_Close_30
//
// Every numeric field must be defined; a history too short to define the
// longest indicator is a data error, never a zero placeholder.
// =============================================================================

use serde::Serialize;

use crate::error::{Result, ValuationError};
use crate::indicators::{IndicatorConfig, IndicatorSet};
use crate::types::PriceSeries;

/// Predictor input for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    #[serde(rename = "Volume")]
    pub volume: i64,
    #[serde(rename = "Stock")]
    pub symbol: String,
    #[serde(rename = "MA_20")]
    pub ma_20: f64,
    #[serde(rename = "MA_50")]
    pub ma_50: f64,
    #[serde(rename = "MA_200")]
    pub ma_200: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "MACD")]
    pub macd: f64,
    #[serde(rename = "BB_Upper")]
    pub bb_upper: f64,
    #[serde(rename = "BB_Middle")]
    pub bb_middle: f64,
    #[serde(rename = "BB_Lower")]
    pub bb_lower: f64,
    #[serde(rename = "Prev_Close_1")]
    pub prev_close_1: f64,
    #[serde(rename = "Prev_Close_7")]
    pub prev_close_7: f64,
    #[serde(rename = "Prev_Close_30")]
    pub prev_close_30: f64,
}

impl FeatureVector {
    /// Field names in contract order.
    pub const FIELD_NAMES: [&'static str; 13] = [
        "Volume",
        "Stock",
        "MA_20",
        "MA_50",
        "MA_200",
        "RSI",
        "MACD",
        "BB_Upper",
        "BB_Middle",
        "BB_Lower",
        "Prev_Close_1",
        "Prev_Close_7",
        "Prev_Close_30",
    ];

    /// Build the vector from a price series.
    ///
    /// `volume` is the trailing-session volume when the caller has one. The
    /// close-only price history carries no volume, so the fallback is the
    /// latest close truncated to an integer, which is what the deployed
    /// predictor was trained on.
    pub fn assemble(
        symbol: &str,
        series: &PriceSeries,
        config: &IndicatorConfig,
        volume: Option<i64>,
    ) -> Result<Self> {
        let set = IndicatorSet::compute(series, config);
        let required = required_history(config);

        let insufficient = || ValuationError::InsufficientHistory {
            required,
            actual: series.len(),
        };

        let bands = set.bollinger.latest().ok_or_else(insufficient)?;
        let last_close = series.last().ok_or_else(insufficient)?;

        Ok(Self {
            volume: volume.unwrap_or(last_close as i64),
            symbol: symbol.to_string(),
            ma_20: set.sma[0].last().ok_or_else(insufficient)?,
            ma_50: set.sma[1].last().ok_or_else(insufficient)?,
            ma_200: set.sma[2].last().ok_or_else(insufficient)?,
            rsi: set.rsi.last().ok_or_else(insufficient)?,
            macd: set.macd.last().ok_or_else(insufficient)?,
            bb_upper: bands.upper,
            bb_middle: bands.middle,
            bb_lower: bands.lower,
            prev_close_1: last_close,
            prev_close_7: series.lagged(7).ok_or_else(insufficient)?,
            prev_close_30: series.lagged(30).ok_or_else(insufficient)?,
        })
    }

    /// Numeric fields in contract order (everything except `Stock`).
    pub fn values(&self) -> [f64; 12] {
        [
            self.volume as f64,
            self.ma_20,
            self.ma_50,
            self.ma_200,
            self.rsi,
            self.macd,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.prev_close_1,
            self.prev_close_7,
            self.prev_close_30,
        ]
    }
}

/// Fewest closes for which every feature is defined under `config`.
pub fn required_history(config: &IndicatorConfig) -> usize {
    let longest_ma = config.ma_periods.iter().copied().max().unwrap_or(0);
    let slow_ema = config.ema_periods[1];
    [
        longest_ma,
        slow_ema,
        config.rsi_period + 1,
        config.bollinger_period,
        30,
    ]
    .into_iter()
    .max()
    .unwrap_or(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> PriceSeries {
        PriceSeries::new(
            (0..n)
                .map(|i| 50.0 + (i as f64 * 0.2).cos() * 3.0 + i as f64 * 0.05)
                .collect(),
        )
    }

    #[test]
    fn field_order_matches_serialisation() {
        let cfg = IndicatorConfig::default();
        let fv = FeatureVector::assemble("IBM", &history(220), &cfg, Some(10)).unwrap();
        let json = serde_json::to_string(&fv).unwrap();
        let mut last = 0;
        for name in FeatureVector::FIELD_NAMES {
            let pos = json.find(&format!("\"{name}\"")).unwrap();
            assert!(pos >= last, "{name} out of order");
            last = pos;
        }
    }

    #[test]
    fn lagged_closes_and_latest_indicators() {
        let series = history(250);
        let cfg = IndicatorConfig::default();
        let fv = FeatureVector::assemble("IBM", &series, &cfg, None).unwrap();
        let set = IndicatorSet::compute(&series, &cfg);

        assert_eq!(fv.prev_close_1, series.closes()[249]);
        assert_eq!(fv.prev_close_7, series.closes()[243]);
        assert_eq!(fv.prev_close_30, series.closes()[220]);
        assert_eq!(fv.ma_200, set.sma[2].last().unwrap());
        assert_eq!(fv.bb_middle, fv.ma_20);
        assert_eq!(fv.volume, series.closes()[249] as i64);
        assert_eq!(fv.symbol, "IBM");
    }

    #[test]
    fn short_history_is_rejected() {
        let err =
            FeatureVector::assemble("IBM", &history(120), &IndicatorConfig::default(), None)
                .unwrap_err();
        assert_eq!(
            err,
            ValuationError::InsufficientHistory {
                required: 200,
                actual: 120
            }
        );
    }

    #[test]
    fn required_history_defaults_to_longest_ma() {
        assert_eq!(required_history(&IndicatorConfig::default()), 200);
        let cfg = IndicatorConfig {
            ma_periods: [5, 10, 20],
            ..IndicatorConfig::default()
        };
        assert_eq!(required_history(&cfg), 30);
    }
}
