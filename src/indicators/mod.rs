// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the technical indicators used by
// the valuation engine. Every function returns an `IndicatorSeries` carrying
// its own offset, so insufficient data shows up as an empty series and
// undefined leading positions as `None` rather than zero.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod series;
pub mod sma;

pub use bollinger::{calculate_bollinger, standard_deviation, BollingerBands, BollingerReading};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, calculate_macd_with};
pub use rsi::{calculate_rsi, current_rsi, RsiSaturation};
pub use series::{IndicatorKind, IndicatorSeries};
pub use sma::calculate_sma;

use serde::{Deserialize, Serialize};

use crate::types::PriceSeries;

fn default_ma_periods() -> [usize; 3] {
    [20, 50, 200]
}

fn default_ema_periods() -> [usize; 2] {
    [macd::MACD_FAST_PERIOD, macd::MACD_SLOW_PERIOD]
}

fn default_rsi_period() -> usize {
    rsi::DEFAULT_RSI_PERIOD
}

fn default_bollinger_period() -> usize {
    bollinger::DEFAULT_BOLLINGER_PERIOD
}

fn default_bollinger_multiplier() -> f64 {
    bollinger::DEFAULT_BOLLINGER_MULTIPLIER
}

/// Periods and modes for a full indicator pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Short, medium and long SMA periods.
    #[serde(default = "default_ma_periods")]
    pub ma_periods: [usize; 3],

    /// Fast and slow EMA periods (also the MACD periods).
    #[serde(default = "default_ema_periods")]
    pub ema_periods: [usize; 2],

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default)]
    pub rsi_saturation: RsiSaturation,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    #[serde(default = "default_bollinger_multiplier")]
    pub bollinger_multiplier: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_periods: default_ma_periods(),
            ema_periods: default_ema_periods(),
            rsi_period: default_rsi_period(),
            rsi_saturation: RsiSaturation::default(),
            bollinger_period: default_bollinger_period(),
            bollinger_multiplier: default_bollinger_multiplier(),
        }
    }
}

/// Every indicator the engine derives from one price series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    /// SMAs in the order of `IndicatorConfig::ma_periods`.
    pub sma: [IndicatorSeries; 3],
    /// EMAs in the order of `IndicatorConfig::ema_periods`.
    pub ema: [IndicatorSeries; 2],
    pub macd: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub bollinger: BollingerBands,
}

impl IndicatorSet {
    /// Run every indicator over `series`.
    pub fn compute(series: &PriceSeries, config: &IndicatorConfig) -> Self {
        let closes = series.closes();
        let [fast, slow] = config.ema_periods;

        Self {
            sma: config.ma_periods.map(|p| calculate_sma(closes, p)),
            ema: config.ema_periods.map(|p| calculate_ema(closes, p)),
            macd: calculate_macd_with(closes, fast, slow),
            rsi: calculate_rsi(closes, config.rsi_period, config.rsi_saturation),
            bollinger: calculate_bollinger(
                closes,
                config.bollinger_period,
                config.bollinger_multiplier,
            ),
        }
    }
}
