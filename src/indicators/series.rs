// =============================================================================
// Indicator Series: offset-aligned indicator output
// =============================================================================
//
// An indicator is only defined once enough history exists (e.g. SMA-20 from
// input index 19 onwards). Instead of padding the front with zeros, which
// cannot be told apart from a genuine zero reading, each series records the
// input index of its first value. Undefined positions surface as `None`.
// =============================================================================

use serde::Serialize;

/// Which indicator produced a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Macd,
    Rsi,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sma => write!(f, "SMA"),
            Self::Ema => write!(f, "EMA"),
            Self::Macd => write!(f, "MACD"),
            Self::Rsi => write!(f, "RSI"),
            Self::BollingerUpper => write!(f, "BB_UPPER"),
            Self::BollingerMiddle => write!(f, "BB_MIDDLE"),
            Self::BollingerLower => write!(f, "BB_LOWER"),
        }
    }
}

/// Indicator values aligned to the price series they were computed from.
///
/// `values[k]` belongs to input index `offset + k`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    kind: IndicatorKind,
    period: usize,
    offset: usize,
    input_len: usize,
    values: Vec<f64>,
}

impl IndicatorSeries {
    pub(crate) fn new(
        kind: IndicatorKind,
        period: usize,
        offset: usize,
        input_len: usize,
        values: Vec<f64>,
    ) -> Self {
        debug_assert!(values.is_empty() || offset + values.len() <= input_len);
        Self {
            kind,
            period,
            offset,
            input_len,
            values,
        }
    }

    /// A series with no defined values (insufficient input).
    pub(crate) fn empty(kind: IndicatorKind, period: usize, input_len: usize) -> Self {
        Self::new(kind, period, input_len, input_len, Vec::new())
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Input index of the first defined value.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the price series this was computed from.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Defined values only.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of defined values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Value at input index `index`, `None` where undefined.
    pub fn at(&self, index: usize) -> Option<f64> {
        index
            .checked_sub(self.offset)
            .and_then(|k| self.values.get(k).copied())
    }

    /// `(input_index, value)` pairs for every defined position.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(k, &v)| (self.offset + k, v))
    }

    /// Full-length view over the input, `None` in every unset position.
    pub fn aligned(&self) -> Vec<Option<f64>> {
        (0..self.input_len).map(|i| self.at(i)).collect()
    }
}
