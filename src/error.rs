// =============================================================================
// Valuation Errors
// =============================================================================
//
// Every failure the valuation core can report. Collaborator failures arrive
// as opaque `anyhow::Error`s and are flattened into a message so that the
// error stays `Clone` and can be published through the pipeline state.
//
// Kinds:
//   Input          rejected before any fetch is issued
//   Fetch          a document or price-history fetch failed
//   Data           a fetched document lacks a usable field
//   Configuration  DCF parameters that would divide by zero or go negative
//   Prediction     the predictor collaborator failed
// =============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::fundamentals::Document;

/// Coarse classification of a [`ValuationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Input,
    Fetch,
    Data,
    Configuration,
    Prediction,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Fetch => write!(f, "fetch"),
            Self::Data => write!(f, "data"),
            Self::Configuration => write!(f, "configuration"),
            Self::Prediction => write!(f, "prediction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ValuationError {
    /// Empty or otherwise unusable ticker symbol.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// A collaborator fetch failed. `message` is the full context chain.
    #[error("failed to fetch {document} for {symbol}: {message}")]
    Fetch {
        symbol: String,
        document: Document,
        message: String,
    },

    #[error("{document} contains no annual reports")]
    NoAnnualReports { document: Document },

    #[error("{document} is missing field `{field}`")]
    MissingField {
        document: Document,
        field: &'static str,
    },

    #[error("{document} field `{field}` is not numeric: {value:?}")]
    NonNumericField {
        document: Document,
        field: &'static str,
        value: String,
    },

    /// Shares outstanding absent, unparsable or not strictly positive.
    #[error("shares outstanding unavailable: {0}")]
    SharesOutstanding(String),

    #[error("insufficient price history: need {required} closes, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("invalid DCF configuration: {0}")]
    InvalidConfig(String),

    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl ValuationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSymbol(_) => ErrorKind::Input,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::NoAnnualReports { .. }
            | Self::MissingField { .. }
            | Self::NonNumericField { .. }
            | Self::SharesOutstanding(_)
            | Self::InsufficientHistory { .. } => ErrorKind::Data,
            Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::Prediction(_) => ErrorKind::Prediction,
        }
    }

    /// Wrap a collaborator failure for `document`.
    pub fn fetch(symbol: &str, document: Document, err: &anyhow::Error) -> Self {
        Self::Fetch {
            symbol: symbol.to_string(),
            document,
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValuationError>;
