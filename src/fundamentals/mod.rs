// =============================================================================
// Fundamentals: financial statement documents as delivered by the source
// =============================================================================
//
// Statements arrive already decoded but untyped: each annual report is a flat
// record of string-encoded fields keyed by the provider's field names. Only
// the handful of figures the DCF needs are ever parsed (see `extract`).
// =============================================================================

pub mod extract;

pub use extract::{
    StatementFigures, FIELD_CAPEX, FIELD_CASH, FIELD_LONG_TERM_DEBT, FIELD_NET_INCOME,
    FIELD_OPERATING_CASH_FLOW,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which document a value (or failure) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Document {
    CashFlow,
    IncomeStatement,
    BalanceSheet,
    CompanyOverview,
    Quote,
    PriceHistory,
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashFlow => write!(f, "cash flow statement"),
            Self::IncomeStatement => write!(f, "income statement"),
            Self::BalanceSheet => write!(f, "balance sheet"),
            Self::CompanyOverview => write!(f, "company overview"),
            Self::Quote => write!(f, "stock quote"),
            Self::PriceHistory => write!(f, "price history"),
        }
    }
}

/// One fiscal year of a statement: field name -> raw string value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnualReport {
    fields: BTreeMap<String, String>,
}

impl AnnualReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fiscal_date_ending(&self) -> Option<&str> {
        self.get("fiscalDateEnding")
    }
}

impl FromIterator<(String, String)> for AnnualReport {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A statement document: annual reports, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementDocument {
    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(rename = "annualReports", default)]
    pub annual_reports: Vec<AnnualReport>,
}

impl StatementDocument {
    pub fn new(symbol: impl Into<String>, annual_reports: Vec<AnnualReport>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            annual_reports,
        }
    }

    /// The most recent annual report (the provider lists newest first).
    pub fn latest(&self) -> Option<&AnnualReport> {
        self.annual_reports.first()
    }
}

/// The three statements a DCF needs, fetched together.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialStatementSet {
    pub cash_flow: StatementDocument,
    pub income: StatementDocument,
    pub balance_sheet: StatementDocument,
}

/// Company profile; only the share count matters to the valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    #[serde(rename = "Symbol", default)]
    pub symbol: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "MarketCapitalization", default)]
    pub market_capitalization: Option<String>,

    #[serde(rename = "SharesOutstanding", default)]
    pub shares_outstanding: Option<String>,
}

/// Latest trading-day quote. Every figure arrives as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    #[serde(rename = "01. symbol", default)]
    pub symbol: String,

    #[serde(rename = "02. open", default)]
    pub open: String,

    #[serde(rename = "03. high", default)]
    pub high: String,

    #[serde(rename = "04. low", default)]
    pub low: String,

    #[serde(rename = "05. price", default)]
    pub price: String,

    #[serde(rename = "06. volume", default)]
    pub volume: String,

    #[serde(rename = "07. latest trading day", default)]
    pub latest_trading_day: String,

    #[serde(rename = "08. previous close", default)]
    pub previous_close: String,

    #[serde(rename = "09. change", default)]
    pub change: String,

    #[serde(rename = "10. change percent", default)]
    pub change_percent: String,
}

impl StockQuote {
    /// Last traded price, `None` unless it parses to a positive number.
    pub fn market_price(&self) -> Option<f64> {
        self.price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn volume(&self) -> Option<i64> {
        self.volume.trim().parse().ok()
    }
}
