// =============================================================================
// Pipeline Collaborators
// =============================================================================
//
// The pipeline never talks to a network or a model file directly. It is
// handed a data source and, optionally, a predictor at construction time, so
// tests (and alternative providers) can substitute their own.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::features::FeatureVector;
use crate::fundamentals::{CompanyOverview, StatementDocument, StockQuote};
use crate::types::PriceSeries;

/// Source of decoded financial documents and price history.
///
/// Failures are opaque to the pipeline; it tags them with the document that
/// was being fetched and reports them unchanged. Retries and timeouts are the
/// implementation's business.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn cash_flow(&self, symbol: &str) -> Result<StatementDocument>;

    async fn income_statement(&self, symbol: &str) -> Result<StatementDocument>;

    async fn balance_sheet(&self, symbol: &str) -> Result<StatementDocument>;

    async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview>;

    /// Latest trading-day quote.
    async fn quote(&self, symbol: &str) -> Result<StockQuote>;

    /// Daily closes, oldest first.
    async fn price_history(&self, symbol: &str) -> Result<PriceSeries>;
}

/// Black-box price model fed with a [`FeatureVector`].
pub trait PricePredictor: Send + Sync {
    /// Predicted next close.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Model name for logs.
    fn name(&self) -> &str;
}
