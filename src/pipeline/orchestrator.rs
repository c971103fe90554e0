// =============================================================================
// Valuation Pipeline: fetch, join, value, publish
// =============================================================================
//
// One request = three concurrent statement fetches joined with
// `tokio::try_join!`. The join fails as soon as any fetch fails; the other
// in-flight fetches are dropped, not awaited. Only after all three documents
// arrive are the figures parsed and the DCF model run.
//
// Shared state:
//   - `state`    tokio watch channel; callers subscribe, only the pipeline
//                writes.
//   - `overview` company overview obtained earlier, source of shares
//                outstanding.
//   - `quote`    latest stock quote obtained earlier, source of the market
//                price shown beside the per-share value.
//   - `latest`   the most recent successful report.
//
// Concurrent requests are not deduplicated. Each runs its own join and the
// last one to finish decides the published state.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::collaborators::{MarketDataSource, PricePredictor};
use super::state::{PipelineState, ValuationReport};
use crate::error::{Result, ValuationError};
use crate::features::FeatureVector;
use crate::fundamentals::{
    CompanyOverview, Document, FinancialStatementSet, StatementFigures, StockQuote,
};
use crate::indicators::{IndicatorConfig, IndicatorSet};
use crate::runtime_config::RuntimeConfig;
use crate::types::PriceSeries;
use crate::valuation::{with_share_price, DcfModel};

/// Drives valuation requests for one caller.
pub struct ValuationPipeline {
    source: Arc<dyn MarketDataSource>,
    predictor: Option<Arc<dyn PricePredictor>>,
    model: DcfModel,
    indicator_config: IndicatorConfig,
    min_history: usize,
    state: watch::Sender<PipelineState>,
    overview: RwLock<Option<CompanyOverview>>,
    quote: RwLock<Option<StockQuote>>,
    latest: RwLock<Option<ValuationReport>>,
}

impl ValuationPipeline {
    /// Build a pipeline over `source`.
    ///
    /// Fails with a configuration error when the DCF assumptions are invalid.
    pub fn new(source: Arc<dyn MarketDataSource>, config: &RuntimeConfig) -> Result<Self> {
        let model = DcfModel::new(config.dcf.clone())?;
        let (state, _) = watch::channel(PipelineState::Idle);

        Ok(Self {
            source,
            predictor: None,
            model,
            indicator_config: config.indicators.clone(),
            min_history: config.prediction.min_history,
            state,
            overview: RwLock::new(None),
            quote: RwLock::new(None),
            latest: RwLock::new(None),
        })
    }

    /// Attach the price predictor used by [`Self::predict_share_price`].
    pub fn with_predictor(mut self, predictor: Arc<dyn PricePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Receiver that sees every state the pipeline publishes from now on.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn latest_report(&self) -> Option<ValuationReport> {
        self.latest.read().clone()
    }

    pub fn company_overview(&self) -> Option<CompanyOverview> {
        self.overview.read().clone()
    }

    pub fn stock_quote(&self) -> Option<StockQuote> {
        self.quote.read().clone()
    }

    // ── Company overview ────────────────────────────────────────────────

    /// Fetch and remember the company overview for `symbol`. The next
    /// valuation of the same symbol takes its share count from here.
    pub async fn load_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        let symbol = normalise_symbol(symbol)?;
        let overview = self
            .source
            .company_overview(&symbol)
            .await
            .map_err(|e| ValuationError::fetch(&symbol, Document::CompanyOverview, &e))?;

        debug!(
            symbol = %symbol,
            shares_outstanding = ?overview.shares_outstanding,
            "company overview loaded"
        );
        self.set_company_overview(overview.clone());
        Ok(overview)
    }

    /// Supply an overview obtained elsewhere.
    pub fn set_company_overview(&self, overview: CompanyOverview) {
        *self.overview.write() = Some(overview);
    }

    /// Fetch and remember the latest quote for `symbol`.
    pub async fn load_quote(&self, symbol: &str) -> Result<StockQuote> {
        let symbol = normalise_symbol(symbol)?;
        let quote = self
            .source
            .quote(&symbol)
            .await
            .map_err(|e| ValuationError::fetch(&symbol, Document::Quote, &e))?;

        debug!(symbol = %symbol, price = ?quote.market_price(), "stock quote loaded");
        self.set_stock_quote(quote.clone());
        Ok(quote)
    }

    pub fn set_stock_quote(&self, quote: StockQuote) {
        *self.quote.write() = Some(quote);
    }

    /// Fetch the quote and the company overview together. Both are stored
    /// only when both arrive.
    pub async fn load_market_data(&self, symbol: &str) -> Result<(StockQuote, CompanyOverview)> {
        let symbol = normalise_symbol(symbol)?;

        let quote = async {
            self.source
                .quote(&symbol)
                .await
                .map_err(|e| ValuationError::fetch(&symbol, Document::Quote, &e))
        };
        let overview = async {
            self.source
                .company_overview(&symbol)
                .await
                .map_err(|e| ValuationError::fetch(&symbol, Document::CompanyOverview, &e))
        };
        let (quote, overview) = tokio::try_join!(quote, overview)?;

        info!(
            symbol = %symbol,
            price = ?quote.market_price(),
            shares_outstanding = ?overview.shares_outstanding,
            "market data loaded"
        );
        self.set_stock_quote(quote.clone());
        self.set_company_overview(overview.clone());
        Ok((quote, overview))
    }

    // ── Valuation ───────────────────────────────────────────────────────

    /// Value `symbol` from its latest annual statements.
    ///
    /// Publishes `Loading`, then `Loaded` with the report or `Error` with the
    /// failure. An empty symbol is rejected before the data source is
    /// contacted. A missing or invalid share count does not fail the
    /// request; the report carries the reason instead of a per-share price.
    pub async fn request_valuation(&self, symbol: &str) -> Result<ValuationReport> {
        let symbol = match normalise_symbol(symbol) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "valuation request rejected");
                self.publish(PipelineState::Error(e.to_string()));
                return Err(e);
            }
        };

        let request_id = Uuid::new_v4().to_string();
        self.publish(PipelineState::Loading);
        info!(request_id = %request_id, symbol = %symbol, "valuation requested");

        let outcome = match self.fetch_statements(&symbol).await {
            Ok(statements) => self.value_statements(&request_id, &symbol, &statements),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(report) => {
                info!(
                    request_id = %request_id,
                    symbol = %symbol,
                    value = report.result.value,
                    per_share_price = ?report.result.per_share_price,
                    market_price = ?report.market_price,
                    "valuation complete"
                );
                *self.latest.write() = Some(report.clone());
                self.publish(PipelineState::Loaded);
                Ok(report)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    symbol = %symbol,
                    kind = %e.kind(),
                    error = %e,
                    "valuation failed"
                );
                self.publish(PipelineState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Fan out the three statement fetches and join them.
    async fn fetch_statements(&self, symbol: &str) -> Result<FinancialStatementSet> {
        let tagged =
            |document: Document| move |e: anyhow::Error| ValuationError::fetch(symbol, document, &e);

        let cash_flow = async {
            self.source
                .cash_flow(symbol)
                .await
                .map_err(tagged(Document::CashFlow))
        };
        let income = async {
            self.source
                .income_statement(symbol)
                .await
                .map_err(tagged(Document::IncomeStatement))
        };
        let balance_sheet = async {
            self.source
                .balance_sheet(symbol)
                .await
                .map_err(tagged(Document::BalanceSheet))
        };

        let (cash_flow, income, balance_sheet) =
            tokio::try_join!(cash_flow, income, balance_sheet)?;

        Ok(FinancialStatementSet {
            cash_flow,
            income,
            balance_sheet,
        })
    }

    /// Parse, value and attach the per-share price. Runs only after a
    /// successful join.
    fn value_statements(
        &self,
        request_id: &str,
        symbol: &str,
        statements: &FinancialStatementSet,
    ) -> Result<ValuationReport> {
        let figures = StatementFigures::extract(statements)?;
        let dcf = self.model.value(&figures.dcf_inputs());

        let shares = self
            .overview
            .read()
            .as_ref()
            .filter(|o| o.symbol.eq_ignore_ascii_case(symbol))
            .and_then(|o| o.shares_outstanding.clone());

        let market_price = self
            .quote
            .read()
            .as_ref()
            .filter(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .and_then(StockQuote::market_price);

        let (result, share_price_error) = with_share_price(dcf.value, shares.as_deref());
        if let Some(e) = &share_price_error {
            warn!(request_id, symbol, error = %e, "per-share price unavailable");
        }

        Ok(ValuationReport {
            request_id: request_id.to_string(),
            symbol: symbol.to_string(),
            fiscal_date_ending: statements
                .cash_flow
                .latest()
                .and_then(|r| r.fiscal_date_ending())
                .map(str::to_string),
            figures,
            dcf,
            result,
            market_price,
            share_price_error,
            completed_at: Utc::now().to_rfc3339(),
        })
    }

    // ── Indicators & prediction ─────────────────────────────────────────

    /// Fetch daily closes for `symbol`.
    pub async fn price_history(&self, symbol: &str) -> Result<PriceSeries> {
        let symbol = normalise_symbol(symbol)?;
        self.source
            .price_history(&symbol)
            .await
            .map_err(|e| ValuationError::fetch(&symbol, Document::PriceHistory, &e))
    }

    /// Fetch history and compute every configured indicator.
    pub async fn indicators(&self, symbol: &str) -> Result<IndicatorSet> {
        let series = self.price_history(symbol).await?;
        Ok(IndicatorSet::compute(&series, &self.indicator_config))
    }

    /// Predicted next close for `symbol` from the attached predictor.
    ///
    /// Needs at least `prediction.min_history` closes. Does not touch the
    /// valuation state.
    pub async fn predict_share_price(&self, symbol: &str) -> Result<f64> {
        let predictor = self
            .predictor
            .as_ref()
            .ok_or_else(|| ValuationError::Prediction("no predictor configured".to_string()))?;

        let symbol = normalise_symbol(symbol)?;
        let series = self.price_history(&symbol).await?;
        if series.len() < self.min_history {
            return Err(ValuationError::InsufficientHistory {
                required: self.min_history,
                actual: series.len(),
            });
        }

        let features = FeatureVector::assemble(&symbol, &series, &self.indicator_config, None)?;
        let predicted = predictor
            .predict(&features)
            .map_err(|e| ValuationError::Prediction(format!("{}: {e:#}", predictor.name())))?;

        info!(
            symbol = %symbol,
            model = predictor.name(),
            last_close = features.prev_close_1,
            predicted,
            "share price predicted"
        );
        Ok(predicted)
    }

    fn publish(&self, next: PipelineState) {
        let prev = self.state.send_replace(next.clone());
        debug!(from = %prev, to = %next, "pipeline state");
    }
}

fn normalise_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(ValuationError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol.to_uppercase())
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fundamentals::{AnnualReport, StatementDocument};
    use crate::valuation::compute_dcf;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        Fail,
        Pending,
    }

    struct FakeSource {
        cash_flow: Outcome,
        income: Outcome,
        balance_sheet: Outcome,
        shares: Option<&'static str>,
        quote_price: Option<&'static str>,
        closes: Vec<f64>,
        /// When set, statement fetches wait for a permit before resolving.
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn healthy() -> Self {
            Self {
                cash_flow: Outcome::Ok,
                income: Outcome::Ok,
                balance_sheet: Outcome::Ok,
                shares: Some("10"),
                quote_price: Some("185.50"),
                closes: (1..=250).map(|i| 100.0 + f64::from(i) * 0.5).collect(),
                gate: None,
                calls: AtomicUsize::new(0),
            }
        }

        async fn resolve(
            &self,
            outcome: Outcome,
            doc: StatementDocument,
        ) -> anyhow::Result<StatementDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await?;
            }
            match outcome {
                Outcome::Ok => Ok(doc),
                Outcome::Fail => anyhow::bail!("HTTP 503"),
                Outcome::Pending => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn cash_flow(&self, symbol: &str) -> anyhow::Result<StatementDocument> {
            let report = AnnualReport::new()
                .with("fiscalDateEnding", "2023-12-31")
                .with("operatingCashflow", "150")
                .with("capitalExpenditures", "50");
            self.resolve(self.cash_flow, StatementDocument::new(symbol, vec![report]))
                .await
        }

        async fn income_statement(&self, symbol: &str) -> anyhow::Result<StatementDocument> {
            let report = AnnualReport::new().with("netIncome", "80");
            self.resolve(self.income, StatementDocument::new(symbol, vec![report]))
                .await
        }

        async fn balance_sheet(&self, symbol: &str) -> anyhow::Result<StatementDocument> {
            let report = AnnualReport::new()
                .with("longTermDebt", "50")
                .with("cashAndCashEquivalentsAtCarryingValue", "20");
            self.resolve(self.balance_sheet, StatementDocument::new(symbol, vec![report]))
                .await
        }

        async fn company_overview(&self, symbol: &str) -> anyhow::Result<CompanyOverview> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyOverview {
                symbol: symbol.to_string(),
                name: "Test Corp".to_string(),
                market_capitalization: None,
                shares_outstanding: self.shares.map(str::to_string),
            })
        }

        async fn quote(&self, symbol: &str) -> anyhow::Result<StockQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.quote_price {
                Some(price) => Ok(StockQuote {
                    symbol: symbol.to_string(),
                    price: price.to_string(),
                    ..StockQuote::default()
                }),
                None => anyhow::bail!("quote unavailable"),
            }
        }

        async fn price_history(&self, _symbol: &str) -> anyhow::Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PriceSeries::new(self.closes.clone()))
        }
    }

    struct FixedPredictor(anyhow::Result<f64>);

    impl PricePredictor for FixedPredictor {
        fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64> {
            assert_eq!(features.symbol, "IBM");
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(e) => anyhow::bail!("{e}"),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn pipeline(source: FakeSource) -> (Arc<FakeSource>, ValuationPipeline) {
        let source = Arc::new(source);
        let pipeline = ValuationPipeline::new(source.clone(), &RuntimeConfig::default()).unwrap();
        (source, pipeline)
    }

    #[tokio::test]
    async fn starts_idle() {
        let (_, p) = pipeline(FakeSource::healthy());
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.latest_report().is_none());
    }

    #[tokio::test]
    async fn values_symbol_end_to_end() {
        let (_, p) = pipeline(FakeSource::healthy());
        p.load_overview("ibm").await.unwrap();

        let report = p.request_valuation("ibm").await.unwrap();
        let expected = compute_dcf(100.0, 80.0, 50.0, 20.0).unwrap();

        assert_eq!(report.symbol, "IBM");
        assert_eq!(report.fiscal_date_ending.as_deref(), Some("2023-12-31"));
        assert!((report.figures.free_cash_flow() - 100.0).abs() < 1e-9);
        assert!((report.dcf.net_debt - 30.0).abs() < 1e-9);
        assert!((report.result.value - expected).abs() < 1e-6);
        let price = report.result.per_share_price.unwrap();
        assert!((price - expected / 10.0).abs() < 1e-6);
        assert!(report.share_price_error.is_none());

        assert_eq!(p.state(), PipelineState::Loaded);
        assert_eq!(p.latest_report(), Some(report));
    }

    #[tokio::test]
    async fn missing_shares_still_loads_without_price() {
        let mut source = FakeSource::healthy();
        source.shares = Some("None");
        let (_, p) = pipeline(source);
        p.load_overview("IBM").await.unwrap();

        let report = p.request_valuation("IBM").await.unwrap();
        assert!(report.result.per_share_price.is_none());
        assert_eq!(report.share_price_error.unwrap().kind(), ErrorKind::Data);
        assert_eq!(p.state(), PipelineState::Loaded);
    }

    #[tokio::test]
    async fn overview_for_other_symbol_is_ignored() {
        let (_, p) = pipeline(FakeSource::healthy());
        p.load_overview("MSFT").await.unwrap();

        let report = p.request_valuation("IBM").await.unwrap();
        assert!(report.result.per_share_price.is_none());
        assert!(report.share_price_error.is_some());
    }

    #[tokio::test]
    async fn empty_symbol_never_reaches_source() {
        let (source, p) = pipeline(FakeSource::healthy());

        let err = p.request_valuation("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(p.state(), PipelineState::Error(_)));
    }

    #[tokio::test]
    async fn one_failed_fetch_fails_the_request() {
        let mut source = FakeSource::healthy();
        source.income = Outcome::Fail;
        let (_, p) = pipeline(source);

        let err = p.request_valuation("IBM").await.unwrap_err();
        match &err {
            ValuationError::Fetch { document, message, .. } => {
                assert_eq!(*document, Document::IncomeStatement);
                assert!(message.contains("HTTP 503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(p.state(), PipelineState::Error(err.to_string()));
        assert!(p.latest_report().is_none());
    }

    #[tokio::test]
    async fn failure_is_not_blocked_by_pending_fetch() {
        let mut source = FakeSource::healthy();
        source.cash_flow = Outcome::Pending;
        source.balance_sheet = Outcome::Fail;
        let (_, p) = pipeline(source);

        let outcome = tokio::time::timeout(Duration::from_secs(1), p.request_valuation("IBM"))
            .await
            .expect("join must short-circuit on failure");
        let err = outcome.unwrap_err();
        assert!(matches!(
            err,
            ValuationError::Fetch {
                document: Document::BalanceSheet,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failed_request_keeps_previous_report() {
        let (_, p) = pipeline(FakeSource::healthy());
        let first = p.request_valuation("IBM").await.unwrap();

        let err = p.request_valuation("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(p.latest_report(), Some(first));
    }

    #[tokio::test]
    async fn subscribers_observe_loading_then_loaded() {
        let gate = Arc::new(Semaphore::new(0));
        let mut source = FakeSource::healthy();
        source.gate = Some(gate.clone());
        let (_, p) = pipeline(source);
        let p = Arc::new(p);
        let mut rx = p.subscribe();

        let request = tokio::spawn({
            let p = p.clone();
            async move { p.request_valuation("IBM").await }
        });

        let saw_loading = rx.wait_for(|s| *s == PipelineState::Loading).await.is_ok();
        assert!(saw_loading);
        assert_eq!(p.state(), PipelineState::Loading);
        assert!(p.latest_report().is_none());

        gate.add_permits(1);
        request.await.unwrap().unwrap();

        let saw_loaded = rx.wait_for(|s| *s == PipelineState::Loaded).await.is_ok();
        assert!(saw_loaded);
        assert!(p.latest_report().is_some());
    }

    #[tokio::test]
    async fn market_data_supplies_price_beside_valuation() {
        let (_, p) = pipeline(FakeSource::healthy());
        let (quote, overview) = p.load_market_data("ibm").await.unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(overview.shares_outstanding.as_deref(), Some("10"));

        let report = p.request_valuation("IBM").await.unwrap();
        assert_eq!(report.market_price, Some(185.5));
        assert!(report.result.per_share_price.is_some());
    }

    #[tokio::test]
    async fn quote_for_other_symbol_is_ignored() {
        let (_, p) = pipeline(FakeSource::healthy());
        p.load_quote("MSFT").await.unwrap();

        let report = p.request_valuation("IBM").await.unwrap();
        assert_eq!(report.market_price, None);
    }

    #[tokio::test]
    async fn failed_quote_stores_nothing() {
        let mut source = FakeSource::healthy();
        source.quote_price = None;
        let (_, p) = pipeline(source);

        let err = p.load_market_data("IBM").await.unwrap_err();
        assert!(matches!(
            err,
            ValuationError::Fetch {
                document: Document::Quote,
                ..
            }
        ));
        assert!(p.stock_quote().is_none());
        assert!(p.company_overview().is_none());
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn predicts_with_attached_predictor() {
        let (_, p) = pipeline(FakeSource::healthy());
        let p = p.with_predictor(Arc::new(FixedPredictor(Ok(123.5))));

        let predicted = p.predict_share_price("ibm").await.unwrap();
        assert!((predicted - 123.5).abs() < f64::EPSILON);
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn predictor_failure_is_reported() {
        let (_, p) = pipeline(FakeSource::healthy());
        let failing = FixedPredictor(Err(anyhow::anyhow!("model offline")));
        let p = p.with_predictor(Arc::new(failing));

        let err = p.predict_share_price("IBM").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Prediction);
        assert!(err.to_string().contains("model offline"));
    }

    #[tokio::test]
    async fn prediction_needs_enough_history() {
        let mut source = FakeSource::healthy();
        source.closes.truncate(150);
        let (_, p) = pipeline(source);
        let p = p.with_predictor(Arc::new(FixedPredictor(Ok(1.0))));

        let err = p.predict_share_price("IBM").await.unwrap_err();
        assert_eq!(
            err,
            ValuationError::InsufficientHistory {
                required: 200,
                actual: 150
            }
        );
    }

    #[tokio::test]
    async fn prediction_without_predictor_fails() {
        let (_, p) = pipeline(FakeSource::healthy());
        let err = p.predict_share_price("IBM").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Prediction);
    }

    #[tokio::test]
    async fn indicators_cover_fetched_history() {
        let (_, p) = pipeline(FakeSource::healthy());
        let set = p.indicators("IBM").await.unwrap();
        assert_eq!(set.sma[2].input_len(), 250);
        assert_eq!(set.sma[2].len(), 51);
        assert!(set.rsi.last().is_some());
    }
}
