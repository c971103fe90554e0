// =============================================================================
// Alpha Vantage REST Client
// =============================================================================
//
// Every document is a GET on `/query?function=<FUNCTION>&symbol=<SYMBOL>`.
// Alpha Vantage reports most problems (bad symbol, throttling, premium-only
// endpoints) with HTTP 200 and a JSON body holding one of:
//   "Error Message", "Note", "Information"
// Those payloads are treated as failed fetches, never parsed as documents.
//
// SECURITY: the API key travels in the query string. It is never logged, the
// Debug impl redacts it, and transport errors have their URL removed.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::fundamentals::{CompanyOverview, StatementDocument, StockQuote};
use crate::pipeline::MarketDataSource;
use crate::runtime_config::AlphaVantageConfig;
use crate::types::PriceSeries;

/// Keys Alpha Vantage uses for in-band errors on HTTP 200.
const ERROR_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

const GLOBAL_QUOTE_KEY: &str = "Global Quote";
const DAILY_SERIES_KEY: &str = "Time Series (Daily)";
const CLOSE_KEY: &str = "4. close";

/// Alpha Vantage client implementing [`MarketDataSource`].
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(api_key: impl Into<String>, config: &AlphaVantageConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("Alpha Vantage API key is empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        debug!(
            base_url = %base_url,
            timeout_secs = config.timeout_secs,
            "AlphaVantageClient initialised"
        );

        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// Build the GET for `function`. Every parameter goes through reqwest's
    /// query encoder, so a symbol cannot smuggle in extra parameters.
    fn request(
        &self,
        function: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        let mut params = vec![("function", function), ("symbol", symbol)];
        params.extend_from_slice(extra);
        params.push(("apikey", self.api_key.as_str()));

        self.client
            .get(format!("{}/query", self.base_url))
            .query(&params)
    }

    /// GET `function` for `symbol` and return the checked JSON body.
    ///
    /// reqwest errors carry the request URL, key included, so it is stripped
    /// before the error leaves this client.
    async fn query(
        &self,
        function: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let resp = self
            .request(function, symbol, extra)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {function} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("failed to parse {function} response"))?;

        if !status.is_success() {
            anyhow::bail!("Alpha Vantage {} returned {}: {}", function, status, body);
        }

        check_payload(function, &body)?;
        Ok(body)
    }

    async fn statement(&self, function: &str, symbol: &str) -> Result<StatementDocument> {
        let body = self.query(function, symbol, &[]).await?;
        let doc = parse_statement(function, body)?;
        debug!(
            function,
            symbol,
            reports = doc.annual_reports.len(),
            "statement fetched"
        );
        Ok(doc)
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    #[instrument(skip(self), name = "alpha_vantage::cash_flow")]
    async fn cash_flow(&self, symbol: &str) -> Result<StatementDocument> {
        self.statement("CASH_FLOW", symbol).await
    }

    #[instrument(skip(self), name = "alpha_vantage::income_statement")]
    async fn income_statement(&self, symbol: &str) -> Result<StatementDocument> {
        self.statement("INCOME_STATEMENT", symbol).await
    }

    #[instrument(skip(self), name = "alpha_vantage::balance_sheet")]
    async fn balance_sheet(&self, symbol: &str) -> Result<StatementDocument> {
        self.statement("BALANCE_SHEET", symbol).await
    }

    #[instrument(skip(self), name = "alpha_vantage::company_overview")]
    async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        let body = self.query("OVERVIEW", symbol, &[]).await?;
        let overview = parse_overview(body)?;
        debug!(symbol, shares_outstanding = ?overview.shares_outstanding, "overview fetched");
        Ok(overview)
    }

    #[instrument(skip(self), name = "alpha_vantage::quote")]
    async fn quote(&self, symbol: &str) -> Result<StockQuote> {
        let body = self.query("GLOBAL_QUOTE", symbol, &[]).await?;
        let quote = parse_quote(&body)?;
        debug!(
            symbol,
            price = %quote.price,
            latest_trading_day = %quote.latest_trading_day,
            "quote fetched"
        );
        Ok(quote)
    }

    #[instrument(skip(self), name = "alpha_vantage::price_history")]
    async fn price_history(&self, symbol: &str) -> Result<PriceSeries> {
        let body = self
            .query("TIME_SERIES_DAILY", symbol, &[("outputsize", "full")])
            .await?;
        let series = parse_daily_closes(&body)?;
        debug!(symbol, closes = series.len(), "daily closes fetched");
        Ok(series)
    }
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Payload parsing
// -----------------------------------------------------------------------------

/// Reject in-band error payloads and empty objects.
fn check_payload(function: &str, body: &serde_json::Value) -> Result<()> {
    for key in ERROR_KEYS {
        if let Some(msg) = body.get(key) {
            let msg = msg
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| msg.to_string());
            anyhow::bail!("Alpha Vantage {function} rejected request ({key}): {msg}");
        }
    }
    if body.as_object().is_some_and(|o| o.is_empty()) {
        anyhow::bail!("Alpha Vantage {function} returned an empty document");
    }
    Ok(())
}

fn parse_statement(function: &str, body: serde_json::Value) -> Result<StatementDocument> {
    serde_json::from_value(body).with_context(|| format!("malformed {function} document"))
}

fn parse_overview(body: serde_json::Value) -> Result<CompanyOverview> {
    serde_json::from_value(body).context("malformed OVERVIEW document")
}

/// The quote object of a GLOBAL_QUOTE body. Unknown symbols come back as an
/// empty quote object.
fn parse_quote(body: &serde_json::Value) -> Result<StockQuote> {
    let quote = body
        .get(GLOBAL_QUOTE_KEY)
        .with_context(|| format!("GLOBAL_QUOTE response missing '{GLOBAL_QUOTE_KEY}'"))?;
    if quote.as_object().is_some_and(|o| o.is_empty()) {
        anyhow::bail!("GLOBAL_QUOTE returned no quote");
    }
    serde_json::from_value(quote.clone()).context("malformed GLOBAL_QUOTE document")
}

/// Daily closes from a TIME_SERIES_DAILY body, oldest first.
fn parse_daily_closes(body: &serde_json::Value) -> Result<PriceSeries> {
    let days = body[DAILY_SERIES_KEY]
        .as_object()
        .with_context(|| format!("TIME_SERIES_DAILY response missing '{DAILY_SERIES_KEY}'"))?;

    let mut dated: Vec<(&str, f64)> = days
        .iter()
        .map(|(date, bar)| {
            let raw = bar[CLOSE_KEY]
                .as_str()
                .with_context(|| format!("bar {date} missing '{CLOSE_KEY}'"))?;
            let close: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("bar {date} close '{raw}' is not numeric"))?;
            Ok((date.as_str(), close))
        })
        .collect::<Result<_>>()?;

    // ISO dates sort chronologically as strings.
    dated.sort_unstable_by(|a, b| a.0.cmp(b.0));

    Ok(PriceSeries::new(dated.into_iter().map(|(_, c)| c).collect()))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn in_band_errors_are_rejected() {
        let throttled = json!({
            "Note": "Our standard API call frequency is 5 calls per minute"
        });
        let err = check_payload("CASH_FLOW", &throttled).unwrap_err();
        assert!(err.to_string().contains("CASH_FLOW"));
        assert!(err.to_string().contains("call frequency"));

        let bad_symbol = json!({ "Error Message": "Invalid API call." });
        assert!(check_payload("OVERVIEW", &bad_symbol).is_err());

        let premium = json!({ "Information": "premium endpoint" });
        assert!(check_payload("TIME_SERIES_DAILY", &premium).is_err());

        assert!(check_payload("OVERVIEW", &json!({})).is_err());
    }

    #[test]
    fn statement_payload_passes_and_parses() {
        let body = json!({
            "symbol": "IBM",
            "annualReports": [
                { "fiscalDateEnding": "2023-12-31", "netIncome": "7502000000" }
            ]
        });
        check_payload("INCOME_STATEMENT", &body).unwrap();
        let doc = parse_statement("INCOME_STATEMENT", body).unwrap();
        assert_eq!(doc.latest().unwrap().get("netIncome"), Some("7502000000"));
    }

    #[test]
    fn overview_reads_shares_outstanding() {
        let body = json!({
            "Symbol": "IBM",
            "Name": "International Business Machines",
            "MarketCapitalization": "170000000000",
            "SharesOutstanding": "916000000",
            "Sector": "TECHNOLOGY"
        });
        let overview = parse_overview(body).unwrap();
        assert_eq!(overview.symbol, "IBM");
        assert_eq!(overview.shares_outstanding.as_deref(), Some("916000000"));
    }

    #[test]
    fn daily_closes_are_sorted_oldest_first() {
        let body = json!({
            "Meta Data": { "2. Symbol": "IBM" },
            "Time Series (Daily)": {
                "2024-01-03": { "1. open": "160.0", "4. close": "161.5" },
                "2024-01-02": { "1. open": "158.0", "4. close": "159.0" },
                "2024-01-04": { "1. open": "161.0", "4. close": "163.25" }
            }
        });
        let series = parse_daily_closes(&body).unwrap();
        assert_eq!(series.closes(), &[159.0, 161.5, 163.25]);
    }

    #[test]
    fn daily_closes_reject_bad_bars() {
        let missing = json!({ "Time Series (Daily)": { "2024-01-02": { "1. open": "1" } } });
        assert!(parse_daily_closes(&missing).is_err());

        let garbage = json!({ "Time Series (Daily)": { "2024-01-02": { "4. close": "n/a" } } });
        assert!(parse_daily_closes(&garbage).is_err());

        assert!(parse_daily_closes(&json!({ "Meta Data": {} })).is_err());
    }

    #[test]
    fn quote_is_unwrapped_from_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "05. price": "185.92",
                "07. latest trading day": "2024-03-01"
            }
        });
        let quote = parse_quote(&body).unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.market_price(), Some(185.92));

        assert!(parse_quote(&json!({ "Global Quote": {} })).is_err());
        assert!(parse_quote(&json!({ "Meta Data": {} })).is_err());
    }

    fn client_at(base_url: &str, key: &str) -> AlphaVantageClient {
        let config = AlphaVantageConfig {
            base_url: base_url.to_string(),
            timeout_secs: 2,
        };
        AlphaVantageClient::new(key, &config).unwrap()
    }

    #[test]
    fn query_parameters_are_encoded() {
        let client = client_at("https://www.alphavantage.co/", "KEY123");
        let req = client
            .request("TIME_SERIES_DAILY", "IBM&apikey=x y", &[("outputsize", "full")])
            .build()
            .unwrap();

        assert_eq!(req.url().path(), "/query");
        let pairs: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        let get = |name: &str| -> Vec<&str> {
            pairs
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .collect()
        };
        assert_eq!(get("function"), vec!["TIME_SERIES_DAILY"]);
        assert_eq!(get("symbol"), vec!["IBM&apikey=x y"]);
        assert_eq!(get("outputsize"), vec!["full"]);
        assert_eq!(get("apikey"), vec!["KEY123"]);
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_key() {
        let client = client_at("http://127.0.0.1:1", "SUPERSECRETKEY");

        let err = client.cash_flow("IBM").await.unwrap_err();
        let wrapped = crate::error::ValuationError::fetch(
            "IBM",
            crate::fundamentals::Document::CashFlow,
            &err,
        );
        let rendered = wrapped.to_string();
        assert!(rendered.contains("GET CASH_FLOW request failed"));
        assert!(!rendered.contains("SUPERSECRETKEY"), "{rendered}");
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn failed_valuation_state_does_not_carry_the_key() {
        use crate::pipeline::{PipelineState, ValuationPipeline};
        use crate::runtime_config::RuntimeConfig;
        use std::sync::Arc;

        let client = client_at("http://127.0.0.1:1", "SUPERSECRETKEY");
        let pipeline =
            ValuationPipeline::new(Arc::new(client), &RuntimeConfig::default()).unwrap();

        assert!(pipeline.request_valuation("IBM").await.is_err());
        match pipeline.state() {
            PipelineState::Error(msg) => assert!(!msg.contains("SUPERSECRETKEY"), "{msg}"),
            other => panic!("unexpected state: {other}"),
        }
    }

    #[test]
    fn construction_rejects_empty_key_and_debug_redacts() {
        assert!(AlphaVantageClient::new("  ", &AlphaVantageConfig::default()).is_err());

        let client = AlphaVantageClient::new("secret-key", &AlphaVantageConfig::default()).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
