// =============================================================================
// Valuation Engine: command-line entry point
// =============================================================================
//
// Usage: valuation-engine <SYMBOL>
//
// Values one company from its latest Alpha Vantage statements and logs the
// current indicator readings for its daily closes. The API key comes from
// ALPHAVANTAGE_API_KEY; VALUATION_CONFIG optionally points at a JSON config.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use valuation_engine::alpha_vantage::AlphaVantageClient;
use valuation_engine::indicators::{current_rsi, IndicatorSet};
use valuation_engine::{RuntimeConfig, ValuationPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("VALUATION_CONFIG").unwrap_or_else(|_| "valuation_config.json".into());
    let config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    let symbol = std::env::args()
        .nth(1)
        .context("usage: valuation-engine <SYMBOL>")?;

    // ── 2. Data source & pipeline ────────────────────────────────────────
    let api_key =
        std::env::var("ALPHAVANTAGE_API_KEY").context("ALPHAVANTAGE_API_KEY is not set")?;
    let client = AlphaVantageClient::new(api_key, &config.alpha_vantage)?;
    let pipeline = ValuationPipeline::new(Arc::new(client), &config)?;

    // ── 3. Valuation ─────────────────────────────────────────────────────
    if let Err(e) = pipeline.load_market_data(&symbol).await {
        warn!(error = %e, "Market data unavailable, falling back to overview only");
        if let Err(e) = pipeline.load_overview(&symbol).await {
            warn!(error = %e, "Company overview unavailable, per-share price will be missing");
        }
    }

    let report = pipeline.request_valuation(&symbol).await?;
    info!(
        symbol = %report.symbol,
        fiscal_date_ending = ?report.fiscal_date_ending,
        free_cash_flow = report.figures.free_cash_flow(),
        pv_high_growth = report.dcf.present_values.high_growth,
        pv_transition = report.dcf.present_values.transition,
        pv_terminal = report.dcf.present_values.terminal,
        net_debt = report.dcf.net_debt,
        value = report.result.value,
        per_share_price = ?report.result.per_share_price,
        market_price = ?report.market_price,
        "Valuation"
    );

    // ── 4. Indicators ────────────────────────────────────────────────────
    match pipeline.price_history(&symbol).await {
        Ok(series) => {
            let set = IndicatorSet::compute(&series, &config.indicators);
            let rsi = current_rsi(
                series.closes(),
                config.indicators.rsi_period,
                config.indicators.rsi_saturation,
            );
            let bands = set.bollinger.latest();
            info!(
                symbol = %report.symbol,
                closes = series.len(),
                sma = ?set.sma.iter().map(|s| s.last()).collect::<Vec<_>>(),
                macd = ?set.macd.last(),
                rsi = ?rsi.map(|(v, _)| v),
                rsi_signal = rsi.map(|(_, s)| s).unwrap_or("n/a"),
                bollinger_upper = ?bands.as_ref().map(|b| b.upper),
                bollinger_lower = ?bands.as_ref().map(|b| b.lower),
                "Indicators"
            );
        }
        Err(e) => warn!(error = %e, "Price history unavailable, skipping indicators"),
    }

    Ok(())
}
