// =============================================================================
// Multi-Stage Discounted Cash Flow Model
// =============================================================================
//
// Free cash flow is projected through three regimes and discounted to today:
//
//   1. High growth: compound the base FCF for `high_growth_years` at a
//      fixed rate.
//   2. Transition: compound from the last high-growth FCF while the rate
//      steps linearly from `transition_start_rate` down to
//      `perpetual_growth_rate`.
//   3. Terminal: Gordon growth on the last transition FCF:
//          TV = FCF_n * (1 + g) / (r - g)
//
// Explicit flows are discounted by (1 + r)^year with `year` 1-based and
// continuing across both stages; the terminal value is discounted over the
// whole horizon. Net debt (long-term debt - cash) is subtracted last.
//
// `r <= g` makes the terminal value meaningless and is rejected up front.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ValuationError};

/// Upper bound on `high_growth_years + transition_years`.
pub const MAX_HORIZON_YEARS: u32 = 200;

fn default_high_growth_rate() -> f64 {
    0.15
}

fn default_transition_start_rate() -> f64 {
    0.10
}

fn default_perpetual_growth_rate() -> f64 {
    0.02
}

fn default_discount_rate() -> f64 {
    0.10
}

fn default_stage_years() -> u32 {
    5
}

/// Growth and discount assumptions for the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfConfig {
    #[serde(default = "default_high_growth_rate")]
    pub high_growth_rate: f64,

    /// Growth rate in the first transition year.
    #[serde(default = "default_transition_start_rate")]
    pub transition_start_rate: f64,

    /// Long-run growth rate; also where the transition stage ends.
    #[serde(default = "default_perpetual_growth_rate")]
    pub perpetual_growth_rate: f64,

    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,

    #[serde(default = "default_stage_years")]
    pub high_growth_years: u32,

    #[serde(default = "default_stage_years")]
    pub transition_years: u32,
}

impl Default for DcfConfig {
    fn default() -> Self {
        Self {
            high_growth_rate: default_high_growth_rate(),
            transition_start_rate: default_transition_start_rate(),
            perpetual_growth_rate: default_perpetual_growth_rate(),
            discount_rate: default_discount_rate(),
            high_growth_years: default_stage_years(),
            transition_years: default_stage_years(),
        }
    }
}

impl DcfConfig {
    /// Reject parameters that would produce a non-finite or sign-flipped
    /// terminal value, or a projection horizon beyond `MAX_HORIZON_YEARS`.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("high_growth_rate", self.high_growth_rate),
            ("transition_start_rate", self.transition_start_rate),
            ("perpetual_growth_rate", self.perpetual_growth_rate),
            ("discount_rate", self.discount_rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() {
                return Err(ValuationError::InvalidConfig(format!(
                    "{name} must be finite, got {rate}"
                )));
            }
        }
        match self.high_growth_years.checked_add(self.transition_years) {
            Some(total) if total <= MAX_HORIZON_YEARS => {}
            _ => {
                return Err(ValuationError::InvalidConfig(format!(
                    "high_growth_years ({}) + transition_years ({}) must not exceed {MAX_HORIZON_YEARS}",
                    self.high_growth_years, self.transition_years
                )));
            }
        }
        if self.discount_rate <= -1.0 {
            return Err(ValuationError::InvalidConfig(format!(
                "discount_rate must be greater than -1, got {}",
                self.discount_rate
            )));
        }
        if self.discount_rate <= self.perpetual_growth_rate {
            return Err(ValuationError::InvalidConfig(format!(
                "discount_rate ({}) must exceed perpetual_growth_rate ({})",
                self.discount_rate, self.perpetual_growth_rate
            )));
        }
        Ok(())
    }

    /// Total explicit projection years; the terminal value is valued here.
    pub fn horizon_years(&self) -> u32 {
        self.high_growth_years.saturating_add(self.transition_years)
    }

    /// Per-year step of the transition growth rate.
    pub fn transition_decrement(&self) -> f64 {
        if self.transition_years <= 1 {
            return 0.0;
        }
        (self.transition_start_rate - self.perpetual_growth_rate)
            / f64::from(self.transition_years - 1)
    }
}

/// Projected free cash flows for one valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowProjection {
    pub high_growth: Vec<f64>,
    pub transition: Vec<f64>,
    /// Undiscounted terminal value at the end of the horizon.
    pub terminal_value: f64,
}

/// Present values of each stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresentValues {
    pub high_growth: f64,
    pub transition: f64,
    pub terminal: f64,
}

impl PresentValues {
    pub fn total(&self) -> f64 {
        self.high_growth + self.transition + self.terminal
    }
}

/// Full model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcfValuation {
    pub projection: CashFlowProjection,
    pub present_values: PresentValues,
    /// long-term debt - cash and equivalents
    pub net_debt: f64,
    /// Total present value minus net debt. Although the figure is often
    /// labelled an enterprise value, subtracting net debt makes it an equity
    /// value; the per-share price divides this adjusted number.
    pub value: f64,
}

/// Balance-sheet and cash-flow inputs to a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcfInputs {
    pub free_cash_flow: f64,
    /// Carried for reporting; the projection is driven by free cash flow.
    pub net_income: f64,
    pub long_term_debt: f64,
    pub cash_and_equivalents: f64,
}

/// The DCF model bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct DcfModel {
    config: DcfConfig,
}

impl DcfModel {
    pub fn new(config: DcfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DcfConfig {
        &self.config
    }

    /// Project `initial_fcf` through the growth stages.
    pub fn project(&self, initial_fcf: f64) -> CashFlowProjection {
        let cfg = &self.config;

        let high_growth = compound_stage(
            initial_fcf,
            std::iter::repeat(cfg.high_growth_rate).take(cfg.high_growth_years as usize),
        );
        let last_high = high_growth.last().copied().unwrap_or(initial_fcf);

        let decrement = cfg.transition_decrement();
        let transition = compound_stage(
            last_high,
            (0..cfg.transition_years).map(|k| cfg.transition_start_rate - decrement * f64::from(k)),
        );
        let last_transition = transition.last().copied().unwrap_or(last_high);

        let g = cfg.perpetual_growth_rate;
        let terminal_value = last_transition * (1.0 + g) / (cfg.discount_rate - g);

        CashFlowProjection {
            high_growth,
            transition,
            terminal_value,
        }
    }

    /// Discount a projection back to year 0.
    pub fn present_values(&self, projection: &CashFlowProjection) -> PresentValues {
        let base = 1.0 + self.config.discount_rate;
        let discount = |flow: f64, year: usize| flow / base.powi(year as i32);

        let high_growth: f64 = projection
            .high_growth
            .iter()
            .enumerate()
            .map(|(k, &cf)| discount(cf, k + 1))
            .sum();

        let first_transition_year = projection.high_growth.len() + 1;
        let transition: f64 = projection
            .transition
            .iter()
            .enumerate()
            .map(|(k, &cf)| discount(cf, first_transition_year + k))
            .sum();

        let terminal = discount(
            projection.terminal_value,
            self.config.horizon_years() as usize,
        );

        PresentValues {
            high_growth,
            transition,
            terminal,
        }
    }

    /// Run the full model on `inputs`.
    pub fn value(&self, inputs: &DcfInputs) -> DcfValuation {
        let projection = self.project(inputs.free_cash_flow);
        let present_values = self.present_values(&projection);
        let net_debt = inputs.long_term_debt - inputs.cash_and_equivalents;
        let value = present_values.total() - net_debt;

        debug!(
            free_cash_flow = inputs.free_cash_flow,
            net_income = inputs.net_income,
            pv_total = present_values.total(),
            net_debt,
            value,
            "DCF computed"
        );

        DcfValuation {
            projection,
            present_values,
            net_debt,
            value,
        }
    }
}

/// Compound `start` by each rate in turn, keeping every year's value.
fn compound_stage(start: f64, rates: impl Iterator<Item = f64>) -> Vec<f64> {
    rates
        .scan(start, |fcf, rate| {
            *fcf *= 1.0 + rate;
            Some(*fcf)
        })
        .collect()
}

/// DCF value with the default assumptions.
pub fn compute_dcf(
    free_cash_flow: f64,
    net_income: f64,
    long_term_debt: f64,
    cash_and_equivalents: f64,
) -> Result<f64> {
    let model = DcfModel::new(DcfConfig::default())?;
    let inputs = DcfInputs {
        free_cash_flow,
        net_income,
        long_term_debt,
        cash_and_equivalents,
    };
    Ok(model.value(&inputs).value)
}
