// =============================================================================
// Statement Figure Extraction
// =============================================================================
//
// Pulls the five DCF inputs out of the latest annual report of each statement.
// Absent fields, the provider's "None" placeholder and any other unparsable
// text are reported as data errors naming the document and field.
// =============================================================================

use serde::Serialize;

use super::{AnnualReport, Document, FinancialStatementSet, StatementDocument};
use crate::error::{Result, ValuationError};
use crate::valuation::DcfInputs;

pub const FIELD_OPERATING_CASH_FLOW: &str = "operatingCashflow";
pub const FIELD_CAPEX: &str = "capitalExpenditures";
pub const FIELD_NET_INCOME: &str = "netIncome";
pub const FIELD_LONG_TERM_DEBT: &str = "longTermDebt";
pub const FIELD_CASH: &str = "cashAndCashEquivalentsAtCarryingValue";

/// Raw figures from the latest annual reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatementFigures {
    pub operating_cash_flow: f64,
    pub capital_expenditures: f64,
    pub net_income: f64,
    pub long_term_debt: f64,
    pub cash_and_equivalents: f64,
}

impl StatementFigures {
    /// Parse every required field from `set`.
    pub fn extract(set: &FinancialStatementSet) -> Result<Self> {
        let cash_flow = latest(&set.cash_flow, Document::CashFlow)?;
        let income = latest(&set.income, Document::IncomeStatement)?;
        let balance = latest(&set.balance_sheet, Document::BalanceSheet)?;

        use Document::{BalanceSheet, CashFlow, IncomeStatement};

        Ok(Self {
            operating_cash_flow: numeric_field(cash_flow, CashFlow, FIELD_OPERATING_CASH_FLOW)?,
            capital_expenditures: numeric_field(cash_flow, CashFlow, FIELD_CAPEX)?,
            net_income: numeric_field(income, IncomeStatement, FIELD_NET_INCOME)?,
            long_term_debt: numeric_field(balance, BalanceSheet, FIELD_LONG_TERM_DEBT)?,
            cash_and_equivalents: numeric_field(balance, BalanceSheet, FIELD_CASH)?,
        })
    }

    /// Operating cash flow minus capital expenditures.
    pub fn free_cash_flow(&self) -> f64 {
        self.operating_cash_flow - self.capital_expenditures
    }

    pub fn dcf_inputs(&self) -> DcfInputs {
        DcfInputs {
            free_cash_flow: self.free_cash_flow(),
            net_income: self.net_income,
            long_term_debt: self.long_term_debt,
            cash_and_equivalents: self.cash_and_equivalents,
        }
    }
}

fn latest(doc: &StatementDocument, document: Document) -> Result<&AnnualReport> {
    doc.latest()
        .ok_or(ValuationError::NoAnnualReports { document })
}

fn numeric_field(report: &AnnualReport, document: Document, field: &'static str) -> Result<f64> {
    let raw = report
        .get(field)
        .ok_or(ValuationError::MissingField { document, field })?;

    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValuationError::NonNumericField {
            document,
            field,
            value: raw.to_string(),
        }),
    }
}
