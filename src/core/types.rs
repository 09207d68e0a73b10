use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PrepaymentFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

/// Loan parameters for one schedule computation. Rates are fractions
/// (0.085 for 8.5% annual); the CLI/API boundary converts from percent.
#[derive(Debug, Clone)]
pub struct LoanInputs {
    pub principal: f64,
    pub annual_rate: f64,
    pub tenure_years: u32,
    pub prepayment_amount: f64,
    pub prepayment_frequency: PrepaymentFrequency,
    pub yearly_step_up: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearEntry {
    pub year: u32,
    pub remaining_balance: f64,
    pub emi_at_year_end: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalInterestSplit {
    pub principal: f64,
    pub total_interest_paid: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    /// EMI charged in the first month, recorded directly by the loop.
    pub initial_monthly_emi: f64,
    /// EMI in effect when the loan paid off (or when the loop was cut).
    pub monthly_emi: f64,
    pub total_interest_paid: f64,
    pub payoff_years: f64,
    pub months_elapsed: u32,
    /// Set when the safety bound stopped the loop with balance still owed.
    pub truncated: bool,
    pub yearly_schedule: Vec<YearEntry>,
    pub principal_interest_split: PrincipalInterestSplit,
}
