use super::types::{
    AmortizationResult, LoanInputs, PrepaymentFrequency, PrincipalInterestSplit, YearEntry,
};

/// Standard amortizing-loan payment. The power-ratio form divides by zero
/// at r = 0, where the payment reduces to principal / months.
fn base_monthly_emi(principal: f64, monthly_rate: f64, total_months: u32) -> f64 {
    if monthly_rate == 0.0 {
        return principal / f64::from(total_months);
    }
    let growth = (1.0 + monthly_rate).powf(f64::from(total_months));
    principal * monthly_rate * growth / (growth - 1.0)
}

fn prepayment_for_month(inputs: &LoanInputs, month: u32) -> f64 {
    if inputs.prepayment_amount <= 0.0 {
        return 0.0;
    }
    let due = match inputs.prepayment_frequency {
        PrepaymentFrequency::Monthly => true,
        PrepaymentFrequency::Quarterly => month % 3 == 0,
        PrepaymentFrequency::Yearly => month % 12 == 0,
    };
    if due { inputs.prepayment_amount } else { 0.0 }
}

fn validate_inputs(inputs: &LoanInputs) -> Result<(), String> {
    if !inputs.principal.is_finite() || inputs.principal <= 0.0 {
        return Err("principal must be a positive finite amount".to_string());
    }
    if !inputs.annual_rate.is_finite() || inputs.annual_rate < 0.0 {
        return Err("annual rate must be >= 0".to_string());
    }
    if inputs.tenure_years == 0 {
        return Err("tenure must be at least one year".to_string());
    }
    if !inputs.prepayment_amount.is_finite() || inputs.prepayment_amount < 0.0 {
        return Err("prepayment amount must be >= 0".to_string());
    }
    if !inputs.yearly_step_up.is_finite() || inputs.yearly_step_up < 0.0 {
        return Err("yearly step-up must be >= 0".to_string());
    }
    Ok(())
}

/// Runs the month-by-month amortization loop and reports the schedule.
///
/// The EMI is fixed within a year and stepped up at each anniversary when
/// a step-up is configured. Prepayments land on the months their frequency
/// selects. The loop stops when the balance reaches zero or when twice the
/// contracted tenure has elapsed; the latter is a hard backstop against
/// inputs whose payments never amortize, reported via `truncated` rather
/// than as an error.
pub fn run_schedule(inputs: &LoanInputs) -> Result<AmortizationResult, String> {
    validate_inputs(inputs)?;

    let monthly_rate = inputs.annual_rate / 12.0;
    let total_months = inputs.tenure_years.saturating_mul(12);
    let month_cap = total_months.saturating_mul(2);

    let initial_emi = base_monthly_emi(inputs.principal, monthly_rate, total_months);
    let mut current_emi = initial_emi;
    let mut remaining_balance = inputs.principal;
    let mut total_interest_paid = 0.0;
    let mut yearly_schedule = Vec::with_capacity(inputs.tenure_years as usize);
    let mut months_elapsed = 0_u32;
    let mut truncated = false;

    let mut month = 1_u32;
    loop {
        // Step-up applies at the start of each year after the first.
        if month % 12 == 1 && month > 1 && inputs.yearly_step_up > 0.0 {
            current_emi *= 1.0 + inputs.yearly_step_up;
        }

        let monthly_interest = remaining_balance * monthly_rate;
        let monthly_principal = current_emi - monthly_interest;
        let prepayment = prepayment_for_month(inputs, month);

        remaining_balance -= monthly_principal + prepayment;
        total_interest_paid += monthly_interest;

        if month % 12 == 0 {
            yearly_schedule.push(YearEntry {
                year: month / 12,
                remaining_balance: remaining_balance.max(0.0),
                emi_at_year_end: current_emi,
            });
        }

        months_elapsed = month;
        if remaining_balance <= 0.0 {
            break;
        }
        if month >= month_cap {
            truncated = true;
            break;
        }
        month += 1;
    }

    Ok(AmortizationResult {
        initial_monthly_emi: initial_emi,
        monthly_emi: current_emi,
        total_interest_paid,
        payoff_years: f64::from(months_elapsed) / 12.0,
        months_elapsed,
        truncated,
        yearly_schedule,
        principal_interest_split: PrincipalInterestSplit {
            principal: inputs.principal,
            total_interest_paid,
        },
    })
}
