use serde::Serialize;

use super::engine::run_schedule;
use super::types::LoanInputs;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    /// Smallest periodic prepayment that pays the loan off within the
    /// target number of years.
    RequiredPrepayment,
    /// Largest principal whose initial EMI stays within the target budget.
    MaxPrincipal,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    /// Target payoff years for RequiredPrepayment, EMI budget for MaxPrincipal.
    pub target_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub payoff_years: f64,
    pub initial_monthly_emi: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_payoff_years: Option<f64>,
    pub achieved_monthly_emi: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    payoff_years: f64,
    initial_monthly_emi: f64,
}

fn evaluate_candidate(
    base_inputs: &LoanInputs,
    goal_type: GoalType,
    candidate_value: f64,
) -> Result<CandidateEval, String> {
    let mut inputs = base_inputs.clone();
    match goal_type {
        GoalType::RequiredPrepayment => inputs.prepayment_amount = candidate_value.max(0.0),
        GoalType::MaxPrincipal => inputs.principal = candidate_value,
    }

    let result = run_schedule(&inputs)?;
    // A truncated schedule never paid off; treat it as unbounded so the
    // bisection cannot accept it.
    let payoff_years = if result.truncated {
        f64::INFINITY
    } else {
        result.payoff_years
    };
    Ok(CandidateEval {
        payoff_years,
        initial_monthly_emi: result.initial_monthly_emi,
    })
}

fn meets_target(goal_type: GoalType, target_value: f64, eval: CandidateEval) -> bool {
    match goal_type {
        GoalType::RequiredPrepayment => eval.payoff_years <= target_value + 1e-12,
        GoalType::MaxPrincipal => eval.initial_monthly_emi <= target_value + 1e-9,
    }
}

pub fn solve_goal(inputs: &LoanInputs, config: GoalSolveConfig) -> Result<GoalSolveResult, String> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(inputs, config.goal_type, config.search_min)?;
    let high_eval = evaluate_candidate(inputs, config.goal_type, config.search_max)?;

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    match config.goal_type {
        GoalType::RequiredPrepayment => {
            if meets_target(config.goal_type, config.target_value, low_eval) {
                solved_value = Some(config.search_min);
                converged = true;
                feasible = true;
                message =
                    "Already meets the target payoff at the lower prepayment bound.".to_string();
            } else if !meets_target(config.goal_type, config.target_value, high_eval) {
                feasible = false;
                message = "No feasible prepayment found within the search bounds.".to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let eval = evaluate_candidate(inputs, config.goal_type, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        payoff_years: eval.payoff_years,
                        initial_monthly_emi: eval.initial_monthly_emi,
                    });

                    if meets_target(config.goal_type, config.target_value, eval) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        solved_value = Some(hi);
                        break;
                    }
                }
                if solved_value.is_none() {
                    solved_value = Some(hi);
                }
                feasible = true;
                message = if converged {
                    "Solved required prepayment.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
        GoalType::MaxPrincipal => {
            if !meets_target(config.goal_type, config.target_value, low_eval) {
                feasible = false;
                message = "No feasible principal found within the search bounds.".to_string();
            } else if meets_target(config.goal_type, config.target_value, high_eval) {
                solved_value = Some(config.search_max);
                converged = true;
                feasible = true;
                message =
                    "Upper principal bound still fits the EMI budget; increase search max for a larger loan."
                        .to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let eval = evaluate_candidate(inputs, config.goal_type, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        payoff_years: eval.payoff_years,
                        initial_monthly_emi: eval.initial_monthly_emi,
                    });

                    if meets_target(config.goal_type, config.target_value, eval) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        solved_value = Some(lo);
                        break;
                    }
                }
                if solved_value.is_none() {
                    solved_value = Some(lo);
                }
                feasible = true;
                message = if converged {
                    "Solved maximum principal.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
    }

    let mut achieved_payoff_years = None;
    let mut achieved_monthly_emi = None;
    if let Some(value) = solved_value {
        let eval = evaluate_candidate(inputs, config.goal_type, value)?;
        achieved_payoff_years = Some(eval.payoff_years);
        achieved_monthly_emi = Some(eval.initial_monthly_emi);
    }

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_value: config.target_value,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_payoff_years,
        achieved_monthly_emi,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn validate_config(config: GoalSolveConfig) -> Result<(), String> {
    if !config.target_value.is_finite() || config.target_value <= 0.0 {
        return Err("target_value must be > 0".to_string());
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if config.goal_type == GoalType::RequiredPrepayment && config.search_min < 0.0 {
        return Err("search_min must be >= 0 for required-prepayment".to_string());
    }
    if config.goal_type == GoalType::MaxPrincipal && config.search_min <= 0.0 {
        return Err("search_min must be > 0 for max-principal".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}
