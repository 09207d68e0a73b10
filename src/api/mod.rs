use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AmortizationResult, GoalSolveConfig, GoalType, LoanInputs, PrepaymentFrequency,
    PrincipalInterestSplit, YearEntry, run_schedule, solve_goal,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPrepaymentFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl From<CliPrepaymentFrequency> for PrepaymentFrequency {
    fn from(value: CliPrepaymentFrequency) -> Self {
        match value {
            CliPrepaymentFrequency::Monthly => PrepaymentFrequency::Monthly,
            CliPrepaymentFrequency::Quarterly => PrepaymentFrequency::Quarterly,
            CliPrepaymentFrequency::Yearly => PrepaymentFrequency::Yearly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPrepaymentFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl From<ApiPrepaymentFrequency> for CliPrepaymentFrequency {
    fn from(value: ApiPrepaymentFrequency) -> Self {
        match value {
            ApiPrepaymentFrequency::Monthly => CliPrepaymentFrequency::Monthly,
            ApiPrepaymentFrequency::Quarterly => CliPrepaymentFrequency::Quarterly,
            ApiPrepaymentFrequency::Yearly => CliPrepaymentFrequency::Yearly,
        }
    }
}

impl From<PrepaymentFrequency> for ApiPrepaymentFrequency {
    fn from(value: PrepaymentFrequency) -> Self {
        match value {
            PrepaymentFrequency::Monthly => ApiPrepaymentFrequency::Monthly,
            PrepaymentFrequency::Quarterly => ApiPrepaymentFrequency::Quarterly,
            PrepaymentFrequency::Yearly => ApiPrepaymentFrequency::Yearly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "requiredPrepayment", alias = "required_prepayment")]
    RequiredPrepayment,
    #[serde(alias = "maxPrincipal", alias = "max_principal")]
    MaxPrincipal,
}

impl From<ApiGoalType> for GoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::RequiredPrepayment => GoalType::RequiredPrepayment,
            ApiGoalType::MaxPrincipal => GoalType::MaxPrincipal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "amort",
    about = "Loan EMI amortization engine (periodic prepayments + yearly EMI step-up)"
)]
struct Cli {
    #[arg(long, help = "Loan principal in currency units")]
    principal: f64,
    #[arg(long, help = "Annual interest rate in percent, e.g. 8.5")]
    annual_rate: f64,
    #[arg(long, help = "Loan tenure in years")]
    tenure_years: u32,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Periodic prepayment amount; 0 disables prepayment"
    )]
    prepayment_amount: f64,
    #[arg(long, value_enum, default_value_t = CliPrepaymentFrequency::Monthly)]
    prepayment_frequency: CliPrepaymentFrequency,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Yearly EMI step-up in percent; 0 disables step-up"
    )]
    yearly_step_up: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchedulePayload {
    principal: Option<f64>,
    #[serde(alias = "annualRatePercent", alias = "rate")]
    annual_rate: Option<f64>,
    #[serde(alias = "tenure")]
    tenure_years: Option<u32>,
    prepayment_amount: Option<f64>,
    prepayment_frequency: Option<ApiPrepaymentFrequency>,
    #[serde(alias = "yearlyStepUpPercent")]
    yearly_step_up: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    principal: Option<f64>,
    #[serde(alias = "annualRatePercent", alias = "rate")]
    annual_rate: Option<f64>,
    #[serde(alias = "tenure")]
    tenure_years: Option<u32>,
    prepayment_amount: Option<f64>,
    prepayment_frequency: Option<ApiPrepaymentFrequency>,
    #[serde(alias = "yearlyStepUpPercent")]
    yearly_step_up: Option<f64>,

    goal: Option<ApiGoalType>,
    #[serde(alias = "targetPayoffYears", alias = "emiBudget")]
    target_value: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    principal: f64,
    annual_rate_percent: f64,
    tenure_years: u32,
    prepayment_amount: f64,
    prepayment_frequency: ApiPrepaymentFrequency,
    yearly_step_up_percent: f64,
    initial_monthly_emi: f64,
    monthly_emi: f64,
    total_interest_paid: f64,
    payoff_years: f64,
    months_elapsed: u32,
    truncated: bool,
    yearly_schedule: Vec<YearEntry>,
    principal_interest_split: PrincipalInterestSplit,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<LoanInputs, String> {
    if !cli.principal.is_finite() || cli.principal <= 0.0 {
        return Err("--principal must be > 0".to_string());
    }

    if !cli.annual_rate.is_finite() || cli.annual_rate < 0.0 {
        return Err("--annual-rate must be >= 0".to_string());
    }

    if cli.tenure_years == 0 {
        return Err("--tenure-years must be >= 1".to_string());
    }

    if !cli.prepayment_amount.is_finite() || cli.prepayment_amount < 0.0 {
        return Err("--prepayment-amount must be >= 0".to_string());
    }

    if !cli.yearly_step_up.is_finite() || cli.yearly_step_up < 0.0 {
        return Err("--yearly-step-up must be >= 0".to_string());
    }

    Ok(LoanInputs {
        principal: cli.principal,
        annual_rate: cli.annual_rate / 100.0,
        tenure_years: cli.tenure_years,
        prepayment_amount: cli.prepayment_amount,
        prepayment_frequency: cli.prepayment_frequency.into(),
        yearly_step_up: cli.yearly_step_up / 100.0,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/schedule",
            get(schedule_get_handler).post(schedule_post_handler),
        )
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Amortization HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/schedule");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn schedule_get_handler(Query(payload): Query<SchedulePayload>) -> Response {
    schedule_handler_impl(payload)
}

async fn schedule_post_handler(Json(payload): Json<SchedulePayload>) -> Response {
    schedule_handler_impl(payload)
}

fn schedule_handler_impl(payload: SchedulePayload) -> Response {
    let inputs = match schedule_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_schedule(&inputs) {
        Ok(result) => json_response(StatusCode::OK, build_schedule_response(&inputs, result)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn solve_get_handler(Query(payload): Query<SolvePayload>) -> Response {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> Response {
    solve_handler_impl(payload)
}

fn solve_handler_impl(payload: SolvePayload) -> Response {
    let (inputs, config) = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match solve_goal(&inputs, config) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn schedule_request_from_json(json: &str) -> Result<LoanInputs, String> {
    let payload = serde_json::from_str::<SchedulePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    schedule_request_from_payload(payload)
}

fn schedule_request_from_payload(payload: SchedulePayload) -> Result<LoanInputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.principal {
        cli.principal = v;
    }
    if let Some(v) = payload.annual_rate {
        cli.annual_rate = v;
    }
    if let Some(v) = payload.tenure_years {
        cli.tenure_years = v;
    }
    if let Some(v) = payload.prepayment_amount {
        cli.prepayment_amount = v;
    }
    if let Some(v) = payload.prepayment_frequency {
        cli.prepayment_frequency = v.into();
    }
    if let Some(v) = payload.yearly_step_up {
        cli.yearly_step_up = v;
    }

    build_inputs(cli)
}

fn solve_request_from_payload(payload: SolvePayload) -> Result<(LoanInputs, GoalSolveConfig), String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.principal {
        cli.principal = v;
    }
    if let Some(v) = payload.annual_rate {
        cli.annual_rate = v;
    }
    if let Some(v) = payload.tenure_years {
        cli.tenure_years = v;
    }
    if let Some(v) = payload.prepayment_amount {
        cli.prepayment_amount = v;
    }
    if let Some(v) = payload.prepayment_frequency {
        cli.prepayment_frequency = v.into();
    }
    if let Some(v) = payload.yearly_step_up {
        cli.yearly_step_up = v;
    }

    let inputs = build_inputs(cli)?;

    let goal_type: GoalType = payload
        .goal
        .unwrap_or(ApiGoalType::RequiredPrepayment)
        .into();
    let Some(target_value) = payload.target_value else {
        return Err("targetValue is required".to_string());
    };

    let (default_min, default_max) = match goal_type {
        GoalType::RequiredPrepayment => (0.0, inputs.principal),
        GoalType::MaxPrincipal => (1.0, 1_000_000_000.0),
    };

    let config = GoalSolveConfig {
        goal_type,
        target_value,
        search_min: payload.search_min.unwrap_or(default_min),
        search_max: payload.search_max.unwrap_or(default_max),
        tolerance: payload.tolerance.unwrap_or(1.0),
        max_iterations: payload.max_iterations.unwrap_or(48),
    };

    Ok((inputs, config))
}

fn default_cli_for_api() -> Cli {
    Cli {
        principal: 1_000_000.0,
        annual_rate: 8.5,
        tenure_years: 20,
        prepayment_amount: 0.0,
        prepayment_frequency: CliPrepaymentFrequency::Monthly,
        yearly_step_up: 0.0,
    }
}

fn build_schedule_response(inputs: &LoanInputs, result: AmortizationResult) -> ScheduleResponse {
    ScheduleResponse {
        principal: inputs.principal,
        annual_rate_percent: inputs.annual_rate * 100.0,
        tenure_years: inputs.tenure_years,
        prepayment_amount: inputs.prepayment_amount,
        prepayment_frequency: inputs.prepayment_frequency.into(),
        yearly_step_up_percent: inputs.yearly_step_up * 100.0,
        initial_monthly_emi: result.initial_monthly_emi,
        monthly_emi: result.monthly_emi,
        total_interest_paid: result.total_interest_paid,
        payoff_years: result.payoff_years,
        months_elapsed: result.months_elapsed,
        truncated: result.truncated,
        yearly_schedule: result.yearly_schedule,
        principal_interest_split: result.principal_interest_split,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_converts_percent_to_fractions() {
        let mut cli = sample_cli();
        cli.annual_rate = 8.5;
        cli.yearly_step_up = 10.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.annual_rate, 0.085);
        assert_approx(inputs.yearly_step_up, 0.10);
    }

    #[test]
    fn build_inputs_rejects_non_positive_principal() {
        let mut cli = sample_cli();
        cli.principal = 0.0;
        let err = build_inputs(cli).expect_err("must reject zero principal");
        assert!(err.contains("--principal"));
    }

    #[test]
    fn build_inputs_rejects_negative_rate() {
        let mut cli = sample_cli();
        cli.annual_rate = -0.5;
        let err = build_inputs(cli).expect_err("must reject negative rate");
        assert!(err.contains("--annual-rate"));
    }

    #[test]
    fn build_inputs_rejects_zero_tenure() {
        let mut cli = sample_cli();
        cli.tenure_years = 0;
        let err = build_inputs(cli).expect_err("must reject zero tenure");
        assert!(err.contains("--tenure-years"));
    }

    #[test]
    fn build_inputs_rejects_negative_prepayment() {
        let mut cli = sample_cli();
        cli.prepayment_amount = -100.0;
        let err = build_inputs(cli).expect_err("must reject negative prepayment");
        assert!(err.contains("--prepayment-amount"));
    }

    #[test]
    fn schedule_request_from_json_parses_web_keys() {
        let json = r#"{
          "principal": 2500000,
          "annualRatePercent": 9.25,
          "tenureYears": 15,
          "prepaymentAmount": 10000,
          "prepaymentFrequency": "quarterly",
          "yearlyStepUpPercent": 5
        }"#;
        let inputs = schedule_request_from_json(json).expect("json should parse");

        assert_approx(inputs.principal, 2_500_000.0);
        assert_approx(inputs.annual_rate, 0.0925);
        assert_eq!(inputs.tenure_years, 15);
        assert_approx(inputs.prepayment_amount, 10_000.0);
        assert_eq!(inputs.prepayment_frequency, PrepaymentFrequency::Quarterly);
        assert_approx(inputs.yearly_step_up, 0.05);
    }

    #[test]
    fn schedule_request_applies_defaults_for_missing_fields() {
        let inputs =
            schedule_request_from_json(r#"{ "principal": 500000 }"#).expect("json should parse");
        assert_approx(inputs.principal, 500_000.0);
        assert_approx(inputs.annual_rate, 0.085);
        assert_eq!(inputs.tenure_years, 20);
        assert_eq!(inputs.prepayment_frequency, PrepaymentFrequency::Monthly);
    }

    #[test]
    fn solve_request_requires_target_value() {
        let payload = SolvePayload {
            goal: Some(ApiGoalType::RequiredPrepayment),
            ..SolvePayload::default()
        };
        let err = solve_request_from_payload(payload).expect_err("must require target");
        assert!(err.contains("targetValue"));
    }

    #[test]
    fn solve_request_defaults_bounds_per_goal() {
        let payload = SolvePayload {
            goal: Some(ApiGoalType::RequiredPrepayment),
            target_value: Some(10.0),
            ..SolvePayload::default()
        };
        let (inputs, config) = solve_request_from_payload(payload).expect("valid request");
        assert_eq!(config.goal_type, GoalType::RequiredPrepayment);
        assert_approx(config.search_min, 0.0);
        assert_approx(config.search_max, inputs.principal);
        assert_approx(config.tolerance, 1.0);
        assert_eq!(config.max_iterations, 48);

        let payload = SolvePayload {
            goal: Some(ApiGoalType::MaxPrincipal),
            target_value: Some(9_000.0),
            ..SolvePayload::default()
        };
        let (_, config) = solve_request_from_payload(payload).expect("valid request");
        assert_eq!(config.goal_type, GoalType::MaxPrincipal);
        assert_approx(config.search_min, 1.0);
    }

    #[test]
    fn solve_payload_accepts_goal_aliases() {
        let payload = serde_json::from_str::<SolvePayload>(
            r#"{ "goal": "maxPrincipal", "targetPayoffYears": 12 }"#,
        )
        .expect("json should parse");
        assert_eq!(payload.goal, Some(ApiGoalType::MaxPrincipal));
        assert_eq!(payload.target_value, Some(12.0));
    }

    #[test]
    fn schedule_response_serialization_contains_expected_fields() {
        let inputs = schedule_request_from_json(r#"{ "yearlyStepUpPercent": 5 }"#)
            .expect("json should parse");
        let result = run_schedule(&inputs).expect("valid inputs");
        let response = build_schedule_response(&inputs, result);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"initialMonthlyEmi\""));
        assert!(json.contains("\"monthlyEmi\""));
        assert!(json.contains("\"totalInterestPaid\""));
        assert!(json.contains("\"payoffYears\""));
        assert!(json.contains("\"truncated\""));
        assert!(json.contains("\"yearlySchedule\""));
        assert!(json.contains("\"remainingBalance\""));
        assert!(json.contains("\"emiAtYearEnd\""));
        assert!(json.contains("\"principalInterestSplit\""));
        assert!(json.contains("\"prepaymentFrequency\":\"monthly\""));
    }

    #[test]
    fn solve_response_serialization_contains_expected_fields() {
        let payload = serde_json::from_str::<SolvePayload>(
            r#"{
              "principal": 120000,
              "annualRate": 0,
              "tenureYears": 10,
              "goal": "required-prepayment",
              "targetValue": 5
            }"#,
        )
        .expect("json should parse");
        let (inputs, config) = solve_request_from_payload(payload).expect("valid request");
        let result = solve_goal(&inputs, config).expect("must solve");

        let json = serde_json::to_string(&result).expect("result should serialize");
        assert!(json.contains("\"goalType\":\"required-prepayment\""));
        assert!(json.contains("\"solvedValue\""));
        assert!(json.contains("\"achievedPayoffYears\""));
        assert!(json.contains("\"iterations\""));
        assert!(json.contains("\"converged\":true"));
        assert!(json.contains("\"feasible\":true"));
    }
}
