mod engine;
mod solver;
mod types;

pub use engine::run_schedule;
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, solve_goal};
pub use types::{
    AmortizationResult, LoanInputs, PrepaymentFrequency, PrincipalInterestSplit, YearEntry,
};
