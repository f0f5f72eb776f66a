use colgen_solver::{LpProblem, VarKind};

use crate::backend::{LpBackend, solve_optimal};
use crate::error::{DecompositionError, Stage};
use crate::master::MasterDuals;
use crate::problem::ProblemDefinition;

/// Outcome of one pricing round
#[derive(Debug, Clone, PartialEq)]
pub struct PricingResult {
    /// Optimal easy-variable assignment: the candidate column
    pub column: Vec<f64>,
    /// Optimal value of the sub-problem
    pub objective_value: f64,
    /// `objective_value - alpha`; negative means the column improves the master
    pub reduced_cost: f64,
}

/// Objective of the pricing problem: `c_j - sum_r A_rj * pi_r` per easy variable
pub fn adjusted_costs(problem: &ProblemDefinition, duals: &MasterDuals) -> Vec<f64> {
    problem
        .objective
        .iter()
        .enumerate()
        .map(|(j, &c)| {
            let priced: f64 = problem
                .complicating
                .iter()
                .zip(&duals.complicating)
                .map(|(row, pi)| row.coefficients[j] * pi)
                .sum();
            c - priced
        })
        .collect()
}

/// Integer program over the easy variables and the easy rows, minimizing the
/// dual-adjusted costs. Built from scratch for every set of duals.
pub fn build_pricing_problem(problem: &ProblemDefinition, duals: &MasterDuals) -> LpProblem {
    let mut model = LpProblem::with_kind(problem.variables.clone(), VarKind::Integer);
    model.set_objective(adjusted_costs(problem, duals), true);
    for row in &problem.easy {
        model.add_constraint(row.name.clone(), row.coefficients.clone(), row.op, row.rhs);
    }
    model
}

/// Build and solve the pricing problem for `duals`
pub fn price<B: LpBackend + ?Sized>(
    problem: &ProblemDefinition,
    duals: &MasterDuals,
    backend: &B,
) -> Result<PricingResult, DecompositionError> {
    let model = build_pricing_problem(problem, duals);
    log::debug!("pricing costs {:?}", model.objective.coefficients);

    let solution = solve_optimal(backend, &model, Stage::Pricing)?;
    Ok(PricingResult {
        reduced_cost: solution.objective_value - duals.convexity,
        objective_value: solution.objective_value,
        column: solution.values,
    })
}
