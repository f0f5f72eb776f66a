use colgen_solver::LpProblem;

use crate::backend::{LpBackend, solve_optimal};
use crate::error::{DecompositionError, Stage};
use crate::problem::ProblemDefinition;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct CompactSolution {
    pub objective_value: f64,
    pub values: Vec<f64>,
}

/// The undecomposed LP: all rows at once over continuous `x >= 0`
pub fn compact_problem(problem: &ProblemDefinition) -> LpProblem {
    let mut model = LpProblem::new(problem.variables.clone());
    model.set_objective(problem.objective.clone(), true);
    for row in problem.rows() {
        model.add_constraint(row.name.clone(), row.coefficients.clone(), row.op, row.rhs);
    }
    model
}

/// Solve the compact formulation directly, as a reference for the decomposition
pub fn solve_compact<B: LpBackend + ?Sized>(
    problem: &ProblemDefinition,
    backend: &B,
) -> Result<CompactSolution, DecompositionError> {
    let model = compact_problem(problem);
    model.validate()?;
    let solution = solve_optimal(backend, &model, Stage::Compact)?;
    log::info!("compact formulation objective {:.6}", solution.objective_value);
    Ok(CompactSolution {
        objective_value: solution.objective_value,
        values: solution.values,
    })
}
