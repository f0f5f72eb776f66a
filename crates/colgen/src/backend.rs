use colgen_solver::{LpProblem, Solution, SolutionStatus, Solver};

use crate::error::{DecompositionError, Stage};

/// The mathematical-programming solver a run delegates LP and IP solves to.
///
/// Implementations must fill `Solution::duals` for problems without integer
/// variables.
pub trait LpBackend {
    fn solve(&self, problem: &LpProblem) -> Solution;
}

impl LpBackend for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

impl<B: LpBackend + ?Sized> LpBackend for &B {
    fn solve(&self, problem: &LpProblem) -> Solution {
        (**self).solve(problem)
    }
}

/// Solve `problem` and turn every non-optimal status into the matching error
pub(crate) fn solve_optimal<B: LpBackend + ?Sized>(
    backend: &B,
    problem: &LpProblem,
    stage: Stage,
) -> Result<Solution, DecompositionError> {
    let solution = backend.solve(problem);
    match solution.status {
        SolutionStatus::Optimal => Ok(solution),
        SolutionStatus::Infeasible => Err(DecompositionError::Infeasible(stage)),
        SolutionStatus::Unbounded => Err(DecompositionError::Unbounded(stage)),
        SolutionStatus::Error => Err(DecompositionError::SolverFailure(stage)),
    }
}
