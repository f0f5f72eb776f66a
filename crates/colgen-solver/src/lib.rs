mod branch;
mod problem;
mod simplex;
mod solution;

pub use problem::{Constraint, ConstraintOp, LpProblem, ModelError, Objective, VarKind};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
