use std::fmt;

use colgen_solver::ModelError;
use thiserror::Error;

use crate::driver::RunState;

/// Which solve of a run produced a status
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Restricted master problem
    Master,
    /// Pricing sub-problem
    Pricing,
    /// Full, non-decomposed formulation
    Compact,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Master => write!(f, "restricted master problem"),
            Stage::Pricing => write!(f, "pricing sub-problem"),
            Stage::Compact => write!(f, "compact formulation"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Problem has no variables")]
    NoVariables,
    #[error("Objective has {found} coefficients, expected {expected}")]
    ObjectiveLength { expected: usize, found: usize },
    #[error("Row {row} has {found} coefficients, expected {expected}")]
    RowLength { row: String, expected: usize, found: usize },
    #[error("Row {0} has a non-finite coefficient or right-hand side")]
    NonFiniteRow(String),
    #[error("Problem needs at least one complicating row")]
    NoComplicatingRows,
    #[error("At least 2 seed columns are required, got {0}")]
    TooFewSeeds(usize),
    #[error("Seed {seed} has {found} values, expected {expected}")]
    SeedLength { seed: usize, expected: usize, found: usize },
    #[error("Seed {seed} has invalid value {value}; values must be finite and non-negative")]
    InvalidSeedValue { seed: usize, value: f64 },
    #[error("Seed {seed} violates easy row {row}")]
    SeedViolatesRow { seed: usize, row: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecompositionError {
    #[error("Invalid problem: {0}")]
    Problem(#[from] ProblemError),
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
    #[error("The {0} is infeasible")]
    Infeasible(Stage),
    #[error("The {0} is unbounded")]
    Unbounded(Stage),
    #[error("Solver failed on the {0}")]
    SolverFailure(Stage),
    #[error("Column generation did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },
    #[error("Pricing returned column {column:?}, already stored at index {index}, with reduced cost {reduced_cost}")]
    DuplicateColumn {
        column: Vec<f64>,
        index: usize,
        reduced_cost: f64,
    },
    #[error("The run has already finished ({0:?})")]
    Finished(RunState),
}
