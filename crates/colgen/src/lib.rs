//! Dantzig-Wolfe decomposition by column generation.
//!
//! A [`DecompositionRun`] alternates between the restricted master problem
//! ([`RestrictedMaster`]) over the columns found so far and an integer pricing
//! problem ([`price`]) that proposes the column with the most negative reduced
//! cost, until no improving column is left.

pub mod backend;
pub mod column;
pub mod compact;
pub mod driver;
pub mod error;
pub mod master;
pub mod pricing;
pub mod problem;

pub use backend::LpBackend;
pub use column::{Column, ColumnOrigin, ColumnStore};
pub use compact::{CompactSolution, compact_problem, solve_compact};
pub use driver::{
    DecompositionConfig, DecompositionResult, DecompositionRun, DuplicatePolicy, IterationRecord, RunState, Step,
    decompose,
};
pub use error::{DecompositionError, ProblemError, Stage};
pub use master::{MasterDuals, MasterSolution, RestrictedMaster};
pub use pricing::{PricingResult, adjusted_costs, build_pricing_problem, price};
pub use problem::{ProblemDefinition, Row};
