/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Dual value of each constraint, in constraint order.
    ///
    /// Measured as the change of the optimal objective per unit increase of the
    /// constraint's right-hand side, in the problem's own sense. A binding `<=`
    /// row of a minimization problem therefore has a non-positive dual.
    /// Empty for integer problems and non-optimal statuses.
    pub duals: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// Solver encountered an error (iteration or node limit)
    Error,
}

impl Solution {
    pub fn infeasible() -> Self {
        Self::with_status(SolutionStatus::Infeasible, f64::INFINITY)
    }

    pub fn unbounded() -> Self {
        Self::with_status(SolutionStatus::Unbounded, f64::NEG_INFINITY)
    }

    pub fn error() -> Self {
        Self::with_status(SolutionStatus::Error, f64::NAN)
    }

    fn with_status(status: SolutionStatus, objective_value: f64) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            duals: Vec::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Dual value of constraint `index`, if available
    pub fn dual(&self, index: usize) -> Option<f64> {
        self.duals.get(index).copied()
    }
}
