use colgen_solver::{ConstraintOp, LpProblem, VarKind};

use crate::backend::{LpBackend, solve_optimal};
use crate::column::ColumnStore;
use crate::error::{DecompositionError, Stage};
use crate::problem::ProblemDefinition;

const CONVEXITY_ROW: &str = "convexity";

/// Dual prices of the master rows after a solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MasterDuals {
    /// `pi`, one per complicating row
    pub complicating: Vec<f64>,
    /// `alpha`, the convexity row's dual
    pub convexity: f64,
}

#[derive(Debug, Clone)]
pub struct MasterSolution {
    pub objective_value: f64,
    /// One weight per column, in column-store order
    pub weights: Vec<f64>,
    pub duals: MasterDuals,
}

/// The restricted master problem: one continuous weight `w_i >= 0` per known
/// column,
///
/// ```text
/// minimize   sum_i (c · col_i) w_i
/// subject to sum_i (A_r · col_i) w_i  op_r  b_r    for every complicating row r
///            sum_i w_i <= 1
/// ```
///
/// The model only ever grows: a weight's coefficients are fixed when it is added.
#[derive(Debug, Clone)]
pub struct RestrictedMaster {
    model: LpProblem,
    n_complicating: usize,
}

impl RestrictedMaster {
    /// Build the master over every column currently in `store` (the seeds)
    pub fn new(problem: &ProblemDefinition, store: &ColumnStore) -> Result<Self, DecompositionError> {
        let mut model = LpProblem::new(Vec::new());
        model.set_objective(Vec::new(), true);
        for row in &problem.complicating {
            model.add_constraint(row.name.clone(), Vec::new(), row.op, row.rhs);
        }
        model.add_constraint(CONVEXITY_ROW, Vec::new(), ConstraintOp::Le, 1.0);

        let mut master = Self {
            model,
            n_complicating: problem.complicating.len(),
        };
        for (index, column) in store.iter().enumerate() {
            let values = column.values();
            master.add_column(
                index,
                problem.objective_value(values),
                &problem.complicating_lhs(values),
            )?;
        }
        Ok(master)
    }

    /// Solve the current master and read off its duals
    pub fn solve<B: LpBackend + ?Sized>(&self, backend: &B) -> Result<MasterSolution, DecompositionError> {
        let solution = solve_optimal(backend, &self.model, Stage::Master)?;
        if solution.duals.len() != self.model.num_constraints() {
            log::error!(
                "backend returned {} duals for {} master rows",
                solution.duals.len(),
                self.model.num_constraints()
            );
            return Err(DecompositionError::SolverFailure(Stage::Master));
        }

        let convexity = solution.duals[self.n_complicating];
        let complicating = solution.duals[..self.n_complicating].to_vec();
        Ok(MasterSolution {
            objective_value: solution.objective_value,
            weights: solution.values,
            duals: MasterDuals {
                complicating,
                convexity,
            },
        })
    }

    /// Add the weight of column `column` with objective coefficient
    /// `objective_coeff`, `complicating_coeffs[r]` in complicating row `r` and 1 in
    /// the convexity row. Returns the new weight's index.
    pub fn add_column(
        &mut self,
        column: usize,
        objective_coeff: f64,
        complicating_coeffs: &[f64],
    ) -> Result<usize, DecompositionError> {
        debug_assert_eq!(complicating_coeffs.len(), self.n_complicating);
        let mut entries: Vec<(usize, f64)> = complicating_coeffs.iter().copied().enumerate().collect();
        entries.push((self.n_complicating, 1.0));

        let index = self.model.add_variable(
            format!("lambda_{}", column),
            VarKind::Continuous,
            objective_coeff,
            &entries,
        )?;
        Ok(index)
    }

    pub fn num_weights(&self) -> usize {
        self.model.num_variables()
    }

    pub fn model(&self) -> &LpProblem {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use approx::assert_abs_diff_eq;
    use colgen_solver::Solver;

    fn seeded(problem: &ProblemDefinition) -> ColumnStore {
        let mut store = ColumnStore::new();
        for seed in &problem.seeds {
            store.append(Column::seed(seed.clone()));
        }
        store
    }

    #[test]
    fn test_initial_master_shape() {
        let problem = ProblemDefinition::reference();
        let master = RestrictedMaster::new(&problem, &seeded(&problem)).unwrap();

        let model = master.model();
        assert_eq!(master.num_weights(), 2);
        assert_eq!(model.num_constraints(), 2);
        assert_eq!(model.objective.coefficients, vec![0.0, -15.0]);
        assert_eq!(model.constraints[0].coefficients, vec![0.0, 10.0]);
        assert_eq!(model.constraints[0].rhs, 6.0);
        assert_eq!(model.constraints[1].coefficients, vec![1.0, 1.0]);
        assert_eq!(model.constraints[1].rhs, 1.0);
    }

    #[test]
    fn test_initial_master_duals() {
        let problem = ProblemDefinition::reference();
        let master = RestrictedMaster::new(&problem, &seeded(&problem)).unwrap();

        let solution = master.solve(&Solver::new()).unwrap();

        assert_abs_diff_eq!(solution.objective_value, -9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.weights[1], 0.6, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.duals.complicating[0], -1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.duals.convexity, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_column_grows_in_place() {
        let problem = ProblemDefinition::reference();
        let mut master = RestrictedMaster::new(&problem, &seeded(&problem)).unwrap();

        let index = master.add_column(2, 5.0, &[-5.0]).unwrap();

        assert_eq!(index, 2);
        let model = master.model();
        assert_eq!(model.variables[2], "lambda_2");
        assert_eq!(model.objective.coefficients, vec![0.0, -15.0, 5.0]);
        assert_eq!(model.constraints[0].coefficients, vec![0.0, 10.0, -5.0]);
        assert_eq!(model.constraints[1].coefficients, vec![1.0, 1.0, 1.0]);

        let solution = master.solve(&Solver::new()).unwrap();
        assert_abs_diff_eq!(solution.objective_value, -29.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.duals.complicating[0], -4.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.duals.convexity, -5.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_infeasible_master() {
        let mut problem = ProblemDefinition::reference();
        problem.complicating[0].rhs = -20.0;
        let master = RestrictedMaster::new(&problem, &seeded(&problem)).unwrap();

        let err = master.solve(&Solver::new()).unwrap_err();

        assert_eq!(err, DecompositionError::Infeasible(Stage::Master));
    }
}
