use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolutionStatus};

/// Consecutive degenerate pivots after which Bland's rule takes over
const DEGENERATE_LIMIT: usize = 10;

/// Simplex solver for linear programming problems.
///
/// Problems with integer variables are solved by branch-and-bound over the
/// LP relaxation (see `branch.rs`).
pub struct Solver {
    /// Maximum iterations per simplex phase before giving up
    pub(crate) max_iterations: usize,
    /// Tolerance for floating point comparisons
    pub(crate) tolerance: f64,
    /// Maximum branch-and-bound nodes before giving up
    pub(crate) max_nodes: usize,
    /// Distance from the nearest integer still accepted as integral
    pub(crate) integrality_tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            max_nodes: 10000,
            integrality_tolerance: 1e-6,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    /// Solve the problem: two-phase simplex for pure LPs, branch-and-bound when
    /// some variables are integer.
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            log::error!("malformed problem: {}", e);
            return Solution::error();
        }

        if problem.has_integer_variables() {
            self.solve_integer(problem)
        } else {
            self.solve_lp(problem)
        }
    }

    /// Solve the LP relaxation (variable kinds are ignored)
    pub(crate) fn solve_lp(&self, problem: &LpProblem) -> Solution {
        let mut tableau = self.build_tableau(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau) {
                SimplexResult::Optimal => {}
                SimplexResult::IterationLimit => return Solution::error(),
                SimplexResult::Infeasible | SimplexResult::Unbounded => return Solution::infeasible(),
            }
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau) {
            SimplexResult::Optimal => self.extract_solution(&tableau, problem),
            SimplexResult::Unbounded => Solution::unbounded(),
            SimplexResult::Infeasible => Solution::infeasible(),
            SimplexResult::IterationLimit => Solution::error(),
        }
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // A row with negative RHS is negated, which turns <= into >= and back
        let layouts: Vec<RowLayout> = problem
            .constraints
            .iter()
            .map(|c| match (c.op, c.rhs < 0.0) {
                (ConstraintOp::Le, false) | (ConstraintOp::Ge, true) => RowLayout::Slack,
                (ConstraintOp::Ge, false) | (ConstraintOp::Le, true) => RowLayout::Surplus,
                (ConstraintOp::Eq, _) => RowLayout::Artificial,
            })
            .collect();

        let n_slack = layouts.iter().filter(|l| **l != RowLayout::Artificial).count();
        let n_artificial = layouts.iter().filter(|l| **l != RowLayout::Slack).count();

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            dual_columns: Vec::with_capacity(n_constraints),
            n_vars,
            n_slack,
            n_artificial,
        };

        // Fill in constraint rows
        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, layout)) in problem.constraints.iter().zip(&layouts).enumerate() {
            let flip = if c.rhs < 0.0 { -1.0 } else { 1.0 };

            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = flip * coef;
            }
            tableau.data[i][total_cols - 1] = flip * c.rhs;

            // Dual columns record the column's coefficient in the row as written,
            // i.e. before the RHS flip.
            match layout {
                RowLayout::Slack => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    tableau.dual_columns.push((slack_idx, flip));
                    slack_idx += 1;
                }
                RowLayout::Surplus => {
                    tableau.data[i][slack_idx] = -1.0;
                    tableau.dual_columns.push((slack_idx, -flip));
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                RowLayout::Artificial => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.dual_columns.push((artificial_idx, flip));
                    artificial_idx += 1;
                }
            }
        }

        // Objective row (last row)
        // Simplex maximizes, so for minimization we negate the coefficients
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau) -> SimplexResult {
        // Auxiliary objective: maximize -sum(artificials)
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.art_start();

        let orig_obj = tableau.data[n_constraints].clone();

        for j in 0..n_cols {
            tableau.data[n_constraints][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Make objective row consistent with basic artificial variables
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, n_cols - 1) {
            SimplexResult::Optimal => {}
            SimplexResult::IterationLimit => return SimplexResult::IterationLimit,
            _ => return SimplexResult::Infeasible,
        }

        // Check if all artificials are zero
        let rhs_col = n_cols - 1;
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > self.tolerance {
                return SimplexResult::Infeasible;
            }
        }

        self.drive_out_artificials(tableau);

        // Restore original objective and adjust for basic variables
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            if tableau.data[n_constraints][basic].abs() > self.tolerance {
                let ratio = tableau.data[n_constraints][basic];
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        SimplexResult::Optimal
    }

    /// Pivot artificials that stayed basic at zero out of the basis, so phase 2
    /// cannot push them back above zero. Rows without a usable pivot are redundant
    /// and keep their artificial.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let art_start = tableau.art_start();
        for i in 0..tableau.basic_vars.len() {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance) {
                self.pivot(tableau, i, col);
            }
        }
    }

    fn phase2(&self, tableau: &mut Tableau) -> SimplexResult {
        // Exclude artificial variable columns from pivoting
        let exclude_from = tableau.art_start();
        self.iterate(tableau, exclude_from)
    }

    fn iterate(&self, tableau: &mut Tableau, exclude_from: usize) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_run = 0;

        for _ in 0..self.max_iterations {
            let bland = degenerate_run >= DEGENERATE_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Unbounded;
            };
            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }
            self.pivot(tableau, pivot_row, pivot_col);
        }

        log::warn!("simplex stopped after {} iterations", self.max_iterations);
        SimplexResult::IterationLimit
    }

    /// Entering column: most positive reduced cost, or the lowest improving
    /// index under Bland's rule.
    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize, bland: bool) -> Option<usize> {
        let obj_row = &tableau.data[tableau.data.len() - 1];

        if bland {
            return (0..exclude_from).find(|&j| obj_row[j] > self.tolerance);
        }

        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &value) in obj_row.iter().enumerate().take(exclude_from) {
            if value > max_val {
                max_val = value;
                max_col = Some(j);
            }
        }

        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = (tableau.data[i][rhs_col] / val).max(0.0);
                let better = match min_row {
                    None => true,
                    Some(_) if ratio < min_ratio - self.tolerance => true,
                    // Ties go to the lowest basic variable under Bland's rule
                    Some(row) if bland && ratio <= min_ratio + self.tolerance => {
                        tableau.basic_vars[i] < tableau.basic_vars[row]
                    }
                    Some(_) => false,
                };
                if better {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n_cols {
                    tableau.data[i][j] -= factor * tableau.data[row][j];
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                values[basic] = tableau.data[i][rhs_col];
            }
        }

        let objective_value = problem.evaluate(&values);
        let duals = self.duals(tableau, problem);

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            duals,
        }
    }

    /// Duals from the objective row entries under each row's slack, surplus or
    /// artificial column. The row holds `-y` (maximization sense) scaled by the
    /// column's original coefficient.
    fn duals(&self, tableau: &Tableau, problem: &LpProblem) -> Vec<f64> {
        let obj_row = &tableau.data[tableau.data.len() - 1];
        tableau
            .dual_columns
            .iter()
            .map(|&(col, coef)| {
                let value = obj_row[col] / coef;
                let value = if problem.objective.minimize { value } else { -value };
                // Avoid reporting -0.0
                if value.abs() < self.tolerance { 0.0 } else { value }
            })
            .collect()
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    /// Per constraint: column used to read its dual, and that column's
    /// coefficient in the constraint as written
    dual_columns: Vec<(usize, f64)>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    /// Basic slack, `a x + s = b`
    Slack,
    /// Surplus plus basic artificial, `a x - s + r = b`
    Surplus,
    /// Basic artificial only, `a x + r = b`
    Artificial,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    Infeasible,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.values[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.objective_value, 11.0, epsilon = 1e-6);

        // One more unit of "sum" lets y grow by one: +2
        assert_abs_diff_eq!(solution.duals[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.values[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.objective_value, 9.0, epsilon = 1e-6);

        // Raising the demand costs one more y; raising x's cap saves 3 - 2
        assert_abs_diff_eq!(solution.duals[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[1], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_master_style_duals() {
        // Minimize: -15 b
        // Subject to:
        //   10 b <= 6
        //   a + b <= 1
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![0.0, -15.0], true);
        problem.add_constraint("link", vec![0.0, 10.0], ConstraintOp::Le, 6.0);
        problem.add_constraint("convexity", vec![1.0, 1.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert!(solution.is_optimal());
        assert_abs_diff_eq!(solution.objective_value, -9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.dual(0).unwrap(), -1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.dual(1).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_equality_and_negative_rhs() {
        // Minimize: x + 2y
        // Subject to:
        //   x + y = 3
        //   -x <= -1   (x >= 1)
        // Optimal: x=3, y=0, obj=3
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);
        problem.add_constraint("total", vec![1.0, 1.0], ConstraintOp::Eq, 3.0);
        problem.add_constraint("x_min", vec![-1.0, 0.0], ConstraintOp::Le, -1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_abs_diff_eq!(solution.values[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.values[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.objective_value, 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.duals[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        // Minimize: -x with only x - y <= 1
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![-1.0, 0.0], true);
        problem.add_constraint("gap", vec![1.0, -1.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_malformed_problem_is_error() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.add_constraint("short", vec![], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Error);
    }
}
