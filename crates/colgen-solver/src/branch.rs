use crate::problem::{ConstraintOp, LpProblem, VarKind};
use crate::simplex::Solver;
use crate::solution::{Solution, SolutionStatus};

/// A bound added on top of the root problem while branching
#[derive(Debug, Clone, Copy)]
struct Bound {
    var: usize,
    op: ConstraintOp,
    value: f64,
}

impl Solver {
    /// Depth-first branch-and-bound over the LP relaxation.
    ///
    /// Branches on the most fractional integer variable (lowest index on ties) and
    /// explores the rounded-down child first, so the search order only depends on
    /// the problem data.
    pub(crate) fn solve_integer(&self, problem: &LpProblem) -> Solution {
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };
        let mut incumbent: Option<(f64, Vec<f64>)> = None;
        let mut stack: Vec<Vec<Bound>> = vec![Vec::new()];
        let mut nodes = 0;

        while let Some(bounds) = stack.pop() {
            nodes += 1;
            if nodes > self.max_nodes {
                log::warn!("branch-and-bound stopped after {} nodes", self.max_nodes);
                return Solution::error();
            }

            let relaxation = self.solve_lp(&with_bounds(problem, &bounds));
            match relaxation.status {
                SolutionStatus::Optimal => {}
                SolutionStatus::Infeasible => continue,
                SolutionStatus::Unbounded if bounds.is_empty() => return Solution::unbounded(),
                SolutionStatus::Unbounded => continue,
                SolutionStatus::Error => return Solution::error(),
            }

            if let Some((best, _)) = &incumbent {
                if sense * relaxation.objective_value >= sense * best - self.tolerance {
                    continue;
                }
            }

            match self.branching_variable(problem, &relaxation.values) {
                Some(var) => {
                    let value = relaxation.values[var];
                    let mut up = bounds.clone();
                    up.push(Bound {
                        var,
                        op: ConstraintOp::Ge,
                        value: value.ceil(),
                    });
                    let mut down = bounds;
                    down.push(Bound {
                        var,
                        op: ConstraintOp::Le,
                        value: value.floor(),
                    });
                    stack.push(up);
                    stack.push(down);
                }
                None => {
                    let values = self.snap(problem, relaxation.values);
                    let objective = problem.evaluate(&values);
                    log::trace!("new incumbent {} at node {}", objective, nodes);
                    incumbent = Some((objective, values));
                }
            }
        }

        log::debug!("branch-and-bound explored {} nodes", nodes);

        match incumbent {
            Some((objective_value, values)) => Solution {
                status: SolutionStatus::Optimal,
                values,
                objective_value,
                duals: Vec::new(),
            },
            None => Solution::infeasible(),
        }
    }

    fn branching_variable(&self, problem: &LpProblem, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (j, (&kind, &value)) in problem.kinds.iter().zip(values).enumerate() {
            if kind != VarKind::Integer {
                continue;
            }
            let fractionality = (value - value.round()).abs();
            if fractionality <= self.integrality_tolerance {
                continue;
            }
            if best.is_none_or(|(_, f)| fractionality > f + self.tolerance) {
                best = Some((j, fractionality));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Round integer variables that are within tolerance of an integer
    fn snap(&self, problem: &LpProblem, mut values: Vec<f64>) -> Vec<f64> {
        for (value, &kind) in values.iter_mut().zip(&problem.kinds) {
            if kind == VarKind::Integer {
                *value = value.round();
            }
        }
        values
    }
}

fn with_bounds(problem: &LpProblem, bounds: &[Bound]) -> LpProblem {
    let mut node = problem.clone();
    let n = problem.num_variables();
    for bound in bounds {
        let mut coefficients = vec![0.0; n];
        coefficients[bound.var] = 1.0;
        let name = format!("branch_{}", problem.variables[bound.var]);
        node.add_constraint(name, coefficients, bound.op, bound.value);
    }
    node
}
