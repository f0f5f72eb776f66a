use thiserror::Error;

/// Represents a linear (or mixed-integer) programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Domain of each variable (all variables are non-negative)
    pub kinds: Vec<VarKind>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarKind {
    #[default]
    Continuous,
    Integer,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Objective has {found} coefficients but the problem has {expected} variables")]
    ObjectiveLength { expected: usize, found: usize },
    #[error("Constraint {name} has {found} coefficients but the problem has {expected} variables")]
    ConstraintLength { name: String, expected: usize, found: usize },
    #[error("Unknown constraint index {0}")]
    UnknownConstraint(usize),
}

impl ConstraintOp {
    /// Whether `lhs op rhs` holds within `tolerance`
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ConstraintOp::Le => lhs <= rhs + tolerance,
            ConstraintOp::Ge => lhs >= rhs - tolerance,
            ConstraintOp::Eq => (lhs - rhs).abs() <= tolerance,
        }
    }
}

impl Constraint {
    /// Left-hand side value of this constraint at `values`
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            kinds: vec![VarKind::Continuous; n],
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    /// Create a problem whose variables all share the same domain
    pub fn with_kind(variables: Vec<String>, kind: VarKind) -> Self {
        let mut problem = Self::new(variables);
        problem.kinds.fill(kind);
        problem
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    /// Append a variable together with its column: its objective coefficient and
    /// its coefficient in each listed constraint (all other constraints get 0).
    ///
    /// Existing variables, constraints and coefficients are left untouched.
    /// Returns the index of the new variable.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        objective: f64,
        column: &[(usize, f64)],
    ) -> Result<usize, ModelError> {
        if let Some(&(row, _)) = column.iter().find(|(row, _)| *row >= self.constraints.len()) {
            return Err(ModelError::UnknownConstraint(row));
        }

        let index = self.variables.len();
        self.variables.push(name.into());
        self.kinds.push(kind);
        self.objective.coefficients.push(objective);
        for constraint in &mut self.constraints {
            constraint.coefficients.push(0.0);
        }
        for &(row, coef) in column {
            self.constraints[row].coefficients[index] = coef;
        }
        Ok(index)
    }

    /// Check that every coefficient vector has one entry per variable
    pub fn validate(&self) -> Result<(), ModelError> {
        let expected = self.num_variables();
        if self.objective.coefficients.len() != expected {
            return Err(ModelError::ObjectiveLength {
                expected,
                found: self.objective.coefficients.len(),
            });
        }
        for c in &self.constraints {
            if c.coefficients.len() != expected {
                return Err(ModelError::ConstraintLength {
                    name: c.name.clone(),
                    expected,
                    found: c.coefficients.len(),
                });
            }
        }
        Ok(())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.kinds.contains(&VarKind::Integer)
    }

    /// Objective value at `values`
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variable_extends_every_row() {
        let mut problem = LpProblem::new(vec!["a".to_string()]);
        problem.set_objective(vec![2.0], true);
        problem.add_constraint("first", vec![1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("second", vec![3.0], ConstraintOp::Le, 1.0);

        let index = problem
            .add_variable("b", VarKind::Continuous, -1.0, &[(1, 5.0)])
            .unwrap();

        assert_eq!(index, 1);
        assert_eq!(problem.objective.coefficients, vec![2.0, -1.0]);
        assert_eq!(problem.constraints[0].coefficients, vec![1.0, 0.0]);
        assert_eq!(problem.constraints[1].coefficients, vec![3.0, 5.0]);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_add_variable_rejects_unknown_row() {
        let mut problem = LpProblem::new(vec!["a".to_string()]);
        problem.add_constraint("only", vec![1.0], ConstraintOp::Le, 1.0);

        let err = problem
            .add_variable("b", VarKind::Continuous, 0.0, &[(3, 1.0)])
            .unwrap_err();

        assert_eq!(err, ModelError::UnknownConstraint(3));
        assert_eq!(problem.num_variables(), 1);
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.add_constraint("short", vec![1.0], ConstraintOp::Ge, 0.0);

        assert!(matches!(
            problem.validate(),
            Err(ModelError::ConstraintLength { expected: 2, found: 1, .. })
        ));
    }
}
