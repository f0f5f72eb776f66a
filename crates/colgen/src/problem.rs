use colgen_solver::ConstraintOp;

use crate::error::ProblemError;

/// A linear row `coefficients · x op rhs` over the easy variables
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub coefficients: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_op"))]
    pub op: ConstraintOp,
    pub rhs: f64,
}

#[cfg(feature = "serde")]
fn default_op() -> ConstraintOp {
    ConstraintOp::Le
}

impl Row {
    pub fn new(name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) -> Self {
        Self {
            name: name.into(),
            coefficients,
            op,
            rhs,
        }
    }

    /// `<=` row, the shape every row of the reference instance has
    pub fn le(name: impl Into<String>, coefficients: Vec<f64>, rhs: f64) -> Self {
        Self::new(name, coefficients, ConstraintOp::Le, rhs)
    }

    pub fn lhs(&self, x: &[f64]) -> f64 {
        dot(&self.coefficients, x)
    }

    pub fn is_satisfied(&self, x: &[f64], tolerance: f64) -> bool {
        self.op.holds(self.lhs(x), self.rhs, tolerance)
    }
}

/// A block-structured minimization problem over non-negative "easy" variables:
///
/// ```text
/// minimize   c · x
/// subject to A_r · x  op  b_r     (complicating rows, priced through the master)
///            D_s · x  op  d_s     (easy rows, kept in the pricing sub-problem)
///            x >= 0
/// ```
///
/// together with the seed columns the restricted master starts from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDefinition {
    pub variables: Vec<String>,
    /// Objective coefficients `c`
    pub objective: Vec<f64>,
    pub complicating: Vec<Row>,
    pub easy: Vec<Row>,
    /// Initial extreme points of the easy region
    pub seeds: Vec<Vec<f64>>,
}

impl ProblemDefinition {
    /// The textbook instance:
    ///
    /// ```text
    /// minimize   x1 - 3 x2
    /// subject to -x1 + 2 x2 <= 6    (complicating)
    ///             x1 +   x2 <= 5    (easy)
    /// ```
    ///
    /// seeded with the extreme points `[0, 0]` and `[0, 5]`.
    pub fn reference() -> Self {
        Self {
            variables: vec!["x1".to_string(), "x2".to_string()],
            objective: vec![1.0, -3.0],
            complicating: vec![Row::le("c1", vec![-1.0, 2.0], 6.0)],
            easy: vec![Row::le("easy", vec![1.0, 1.0], 5.0)],
            seeds: vec![vec![0.0, 0.0], vec![0.0, 5.0]],
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.complicating.iter().chain(&self.easy)
    }

    /// Check dimensions and that every seed lies in the easy region
    pub fn validate(&self, tolerance: f64) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(ProblemError::NoVariables);
        }
        if self.objective.len() != n {
            return Err(ProblemError::ObjectiveLength {
                expected: n,
                found: self.objective.len(),
            });
        }
        if self.complicating.is_empty() {
            return Err(ProblemError::NoComplicatingRows);
        }

        for row in self.rows() {
            if row.coefficients.len() != n {
                return Err(ProblemError::RowLength {
                    row: row.name.clone(),
                    expected: n,
                    found: row.coefficients.len(),
                });
            }
            if !row.rhs.is_finite() || row.coefficients.iter().any(|c| !c.is_finite()) {
                return Err(ProblemError::NonFiniteRow(row.name.clone()));
            }
        }

        if self.seeds.len() < 2 {
            return Err(ProblemError::TooFewSeeds(self.seeds.len()));
        }
        for (seed, values) in self.seeds.iter().enumerate() {
            if values.len() != n {
                return Err(ProblemError::SeedLength {
                    seed,
                    expected: n,
                    found: values.len(),
                });
            }
            if let Some(&value) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(ProblemError::InvalidSeedValue { seed, value });
            }
            if let Some(row) = self.easy.iter().find(|row| !row.is_satisfied(values, tolerance)) {
                return Err(ProblemError::SeedViolatesRow {
                    seed,
                    row: row.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// `c · x`
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        dot(&self.objective, x)
    }

    /// `A_r · x` for every complicating row
    pub fn complicating_lhs(&self, x: &[f64]) -> Vec<f64> {
        self.complicating.iter().map(|row| row.lhs(x)).collect()
    }

    /// Names of the rows `x` violates; a negative entry is reported as `x >= 0`
    pub fn violated_rows(&self, x: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated: Vec<String> = self
            .rows()
            .filter(|row| !row.is_satisfied(x, tolerance))
            .map(|row| row.name.clone())
            .collect();
        if x.iter().any(|v| *v < -tolerance) {
            violated.push("x >= 0".to_string());
        }
        violated
    }

    pub fn is_feasible(&self, x: &[f64], tolerance: f64) -> bool {
        self.violated_rows(x, tolerance).is_empty()
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
