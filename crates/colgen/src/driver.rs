use crate::backend::LpBackend;
use crate::column::{Column, ColumnStore};
use crate::error::DecompositionError;
use crate::master::{MasterDuals, MasterSolution, RestrictedMaster};
use crate::pricing::{PricingResult, price};
use crate::problem::ProblemDefinition;

/// What to do when pricing proposes a column that is already stored
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail the run with `DecompositionError::DuplicateColumn`
    #[default]
    Reject,
    /// Add the column again as a new weight
    Accept,
}

/// Knobs of a decomposition run
#[derive(Debug, Clone)]
pub struct DecompositionConfig {
    /// Reduced costs below this (negative) value accept the column
    pub tolerance: f64,
    /// Maximum number of master/pricing rounds
    pub max_iterations: usize,
    pub duplicates: DuplicatePolicy,
    /// Tolerance for row checks and column comparison
    pub feasibility_tolerance: f64,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            tolerance: -1e-6,
            max_iterations: 100,
            duplicates: DuplicatePolicy::Reject,
            feasibility_tolerance: 1e-6,
        }
    }
}

impl DecompositionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tol: f64) -> Self {
        self.feasibility_tolerance = tol;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Iterating,
    Converged,
    Failed,
}

/// One master solve followed by one pricing round
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub master_objective: f64,
    pub duals: MasterDuals,
    pub candidate: Vec<f64>,
    pub pricing_objective: f64,
    pub reduced_cost: f64,
    /// Index the candidate was stored at, if it was accepted
    pub accepted: Option<usize>,
}

/// Result of a converged run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct DecompositionResult {
    /// Objective value of the last master solve
    pub objective_value: f64,
    /// `sum_i column_i * weight_i` over the final weights
    pub solution: Vec<f64>,
    pub weights: Vec<f64>,
    pub columns: Vec<Column>,
    pub iterations: Vec<IterationRecord>,
}

impl DecompositionResult {
    /// Values of the columns pricing added, in the order they were accepted
    pub fn generated_columns(&self) -> Vec<&[f64]> {
        self.iterations
            .iter()
            .filter_map(|record| record.accepted.map(|_| record.candidate.as_slice()))
            .collect()
    }

    /// Master objective after each solve
    pub fn objective_trace(&self) -> Vec<f64> {
        self.iterations.iter().map(|record| record.master_objective).collect()
    }
}

/// What a single `step` did
#[derive(Debug, Clone)]
pub enum Step {
    /// The candidate had negative reduced cost and now has a weight in the master
    ColumnAdded { index: usize, reduced_cost: f64 },
    /// No improving column exists; holds the final master solution
    Converged(MasterSolution),
}

/// State of one column-generation run: the column ledger and the master built
/// over it. Each run owns its state; nothing is shared between runs.
pub struct DecompositionRun<'a, B: LpBackend> {
    problem: &'a ProblemDefinition,
    backend: B,
    config: DecompositionConfig,
    store: ColumnStore,
    master: RestrictedMaster,
    state: RunState,
    trace: Vec<IterationRecord>,
}

impl<'a, B: LpBackend> DecompositionRun<'a, B> {
    /// Validate `problem`, store the seed columns and build the initial master
    pub fn new(
        problem: &'a ProblemDefinition,
        backend: B,
        config: DecompositionConfig,
    ) -> Result<Self, DecompositionError> {
        problem.validate(config.feasibility_tolerance)?;

        let mut store = ColumnStore::new();
        for seed in &problem.seeds {
            store.append(Column::seed(seed.clone()));
        }
        let master = RestrictedMaster::new(problem, &store)?;

        log::info!(
            "decomposition started: {} variables, {} complicating rows, {} easy rows, {} seed columns",
            problem.num_variables(),
            problem.complicating.len(),
            problem.easy.len(),
            store.len()
        );

        Ok(Self {
            problem,
            backend,
            config,
            store,
            master,
            state: RunState::Iterating,
            trace: Vec::new(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn columns(&self) -> &ColumnStore {
        &self.store
    }

    pub fn master(&self) -> &RestrictedMaster {
        &self.master
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.trace
    }

    /// Run one master solve and one pricing round.
    ///
    /// Any error moves the run to `RunState::Failed`. A converged or failed run
    /// is left untouched and returns `DecompositionError::Finished`.
    pub fn step(&mut self) -> Result<Step, DecompositionError> {
        if self.state != RunState::Iterating {
            log::warn!("step called on a run that is {:?}", self.state);
            return Err(DecompositionError::Finished(self.state));
        }
        let result = self.iterate();
        self.state = match &result {
            Ok(Step::ColumnAdded { .. }) => RunState::Iterating,
            Ok(Step::Converged(_)) => RunState::Converged,
            Err(_) => RunState::Failed,
        };
        result
    }

    fn iterate(&mut self) -> Result<Step, DecompositionError> {
        let iteration = self.trace.len();
        let master = self.master.solve(&self.backend)?;
        log::debug!(
            "iteration {}: duals pi={:?} alpha={}",
            iteration,
            master.duals.complicating,
            master.duals.convexity
        );

        let PricingResult {
            column,
            objective_value,
            reduced_cost,
        } = price(self.problem, &master.duals, &self.backend)?;

        log::info!(
            "iteration {}: master objective {:.6}, reduced cost {:.6}",
            iteration,
            master.objective_value,
            reduced_cost
        );

        let mut record = IterationRecord {
            iteration,
            master_objective: master.objective_value,
            duals: master.duals.clone(),
            candidate: column.clone(),
            pricing_objective: objective_value,
            reduced_cost,
            accepted: None,
        };

        if reduced_cost >= self.config.tolerance {
            self.trace.push(record);
            log::info!(
                "converged after {} iterations with objective {:.6}",
                self.trace.len(),
                master.objective_value
            );
            return Ok(Step::Converged(master));
        }

        if let Some(existing) = self.store.find(&column, self.config.feasibility_tolerance) {
            log::warn!(
                "pricing returned column {:?} already stored at index {}",
                column,
                existing
            );
            if self.config.duplicates == DuplicatePolicy::Reject {
                self.trace.push(record);
                return Err(DecompositionError::DuplicateColumn {
                    column,
                    index: existing,
                    reduced_cost,
                });
            }
        }

        let objective_coeff = self.problem.objective_value(&column);
        let complicating_coeffs = self.problem.complicating_lhs(&column);
        let index = self.store.append(Column::generated(column, iteration));
        self.master.add_column(index, objective_coeff, &complicating_coeffs)?;
        debug_assert_eq!(self.master.num_weights(), self.store.len());

        record.accepted = Some(index);
        self.trace.push(record);
        Ok(Step::ColumnAdded { index, reduced_cost })
    }

    /// Iterate until convergence or until the run has done `max_iterations`
    /// rounds in total
    pub fn run(mut self) -> Result<DecompositionResult, DecompositionError> {
        while self.trace.len() < self.config.max_iterations {
            if let Step::Converged(master) = self.step()? {
                return Ok(self.finish(master));
            }
        }

        self.state = RunState::Failed;
        log::warn!(
            "no convergence after {} iterations ({} columns)",
            self.config.max_iterations,
            self.store.len()
        );
        Err(DecompositionError::DidNotConverge {
            iterations: self.config.max_iterations,
        })
    }

    fn finish(self, master: MasterSolution) -> DecompositionResult {
        let solution = self.store.combine(&master.weights, self.problem.num_variables());

        let violated = self.problem.violated_rows(&solution, self.config.feasibility_tolerance);
        if !violated.is_empty() {
            log::warn!("combined solution {:?} violates {:?}", solution, violated);
        }

        DecompositionResult {
            objective_value: master.objective_value,
            solution,
            weights: master.weights,
            columns: self.store.into_columns(),
            iterations: self.trace,
        }
    }
}

/// Run column generation on `problem` to convergence
pub fn decompose<B: LpBackend>(
    problem: &ProblemDefinition,
    backend: B,
    config: DecompositionConfig,
) -> Result<DecompositionResult, DecompositionError> {
    DecompositionRun::new(problem, backend, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOrigin;
    use crate::error::Stage;
    use approx::assert_abs_diff_eq;
    use colgen_solver::{LpProblem, Solution, SolutionStatus, Solver};
    use std::cell::Cell;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_reference_steps() {
        init_logger();
        let problem = ProblemDefinition::reference();
        let mut run = DecompositionRun::new(&problem, Solver::new(), DecompositionConfig::default()).unwrap();
        assert_eq!(run.state(), RunState::Iterating);

        match run.step().unwrap() {
            Step::ColumnAdded { index, reduced_cost } => {
                assert_eq!(index, 2);
                assert_abs_diff_eq!(reduced_cost, -2.5, epsilon = 1e-9);
            }
            other => panic!("expected a new column, got {:?}", other),
        }
        assert_eq!(run.columns().len(), 3);
        assert_eq!(run.master().num_weights(), 3);
        assert_eq!(
            run.columns().get(2).unwrap().origin(),
            ColumnOrigin::Generated { iteration: 0 }
        );

        match run.step().unwrap() {
            Step::Converged(master) => {
                assert_abs_diff_eq!(master.objective_value, -29.0 / 3.0, epsilon = 1e-9);
            }
            other => panic!("expected convergence, got {:?}", other),
        }
        assert_eq!(run.state(), RunState::Converged);
        assert_eq!(run.iterations().len(), 2);
        assert_eq!(run.iterations()[0].accepted, Some(2));
        assert_eq!(run.iterations()[1].accepted, None);
    }

    #[test]
    fn test_step_after_convergence_is_refused() {
        let problem = ProblemDefinition::reference();
        let mut run = DecompositionRun::new(&problem, Solver::new(), DecompositionConfig::default()).unwrap();
        while let Step::ColumnAdded { .. } = run.step().unwrap() {}
        assert_eq!(run.state(), RunState::Converged);
        let trace_len = run.iterations().len();

        let err = run.step().unwrap_err();

        assert_eq!(err, DecompositionError::Finished(RunState::Converged));
        assert_eq!(run.state(), RunState::Converged);
        assert_eq!(run.iterations().len(), trace_len);
        assert_eq!(run.columns().len(), 3);
    }

    #[test]
    fn test_step_after_failure_is_refused() {
        let mut problem = ProblemDefinition::reference();
        problem.complicating[0].rhs = -20.0;
        let mut run = DecompositionRun::new(&problem, Solver::new(), DecompositionConfig::default()).unwrap();
        run.step().unwrap_err();
        assert_eq!(run.state(), RunState::Failed);

        let err = run.step().unwrap_err();

        assert_eq!(err, DecompositionError::Finished(RunState::Failed));
        assert_eq!(run.state(), RunState::Failed);
        assert!(run.iterations().is_empty());
    }

    #[test]
    fn test_iteration_cap() {
        let problem = ProblemDefinition::reference();
        let config = DecompositionConfig::default().with_max_iterations(1);

        let err = decompose(&problem, Solver::new(), config).unwrap_err();

        assert_eq!(err, DecompositionError::DidNotConverge { iterations: 1 });
    }

    #[test]
    fn test_failed_state_on_infeasible_master() {
        let mut problem = ProblemDefinition::reference();
        problem.complicating[0].rhs = -20.0;
        let mut run = DecompositionRun::new(&problem, Solver::new(), DecompositionConfig::default()).unwrap();

        let err = run.step().unwrap_err();

        assert_eq!(err, DecompositionError::Infeasible(Stage::Master));
        assert_eq!(run.state(), RunState::Failed);
        assert!(run.iterations().is_empty());
    }

    #[test]
    fn test_invalid_problem_rejected_before_solving() {
        let mut problem = ProblemDefinition::reference();
        problem.seeds.pop();

        let err = decompose(&problem, Solver::new(), DecompositionConfig::default()).unwrap_err();

        assert!(matches!(err, DecompositionError::Problem(_)));
    }

    /// Always prices the same stored seed with a negative reduced cost
    struct StuckPricing {
        inner: Solver,
        calls: Cell<usize>,
    }

    impl LpBackend for StuckPricing {
        fn solve(&self, problem: &LpProblem) -> Solution {
            self.calls.set(self.calls.get() + 1);
            if problem.has_integer_variables() {
                let mut solution = Solution::infeasible();
                solution.status = SolutionStatus::Optimal;
                solution.values = vec![0.0, 5.0];
                solution.objective_value = -1.0;
                solution
            } else {
                self.inner.solve(problem)
            }
        }
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let problem = ProblemDefinition::reference();
        let backend = StuckPricing {
            inner: Solver::new(),
            calls: Cell::new(0),
        };

        let err = decompose(&problem, &backend, DecompositionConfig::default()).unwrap_err();

        assert_eq!(
            err,
            DecompositionError::DuplicateColumn {
                column: vec![0.0, 5.0],
                index: 1,
                reduced_cost: -1.0,
            }
        );
        assert_eq!(backend.calls.get(), 2);
    }

    #[test]
    fn test_duplicate_column_accepted() {
        let problem = ProblemDefinition::reference();
        let backend = StuckPricing {
            inner: Solver::new(),
            calls: Cell::new(0),
        };
        let config = DecompositionConfig::default()
            .with_duplicates(DuplicatePolicy::Accept)
            .with_max_iterations(3);

        let mut run = DecompositionRun::new(&problem, &backend, config).unwrap();
        run.step().unwrap();
        run.step().unwrap();

        assert_eq!(run.columns().len(), 4);
        assert_eq!(run.master().num_weights(), 4);
        assert_eq!(run.columns().find(&[0.0, 5.0], 1e-9), Some(1));

        let err = run.run().unwrap_err();
        assert_eq!(err, DecompositionError::DidNotConverge { iterations: 3 });
    }
}
