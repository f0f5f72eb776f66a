use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colgen::{
    ColumnOrigin, DecompositionConfig, DecompositionResult, DuplicatePolicy, ProblemDefinition, ProblemError,
    decompose, solve_compact,
};
use colgen_solver::Solver;
use env_logger::Builder;

#[derive(Parser)]
#[command(name = "colgen")]
#[command(about = "Dantzig-Wolfe decomposition by column generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run column generation and print the optimal solution
    Solve {
        /// Problem definition (JSON); the built-in reference instance when omitted
        file: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Maximum number of master/pricing rounds
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
        /// Reduced costs below this value add a column
        #[arg(long, default_value_t = -1e-6, allow_hyphen_values = true)]
        tolerance: f64,
        /// Add duplicate columns instead of failing
        #[arg(long)]
        allow_duplicates: bool,
        /// Also solve the compact formulation and compare objectives
        #[arg(short, long)]
        compare: bool,
    },
    /// Solve the compact (non-decomposed) LP directly
    Compact {
        /// Problem definition (JSON); the built-in reference instance when omitted
        file: Option<PathBuf>,
    },
    /// Check a problem definition for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Print the reference problem definition as JSON
    Reference,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new().filter_level(cli.verbose.log_level_filter()).init();

    match cli.command {
        Commands::Solve {
            file,
            format,
            max_iterations,
            tolerance,
            allow_duplicates,
            compare,
        } => {
            let problem = load_problem(file.as_deref())?;
            let duplicates = if allow_duplicates {
                DuplicatePolicy::Accept
            } else {
                DuplicatePolicy::Reject
            };
            let config = DecompositionConfig::default()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance)
                .with_duplicates(duplicates);

            let result = decompose(&problem, Solver::new(), config).context("Column generation failed")?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Pretty => print_result(&problem, &result),
            }

            if compare {
                let compact = solve_compact(&problem, &Solver::new()).context("Solving compact formulation")?;
                let gap = (compact.objective_value - result.objective_value).abs();
                println!();
                println!("Compact objective: {:.6}", compact.objective_value);
                println!("Gap: {:.2e}", gap);
            }
        }
        Commands::Compact { file } => {
            let problem = load_problem(file.as_deref())?;
            let solution = solve_compact(&problem, &Solver::new()).context("Solving compact formulation")?;

            println!("Status: OPTIMAL");
            println!("Objective: {:.6}", solution.objective_value);
            for (name, value) in problem.variables.iter().zip(&solution.values) {
                println!("  {:20} {:12.6}", name, value);
            }
        }
        Commands::Check { file } => {
            let problem = read_problem(&file)?;
            if let Err(e) = check_problem(&problem) {
                eprintln!("✗ {} has errors:", file.display());
                eprintln!("  {}", e);
                bail!("invalid problem definition");
            }

            println!("✓ {} is valid", file.display());
            println!("  {} variables", problem.num_variables());
            println!("  {} complicating rows", problem.complicating.len());
            println!("  {} easy rows", problem.easy.len());
            println!("  {} seed columns", problem.seeds.len());
        }
        Commands::Reference => {
            println!("{}", serde_json::to_string_pretty(&ProblemDefinition::reference())?);
        }
    }

    Ok(())
}

/// Validate with the same feasibility tolerance `solve` uses
fn check_problem(problem: &ProblemDefinition) -> Result<(), ProblemError> {
    problem.validate(DecompositionConfig::default().feasibility_tolerance)
}

fn load_problem(file: Option<&Path>) -> Result<ProblemDefinition> {
    match file {
        Some(path) => read_problem(path),
        None => {
            log::info!("using the reference problem");
            Ok(ProblemDefinition::reference())
        }
    }
}

fn read_problem(path: &Path) -> Result<ProblemDefinition> {
    let source = std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    parse_problem(&source).with_context(|| format!("Parsing {}", path.display()))
}

fn parse_problem(source: &str) -> Result<ProblemDefinition> {
    Ok(serde_json::from_str(source)?)
}

fn print_result(problem: &ProblemDefinition, result: &DecompositionResult) {
    println!("Status: CONVERGED");
    println!("Iterations: {}", result.iterations.len());
    println!("Objective: {:.6}", result.objective_value);
    println!();

    println!("Solution:");
    for (name, value) in problem.variables.iter().zip(&result.solution) {
        println!("  {:20} {:12.6}", name, value);
    }
    println!();

    println!("Columns:");
    for (i, (column, weight)) in result.columns.iter().zip(&result.weights).enumerate() {
        let origin = match column.origin() {
            ColumnOrigin::Seed => "seed".to_string(),
            ColumnOrigin::Generated { iteration } => format!("iteration {}", iteration),
        };
        println!("  {:3} {:?} weight {:.6} ({})", i, column.values(), weight, origin);
    }
    println!();

    println!("Trace:");
    for record in &result.iterations {
        let decision = if record.accepted.is_some() { "added" } else { "stop" };
        println!(
            "  {:3} master {:12.6}  reduced cost {:12.6}  {:?} {}",
            record.iteration, record.master_objective, record.reduced_cost, record.candidate, decision
        );
    }
}
