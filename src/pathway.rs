//! Running a loaded model from problem construction through to output files.
use crate::optimisation::diagnostics::diagnose_infeasibility;
use crate::optimisation::problem::Problem;
use crate::optimisation::{SolveStatus, SolverOutcome, build_problem, solve};
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::registry::EntityRegistry;
use crate::results::Solution;
use anyhow::{Result, bail, ensure};
use itertools::Itertools;
use log::{info, warn};
use std::path::Path;

/// Build and solve the pathway problem for a model, then write the results.
///
/// # Arguments
///
/// * `registry` - The model to run
/// * `output_path` - Folder for the output files, which must already exist
/// * `diagnose` - Whether to look for the conflicting constraint families if the model is
///   infeasible
pub fn run(registry: &EntityRegistry, output_path: &Path, diagnose: bool) -> Result<()> {
    let pathway = build_problem(registry);
    let settings = &registry.parameters.solver;
    let outcome = solve(&pathway.problem, settings)?;

    match outcome.status {
        SolveStatus::Optimal => {}
        SolveStatus::TimeLimitReached => check_incumbent(&pathway.problem, &outcome)?,
        SolveStatus::Infeasible => {
            if !diagnose {
                bail!("The model is infeasible");
            }

            info!("The model is infeasible; looking for conflicting constraints");
            let families = diagnose_infeasibility(&pathway.problem, settings)?;
            if families.is_empty() {
                bail!("The model is infeasible because of variable bounds alone");
            }
            bail!(
                "The model is infeasible. These constraints cannot all be met: {}",
                families.iter().join(", ")
            );
        }
    }

    let solution = Solution::new(registry, pathway, outcome);
    info!("Total discounted cost: {:.2}", solution.objective());

    DataWriter::create(output_path)?.write_solution(&solution)?;
    write_metadata(output_path, &registry.model_path, &solution)?;
    info!("Results written to {}", output_path.display());

    Ok(())
}

/// Check that a solve stopped by the time limit found a feasible solution to write
fn check_incumbent(problem: &Problem, outcome: &SolverOutcome) -> Result<()> {
    ensure!(
        problem.is_feasible(&outcome.columns),
        "Time limit reached before a feasible solution was found"
    );
    warn!("Time limit reached; the solution written may not be optimal");

    Ok(())
}
