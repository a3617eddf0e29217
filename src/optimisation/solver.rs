//! The solve driver: hands a [`Problem`] to the HiGHS solver and reads the solution back.
use super::problem::{ConstraintFamily, Problem, Variable};
use anyhow::{Result, anyhow, bail, ensure};
use highs::{HighsModelStatus, RowProblem, Sense};
use log::{Level, info, log_enabled, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use strum::Display;

/// A value for a free-form solver option
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SolverOptionValue {
    /// A boolean option
    Bool(bool),
    /// An integer option
    Int(i32),
    /// A floating-point option
    Float(f64),
    /// A string option
    Text(String),
}

/// Solver settings, as given in the `[solver]` section of `model.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SolverSettings {
    /// Wall-clock limit on the solve (seconds)
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which the solver stops
    pub mip_rel_gap: Option<f64>,
    /// Folder for branch-and-bound node files, for solvers which support them
    pub node_file_dir: Option<PathBuf>,
    /// Further options, passed to the solver unchanged
    #[serde(default)]
    pub options: BTreeMap<String, SolverOptionValue>,
}

impl SolverSettings {
    /// Check the settings are valid
    pub fn validate(&self) -> Result<()> {
        if let Some(time_limit) = self.time_limit {
            ensure!(
                time_limit.is_finite() && time_limit > 0.0,
                "solver.time_limit must be a finite number greater than zero"
            );
        }
        if let Some(gap) = self.mip_rel_gap {
            ensure!(
                (0.0..=1.0).contains(&gap),
                "solver.mip_rel_gap must be between zero and one"
            );
        }

        Ok(())
    }
}

/// The outcome of a solve which finished without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem has no feasible solution
    Infeasible,
    /// The solver stopped at the time limit. The solution is the best found so far, if any.
    TimeLimitReached,
}

/// The status and variable values returned by the solver
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// How the solve finished
    pub status: SolveStatus,
    /// The value of each variable, in column order
    pub columns: Vec<f64>,
    /// The objective value, including its constant part
    pub objective: f64,
}

impl SolverOutcome {
    /// The value the solver assigned to a variable
    pub fn value(&self, variable: Variable) -> f64 {
        self.columns[variable.index()]
    }
}

/// Solve the problem with HiGHS.
///
/// Infeasibility and hitting the time limit are reported through [`SolveStatus`]; an error is
/// only returned if the solver itself fails or ends in some other state (e.g. unbounded).
pub fn solve(problem: &Problem, settings: &SolverSettings) -> Result<SolverOutcome> {
    info!(
        "Solving problem with {} variables and {} constraints",
        problem.num_variables(),
        problem.num_rows()
    );
    let outcome = solve_with_families(problem, settings, |_| true)?;
    info!("Solver finished with status: {}", outcome.status);

    Ok(outcome)
}

/// Solve the problem using only the constraints whose family passes `include`
pub(super) fn solve_with_families<F>(
    problem: &Problem,
    settings: &SolverSettings,
    include: F,
) -> Result<SolverOutcome>
where
    F: Fn(ConstraintFamily) -> bool,
{
    let mut highs_problem = RowProblem::default();
    let columns = problem
        .variables()
        .iter()
        .zip(problem.costs())
        .map(|(definition, &cost)| {
            let bounds = definition.min..=definition.max;
            if definition.integer {
                highs_problem.add_integer_column(cost, bounds)
            } else {
                highs_problem.add_column(cost, bounds)
            }
        })
        .collect::<Vec<_>>();

    for row in problem.rows().iter().filter(|row| include(row.family)) {
        let factors = row
            .terms
            .iter()
            .map(|(variable, coefficient)| (columns[variable.index()], *coefficient));
        highs_problem.add_row(row.min..=row.max, factors);
    }

    let mut model = highs_problem.optimise(Sense::Minimise);
    configure(&mut model, settings)?;

    let solved = model
        .try_solve()
        .map_err(|status| anyhow!("Could not solve: {status:?}"))?;
    let status = match solved.status() {
        HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => SolveStatus::Optimal,
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            SolveStatus::Infeasible
        }
        HighsModelStatus::ReachedTimeLimit => SolveStatus::TimeLimitReached,
        status => bail!("Could not solve: {status:?}"),
    };

    let columns = solved.get_solution().columns().to_vec();
    let objective = problem.objective_value(&columns);
    Ok(SolverOutcome {
        status,
        columns,
        objective,
    })
}

/// Pass settings through to HiGHS
fn configure(model: &mut highs::Model, settings: &SolverSettings) -> Result<()> {
    // HiGHS writes straight to stdout rather than through our logger, so only let it talk when
    // debugging
    let verbose = log_enabled!(Level::Debug);
    model.set_option("output_flag", verbose);
    model.set_option("log_to_console", verbose);

    if let Some(time_limit) = settings.time_limit {
        model.set_option("time_limit", time_limit);
    }
    if let Some(gap) = settings.mip_rel_gap {
        model.set_option("mip_rel_gap", gap);
    }
    if let Some(dir) = &settings.node_file_dir {
        warn!(
            "HiGHS does not use node files; ignoring solver.node_file_dir ({})",
            dir.display()
        );
    }

    for (name, value) in &settings.options {
        let result = match value {
            SolverOptionValue::Bool(value) => model.try_set_option(name.as_str(), *value),
            SolverOptionValue::Int(value) => model.try_set_option(name.as_str(), *value),
            SolverOptionValue::Float(value) => model.try_set_option(name.as_str(), *value),
            SolverOptionValue::Text(value) => model.try_set_option(name.as_str(), value.as_str()),
        };
        result.map_err(|status| anyhow!("Invalid solver option {name}: {status:?}"))?;
    }

    Ok(())
}
