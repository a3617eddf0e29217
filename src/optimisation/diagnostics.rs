//! Infeasibility diagnostics.
//!
//! When a model has no feasible solution, it is usually down to a few groups of constraints
//! working against each other (e.g. a tight emission limit and a maximum share for the only
//! clean mode). This module narrows the problem down to such a group.
use super::problem::{ConstraintFamily, Problem};
use super::solver::{SolveStatus, SolverSettings, solve_with_families};
use anyhow::{Result, ensure};
use log::{info, warn};
use strum::IntoEnumIterator;

/// Find an irreducible set of constraint families which is infeasible on its own.
///
/// This is a deletion filter over whole families: each family is switched off in turn and stays
/// off if the remaining families are still infeasible. Every family in the result is needed for
/// the infeasibility, though other irreducible sets may exist. An empty result means the variable
/// bounds alone are infeasible.
///
/// Fails if the full problem is not infeasible. A solve which hits the time limit proves nothing,
/// so the family it left out is kept.
pub fn diagnose_infeasibility(
    problem: &Problem,
    settings: &SolverSettings,
) -> Result<Vec<ConstraintFamily>> {
    let mut active: Vec<ConstraintFamily> = ConstraintFamily::iter()
        .filter(|family| problem.rows_in(*family).next().is_some())
        .collect();

    let outcome = solve_with_families(problem, settings, |_| true)?;
    ensure!(
        outcome.status == SolveStatus::Infeasible,
        "Cannot diagnose infeasibility: the problem is not infeasible (status: {})",
        outcome.status
    );

    for family in active.clone() {
        let remaining = active
            .iter()
            .copied()
            .filter(|other| *other != family)
            .collect::<Vec<_>>();
        let outcome = solve_with_families(problem, settings, |f| remaining.contains(&f))?;
        match outcome.status {
            SolveStatus::Infeasible => {
                info!("Still infeasible without {family} constraints");
                active = remaining;
            }
            SolveStatus::TimeLimitReached => {
                warn!("Hit the time limit when checking {family} constraints; keeping them");
            }
            SolveStatus::Optimal => {
                info!("{family} constraints are needed for the infeasibility");
            }
        }
    }

    Ok(active)
}
