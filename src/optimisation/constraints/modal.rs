//! Constraints on the split of tonne-km between modes.
use crate::mode::ModeID;
use crate::optimisation::problem::{ConstraintFamily, Problem, Variable};
use crate::optimisation::variables::{Variables, flow_options};
use crate::registry::EntityRegistry;
use indexmap::IndexMap;

/// Annual tonne-km (as kt-km) for each mode and modeled year, as linear terms in the flow variables
#[derive(Default)]
struct TonneKm {
    by_mode: IndexMap<(u32, ModeID), Vec<(Variable, f64)>>,
    by_year: IndexMap<u32, Vec<(Variable, f64)>>,
}

impl TonneKm {
    fn new(variables: &Variables, registry: &EntityRegistry) -> Self {
        let mut tkm = Self::default();
        for option in flow_options(registry) {
            let var = variables.flow.get(&option.key());
            let period_length = registry.temporal.period_length(option.year);
            let term = (var, option.distance_per_year(period_length));
            tkm.by_mode
                .entry((option.year, option.unit.mode().id.clone()))
                .or_default()
                .push(term);
            tkm.by_year.entry(option.year).or_default().push(term);
        }

        tkm
    }

    fn mode(&self, year: u32, mode_id: &ModeID) -> &[(Variable, f64)] {
        self.by_mode
            .get(&(year, mode_id.clone()))
            .map_or(&[], Vec::as_slice)
    }

    fn all(&self, year: u32) -> &[(Variable, f64)] {
        self.by_year.get(&year).map_or(&[], Vec::as_slice)
    }
}

/// Scale a set of terms by a constant factor
fn scaled(terms: &[(Variable, f64)], factor: f64) -> impl Iterator<Item = (Variable, f64)> + '_ {
    terms.iter().map(move |(var, coefficient)| (*var, coefficient * factor))
}

/// Add modal shift constraints, if the model sets a modal shift limit.
///
/// For each mode and modeled year after the first, the change in the mode's tonne-km is at most
/// `alpha` times the previous tonne-km of all modes plus `beta` times the mode's own previous
/// tonne-km, in either direction.
///
/// A mode carrying nothing in the first year can only grow by `alpha` times the total, so a small
/// `alpha` can make the model infeasible if the cheapest pathway needs a faster switch.
pub fn add_modal_shift_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let Some(limit) = registry.parameters.modal_shift else {
        return;
    };

    let tkm = TonneKm::new(variables, registry);
    let temporal = &registry.temporal;
    for &year in temporal.modeled_years() {
        let Some(previous_year) = temporal.previous_year(year) else {
            continue;
        };

        for mode_id in registry.modes.keys() {
            let current = tkm.mode(year, mode_id);
            let previous = tkm.mode(previous_year, mode_id);
            let all_previous = tkm.all(previous_year);

            let rise = scaled(current, 1.0)
                .chain(scaled(previous, -1.0 - limit.beta))
                .chain(scaled(all_previous, -limit.alpha));
            problem.add_row(ConstraintFamily::ModalShift, ..=0.0, rise);

            let fall = scaled(current, -1.0)
                .chain(scaled(previous, 1.0 - limit.beta))
                .chain(scaled(all_previous, -limit.alpha));
            problem.add_row(ConstraintFamily::ModalShift, ..=0.0, fall);
        }
    }
}

/// Add mode share constraints.
///
/// Each mode's tonne-km is bounded above and/or below by a fraction of the tonne-km of all modes.
pub fn add_mode_share_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let bounds = registry.mode_share_bounds();
    if bounds.is_empty() {
        return;
    }

    let tkm = TonneKm::new(variables, registry);
    for ((mode_id, year), bound) in bounds {
        let current = tkm.mode(year, &mode_id);
        let all = tkm.all(year);

        if let Some(max_share) = bound.max {
            let terms = scaled(current, 1.0).chain(scaled(all, -max_share));
            problem.add_row(ConstraintFamily::ModeShare, ..=0.0, terms);
        }
        if let Some(min_share) = bound.min {
            let terms = scaled(current, 1.0).chain(scaled(all, -min_share));
            problem.add_row(ConstraintFamily::ModeShare, 0.0.., terms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::model::ShiftLimit;
    use crate::optimisation::problem::Row;
    use crate::optimisation::variables::add_variables;
    use crate::registry::ModeShareLimit;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::rc::Rc;

    fn rail_flow(variables: &Variables, year: u32) -> Variable {
        variables
            .flow
            .iter()
            .find(|(key, _)| key.year == year && key.unit.to_string() == "rail")
            .map(|(_, var)| var)
            .unwrap()
    }

    #[rstest]
    fn test_mode_share(mut registry: EntityRegistry) {
        registry.mode_share_limits = vec![ModeShareLimit {
            mode: Rc::clone(&registry.modes["rail"]),
            years: vec![2020],
            min_share: Some(0.1),
            max_share: Some(0.3),
        }];
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_mode_share_constraints(&mut problem, &variables, &registry);

        let rows = problem.rows_in(ConstraintFamily::ModeShare).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);

        // Rail's own flow appears in both sides of the inequality
        let rail = rail_flow(&variables, 2020);
        let (max_row, min_row) = (rows[0], rows[1]);
        let coefficient = |row: &Row, var: Variable| {
            row.terms.iter().find(|(v, _)| *v == var).unwrap().1
        };
        assert_approx_eq!(f64, coefficient(max_row, rail), 0.7 * 600.0);
        assert_approx_eq!(f64, coefficient(min_row, rail), 0.9 * 600.0);
        assert_eq!(max_row.max, 0.0);
        assert_eq!(min_row.min, 0.0);

        // Six road flows in 2020, each on the other side
        assert_eq!(max_row.terms.len(), 7);
        assert!(
            max_row
                .terms
                .iter()
                .filter(|(var, _)| *var != rail)
                .all(|(_, coefficient)| (*coefficient + 0.3 * 600.0).abs() < 1e-9)
        );
    }

    #[rstest]
    fn test_mode_share_not_enforced(mut registry: EntityRegistry) {
        registry.parameters.enforce_modal_share = false;
        registry.mode_share_limits = vec![ModeShareLimit {
            mode: Rc::clone(&registry.modes["rail"]),
            years: vec![2020],
            min_share: None,
            max_share: Some(0.3),
        }];
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_mode_share_constraints(&mut problem, &variables, &registry);
        assert_eq!(problem.num_rows(), 0);
    }

    #[rstest]
    fn test_modal_shift(mut registry: EntityRegistry) {
        registry.parameters.modal_shift = Some(ShiftLimit {
            alpha: 0.1,
            beta: 0.5,
        });
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_modal_shift_constraints(&mut problem, &variables, &registry);

        // Two rows for each mode in 2021 and 2022
        let rows = problem.rows_in(ConstraintFamily::ModalShift).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2 * 2 * 2);

        // Rail's rise in 2021: rail_2021 - (1 + beta + alpha) * rail_2020 - alpha * road_2020
        let rail_rise = rows[2];
        let now = rail_flow(&variables, 2021);
        let before = rail_flow(&variables, 2020);
        assert_eq!(rail_rise.terms[0], (now, 600.0));
        assert_eq!(rail_rise.terms[1].0, before);
        assert_approx_eq!(f64, rail_rise.terms[1].1, -1.6 * 600.0);
        assert_eq!(rail_rise.terms.len(), 2 + 6);
    }
}
