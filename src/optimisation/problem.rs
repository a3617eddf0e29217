//! An in-memory linear problem which can be handed to a solver backend.
//!
//! Building the problem separately from the solver lets constraint generators be tested without
//! solving, and lets [`super::diagnostics`] re-solve the problem with some constraint families
//! switched off.
use indexmap::IndexMap;
use std::ops::{Bound, RangeBounds};
use strum::{Display, EnumIter};

/// A decision variable in the optimisation.
///
/// This refers to a column of the problem; it does not hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The column index of this variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// The kinds of decision variable in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum VariableFamily {
    /// Freight carried (kt per modeled period)
    Flow,
    /// Vehicles in service
    StockTotal,
    /// Vehicles carried over from the previous modeled year
    StockExisting,
    /// Vehicles bought
    StockAdded,
    /// Vehicles retired early
    StockRemoved,
    /// Energy taken from fueling infrastructure at a node (kWh per period)
    EnergyDrawn,
    /// Energy in the tank on leaving a node, summed over trips (kWh)
    StateOfCharge,
    /// Elapsed time on leaving a node, summed over trips (vehicle-hours)
    TravelTime,
    /// Rest time taken at a node beyond charging, summed over trips (vehicle-hours)
    BreakTime,
    /// Fueling infrastructure built (kW)
    FuelingCapacityAdded,
    /// Mode infrastructure built (tonne-km per year)
    ModeCapacityAdded,
}

/// The kinds of constraint in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    /// Every OD pair's demand is carried
    DemandCoverage,
    /// Vintage accounting between purchases, carry-over and retirement
    StockBalance,
    /// Vehicles leave service once they exceed their lifetime
    StockAging,
    /// Enough vehicles are in service to carry the assigned flow
    VehicleSizing,
    /// Limits on year-to-year changes in each tech vehicle's stock
    StockShift,
    /// Energy drawn at a node is limited by installed fueling capacity
    FuelingCapacity,
    /// Tonne-km into a node is limited by installed mode infrastructure
    ModeInfrastructure,
    /// Energy in the tank along a route
    StateOfCharge,
    /// Elapsed time along a route
    TravelTime,
    /// Rest breaks required by driving-time regulation
    MandatoryBreaks,
    /// Limits on year-to-year changes in each mode's tonne-km
    ModalShift,
    /// Limits on each mode's share of tonne-km
    ModeShare,
    /// Limits on the share of new vehicles from a group
    MarketShare,
    /// Limits on capital spent on new vehicles
    PurchaseBudget,
    /// Limits on annual emissions
    EmissionLimit,
    /// Limits on annual emissions of a single mode
    ModeEmissionLimit,
}

/// The bounds and type of one variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// Which family the variable belongs to
    pub family: VariableFamily,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Whether the variable must take a whole-number value
    pub integer: bool,
}

/// A constraint of the form `min <= a1*x1 + a2*x2 + ... <= max`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Which family the constraint belongs to
    pub family: ConstraintFamily,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Non-zero coefficients. Each variable appears at most once.
    pub terms: Vec<(Variable, f64)>,
}

/// A minimisation problem
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Problem {
    variables: Vec<VariableDefinition>,
    costs: Vec<f64>,
    offset: f64,
    rows: Vec<Row>,
}

/// Largest violation of a bound or integrality, relative to the size of the bound, for a solution
/// to count as feasible
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Whether `value` lies in `min..=max`, allowing a violation relative to `scale` or the bound
fn within(value: f64, min: f64, max: f64, scale: f64) -> bool {
    let slack = |bound: f64| FEASIBILITY_TOLERANCE * bound.abs().max(scale).max(1.0);
    value >= min - slack(min) && value <= max + slack(max)
}

fn bound_value(bound: Bound<&f64>, unbounded: f64) -> f64 {
    match bound {
        Bound::Included(value) | Bound::Excluded(value) => *value,
        Bound::Unbounded => unbounded,
    }
}

impl Problem {
    /// Add a variable with the given bounds and no cost
    pub fn add_variable(
        &mut self,
        family: VariableFamily,
        bounds: impl RangeBounds<f64>,
        integer: bool,
    ) -> Variable {
        self.variables.push(VariableDefinition {
            family,
            min: bound_value(bounds.start_bound(), f64::NEG_INFINITY),
            max: bound_value(bounds.end_bound(), f64::INFINITY),
            integer,
        });
        self.costs.push(0.0);

        Variable(self.variables.len() - 1)
    }

    /// Add `cost` to the objective coefficient of `variable`
    pub fn add_cost(&mut self, variable: Variable, cost: f64) {
        self.costs[variable.0] += cost;
    }

    /// Add a constant to the objective
    pub fn add_offset(&mut self, value: f64) {
        self.offset += value;
    }

    /// Add a constraint.
    ///
    /// Terms for the same variable are summed and zero coefficients are dropped. A row with no
    /// terms left is only kept if it is violated (i.e. its bounds exclude zero), so that
    /// infeasibility is still reported.
    pub fn add_row<I>(&mut self, family: ConstraintFamily, bounds: impl RangeBounds<f64>, terms: I)
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let mut merged: IndexMap<Variable, f64> = IndexMap::new();
        for (variable, coefficient) in terms {
            *merged.entry(variable).or_default() += coefficient;
        }
        let terms = merged
            .into_iter()
            .filter(|(_, coefficient)| *coefficient != 0.0)
            .collect::<Vec<_>>();

        let min = bound_value(bounds.start_bound(), f64::NEG_INFINITY);
        let max = bound_value(bounds.end_bound(), f64::INFINITY);
        if terms.is_empty() && min <= 0.0 && max >= 0.0 {
            return;
        }

        self.rows.push(Row {
            family,
            min,
            max,
            terms,
        });
    }

    /// The variable definitions, in column order
    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// The objective coefficients, in column order
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// The objective coefficient of a variable
    pub fn cost(&self, variable: Variable) -> f64 {
        self.costs[variable.0]
    }

    /// The constant part of the objective
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// The constraints, in the order they were added
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterate over the constraints of one family
    pub fn rows_in(&self, family: ConstraintFamily) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.family == family)
    }

    /// The number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether any variable must be integer
    pub fn is_mip(&self) -> bool {
        self.variables.iter().any(|definition| definition.integer)
    }

    /// Whether the given column values satisfy every variable bound, integrality requirement and
    /// constraint, to within a small tolerance.
    ///
    /// A solver which stops early may return values without having found a feasible point.
    pub fn is_feasible(&self, columns: &[f64]) -> bool {
        if columns.len() != self.variables.len() || !columns.iter().all(|value| value.is_finite()) {
            return false;
        }

        let variables_ok = self.variables.iter().zip(columns).all(|(definition, &value)| {
            within(value, definition.min, definition.max, value.abs())
                && (!definition.integer || (value - value.round()).abs() <= FEASIBILITY_TOLERANCE)
        });

        variables_ok
            && self.rows.iter().all(|row| {
                let products = row
                    .terms
                    .iter()
                    .map(|(variable, coefficient)| coefficient * columns[variable.0]);
                let activity = products.clone().sum::<f64>();
                let magnitude = products.map(f64::abs).fold(0.0, f64::max);
                within(activity, row.min, row.max, magnitude)
            })
    }

    /// The objective value for the given column values
    pub fn objective_value(&self, columns: &[f64]) -> f64 {
        self.offset
            + self
                .costs
                .iter()
                .zip(columns)
                .map(|(cost, value)| cost * value)
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use std::iter;

    #[test]
    fn test_add_row_merges_terms() {
        let mut problem = Problem::default();
        let x = problem.add_variable(VariableFamily::Flow, 0.0.., false);
        let y = problem.add_variable(VariableFamily::Flow, 0.0..=5.0, true);
        problem.add_row(
            ConstraintFamily::DemandCoverage,
            1.0..=1.0,
            [(x, 1.0), (y, 2.0), (x, 0.5), (y, -2.0)],
        );

        assert_eq!(problem.rows()[0].terms, [(x, 1.5)]);
        assert_eq!(problem.variables()[1].max, 5.0);
        assert!(problem.is_mip());
    }

    #[test]
    fn test_add_row_empty() {
        let mut problem = Problem::default();
        problem.add_row(ConstraintFamily::StockAging, 0.0..=0.0, iter::empty());
        assert_eq!(problem.num_rows(), 0);

        // An empty row which can't be satisfied is kept so the problem is infeasible
        problem.add_row(ConstraintFamily::DemandCoverage, 1.0..=1.0, iter::empty());
        assert_eq!(problem.num_rows(), 1);
    }

    #[test]
    fn test_objective_value() {
        let mut problem = Problem::default();
        let x = problem.add_variable(VariableFamily::Flow, 0.0.., false);
        let y = problem.add_variable(VariableFamily::StockTotal, 0.0.., false);
        problem.add_cost(x, 2.0);
        problem.add_cost(y, 3.0);
        problem.add_cost(x, 1.0);
        problem.add_offset(10.0);
        assert_approx_eq!(f64, problem.objective_value(&[1.0, 2.0]), 19.0);
    }

    #[test]
    fn test_is_feasible() {
        let mut problem = Problem::default();
        let x = problem.add_variable(VariableFamily::Flow, 0.0.., false);
        let y = problem.add_variable(VariableFamily::StockAdded, 0.0..=10.0, true);
        problem.add_row(ConstraintFamily::DemandCoverage, 4.0..=4.0, [(x, 1.0), (y, 1.0)]);

        assert!(problem.is_feasible(&[2.0, 2.0]));
        assert!(problem.is_feasible(&[2.0 + 1e-9, 2.0]));

        // Row violated, integrality violated, bound violated, wrong length, not a number
        assert!(!problem.is_feasible(&[0.0, 0.0]));
        assert!(!problem.is_feasible(&[1.5, 2.5]));
        assert!(!problem.is_feasible(&[-7.0, 11.0]));
        assert!(!problem.is_feasible(&[]));
        assert!(!problem.is_feasible(&[f64::NAN, 2.0]));
    }

    #[test]
    fn test_family_names() {
        assert_eq!(VariableFamily::FuelingCapacityAdded.to_string(), "fueling_capacity_added");
        assert_eq!(ConstraintFamily::ModeShare.to_string(), "mode_share");
    }
}
