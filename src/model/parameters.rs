//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::network::DrivingRules;
use crate::optimisation::SolverSettings;
use crate::temporal::TemporalConfig;
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_discount_rate, f64, 0.05);
define_param_default!(default_enforce_modal_share, bool, true);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Rate at which future costs are discounted each year
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
    /// Whether vehicle stock variables must take whole-number values
    #[serde(default)]
    pub integer_stock: bool,
    /// Whether limits in `mode_share_limits.csv` are applied
    #[serde(default = "default_enforce_modal_share")]
    pub enforce_modal_share: bool,
    /// The horizon and temporal resolution of the optimisation
    pub time: TemporalConfig,
    /// Driving-time regulation used to place mandatory breaks
    #[serde(default)]
    pub driving: DrivingRules,
    /// Limits on how fast the stock of each tech vehicle can change. Unlimited if absent.
    pub stock_shift: Option<ShiftLimit>,
    /// Limits on how fast each mode's tonne-km can change. Unlimited if absent.
    pub modal_shift: Option<ShiftLimit>,
    /// Options passed on to the solver
    #[serde(default)]
    pub solver: SolverSettings,
}

/// Bounds the change in a quantity between consecutive modeled years.
///
/// The change may be at most `alpha` times the previous total across all options plus `beta`
/// times the option's own previous value.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ShiftLimit {
    /// Fraction of the previous total across all options
    pub alpha: f64,
    /// Fraction of the option's own previous value
    pub beta: f64,
}

fn check_discount_rate(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "discount_rate must be a finite number greater than or equal to zero"
    );
    if value > 1.0 {
        warn!("discount_rate is greater than 1 ({value}); it should be given as a fraction");
    }

    Ok(())
}

fn check_driving_rules(rules: &DrivingRules) -> Result<()> {
    ensure!(
        rules.max_driving_time.is_finite() && rules.max_driving_time > 0.0,
        "driving.max_driving_time must be a finite number greater than zero"
    );
    ensure!(
        rules.break_duration.is_finite() && rules.break_duration >= 0.0,
        "driving.break_duration must be a finite number greater than or equal to zero"
    );

    Ok(())
}

fn check_shift_limit(name: &str, limit: &ShiftLimit) -> Result<()> {
    for (field, value) in [("alpha", limit.alpha), ("beta", limit.beta)] {
        ensure!(
            value.is_finite() && value >= 0.0,
            "{name}.{field} must be a finite number greater than or equal to zero"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file.
    ///
    /// The temporal configuration is validated separately when the temporal index is built.
    fn validate(&self) -> Result<()> {
        check_discount_rate(self.discount_rate)?;
        check_driving_rules(&self.driving)?;
        if let Some(limit) = &self.stock_shift {
            check_shift_limit("stock_shift", limit)?;
        }
        if let Some(limit) = &self.modal_shift {
            check_shift_limit("modal_shift", limit)?;
        }
        self.solver.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MODEL_PARAMETERS_FILE_NAME),
            "discount_rate = 0.03

[time]
y_init = 2020
horizon = 10
time_step = 2

[modal_shift]
alpha = 0.1
beta = 0.2

[solver]
time_limit = 60.0
options = { threads = 2, presolve = \"on\" }
",
        )
        .unwrap();

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.discount_rate, 0.03);
        assert_eq!(params.time.y_init, 2020);
        assert_eq!(params.time.time_step, 2);
        assert_eq!(params.time.pre_years, 0);
        assert_eq!(params.time.investment_period, 1);
        assert_eq!(params.driving, DrivingRules::default());
        assert_eq!(params.stock_shift, None);
        assert_eq!(
            params.modal_shift,
            Some(ShiftLimit {
                alpha: 0.1,
                beta: 0.2
            })
        );
        assert!(params.enforce_modal_share);
        assert_eq!(params.solver.time_limit, Some(60.0));
        assert_eq!(params.solver.options.len(), 2);
    }

    #[test]
    fn test_model_params_missing_time() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MODEL_PARAMETERS_FILE_NAME), "discount_rate = 0.03").unwrap();
        assert!(ModelParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.05, true)]
    #[case(1.5, true)]
    #[case(-0.01, false)]
    #[case(f64::NAN, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_discount_rate(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_discount_rate(value).is_ok(), expected_valid);
    }

    #[test]
    fn test_check_driving_rules() {
        assert!(check_driving_rules(&DrivingRules::default()).is_ok());
        assert_error!(
            check_driving_rules(&DrivingRules {
                max_driving_time: 0.0,
                break_duration: 0.75
            }),
            "driving.max_driving_time must be a finite number greater than zero"
        );
    }

    #[test]
    fn test_check_shift_limit() {
        let limit = ShiftLimit {
            alpha: 0.1,
            beta: -0.5,
        };
        assert_error!(
            check_shift_limit("stock_shift", &limit),
            "stock_shift.beta must be a finite number greater than or equal to zero"
        );
    }
}
