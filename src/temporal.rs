//! The temporal index: which calendar years the optimisation instantiates variables for.
//!
//! Cost and demand data are annual. When the model runs with a `time_step` greater than one, each
//! modeled year stands in for a block of consecutive calendar years (its *period*), and the
//! constraint generators and objective use the helpers here to aggregate annual data over that
//! period.
use anyhow::{Result, ensure};
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use std::ops::RangeInclusive;

/// The user-facing temporal configuration, as read from `model.toml`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TemporalConfig {
    /// The first year of the optimisation horizon
    pub y_init: u32,
    /// The number of calendar years in the horizon
    pub horizon: u32,
    /// The number of years before `y_init` in which pre-existing vehicles may have been bought
    #[serde(default)]
    pub pre_years: u32,
    /// The spacing between modeled years
    #[serde(default = "default_time_step")]
    pub time_step: u32,
    /// The spacing between years in which infrastructure can be built
    #[serde(default = "default_investment_period")]
    pub investment_period: u32,
}

fn default_time_step() -> u32 {
    1
}

fn default_investment_period() -> u32 {
    1
}

/// The derived sets of years used to index decision variables
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalIndex {
    y_init: u32,
    y_end: u32,
    g_init: u32,
    time_step: u32,
    modeled_years: Vec<u32>,
    modeled_generations: Vec<u32>,
    investment_years: Vec<u32>,
}

impl TemporalIndex {
    /// Build the temporal index, failing if the configuration is invalid
    pub fn new(config: &TemporalConfig) -> Result<Self> {
        let TemporalConfig {
            y_init,
            horizon,
            pre_years,
            time_step,
            investment_period,
        } = *config;
        ensure!(time_step >= 1, "time_step must be at least 1");
        ensure!(investment_period >= 1, "investment_period must be at least 1");
        ensure!(horizon >= 1, "horizon must be at least 1");
        ensure!(
            pre_years <= y_init,
            "pre_years ({pre_years}) cannot be greater than y_init ({y_init})"
        );
        ensure!(
            pre_years % time_step == 0,
            "pre_years ({pre_years}) must be a multiple of time_step ({time_step}) so that \
            vehicle generations line up with modeled years"
        );

        let y_end = y_init + horizon - 1;
        let g_init = y_init - pre_years;
        let step = time_step as usize;
        let modeled_years = (y_init..=y_end).step_by(step).collect_vec();
        let modeled_generations = (g_init..=y_end).step_by(step).collect_vec();

        let mut investment_years = modeled_years
            .iter()
            .copied()
            .filter(|year| (year - y_init) % investment_period == 0)
            .collect_vec();
        if investment_years.is_empty() {
            warn!(
                "No modeled year matches investment_period {investment_period}; infrastructure \
                investment will only be possible in {y_init}"
            );
            investment_years.push(y_init);
        }

        Ok(Self {
            y_init,
            y_end,
            g_init,
            time_step,
            modeled_years,
            modeled_generations,
            investment_years,
        })
    }

    /// The first year of the horizon
    pub fn y_init(&self) -> u32 {
        self.y_init
    }

    /// The last calendar year of the horizon
    pub fn y_end(&self) -> u32 {
        self.y_end
    }

    /// The earliest purchase generation
    pub fn g_init(&self) -> u32 {
        self.g_init
    }

    /// The spacing between modeled years
    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    /// Every calendar year in the horizon
    pub fn calendar_years(&self) -> RangeInclusive<u32> {
        self.y_init..=self.y_end
    }

    /// Every calendar year a vehicle generation may fall in
    pub fn generation_years(&self) -> RangeInclusive<u32> {
        self.g_init..=self.y_end
    }

    /// The years at which variables are instantiated
    pub fn modeled_years(&self) -> &[u32] {
        &self.modeled_years
    }

    /// The purchase generations at which vintages are tracked
    pub fn modeled_generations(&self) -> &[u32] {
        &self.modeled_generations
    }

    /// The modeled years at which infrastructure can be added
    pub fn investment_years(&self) -> &[u32] {
        &self.investment_years
    }

    /// Iterate over the generations which can be alive in `year` (i.e. `g <= year`)
    pub fn generations_up_to(&self, year: u32) -> impl Iterator<Item = u32> + '_ {
        self.modeled_generations
            .iter()
            .copied()
            .take_while(move |generation| *generation <= year)
    }

    /// Iterate over the investment years up to and including `year`
    pub fn investment_years_up_to(&self, year: u32) -> impl Iterator<Item = u32> + '_ {
        self.investment_years
            .iter()
            .copied()
            .take_while(move |inv_year| *inv_year <= year)
    }

    /// The modeled year preceding `year`, if any
    pub fn previous_year(&self, year: u32) -> Option<u32> {
        let pos = self.modeled_years.iter().position(|y| *y == year)?;
        pos.checked_sub(1).map(|prev| self.modeled_years[prev])
    }

    /// The calendar years which modeled year `year` represents
    pub fn represented_years(&self, year: u32) -> RangeInclusive<u32> {
        year..=(year + self.time_step - 1).min(self.y_end)
    }

    /// The number of calendar years which modeled year `year` represents
    pub fn period_length(&self, year: u32) -> u32 {
        self.represented_years(year).count() as u32
    }

    /// The modeled year whose period contains `calendar_year`, if it is in the horizon
    pub fn representative_year(&self, calendar_year: u32) -> Option<u32> {
        if !self.calendar_years().contains(&calendar_year) {
            return None;
        }

        let offset = (calendar_year - self.y_init) / self.time_step * self.time_step;
        Some(self.y_init + offset)
    }

    /// The zero-based index of a calendar year in annual data arrays
    pub fn annual_index(&self, calendar_year: u32) -> usize {
        (calendar_year - self.y_init) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, temporal_config};
    use rstest::rstest;

    #[rstest]
    fn test_time_step_one_is_annual(temporal_config: TemporalConfig) {
        let index = TemporalIndex::new(&temporal_config).unwrap();
        let annual = (2020..=2029).collect_vec();
        assert_eq!(index.modeled_years(), annual);
        assert_eq!(index.modeled_generations(), (2016..=2029).collect_vec());
        assert_eq!(index.investment_years(), annual);
        for year in annual {
            assert_eq!(index.period_length(year), 1);
            assert_eq!(index.representative_year(year), Some(year));
        }
    }

    #[rstest]
    fn test_time_step_two(temporal_config: TemporalConfig) {
        let config = TemporalConfig {
            time_step: 2,
            investment_period: 4,
            ..temporal_config
        };
        let index = TemporalIndex::new(&config).unwrap();
        assert_eq!(index.modeled_years(), [2020, 2022, 2024, 2026, 2028]);
        assert_eq!(
            index.modeled_generations(),
            [2016, 2018, 2020, 2022, 2024, 2026, 2028]
        );
        assert_eq!(index.investment_years(), [2020, 2024, 2028]);
        assert_eq!(index.represented_years(2022), 2022..=2023);
        assert_eq!(index.representative_year(2023), Some(2022));
        assert_eq!(index.representative_year(2030), None);
        assert_eq!(index.previous_year(2022), Some(2020));
        assert_eq!(index.previous_year(2020), None);
        assert_eq!(index.generations_up_to(2022).collect_vec(), [2016, 2018, 2020, 2022]);
    }

    #[rstest]
    fn test_last_period_is_truncated(temporal_config: TemporalConfig) {
        let config = TemporalConfig {
            time_step: 3,
            pre_years: 3,
            ..temporal_config
        };
        let index = TemporalIndex::new(&config).unwrap();
        assert_eq!(index.modeled_years(), [2020, 2023, 2026, 2029]);
        assert_eq!(index.represented_years(2029), 2029..=2029);
        assert_eq!(index.period_length(2026), 3);
        assert_eq!(index.period_length(2029), 1);
    }

    #[rstest]
    fn test_investment_years_fallback(temporal_config: TemporalConfig) {
        let config = TemporalConfig {
            time_step: 2,
            investment_period: 3,
            horizon: 2,
            ..temporal_config
        };
        let index = TemporalIndex::new(&config).unwrap();
        assert_eq!(index.modeled_years(), [2020]);
        assert_eq!(index.investment_years(), [2020]);
    }

    #[rstest]
    #[case(0, 1, 4, "time_step must be at least 1")]
    #[case(1, 0, 4, "investment_period must be at least 1")]
    #[case(
        3,
        1,
        4,
        "pre_years (4) must be a multiple of time_step (3) so that vehicle generations line up \
        with modeled years"
    )]
    fn test_invalid_config(
        temporal_config: TemporalConfig,
        #[case] time_step: u32,
        #[case] investment_period: u32,
        #[case] pre_years: u32,
        #[case] msg: &str,
    ) {
        let config = TemporalConfig {
            time_step,
            investment_period,
            pre_years,
            ..temporal_config
        };
        assert_error!(TemporalIndex::new(&config), msg);
    }
}
