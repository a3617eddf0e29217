//! Code for working with calendar years and year-indexed data.
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::ops::RangeInclusive;

/// Parse a string describing a set of years.
///
/// The string can be "all" (case-insensitive), a single year, an inclusive range written as
/// `start..end` (e.g. "2020..2030") or a semicolon-separated list combining the two (e.g.
/// "2020;2025..2027"). Every year must be one of `valid_years`.
///
/// # Returns
///
/// The referenced years, sorted and without duplicates.
pub fn parse_year_str(s: &str, valid_years: &[u32]) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(valid_years.to_vec());
    }

    let mut years = Vec::new();
    for part in s.split(';') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once("..") {
            let start = parse_year(start)?;
            let end = parse_year(end)?;
            ensure!(start <= end, "Invalid year range: {part}");
            years.extend(start..=end);
        } else {
            years.push(parse_year(part)?);
        }
    }

    for year in &years {
        ensure!(valid_years.contains(year), "Invalid year: {year}");
    }

    Ok(years.into_iter().sorted_unstable().dedup().collect())
}

fn parse_year(s: &str) -> Result<u32> {
    s.trim()
        .parse()
        .ok()
        .with_context(|| format!("Invalid year: {}", s.trim()))
}

/// A value for every year in a contiguous range of years.
///
/// Cost and demand data are always stored at annual resolution, whatever temporal resolution the
/// optimisation runs at.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSeries {
    first_year: u32,
    values: Vec<f64>,
}

impl YearSeries {
    /// Create a series with the same value for every year in `years`
    pub fn constant(years: RangeInclusive<u32>, value: f64) -> Self {
        Self {
            first_year: *years.start(),
            values: years.map(|_| value).collect(),
        }
    }

    /// Build a series from `(year, value)` pairs which must cover every year in `years` exactly once
    pub fn from_entries<I>(years: RangeInclusive<u32>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let first_year = *years.start();
        let mut values = vec![None; years.clone().count()];
        for (year, value) in entries {
            ensure!(
                years.contains(&year),
                "Year {year} is outside the range {}-{}",
                years.start(),
                years.end()
            );
            let slot = &mut values[(year - first_year) as usize];
            ensure!(slot.is_none(), "Duplicate entry for year {year}");
            *slot = Some(value);
        }

        let missing = values
            .iter()
            .zip(years.clone())
            .filter_map(|(value, year)| value.is_none().then_some(year))
            .collect_vec();
        ensure!(
            missing.is_empty(),
            "Missing entries for years: {}",
            missing.iter().join(", ")
        );

        Ok(Self {
            first_year,
            values: values.into_iter().flatten().collect(),
        })
    }

    /// The value for the given year.
    ///
    /// Panics if the year is outside the series. Series are checked against the model's year
    /// range when they are loaded.
    pub fn get(&self, year: u32) -> f64 {
        self.try_get(year)
            .unwrap_or_else(|| panic!("No value for year {year} in series"))
    }

    /// The value for the given year, if it is covered by the series
    pub fn try_get(&self, year: u32) -> Option<f64> {
        let index = year.checked_sub(self.first_year)? as usize;
        self.values.get(index).copied()
    }

    /// The sum of the values over a range of years
    pub fn sum_over(&self, years: RangeInclusive<u32>) -> f64 {
        years.map(|year| self.get(year)).sum()
    }

    /// The years covered by this series
    pub fn years(&self) -> RangeInclusive<u32> {
        self.first_year..=self.first_year + self.values.len() as u32 - 1
    }

    /// Whether every value is finite and non-negative
    pub fn is_non_negative(&self) -> bool {
        self.values.iter().all(|value| value.is_finite() && *value >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[rstest]
    #[case("2020", &[2020, 2021], &[2020])]
    #[case("all", &[2020, 2021], &[2020, 2021])]
    #[case(" ALL ", &[2020, 2021], &[2020, 2021])]
    #[case("2021;2020", &[2020, 2021], &[2020, 2021])]
    #[case("2020..2022", &[2020, 2021, 2022], &[2020, 2021, 2022])]
    #[case("2022; 2020..2021", &[2020, 2021, 2022], &[2020, 2021, 2022])]
    #[case("2020;2020", &[2020], &[2020])]
    fn test_parse_year_str_valid(
        #[case] input: &str,
        #[case] valid_years: &[u32],
        #[case] expected: &[u32],
    ) {
        assert_eq!(parse_year_str(input, valid_years).unwrap(), expected);
    }

    #[rstest]
    #[case("", &[2020], "No years provided")]
    #[case("2021", &[2020], "Invalid year: 2021")]
    #[case("a;2020", &[2020], "Invalid year: a")]
    #[case("2021..2020", &[2020, 2021], "Invalid year range: 2021..2020")]
    #[case("2020..2022", &[2020, 2021], "Invalid year: 2022")]
    fn test_parse_year_str_invalid(
        #[case] input: &str,
        #[case] valid_years: &[u32],
        #[case] error_msg: &str,
    ) {
        assert_error!(parse_year_str(input, valid_years), error_msg);
    }

    #[test]
    fn test_year_series_from_entries() {
        let series =
            YearSeries::from_entries(2020..=2022, [(2021, 2.0), (2020, 1.0), (2022, 3.0)]).unwrap();
        assert_eq!(series.get(2020), 1.0);
        assert_eq!(series.get(2022), 3.0);
        assert_eq!(series.try_get(2019), None);
        assert_eq!(series.try_get(2023), None);
        assert_eq!(series.sum_over(2021..=2022), 5.0);
        assert_eq!(series.years(), 2020..=2022);
    }

    #[test]
    fn test_year_series_from_entries_missing() {
        assert_error!(
            YearSeries::from_entries(2020..=2023, [(2021, 2.0), (2020, 1.0)]),
            "Missing entries for years: 2022, 2023"
        );
    }

    #[test]
    fn test_year_series_from_entries_duplicate() {
        assert_error!(
            YearSeries::from_entries(2020..=2020, [(2020, 2.0), (2020, 1.0)]),
            "Duplicate entry for year 2020"
        );
    }

    #[test]
    fn test_year_series_from_entries_out_of_range() {
        assert_error!(
            YearSeries::from_entries(2020..=2020, [(2019, 2.0)]),
            "Year 2019 is outside the range 2020-2020"
        );
    }
}
