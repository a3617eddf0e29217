//! General functions related to finance.

/// The factor by which a cost incurred in `year` is multiplied to give its present value in
/// `base_year`.
///
/// Costs are discounted once per year elapsed, so the factor is `(1 + r)^-(year - base_year)`.
pub fn discount_factor(year: u32, base_year: u32, discount_rate: f64) -> f64 {
    let elapsed = i32::try_from(year.abs_diff(base_year)).unwrap_or(i32::MAX);
    let factor = (1.0 + discount_rate).powi(elapsed);
    if year >= base_year {
        1.0 / factor
    } else {
        factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(2020, 2020, 0.05, 1.0)]
    #[case(2021, 2020, 0.05, 1.0 / 1.05)]
    #[case(2030, 2020, 0.0, 1.0)]
    #[case(2022, 2020, 0.1, 1.0 / 1.21)]
    #[case(2019, 2020, 0.1, 1.1)]
    fn test_discount_factor(
        #[case] year: u32,
        #[case] base_year: u32,
        #[case] rate: f64,
        #[case] expected: f64,
    ) {
        assert_approx_eq!(f64, discount_factor(year, base_year, rate), expected);
    }
}
