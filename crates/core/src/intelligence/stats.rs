//! Small descriptive-statistics helpers over `f64` slices.

/// Middle element of the sorted values. Even-length input takes the upper
/// of the two middle elements rather than their average.
pub fn upper_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

/// Mean absolute deviation of `values` around `center`.
pub fn mean_absolute_deviation(values: &[f64], center: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - center).abs()).sum::<f64>() / values.len() as f64
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_length() {
        assert_eq!(upper_median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn median_of_even_length_takes_upper_middle() {
        assert_eq!(upper_median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
    }

    #[test]
    fn median_of_empty_is_none() {
        assert_eq!(upper_median(&[]), None);
    }

    #[test]
    fn mad_around_median() {
        let mad = mean_absolute_deviation(&[200.0, 200.0, 600.0], 200.0);
        assert!((mad - 400.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn mad_of_identical_values_is_zero() {
        assert_eq!(mean_absolute_deviation(&[5.0, 5.0, 5.0], 5.0), 0.0);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }
}
