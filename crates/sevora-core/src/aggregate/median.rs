//! Exact integer median.

use crate::error::OracleError;
use crate::request::Severity;

/// Computes the median of `values`.
///
/// The input is copied and sorted ascending. For an odd count the middle
/// element is returned; for an even count the floor of the mean of the two
/// middle elements. The mean is taken in `u32` so the sum of two `u16`
/// values cannot overflow.
///
/// # Errors
///
/// Returns `OracleError::NoValues` if `values` is empty.
///
/// # Examples
///
/// ```rust
/// use sevora_core::aggregate::median;
///
/// assert_eq!(median(&[10, 50, 5]).unwrap(), 10);
/// assert_eq!(median(&[10, 50]).unwrap(), 30);
/// ```
pub fn median(values: &[Severity]) -> Result<Severity, OracleError> {
    if values.is_empty() {
        return Err(OracleError::NoValues);
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Ok(sorted[mid]);
    }

    let sum = u32::from(sorted[mid - 1]) + u32::from(sorted[mid]);
    // The mean of two u16 values always fits back into u16.
    Ok(Severity::try_from(sum / 2).unwrap_or(Severity::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(median(&[]), Err(OracleError::NoValues));
    }

    #[test]
    fn single_value() {
        assert_eq!(median(&[42]).unwrap(), 42);
    }

    #[test]
    fn odd_count_takes_middle_of_sorted() {
        assert_eq!(median(&[10, 50, 5]).unwrap(), 10);
        assert_eq!(median(&[9, 1, 7, 3, 5]).unwrap(), 5);
    }

    #[test]
    fn even_count_floors_the_mean() {
        assert_eq!(median(&[10, 50]).unwrap(), 30);
        assert_eq!(median(&[1, 2]).unwrap(), 1);
        assert_eq!(median(&[4, 1, 3, 2]).unwrap(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(median(&[7, 7, 7, 1]).unwrap(), 7);
        assert_eq!(median(&[0, 0, 100]).unwrap(), 0);
    }

    #[test]
    fn top_of_range_does_not_overflow() {
        assert_eq!(median(&[u16::MAX, u16::MAX]).unwrap(), u16::MAX);
        assert_eq!(median(&[u16::MAX, u16::MAX - 1]).unwrap(), u16::MAX - 1);
    }

    #[test]
    fn input_order_is_not_mutated() {
        let values = vec![3, 1, 2];
        let _ = median(&values).unwrap();
        assert_eq!(values, vec![3, 1, 2]);
    }
}
