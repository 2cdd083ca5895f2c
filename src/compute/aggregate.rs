//! Integer means.
//!
//! Every mean in the engine, whether the aggregate of an entity's
//! contributions or the cross-entity average of a report slot, is rounded
//! half away from zero using exact integer arithmetic.

/// `sum / count` rounded half away from zero. Returns 0 when `count` is 0.
pub fn rounded_div(sum: i128, count: u64) -> i64 {
    if count == 0 {
        return 0;
    }
    let count = count as i128;
    let quotient = sum / count;
    let remainder = sum % count;
    let rounded = if 2 * remainder.abs() >= count {
        quotient + sum.signum()
    } else {
        quotient
    };
    rounded as i64
}

/// Rounded arithmetic mean, 0 for an empty input.
pub fn rounded_mean<I>(values: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0i128, 0u64), |(sum, count), v| (sum + v as i128, count + 1));
    rounded_div(sum, count)
}

/// Per-slot rounded mean across equally long sequences.
///
/// With no sequences every slot averages to 0.
pub fn average_slots(sequences: &[Vec<i64>], slot_count: usize) -> Vec<i64> {
    (0..slot_count)
        .map(|i| rounded_mean(sequences.iter().filter_map(|seq| seq.get(i).copied())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_rounds_away_from_zero() {
        assert_eq!(rounded_mean([3, 4]), 4);
        assert_eq!(rounded_mean([-3, -4]), -4);
        assert_eq!(rounded_mean([1, 2]), 2);
        assert_eq!(rounded_mean([0, -1]), -1);
    }

    #[test]
    fn test_non_half_fractions() {
        assert_eq!(rounded_mean([1, 2, 2]), 2);
        assert_eq!(rounded_mean([1, 1, 2]), 1);
        assert_eq!(rounded_mean([-1, -1, -2]), -1);
        assert_eq!(rounded_mean([10]), 10);
    }

    #[test]
    fn test_empty_mean_is_zero() {
        assert_eq!(rounded_mean(std::iter::empty()), 0);
        assert_eq!(rounded_div(17, 0), 0);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        assert_eq!(rounded_mean([i64::MAX, i64::MAX]), i64::MAX);
        assert_eq!(rounded_mean([i64::MIN, i64::MIN, i64::MIN]), i64::MIN);
    }

    #[test]
    fn test_average_slots() {
        let sequences = vec![vec![3, 0, 10], vec![4, 1, 10]];
        assert_eq!(average_slots(&sequences, 3), vec![4, 1, 10]);
    }

    #[test]
    fn test_average_slots_without_sequences() {
        assert_eq!(average_slots(&[], 4), vec![0, 0, 0, 0]);
    }
}
