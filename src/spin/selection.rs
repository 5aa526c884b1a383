//! Weighted random selection and roster validation.

use rand::Rng;

use crate::spin::SpinError;

/// Total weight a people-mode roster must add up to.
pub const REQUIRED_WEIGHT_TOTAL: u32 = 100;
/// Fewest entries a wheel can spin over.
pub const MIN_ENTRIES: usize = 2;

/// Pick an index with probability `weight[i] / total`.
///
/// Draws `r` uniformly in `[0, total)` and walks the running sum; the first entry whose
/// running sum exceeds `r` wins, so zero-weight entries are never picked. Returns `None` when
/// every weight is zero.
pub fn pick_weighted<R: Rng + ?Sized>(weights: &[u32], rng: &mut R) -> Option<usize> {
    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total == 0 {
        return None;
    }

    let r = rng.random_range(0..total);
    let mut running = 0u64;
    for (index, &weight) in weights.iter().enumerate() {
        running += u64::from(weight);
        if r < running {
            return Some(index);
        }
    }
    // Unreachable with integer weights, kept so a bad total never panics.
    weights.iter().rposition(|&w| w > 0)
}

/// Check a people-mode roster before a spin.
pub fn validate_roster(weights: &[u32]) -> Result<(), SpinError> {
    if weights.len() < MIN_ENTRIES {
        return Err(SpinError::TooFewEntries {
            required: MIN_ENTRIES,
            actual: weights.len(),
        });
    }
    let total: u32 = weights.iter().sum();
    if total != REQUIRED_WEIGHT_TOTAL {
        return Err(SpinError::WeightsMustTotal {
            expected: REQUIRED_WEIGHT_TOTAL,
            actual: total,
        });
    }
    Ok(())
}

/// Check a menu list before a spin.
pub fn validate_menu(items: &[String]) -> Result<(), SpinError> {
    let usable = items.iter().filter(|item| !item.trim().is_empty()).count();
    if usable < MIN_ENTRIES || usable != items.len() {
        return Err(SpinError::TooFewEntries {
            required: MIN_ENTRIES,
            actual: usable,
        });
    }
    Ok(())
}

/// Split 100 as evenly as possible across `count` entries, handing the remainder to the
/// first entries.
pub fn even_weights(count: usize) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let count_u32 = count as u32;
    let base = REQUIRED_WEIGHT_TOTAL / count_u32;
    let remainder = (REQUIRED_WEIGHT_TOTAL % count_u32) as usize;
    (0..count)
        .map(|index| base + u32::from(index < remainder))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn frequencies_follow_weights() {
        let weights = [50, 30, 15, 5];
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let trials = 200_000;
        let mut counts = [0u32; 4];
        for _ in 0..trials {
            counts[pick_weighted(&weights, &mut rng).unwrap()] += 1;
        }
        for (count, weight) in counts.iter().zip(weights) {
            let observed = f64::from(*count) / f64::from(trials);
            let expected = f64::from(weight) / 100.0;
            assert!(
                (observed - expected).abs() < 0.01,
                "observed {observed} expected {expected}"
            );
        }
    }

    #[test]
    fn zero_weights_are_never_chosen() {
        let weights = [0, 100, 0];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert_eq!(pick_weighted(&weights, &mut rng), Some(1));
        }
    }

    #[test]
    fn all_zero_weights_pick_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_weighted(&[0, 0], &mut rng), None);
        assert_eq!(pick_weighted(&[], &mut rng), None);
    }

    #[test]
    fn roster_must_total_one_hundred() {
        assert!(validate_roster(&[60, 40]).is_ok());
        assert_eq!(
            validate_roster(&[60, 30]),
            Err(SpinError::WeightsMustTotal {
                expected: 100,
                actual: 90
            })
        );
        assert_eq!(
            validate_roster(&[100]),
            Err(SpinError::TooFewEntries {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn menu_needs_two_named_items() {
        assert!(validate_menu(&["Pizza".into(), "Ramen".into()]).is_ok());
        assert!(validate_menu(&["Pizza".into()]).is_err());
        assert!(validate_menu(&["Pizza".into(), "  ".into()]).is_err());
    }

    #[test]
    fn even_weights_total_one_hundred() {
        for count in 1..=12 {
            let weights = even_weights(count);
            assert_eq!(weights.len(), count);
            assert_eq!(weights.iter().sum::<u32>(), 100);
        }
        assert_eq!(even_weights(3), vec![34, 33, 33]);
    }
}
