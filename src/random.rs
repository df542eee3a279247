//! Uniform draws shared by the sampling stages.
//!
//! Every function takes the random stream explicitly. Degenerate ranges
//! (`lo == hi`) collapse to `lo` instead of panicking.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Draws a real value from `[lo, hi)`.
pub(crate) fn uniform_f64<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    rng.random_range(lo..hi)
}

/// Draws an integer from `[lo, hi]`.
pub(crate) fn uniform_inclusive<R: Rng + ?Sized>(rng: &mut R, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        return lo;
    }
    rng.random_range(lo..=hi)
}

/// Draws a count from `[lo, hi]`.
pub(crate) fn uniform_count<R: Rng + ?Sized>(rng: &mut R, lo: usize, hi: usize) -> usize {
    if hi <= lo {
        return lo;
    }
    rng.random_range(lo..=hi)
}

/// Draws an offset from `[0, slack)`, or 0 when there is no slack.
pub(crate) fn uniform_offset<R: Rng + ?Sized>(rng: &mut R, slack: u32) -> u32 {
    if slack == 0 {
        return 0;
    }
    rng.random_range(0..slack)
}

/// Draws an index into a pool of `len` entries. `len` must be non-zero.
pub(crate) fn uniform_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    rng.random_range(0..len)
}

/// Builds the master stream for a run.
pub(crate) fn master_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Draws one sub-stream seed per example from the master stream.
///
/// Seeds are drawn up front so the generated data only depends on the
/// master seed, never on how examples are spread across workers.
pub(crate) fn derive_seeds<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.random::<u64>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_ranges_collapse_to_lower_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(uniform_f64(&mut rng, 0.3, 0.3), 0.3);
        assert_eq!(uniform_inclusive(&mut rng, 2, 2), 2);
        assert_eq!(uniform_offset(&mut rng, 0), 0);
    }

    #[test]
    fn offsets_stay_below_slack() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            assert!(uniform_offset(&mut rng, 5) < 5);
        }
    }

    #[test]
    fn inclusive_draws_reach_both_ends() {
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<i32> = (0..2000).map(|_| uniform_inclusive(&mut rng, -2, 2)).collect();
        assert!(draws.contains(&-2));
        assert!(draws.contains(&2));
        assert!(draws.iter().all(|v| (-2..=2).contains(v)));
    }

    #[test]
    fn derived_seeds_depend_only_on_master_seed() {
        let a = derive_seeds(&mut master_rng(Some(42)), 8);
        let b = derive_seeds(&mut master_rng(Some(42)), 8);
        let c = derive_seeds(&mut master_rng(Some(43)), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
