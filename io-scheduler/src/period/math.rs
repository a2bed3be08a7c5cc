/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD of two values and of a sequence.
//!
//! These are free functions rather than methods so they can be used and tested
//! independently of the event table.

/// Iterative Euclidean GCD.  `gcd(0, x) == x`, and `gcd(0, 0) == 0`.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Fold a sequence of periods to their overall GCD.
///
/// Returns `0` for an empty sequence.  Zero entries are neutral.
pub fn gcd_of<I>(periods: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    periods.into_iter().fold(0, gcd)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── gcd ───────────────────────────────────────────────────────────────────

    #[test]
    fn gcd_basic_cases() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(7, 3), 1);
        assert_eq!(gcd(100, 25), 25);
    }

    #[test]
    fn gcd_with_zero() {
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn gcd_same_values() {
        assert_eq!(gcd(42, 42), 42);
    }

    // ── gcd_of ────────────────────────────────────────────────────────────────

    #[test]
    fn gcd_of_empty_is_zero() {
        assert_eq!(gcd_of([]), 0);
    }

    #[test]
    fn gcd_of_single_period() {
        assert_eq!(gcd_of([750]), 750);
    }

    #[test]
    fn gcd_of_mixed_units() {
        // 200 ms, 300 ms, 500 ms → 100 ms
        assert_eq!(gcd_of([200, 300, 500]), 100);
        // 1 s, 1 min, 1 h → 1 s
        assert_eq!(gcd_of([1_000, 60_000, 3_600_000]), 1_000);
    }

    #[test]
    fn gcd_of_coprime_periods_falls_to_one() {
        assert_eq!(gcd_of([7, 13]), 1);
    }
}
