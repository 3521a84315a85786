//! Grid-scan inversion of a one-dimensional function.
//!
//! Used to turn a forward Z-score function into "which measurement gives
//! Z = z*". The result is approximate by construction and intended for
//! drawing curves, not for diagnosis.

use serde::{Deserialize, Serialize};

/// Scan and refinement parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootFinder {
    /// Evenly spaced evaluation points across `[lo, hi]`, ends included
    pub grid_samples: usize,
    /// Bracket half-width at which bisection stops
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for RootFinder {
    fn default() -> Self {
        Self {
            grid_samples: 120,
            tolerance: 1e-5,
            max_iterations: 100,
        }
    }
}

impl RootFinder {
    pub fn new(grid_samples: usize) -> Self {
        Self {
            grid_samples,
            ..Self::default()
        }
    }

    /// Find `x` in `[lo, hi]` with `f(x) ≈ target`.
    ///
    /// Scans the grid left to right and refines the first sign change it
    /// meets. Without a sign change it falls back to the grid point closest
    /// to the target, or the interval midpoint when `f` was never defined.
    /// Never fails.
    pub fn invert<F>(&self, f: F, target: f64, lo: f64, hi: f64) -> f64
    where
        F: Fn(f64) -> Option<f64>,
    {
        let residual = |x: f64| f(x).map(|z| z - target).filter(|r| r.is_finite());

        let mut best: Option<(f64, f64)> = None;
        let mut last: Option<(f64, f64)> = None;

        for x in linspace(lo, hi, self.grid_samples) {
            let Some(r) = residual(x) else {
                continue;
            };

            if r == 0.0 {
                return x;
            }

            if best.map_or(true, |(_, b)| r.abs() < b) {
                best = Some((x, r.abs()));
            }

            if let Some((last_x, last_r)) = last {
                if last_r * r < 0.0 {
                    return self.bisect(&residual, last_x, last_r, x);
                }
            }
            last = Some((x, r));
        }

        match best {
            Some((x, _)) => x,
            None => {
                tracing::debug!("inversion undefined on [{}, {}], using midpoint", lo, hi);
                (lo + hi) / 2.0
            }
        }
    }

    /// Bisection on a bracket whose left residual is `fa`
    fn bisect<G>(&self, residual: &G, mut a: f64, mut fa: f64, mut b: f64) -> f64
    where
        G: Fn(f64) -> Option<f64>,
    {
        for _ in 0..self.max_iterations {
            let mid = 0.5 * (a + b);
            if 0.5 * (b - a) < self.tolerance {
                return mid;
            }
            let Some(fm) = residual(mid) else {
                return mid;
            };
            if fm == 0.0 {
                return mid;
            }
            if (fm < 0.0) == (fa < 0.0) {
                a = mid;
                fa = fm;
            } else {
                b = mid;
            }
        }
        0.5 * (a + b)
    }
}

/// `n` evenly spaced points from `lo` to `hi` inclusive
pub fn linspace(lo: f64, hi: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (hi - lo) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if n > 1 && i == n - 1 { hi } else { lo + step * i as f64 })
}

/// Inclusive grid from `start` to `end` in `step` increments
///
/// Points are computed by multiplication so they do not drift.
pub fn stepped_grid(start: f64, end: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || end < start {
        return vec![start];
    }
    let count = ((end - start) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    #[test]
    fn test_inverts_linear_function() {
        let finder = RootFinder::default();
        let x = finder.invert(|x| Some(2.0 * x - 10.0), 1.0, 0.0, 20.0);
        assert_abs_diff_eq!(x, 5.5, epsilon = 1e-4);
    }

    #[test]
    fn test_first_bracket_wins() {
        // sin crosses zero at π and 2π inside [1, 7]; scanning finds π first
        let finder = RootFinder::default();
        let x = finder.invert(|x| Some(x.sin()), 0.0, 1.0, 7.0);
        assert_abs_diff_eq!(x, std::f64::consts::PI, epsilon = 1e-4);
    }

    #[test]
    fn test_no_crossing_returns_best_grid_point() {
        let finder = RootFinder::new(11);
        // Always above target; closest at the left edge
        let x = finder.invert(|x| Some(x + 5.0), 0.0, 0.0, 10.0);
        assert_eq!(x, 0.0);
    }

    #[test]
    fn test_undefined_everywhere_returns_midpoint() {
        let finder = RootFinder::default();
        let x = finder.invert(|_| None, 0.0, 2.0, 8.0);
        assert_eq!(x, 5.0);
    }

    #[test]
    fn test_non_finite_treated_as_undefined() {
        let finder = RootFinder::default();
        let x = finder.invert(|_| Some(f64::NAN), 0.0, 2.0, 8.0);
        assert_eq!(x, 5.0);
    }

    #[test]
    fn test_skips_undefined_grid_points() {
        let finder = RootFinder::new(21);
        let f = |x: f64| if (4.0..6.0).contains(&x) { None } else { Some(x - 5.0) };
        let x = finder.invert(f, 0.0, 0.0, 10.0);
        // The bracket spans the hole; the first bisection midpoint is undefined
        assert!((3.5..=6.5).contains(&x), "got {}", x);
    }

    #[test]
    fn test_undefined_during_refinement_returns_midpoint() {
        let finder = RootFinder::new(3);
        // Grid is 0, 5, 10; only the ends are defined
        let f = |x: f64| if x == 0.0 || x == 10.0 { Some(x - 3.0) } else { None };
        let x = finder.invert(f, 0.0, 0.0, 10.0);
        assert_eq!(x, 5.0);
    }

    #[test]
    fn test_exact_grid_hit() {
        let finder = RootFinder::new(11);
        let x = finder.invert(|x| Some(x), 4.0, 0.0, 10.0);
        assert_eq!(x, 4.0);
    }

    #[test]
    fn test_respects_iteration_cap() {
        let calls = Cell::new(0u32);
        let finder = RootFinder {
            grid_samples: 2,
            tolerance: 0.0,
            max_iterations: 10,
        };
        finder.invert(
            |x| {
                calls.set(calls.get() + 1);
                Some(x - 0.3)
            },
            0.0,
            0.0,
            1.0,
        );
        assert_eq!(calls.get(), 2 + 10);
    }

    #[test]
    fn test_linspace_endpoints() {
        let pts: Vec<_> = linspace(1.0, 30.0, 120).collect();
        assert_eq!(pts.len(), 120);
        assert_eq!(pts[0], 1.0);
        assert_eq!(pts[119], 30.0);
        assert_eq!(linspace(1.0, 2.0, 1).collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(linspace(1.0, 2.0, 0).count(), 0);
    }

    #[test]
    fn test_stepped_grid() {
        let ages = stepped_grid(0.0, 60.0, 0.25);
        assert_eq!(ages.len(), 241);
        assert_eq!(ages[240], 60.0);

        let lengths = stepped_grid(45.0, 110.0, 0.5);
        assert_eq!(lengths.len(), 131);
        assert_eq!(lengths[130], 110.0);
    }
}
