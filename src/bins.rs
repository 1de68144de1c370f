//! Bin tables
//!
//! A binned accumulator holds one *pre-rounded* working-precision value per
//! magnitude class ("bin"). This module owns the process-wide, immutable
//! table of bin centers and the arithmetic tying classes to exponents.
//!
//! ## Geometry
//!
//! With mantissa digits `m` and bin width `W` (see [`Binnable`]), bin `i`
//! lives at the frexp exponent `b(i) = MAX_EXP + (m − W + 1) − W·i` and its
//! center is `1.5 · 2^(b(i)−1)`. Deposits admitted at bin `i` are at least
//! `m − W + 1` bits below the center, so a primary's floating exponent never
//! moves between renormalizations and every absorb rounds on a fixed
//! quantum — the property the whole reproducibility argument rests on.
//!
//! Consequences worth knowing:
//!
//! - `b(0)` is past the representable range, so `bin_center(0) == +∞`:
//!   inputs with `|x| ≥ 2^(MAX_EXP − W)` saturate the accumulator to ±∞,
//!   reproducibly.
//! - The deepest classes push centers into the subnormal range and finally
//!   to `0`; such bins degrade to plain exact adders and are reported by the
//!   denormal-drift predicate (see [`crate::manual::has_denormal_bits`]).
//!
//! The tables are pure functions of the precision, built on first use; the
//! constructor is idempotent, so racing threads compute identical bytes.

#![forbid(unsafe_code)]

use std::sync::OnceLock;

use crate::fp::Binnable;

/// Frexp exponent of the center of bin `i`.
#[inline]
pub fn bin_exponent<R: Binnable>(i: usize) -> i32 {
    R::MAX_EXP + (R::MANT_DIG - R::BIN_WIDTH + 1) - R::BIN_WIDTH * i as i32
}

/// Center of bin `i`: `1.5 · 2^(b(i)−1)`, exactly.
///
/// Valid for `i ≤ ZERO_INDEX + MAX_FOLD − 1`, which covers every bin a
/// fold-`MAX_FOLD` accumulator can reach.
#[inline]
pub fn bin_center<R: Binnable>(i: usize) -> R {
    R::bin_table()[i]
}

/// The carry quantum of bin `i`: a quarter of the center's `ufp`.
///
/// Renormalization moves primaries in whole multiples of this quantum, and
/// each step is counted once in the carry vector.
#[inline]
pub fn carry_quantum<R: Binnable>(i: usize) -> R {
    R::pow2(bin_exponent::<R>(i) - 3)
}

/// Top-bin index encoded in a primary's leading entry.
///
/// Requires `p0` finite, nonzero, and inside a bin window (which every
/// library path maintains); the exponent then sits exactly on the grid.
#[inline]
pub fn primary_index<R: Binnable>(p0: R) -> usize {
    debug_assert!(p0.is_finite() && p0 != R::ZERO);
    let num = R::MAX_EXP + (R::MANT_DIG - R::BIN_WIDTH + 1) - p0.exponent();
    (num.max(0) / R::BIN_WIDTH) as usize
}

fn build_table<R: Binnable>() -> Vec<R> {
    (0..R::ZERO_INDEX + R::MAX_FOLD)
        .map(|i| {
            let b = bin_exponent::<R>(i);
            R::pow2(b - 1) + R::pow2(b - 2)
        })
        .collect()
}

static TABLE_F32: OnceLock<Vec<f32>> = OnceLock::new();
static TABLE_F64: OnceLock<Vec<f64>> = OnceLock::new();

pub(crate) fn table_f32() -> &'static [f32] {
    TABLE_F32.get_or_init(build_table::<f32>)
}

pub(crate) fn table_f64() -> &'static [f64] {
    TABLE_F64.get_or_init(build_table::<f64>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_sit_on_the_exponent_grid() {
        for i in 1..=f64::ZERO_INDEX {
            let c: f64 = bin_center(i);
            assert!(c.is_finite() && c > 0.0);
            assert_eq!(Binnable::exponent(c), bin_exponent::<f64>(i));
            // 1.5 × power of two: exactly the implicit one plus one bit.
            assert_eq!(c, 1.5 * Binnable::ufp(c));
        }
        for i in 1..=f32::ZERO_INDEX {
            let c: f32 = bin_center(i);
            assert_eq!(c, 1.5 * Binnable::ufp(c));
        }
    }

    #[test]
    fn top_class_saturates_to_infinity() {
        assert_eq!(bin_center::<f64>(0), f64::INFINITY);
        assert_eq!(bin_center::<f32>(0), f32::INFINITY);
    }

    #[test]
    fn spacing_is_one_bin_width() {
        for i in 1..f64::ZERO_INDEX {
            let hi: f64 = bin_center(i);
            let lo: f64 = bin_center(i + 1);
            assert_eq!(hi, lo * 2f64.powi(f64::BIN_WIDTH));
        }
    }

    #[test]
    fn primary_index_recovers_the_class() {
        for i in 1..=f64::ZERO_INDEX {
            assert_eq!(primary_index::<f64>(bin_center(i)), i);
        }
        for i in 1..=f32::ZERO_INDEX {
            assert_eq!(primary_index::<f32>(bin_center(i)), i);
        }
    }

    #[test]
    fn carry_quantum_is_a_quarter_ufp() {
        for i in 1..=f64::ZERO_INDEX {
            let c: f64 = bin_center(i);
            assert_eq!(carry_quantum::<f64>(i), 0.25 * Binnable::ufp(c));
        }
    }

    #[test]
    fn deep_bins_degrade_to_zero_centers() {
        // Below the subnormal range the table must yield exact zeros, not
        // garbage; those bins act as plain adders.
        let last = f64::ZERO_INDEX + f64::MAX_FOLD - 1;
        let c: f64 = bin_center(last);
        assert!(c == 0.0 || c.is_subnormal());
    }
}
