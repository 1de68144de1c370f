//! Working-precision bit utilities
//!
//! Everything the binned accumulator needs to know about a scalar is a pure
//! function of its bit pattern: the *unit in the first place* (`ufp`), the
//! magnitude class (`index`), the power-of-two `scale` used by the scaled
//! sum of squares, and the pre-rounding primitive `force_lsb`.
//!
//! ## Invariants
//!
//! - `ufp(x)` is the power of two at the implicit-one position of `|x|`'s
//!   mantissa, extracted from the exponent field — never via `log`.
//! - `index` is monotone: `|x| ≤ |y| ⇒ index(x) ≥ index(y)` (classes count
//!   *down* in magnitude). Zero and subnormals share the bottom class
//!   [`Binnable::ZERO_INDEX`]; NaN/Inf must be screened out by the caller.
//! - `force_lsb(x)` has the bit pattern `bits(x) | 1`. It is the only reason
//!   binned accumulation is associative: an addend whose low bit is set can
//!   never fall exactly halfway between two representable results, so
//!   round-to-nearest becomes a pure function of the addend and the bin.
//! - `pow2(e)` is exact for every representable `e`, returns `0` below the
//!   subnormal range and `+∞` above the normal range.
//!
//! All of this is safe Rust (`to_bits`/`from_bits`); the crate forbids
//! `unsafe` throughout.

#![forbid(unsafe_code)]

use core::fmt;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A working-precision IEEE-754 scalar (`f32` or `f64`) that can back a
/// binned accumulator.
///
/// The associated constants fix the bin geometry per precision; see the
/// module docs of [`crate::bins`] for how they combine.
pub trait Binnable:
    Copy
    + Clone
    + PartialEq
    + PartialOrd
    + Default
    + fmt::Debug
    + fmt::Display
    + fmt::LowerExp
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + 'static
{
    /// Mantissa digits including the implicit one (24 for `f32`, 53 for `f64`).
    const MANT_DIG: i32;
    /// Bin width in bits (13 for `f32`, 40 for `f64`).
    const BIN_WIDTH: i32;
    /// Maximum frexp-style exponent (`|x| < 2^MAX_EXP` for all finite `x`).
    const MAX_EXP: i32;
    /// Minimum frexp-style exponent of a normal value.
    const MIN_EXP: i32;
    /// Magnitude class of zero, subnormals, and the smallest normals:
    /// `(MAX_EXP − MIN_EXP) / BIN_WIDTH`.
    const ZERO_INDEX: usize;
    /// Maximum number of deposits between renormalizations. With deposits at
    /// least `MANT_DIG − BIN_WIDTH + 1` bits below the bin center, the signed
    /// drift of `ENDURANCE` deposits stays strictly inside half a carry
    /// quantum, so a primary's floating exponent never moves.
    const ENDURANCE: usize;
    /// Largest supported fold.
    const MAX_FOLD: usize = 8;
    /// Fold used by the reproducible facade when none is given.
    const DEFAULT_FOLD: usize = 3;
    /// Exponent grid step for [`Binnable::scale`]. Chosen so that the square
    /// of any ratio of two scales shifts exponents by a whole number of bins,
    /// keeping rescaling exact and structure-preserving.
    const SCALE_STEP: i32;
    /// Pre-scaling applied to deposits into the top bin of a zero-window
    /// accumulator (paired with [`Binnable::EXPANSION`]; both powers of two).
    const COMPRESSION: Self;
    /// Inverse of [`Binnable::COMPRESSION`], applied on conversion.
    const EXPANSION: Self;
    /// Exactly `0.5`.
    const HALF: Self;
    /// Additive identity.
    const ZERO: Self;
    /// Multiplicative identity.
    const ONE: Self;

    /// Exact `2^e`; `0` below the subnormal range, `+∞` above the normal one.
    fn pow2(e: i32) -> Self;

    /// Frexp-style exponent: `|x| ∈ [2^(e−1), 2^e)` for normal `x`.
    /// Subnormals report the exponent-field floor; screen them out first
    /// where it matters.
    fn exponent(self) -> i32;

    /// Magnitude class of a finite scalar; counts down in magnitude, with
    /// zero and subnormals landing on [`Binnable::ZERO_INDEX`].
    fn index(self) -> usize;

    /// Unit in the first place: the power of two at the implicit-one
    /// position of `|x|`. Zero for zero and subnormals.
    fn ufp(self) -> Self;

    /// Power-of-two scale `≥ |x|` from the [`Binnable::SCALE_STEP`] exponent
    /// grid; `0` for `x == 0`.
    fn scale(self) -> Self;

    /// The value whose bit pattern is `bits(self) | 1`.
    fn force_lsb(self) -> Self;

    /// Exponent field all ones (NaN or ±∞).
    fn is_nan_or_inf(self) -> bool;

    /// Finite test (mirror of [`Binnable::is_nan_or_inf`]).
    fn is_finite(self) -> bool;

    /// Subnormal test, used by the denormal-drift predicate.
    fn is_subnormal(self) -> bool;

    /// Absolute value.
    fn abs(self) -> Self;

    /// Square root (used by the Euclidean-norm facade only).
    fn sqrt(self) -> Self;

    /// Ordinary maximum; callers screen NaN before comparing.
    fn max(self, other: Self) -> Self;

    /// The precision's bin-center table (see [`crate::bins`]).
    fn bin_table() -> &'static [Self];
}

macro_rules! impl_binnable {
    (
        $t:ty, bits = $b:ty, mant = $mant:expr, exp_mask = $mask:expr,
        bin_width = $w:expr, max_exp = $maxe:expr, min_exp = $mine:expr,
        endurance = $endur:expr, scale_step = $step:expr, table = $table:path
    ) => {
        impl Binnable for $t {
            const MANT_DIG: i32 = $mant + 1;
            const BIN_WIDTH: i32 = $w;
            const MAX_EXP: i32 = $maxe;
            const MIN_EXP: i32 = $mine;
            const ZERO_INDEX: usize = (($maxe - ($mine)) / $w) as usize;
            const ENDURANCE: usize = $endur;
            const SCALE_STEP: i32 = $step;
            const COMPRESSION: Self = 2.0;
            const EXPANSION: Self = 0.5;
            const HALF: Self = 0.5;
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            #[inline]
            fn pow2(e: i32) -> Self {
                // Normal range: build the exponent field directly. Below it,
                // shift a single mantissa bit; past either end, saturate.
                let emin_norm = Self::MIN_EXP - 1; // 2^(MIN_EXP-1) is the smallest normal
                if e > Self::MAX_EXP - 1 {
                    return <$t>::INFINITY;
                }
                if e >= emin_norm {
                    let field = (e - emin_norm + 1) as $b;
                    return <$t>::from_bits(field << $mant);
                }
                let shift = e - (emin_norm - $mant); // bit position in the subnormal field
                if shift < 0 {
                    return 0.0;
                }
                <$t>::from_bits((1 as $b) << shift)
            }

            #[inline]
            fn exponent(self) -> i32 {
                let field = ((self.to_bits() >> $mant) & (($mask) >> $mant)) as i32;
                field + (Self::MIN_EXP - 1)
            }

            #[inline]
            fn index(self) -> usize {
                debug_assert!(Binnable::is_finite(self));
                let field = ((self.to_bits() >> $mant) & (($mask) >> $mant)) as i32;
                if field == 0 {
                    return Self::ZERO_INDEX;
                }
                let num = Self::MAX_EXP - (field + Self::MIN_EXP - 1);
                (num.max(0) / $w) as usize
            }

            #[inline]
            fn ufp(self) -> Self {
                <$t>::from_bits(self.to_bits() & $mask)
            }

            #[inline]
            fn scale(self) -> Self {
                if self == 0.0 {
                    return 0.0;
                }
                let e = Binnable::exponent(self);
                let mut g = e.div_euclid($step) * $step;
                if g < e {
                    g += $step;
                }
                let cap = (Self::MAX_EXP - 1).div_euclid($step) * $step;
                Self::pow2(g.min(cap))
            }

            #[inline]
            fn force_lsb(self) -> Self {
                <$t>::from_bits(self.to_bits() | 1)
            }

            #[inline]
            fn is_nan_or_inf(self) -> bool {
                self.to_bits() & $mask == $mask
            }

            #[inline]
            fn is_finite(self) -> bool {
                !Binnable::is_nan_or_inf(self)
            }

            #[inline]
            fn is_subnormal(self) -> bool {
                <$t>::is_subnormal(self)
            }

            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[inline]
            fn max(self, other: Self) -> Self {
                if self > other {
                    self
                } else {
                    other
                }
            }

            #[inline]
            fn bin_table() -> &'static [Self] {
                $table()
            }
        }
    };
}

impl_binnable!(
    f32, bits = u32, mant = 23, exp_mask = 0x7f80_0000u32,
    bin_width = 13, max_exp = 128, min_exp = -125,
    endurance = 1 << 8, scale_step = 13, table = crate::bins::table_f32
);

impl_binnable!(
    f64, bits = u64, mant = 52, exp_mask = 0x7ff0_0000_0000_0000u64,
    bin_width = 40, max_exp = 1024, min_exp = -1021,
    endurance = 1 << 10, scale_step = 20, table = crate::bins::table_f64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow2_is_exact_across_the_range() {
        assert_eq!(f64::pow2(0), 1.0);
        assert_eq!(f64::pow2(10), 1024.0);
        assert_eq!(f64::pow2(-1), 0.5);
        assert_eq!(f64::pow2(1023), 2f64.powi(1023));
        assert_eq!(f64::pow2(1024), f64::INFINITY);
        assert_eq!(f64::pow2(-1022), 2f64.powi(-1022));
        assert_eq!(f64::pow2(-1074), 5e-324);
        assert_eq!(f64::pow2(-1075), 0.0);
        assert_eq!(f32::pow2(127), 2f32.powi(127));
        assert_eq!(f32::pow2(128), f32::INFINITY);
        assert_eq!(f32::pow2(-149), f32::from_bits(1));
        assert_eq!(f32::pow2(-150), 0.0);
    }

    #[test]
    fn exponent_matches_frexp_convention() {
        assert_eq!(Binnable::exponent(1.0f64), 1);
        assert_eq!(Binnable::exponent(0.75f64), 0);
        assert_eq!(Binnable::exponent(0.5f64), 0);
        assert_eq!(Binnable::exponent(2.0f64), 2);
        assert_eq!(Binnable::exponent(1e20f64), 67);
    }

    #[test]
    fn ufp_is_the_implicit_one() {
        assert_eq!(Binnable::ufp(1.5f64), 1.0);
        assert_eq!(Binnable::ufp(-3.0f64), 2.0);
        assert_eq!(Binnable::ufp(0.75f64), 0.5);
        assert_eq!(Binnable::ufp(0.0f64), 0.0);
        // Subnormals have no implicit one.
        assert_eq!(Binnable::ufp(5e-324f64), 0.0);
        assert_eq!(Binnable::ufp(1.5f32), 1.0f32);
    }

    #[test]
    fn force_lsb_sets_exactly_the_low_bit() {
        let x = 1.0f64;
        let y = Binnable::force_lsb(x);
        assert_eq!(y.to_bits(), x.to_bits() | 1);
        assert!(y > x);
        // Idempotent once set.
        assert_eq!(Binnable::force_lsb(y), y);
        // Works on negatives (magnitude grows).
        let z = Binnable::force_lsb(-1.0f64);
        assert_eq!(z.to_bits(), (-1.0f64).to_bits() | 1);
        assert!(z < -1.0);
    }

    #[test]
    fn index_is_monotone_down_in_magnitude() {
        let samples = [1e300f64, 1e100, 1e20, 1.0, 1e-20, 1e-300, 0.0];
        for w in samples.windows(2) {
            assert!(
                Binnable::index(w[0]) <= Binnable::index(w[1]),
                "index({}) > index({})",
                w[0],
                w[1]
            );
        }
        assert_eq!(Binnable::index(0.0f64), f64::ZERO_INDEX);
        assert_eq!(Binnable::index(5e-324f64), f64::ZERO_INDEX);
        assert_eq!(Binnable::index(0.0f32), f32::ZERO_INDEX);
        assert_eq!(f64::ZERO_INDEX, 51);
        assert_eq!(f32::ZERO_INDEX, 19);
    }

    #[test]
    fn scale_dominates_and_sits_on_the_grid() {
        for &x in &[1.0f64, 3.5, 1e20, 4e200, 1e-300, 5e-324] {
            let s = Binnable::scale(x);
            assert!(s >= x.abs(), "scale({x}) = {s} < |x|");
            let e = Binnable::exponent(s);
            assert_eq!((e - 1).rem_euclid(f64::SCALE_STEP), 0, "off-grid scale for {x}");
        }
        assert_eq!(Binnable::scale(0.0f64), 0.0);
    }

    #[test]
    fn nan_inf_classification() {
        assert!(Binnable::is_nan_or_inf(f64::NAN));
        assert!(Binnable::is_nan_or_inf(f64::INFINITY));
        assert!(Binnable::is_nan_or_inf(f64::NEG_INFINITY));
        assert!(!Binnable::is_nan_or_inf(f64::MAX));
        assert!(!Binnable::is_nan_or_inf(0.0f64));
    }
}
