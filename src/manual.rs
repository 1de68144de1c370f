//! Strided indexed algebra
//!
//! The manual layer: every operation of the binned-accumulator algebra over
//! caller-owned `(primary, carry)` slices at explicit strides. The packed
//! handles in [`crate::packed`] and the kernels in [`crate::blas1`] /
//! [`crate::blas23`] are thin layers over these routines; complex
//! accumulators are two interleaved real lanes (stride doubling, imaginary
//! lane at offset 1), so everything here is written once per shape, generic
//! over the working precision.
//!
//! ## Discipline
//!
//! A caller drives an accumulator through the cycle
//!
//! 1. [`update`] with an upper bound on the magnitudes about to arrive
//!    (raises the bin window; never lowers it),
//! 2. up to [`Binnable::ENDURANCE`] calls to [`deposit`],
//! 3. [`renormalize`], which sheds whole carry quanta into the carry vector
//!    without changing the represented value by a single bit.
//!
//! [`convert`] reads the represented value; [`add_binned`] merges two
//! accumulators of the same fold and is exact, commutative, and associative
//! on renormalized operands — it is the operator handed to an external
//! reduction.
//!
//! ## Taint
//!
//! NaN/∞ are data: once one reaches `primary[0]`, the accumulator is tainted
//! and every later operation folds into `primary[0]` under plain float
//! rules, so conversion yields the NaN or ±∞ the flat sum would. Tainted
//! accumulators are not bit-stable across orderings (only value-stable);
//! everything else is.

#![forbid(unsafe_code)]

use num_complex::Complex;

use crate::bins::{bin_center, carry_quantum, primary_index};
use crate::fp::Binnable;

// ---------------------------------------------------------------------------
// State predicates
// ---------------------------------------------------------------------------

/// An accumulator whose leading primary is `+0.0` has never been seeded; it
/// represents exactly zero and acts as the identity of [`add_binned`].
#[inline]
pub fn is_untouched<R: Binnable>(pri: &[R]) -> bool {
    pri[0] == R::ZERO
}

/// True when any retained primary has drifted into the subnormal range —
/// the caller-observable cue that a denormals-are-zero fast path would
/// change results.
pub fn has_denormal_bits<R: Binnable>(fold: usize, pri: &[R], inc_pri: usize) -> bool {
    (0..fold).any(|i| {
        let p = pri[i * inc_pri];
        p != R::ZERO && p.is_subnormal()
    })
}

/// Complex variant of [`has_denormal_bits`] (either lane).
pub fn has_denormal_bits_complex<R: Binnable>(fold: usize, pri: &[R], inc_pri: usize) -> bool {
    has_denormal_bits(fold, pri, 2 * inc_pri) || has_denormal_bits(fold, &pri[1..], 2 * inc_pri)
}

// ---------------------------------------------------------------------------
// Zeroing / copying
// ---------------------------------------------------------------------------

/// Reset to the untouched state (represents exactly zero).
pub fn set_zero<R: Binnable>(
    fold: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    for i in 0..fold {
        pri[i * inc_pri] = R::ZERO;
        car[i * inc_car] = R::ZERO;
    }
}

/// Complex reset: both lanes.
pub fn set_zero_complex<R: Binnable>(
    fold: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    set_zero(fold, pri, 2 * inc_pri, car, 2 * inc_car);
    set_zero(fold, &mut pri[1..], 2 * inc_pri, &mut car[1..], 2 * inc_car);
}

/// Copy `src` into `dst` (same fold, independent strides).
pub fn copy_binned<R: Binnable>(
    fold: usize,
    src_pri: &[R],
    src_inc_pri: usize,
    src_car: &[R],
    src_inc_car: usize,
    dst_pri: &mut [R],
    dst_inc_pri: usize,
    dst_car: &mut [R],
    dst_inc_car: usize,
) {
    for i in 0..fold {
        dst_pri[i * dst_inc_pri] = src_pri[i * src_inc_pri];
        dst_car[i * dst_inc_car] = src_car[i * src_inc_car];
    }
}

// ---------------------------------------------------------------------------
// Update: raise the bin window
// ---------------------------------------------------------------------------

/// Raise the window so deposits with `|v| ≤ |x|` are admissible.
///
/// Seeds an untouched accumulator from `x`'s magnitude class; shifts an
/// existing window up when `x` outranks it (content slides toward the low
/// bins, anything past the last bin is shed — deterministically, since the
/// final window depends only on the running maximum). Never lowers a window.
/// No-op when the accumulator is tainted or `x` is not finite (the following
/// [`deposit`] handles the taint itself).
pub fn update<R: Binnable>(
    fold: usize,
    x: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    if x.is_nan_or_inf() {
        return;
    }
    update_to_index(fold, x.index(), pri, inc_pri, car, inc_car);
}

/// Complex update: each lane raised by its own component bound.
pub fn update_complex<R: Binnable>(
    fold: usize,
    x: Complex<R>,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    update(fold, x.re, pri, 2 * inc_pri, car, 2 * inc_car);
    update(
        fold,
        x.im,
        &mut pri[1..],
        2 * inc_pri,
        &mut car[1..],
        2 * inc_car,
    );
}

/// [`update`] with the target magnitude class given directly. Used by the
/// combiner (aligning to another accumulator's window) and by rescaling
/// (re-seeding underflowed tails from the zero class).
pub(crate) fn update_to_index<R: Binnable>(
    fold: usize,
    j: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    if pri[0].is_nan_or_inf() {
        return;
    }
    if pri[0] == R::ZERO {
        for i in 0..fold {
            pri[i * inc_pri] = bin_center::<R>(j + i);
            car[i * inc_car] = R::ZERO;
        }
        return;
    }
    let top = primary_index(pri[0]);
    if j < top {
        let shift = (top - j).min(fold);
        for i in (shift..fold).rev() {
            pri[i * inc_pri] = pri[(i - shift) * inc_pri];
            car[i * inc_car] = car[(i - shift) * inc_car];
        }
        for i in 0..shift {
            pri[i * inc_pri] = bin_center::<R>(j + i);
            car[i * inc_car] = R::ZERO;
        }
    }
}

// ---------------------------------------------------------------------------
// Deposit: the hot path
// ---------------------------------------------------------------------------

/// Add `x` to an accumulator whose window already admits it.
///
/// Each bin absorbs the part of the running value that survives rounding on
/// the bin's quantum; the leftover is exact and cascades to the next bin.
/// The addend's low mantissa bit is forced to 1 first, so the rounding can
/// never tie — which makes the absorbed amount a pure function of `(x, bin)`
/// and the whole sum independent of deposit order.
///
/// Deposits never touch the carry vector. `±0.0` is a no-op. On an untouched
/// accumulator the window is first seeded from `x` itself (the seed-deposit
/// sequence); on a zero-window accumulator the top-bin addend is pre-scaled
/// by [`Binnable::COMPRESSION`] to halve the top term's effective quantum,
/// and conversion applies the matching expansion.
pub fn deposit<R: Binnable>(fold: usize, x: R, pri: &mut [R], inc_pri: usize) {
    debug_assert!(fold >= 2);
    if x.is_nan_or_inf() || pri[0].is_nan_or_inf() {
        pri[0] = pri[0] + x;
        return;
    }
    if x == R::ZERO {
        return;
    }
    if pri[0] == R::ZERO {
        let j = x.index();
        for i in 0..fold {
            pri[i * inc_pri] = bin_center::<R>(j + i);
        }
        if pri[0].is_nan_or_inf() {
            pri[0] = pri[0] + x;
            return;
        }
    }

    let mut x = x;
    let last = (fold - 1) * inc_pri;
    if primary_index(pri[0]) == R::ZERO_INDEX {
        // Compressed top term.
        let m = pri[0];
        let q = (x * R::COMPRESSION).force_lsb() + m;
        pri[0] = q;
        let r = (m - q) * (R::EXPANSION * R::HALF);
        x = x + r;
        x = x + r;
        for i in 1..fold - 1 {
            if x == R::ZERO {
                return;
            }
            let m = pri[i * inc_pri];
            let q = x.force_lsb() + m;
            pri[i * inc_pri] = q;
            x = x + (m - q);
        }
    } else {
        for i in 0..fold - 1 {
            if x == R::ZERO {
                return;
            }
            let m = pri[i * inc_pri];
            let q = x.force_lsb() + m;
            pri[i * inc_pri] = q;
            x = x + (m - q);
        }
    }
    // Fully absorbed residuals must not reach the last bin: forcing the low
    // bit of zero would fabricate the smallest subnormal there.
    if x != R::ZERO {
        pri[last] = pri[last] + x.force_lsb();
    }
}

/// Complex deposit: real lane at even offsets, imaginary at odd, each with
/// its own taint and seeding handled by the lane deposit.
pub fn deposit_complex<R: Binnable>(fold: usize, x: Complex<R>, pri: &mut [R], inc_pri: usize) {
    deposit(fold, x.re, pri, 2 * inc_pri);
    deposit(fold, x.im, &mut pri[1..], 2 * inc_pri);
}

// ---------------------------------------------------------------------------
// Renormalize
// ---------------------------------------------------------------------------

/// Shed accumulated drift into the carry vector.
///
/// Each primary is returned to `[1.5·ufp, 1.75·ufp)` by at most one carry
/// quantum (a quarter of its ufp); the step count lands in the carry entry.
/// The quantum is an exact multiple of the primary's ulp, so the represented
/// value — and therefore every downstream conversion — is unchanged
/// bit-for-bit. Bins whose centers degraded to the subnormal range are left
/// alone (their drift is bounded by the range itself).
pub fn renormalize<R: Binnable>(
    fold: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    if pri[0] == R::ZERO || pri[0].is_nan_or_inf() {
        return;
    }
    for i in 0..fold {
        let m = pri[i * inc_pri];
        if m == R::ZERO {
            continue;
        }
        let u = m.ufp();
        if u == R::ZERO {
            continue;
        }
        let quantum = (u * R::HALF) * R::HALF;
        let lo = u + u * R::HALF; // 1.5·ufp — the bin center
        let hi = lo + quantum; // 1.75·ufp
        if m < lo {
            pri[i * inc_pri] = m + quantum;
            car[i * inc_car] = car[i * inc_car] - R::ONE;
        } else if m >= hi {
            pri[i * inc_pri] = m - quantum;
            car[i * inc_car] = car[i * inc_car] + R::ONE;
        }
    }
}

/// Complex renormalize: both lanes.
pub fn renormalize_complex<R: Binnable>(
    fold: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    renormalize(fold, pri, 2 * inc_pri, car, 2 * inc_car);
    renormalize(
        fold,
        &mut pri[1..],
        2 * inc_pri,
        &mut car[1..],
        2 * inc_car,
    );
}

// ---------------------------------------------------------------------------
// Convert
// ---------------------------------------------------------------------------

/// Read the working-precision value an accumulator represents.
///
/// Bins are folded top-down (largest magnitude first): per bin, the carry
/// count times the carry quantum, then the primary's offset from its center.
/// Tainted accumulators return `primary[0]` (the NaN or ±∞ itself);
/// untouched ones return `+0.0`. Zero-window top terms are expanded back
/// from their compressed scale.
pub fn convert<R: Binnable>(
    fold: usize,
    pri: &[R],
    inc_pri: usize,
    car: &[R],
    inc_car: usize,
) -> R {
    if pri[0].is_nan_or_inf() {
        return pri[0];
    }
    if pri[0] == R::ZERO {
        return R::ZERO;
    }
    let top = primary_index(pri[0]);
    let mut y = R::ZERO;
    let mut start = 0;
    if top == R::ZERO_INDEX {
        y = y + (car[0] * carry_quantum::<R>(top)) * R::EXPANSION;
        y = y + (pri[0] - bin_center::<R>(top)) * R::EXPANSION;
        start = 1;
    }
    for i in start..fold {
        y = y + car[i * inc_car] * carry_quantum::<R>(top + i);
        y = y + (pri[i * inc_pri] - bin_center::<R>(top + i));
    }
    y
}

/// Complex convert: lanes independently.
pub fn convert_complex<R: Binnable>(
    fold: usize,
    pri: &[R],
    inc_pri: usize,
    car: &[R],
    inc_car: usize,
) -> Complex<R> {
    Complex::new(
        convert(fold, pri, 2 * inc_pri, car, 2 * inc_car),
        convert(fold, &pri[1..], 2 * inc_pri, &car[1..], 2 * inc_car),
    )
}

// ---------------------------------------------------------------------------
// Scalar add (update + deposit + renormalize)
// ---------------------------------------------------------------------------

/// Add one scalar through the full cycle; leaves the accumulator
/// renormalized.
pub fn add_scalar<R: Binnable>(
    fold: usize,
    x: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    update(fold, x, pri, inc_pri, car, inc_car);
    deposit(fold, x, pri, inc_pri);
    renormalize(fold, pri, inc_pri, car, inc_car);
}

/// Complex scalar add.
pub fn add_scalar_complex<R: Binnable>(
    fold: usize,
    x: Complex<R>,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    update_complex(fold, x, pri, inc_pri, car, inc_car);
    deposit_complex(fold, x, pri, inc_pri);
    renormalize_complex(fold, pri, inc_pri, car, inc_car);
}

// ---------------------------------------------------------------------------
// The combiner
// ---------------------------------------------------------------------------

/// Merge `src` into `dst` (`dst ← dst ⊕ src`); both fold-`fold`,
/// renormalized. Exact, bit-commutative and -associative, with the
/// untouched accumulator as identity.
///
/// The destination window is raised to the higher of the two; source bins
/// are offset by the index difference, their center-relative offsets and
/// carry counts added exactly, and anything below the destination's last
/// bin is shed (the same shedding a one-shot computation at the final
/// window performs). Ends with a renormalize, so results chain.
pub fn add_binned<R: Binnable>(
    fold: usize,
    src_pri: &[R],
    src_inc_pri: usize,
    src_car: &[R],
    src_inc_car: usize,
    dst_pri: &mut [R],
    dst_inc_pri: usize,
    dst_car: &mut [R],
    dst_inc_car: usize,
) {
    if src_pri[0] == R::ZERO {
        return;
    }
    if src_pri[0].is_nan_or_inf() {
        dst_pri[0] = dst_pri[0] + src_pri[0];
        return;
    }
    if dst_pri[0].is_nan_or_inf() {
        return;
    }
    if dst_pri[0] == R::ZERO {
        copy_binned(
            fold,
            src_pri,
            src_inc_pri,
            src_car,
            src_inc_car,
            dst_pri,
            dst_inc_pri,
            dst_car,
            dst_inc_car,
        );
        return;
    }

    let src_top = primary_index(src_pri[0]);
    update_to_index(fold, src_top, dst_pri, dst_inc_pri, dst_car, dst_inc_car);
    let dst_top = primary_index(dst_pri[0]);
    let offset = src_top - dst_top;
    for i in 0..fold.saturating_sub(offset) {
        let j = i + offset;
        dst_pri[j * dst_inc_pri] =
            dst_pri[j * dst_inc_pri] + (src_pri[i * src_inc_pri] - bin_center::<R>(src_top + i));
        dst_car[j * dst_inc_car] = dst_car[j * dst_inc_car] + src_car[i * src_inc_car];
    }
    renormalize(fold, dst_pri, dst_inc_pri, dst_car, dst_inc_car);
}

/// Complex combiner: lanes independently.
pub fn add_binned_complex<R: Binnable>(
    fold: usize,
    src_pri: &[R],
    src_inc_pri: usize,
    src_car: &[R],
    src_inc_car: usize,
    dst_pri: &mut [R],
    dst_inc_pri: usize,
    dst_car: &mut [R],
    dst_inc_car: usize,
) {
    add_binned(
        fold,
        src_pri,
        2 * src_inc_pri,
        src_car,
        2 * src_inc_car,
        dst_pri,
        2 * dst_inc_pri,
        dst_car,
        2 * dst_inc_car,
    );
    add_binned(
        fold,
        &src_pri[1..],
        2 * src_inc_pri,
        &src_car[1..],
        2 * src_inc_car,
        &mut dst_pri[1..],
        2 * dst_inc_pri,
        &mut dst_car[1..],
        2 * dst_inc_car,
    );
}

// ---------------------------------------------------------------------------
// Scaled sum-of-squares support
// ---------------------------------------------------------------------------

/// Rescale a sum-of-squares accumulator from `old_scale` to `new_scale`
/// (both powers of two off the [`Binnable::SCALE_STEP`] grid, `new ≥ old`).
///
/// Divides every primary by `(new/old)²`. On the scale grid that ratio
/// shifts exponents by a whole number of bins, so centers map to centers and
/// the represented value is divided exactly. A primary that underflows to
/// zero re-seeds the remaining tail from the bottom magnitude class and
/// stops (the shed content is below resolution at the new scale).
pub fn rescale<R: Binnable>(
    fold: usize,
    new_scale: R,
    old_scale: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    if new_scale == old_scale || new_scale == R::ZERO || old_scale == R::ZERO {
        return;
    }
    let ratio = new_scale / old_scale;
    let ratio = ratio * ratio;
    for i in 0..fold {
        let at = i * inc_pri;
        pri[at] = pri[at] / ratio;
        if pri[at] == R::ZERO {
            update_to_index(
                fold - i,
                R::ZERO_INDEX,
                &mut pri[at..],
                inc_pri,
                &mut car[i * inc_car..],
                inc_car,
            );
            break;
        }
    }
}

/// Complex rescale: each lane rescaled independently, like every other
/// complex adapter here. A lane whose lead primary underflows re-seeds its
/// own remaining bins from the bottom magnitude class; the other lane keeps
/// its exactly divided content.
pub fn rescale_complex<R: Binnable>(
    fold: usize,
    new_scale: R,
    old_scale: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    rescale(fold, new_scale, old_scale, pri, 2 * inc_pri, car, 2 * inc_car);
    rescale(
        fold,
        new_scale,
        old_scale,
        &mut pri[1..],
        2 * inc_pri,
        &mut car[1..],
        2 * inc_car,
    );
}

/// Merge two scaled sums of squares: `dst ← dst ⊕ src`, reconciling scales
/// by exact rescaling toward the larger one. Returns the merged scale.
pub fn add_ssq<R: Binnable>(
    fold: usize,
    src_scale: R,
    src_pri: &[R],
    src_inc_pri: usize,
    src_car: &[R],
    src_inc_car: usize,
    dst_scale: R,
    dst_pri: &mut [R],
    dst_inc_pri: usize,
    dst_car: &mut [R],
    dst_inc_car: usize,
) -> R {
    if src_scale > dst_scale {
        rescale(
            fold, src_scale, dst_scale, dst_pri, dst_inc_pri, dst_car, dst_inc_car,
        );
        add_binned(
            fold, src_pri, src_inc_pri, src_car, src_inc_car, dst_pri, dst_inc_pri, dst_car,
            dst_inc_car,
        );
        src_scale
    } else if src_scale == dst_scale {
        add_binned(
            fold, src_pri, src_inc_pri, src_car, src_inc_car, dst_pri, dst_inc_pri, dst_car,
            dst_inc_car,
        );
        src_scale
    } else {
        // Bring a private copy of the source up to the destination's scale.
        let mut tmp_pri = vec![R::ZERO; fold];
        let mut tmp_car = vec![R::ZERO; fold];
        copy_binned(
            fold, src_pri, src_inc_pri, src_car, src_inc_car, &mut tmp_pri, 1, &mut tmp_car, 1,
        );
        rescale(fold, dst_scale, src_scale, &mut tmp_pri, 1, &mut tmp_car, 1);
        add_binned(
            fold, &tmp_pri, 1, &tmp_car, 1, dst_pri, dst_inc_pri, dst_car, dst_inc_car,
        );
        dst_scale
    }
}

/// Complex counterpart of [`add_ssq`]: one shared scale covers both lanes,
/// and reconciliation rescales them together. Returns the merged scale.
pub fn add_ssq_complex<R: Binnable>(
    fold: usize,
    src_scale: R,
    src_pri: &[R],
    src_inc_pri: usize,
    src_car: &[R],
    src_inc_car: usize,
    dst_scale: R,
    dst_pri: &mut [R],
    dst_inc_pri: usize,
    dst_car: &mut [R],
    dst_inc_car: usize,
) -> R {
    if src_scale > dst_scale {
        rescale_complex(
            fold, src_scale, dst_scale, dst_pri, dst_inc_pri, dst_car, dst_inc_car,
        );
        add_binned_complex(
            fold, src_pri, src_inc_pri, src_car, src_inc_car, dst_pri, dst_inc_pri, dst_car,
            dst_inc_car,
        );
        src_scale
    } else if src_scale == dst_scale {
        add_binned_complex(
            fold, src_pri, src_inc_pri, src_car, src_inc_car, dst_pri, dst_inc_pri, dst_car,
            dst_inc_car,
        );
        src_scale
    } else {
        // Bring a private copy of the source up to the destination's scale.
        let mut tmp_pri = vec![R::ZERO; 2 * fold];
        let mut tmp_car = vec![R::ZERO; 2 * fold];
        copy_binned(
            fold,
            src_pri,
            2 * src_inc_pri,
            src_car,
            2 * src_inc_car,
            &mut tmp_pri,
            2,
            &mut tmp_car,
            2,
        );
        copy_binned(
            fold,
            &src_pri[1..],
            2 * src_inc_pri,
            &src_car[1..],
            2 * src_inc_car,
            &mut tmp_pri[1..],
            2,
            &mut tmp_car[1..],
            2,
        );
        rescale_complex(fold, dst_scale, src_scale, &mut tmp_pri, 1, &mut tmp_car, 1);
        add_binned_complex(
            fold, &tmp_pri, 1, &tmp_car, 1, dst_pri, dst_inc_pri, dst_car, dst_inc_car,
        );
        dst_scale
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(fold: usize) -> (Vec<f64>, Vec<f64>) {
        (vec![0.0; fold], vec![0.0; fold])
    }

    fn added(fold: usize, xs: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (mut p, mut c) = fresh(fold);
        for &x in xs {
            add_scalar(fold, x, &mut p, 1, &mut c, 1);
        }
        (p, c)
    }

    #[test]
    fn untouched_converts_to_zero() {
        let (p, c) = fresh(3);
        assert_eq!(convert(3, &p, 1, &c, 1), 0.0);
        assert!(is_untouched(&p));
    }

    #[test]
    fn single_value_round_trips_exactly() {
        for &x in &[
            1.0f64,
            -1.0,
            3.5,
            1e20,
            -2.5e-7,
            1e-300,
            5e-324,
            -5e-324,
            1.2345678901234567,
            f64::MAX / 1e16,
        ] {
            let (p, c) = added(3, &[x]);
            assert_eq!(convert(3, &p, 1, &c, 1), x, "round trip failed for {x}");
        }
        for &x in &[1.0f32, -7.25, 3.0e10, 3.0 * f32::pow2(-140)] {
            let mut p = vec![0.0f32; 3];
            let mut c = vec![0.0f32; 3];
            add_scalar(3, x, &mut p, 1, &mut c, 1);
            assert_eq!(convert(3, &p, 1, &c, 1), x);
        }
    }

    #[test]
    fn zero_deposit_is_a_no_op() {
        let (mut p, mut c) = added(3, &[2.0]);
        let snapshot = p.clone();
        deposit(3, 0.0, &mut p, 1);
        deposit(3, -0.0, &mut p, 1);
        assert_eq!(p, snapshot);
        renormalize(3, &mut p, 1, &mut c, 1);
        assert_eq!(convert(3, &p, 1, &c, 1), 2.0);
    }

    #[test]
    fn giant_gap_cancellation_is_exact() {
        // 66-bit gap fits a fold-3 window: the unit survives the 1e20 pair.
        let (p, c) = added(3, &[1e20, 1.0, -1e20]);
        assert_eq!(convert(3, &p, 1, &c, 1), 1.0);
    }

    #[test]
    fn renormalize_preserves_the_represented_value() {
        let fold = 3;
        let (mut p, mut c) = fresh(fold);
        update(fold, 1.0, &mut p, 1, &mut c, 1);
        for i in 0..f64::ENDURANCE {
            deposit(fold, if i % 2 == 0 { 0.875 } else { -0.25 }, &mut p, 1);
        }
        let before = convert(fold, &p, 1, &c, 1);
        renormalize(fold, &mut p, 1, &mut c, 1);
        let after = convert(fold, &p, 1, &c, 1);
        assert_eq!(before.to_bits(), after.to_bits());
    }

    #[test]
    fn window_shift_preserves_retained_content() {
        let fold = 3;
        let (mut p, mut c) = fresh(fold);
        add_scalar(fold, 1.0, &mut p, 1, &mut c, 1);
        // One-bin raise: old top content slides to the second slot.
        let big = 2f64.powi(45);
        add_scalar(fold, big, &mut p, 1, &mut c, 1);
        assert_eq!(convert(fold, &p, 1, &c, 1), big + 1.0);
    }

    #[test]
    fn deposits_commute_bit_for_bit() {
        let fold = 3;
        let xs = [3.5f64, -0.125, 7.75, 11.0, -3.25, 0.5];
        let (mut pa, mut ca) = fresh(fold);
        let (mut pb, mut cb) = fresh(fold);
        let bound = 11.0;
        update(fold, bound, &mut pa, 1, &mut ca, 1);
        update(fold, bound, &mut pb, 1, &mut cb, 1);
        for &x in &xs {
            deposit(fold, x, &mut pa, 1);
        }
        for &x in xs.iter().rev() {
            deposit(fold, x, &mut pb, 1);
        }
        renormalize(fold, &mut pa, 1, &mut ca, 1);
        renormalize(fold, &mut pb, 1, &mut cb, 1);
        assert_eq!(pa, pb);
        assert_eq!(ca, cb);
    }

    #[test]
    fn combine_has_untouched_identity() {
        let fold = 3;
        let (pa, ca) = added(fold, &[2.5, -1e10, 4.0]);
        let (zp, zc) = fresh(fold);

        // A ⊕ Z == A
        let (mut p, mut c) = (pa.clone(), ca.clone());
        add_binned(fold, &zp, 1, &zc, 1, &mut p, 1, &mut c, 1);
        assert_eq!((p.clone(), c.clone()), (pa.clone(), ca.clone()));

        // Z ⊕ A == A
        let (mut p, mut c) = fresh(fold);
        add_binned(fold, &pa, 1, &ca, 1, &mut p, 1, &mut c, 1);
        assert_eq!((p, c), (pa, ca));
    }

    #[test]
    fn combine_commutes_and_associates_bitwise() {
        let fold = 3;
        let a = added(fold, &[1.5, 2.25, -0.75]);
        let b = added(fold, &[1e8, -3.0]);
        let d = added(fold, &[-1e-4, 9.5, 2.0]);

        let merge = |x: &(Vec<f64>, Vec<f64>), y: &(Vec<f64>, Vec<f64>)| {
            let (mut p, mut c) = (x.0.clone(), x.1.clone());
            add_binned(fold, &y.0, 1, &y.1, 1, &mut p, 1, &mut c, 1);
            (p, c)
        };

        assert_eq!(merge(&a, &b), merge(&b, &a));
        assert_eq!(merge(&merge(&a, &b), &d), merge(&a, &merge(&b, &d)));
    }

    #[test]
    fn taint_is_sticky_and_kind_correct() {
        let fold = 3;
        let (mut p, mut c) = added(fold, &[1.0]);
        add_scalar(fold, f64::NAN, &mut p, 1, &mut c, 1);
        add_scalar(fold, 2.0, &mut p, 1, &mut c, 1);
        assert!(convert(fold, &p, 1, &c, 1).is_nan());

        let (mut p, mut c) = fresh(fold);
        add_scalar(fold, f64::INFINITY, &mut p, 1, &mut c, 1);
        add_scalar(fold, 1.0, &mut p, 1, &mut c, 1);
        assert_eq!(convert(fold, &p, 1, &c, 1), f64::INFINITY);
        add_scalar(fold, f64::NEG_INFINITY, &mut p, 1, &mut c, 1);
        assert!(convert(fold, &p, 1, &c, 1).is_nan());
    }

    #[test]
    fn complex_lanes_are_independent() {
        let fold = 3;
        let mut p = vec![0.0f64; 2 * fold];
        let mut c = vec![0.0f64; 2 * fold];
        add_scalar_complex(fold, Complex::new(3.0, -4.0), &mut p, 1, &mut c, 1);
        add_scalar_complex(fold, Complex::new(0.5, 0.25), &mut p, 1, &mut c, 1);
        let z = convert_complex(fold, &p, 1, &c, 1);
        assert_eq!(z, Complex::new(3.5, -3.75));
    }

    #[test]
    fn rescale_divides_exactly_on_the_grid() {
        let fold = 3;
        let (mut p, mut c) = fresh(fold);
        // Sum-of-squares-like content: everything at or below one.
        for &x in &[1.0, 0.25, 0.5, 0.0625] {
            add_scalar(fold, x, &mut p, 1, &mut c, 1);
        }
        let before = convert(fold, &p, 1, &c, 1);
        let old = 2f64.powi(100); // on the 20-exponent grid
        let new = 2f64.powi(140);
        rescale(fold, new, old, &mut p, 1, &mut c, 1);
        let after = convert(fold, &p, 1, &c, 1);
        let ratio = (new / old) * (new / old);
        assert_eq!(after.to_bits(), (before / ratio).to_bits());
    }

    #[test]
    fn add_ssq_reconciles_scales() {
        let fold = 3;
        let (mut pa, mut ca) = fresh(fold);
        add_scalar(fold, 0.5, &mut pa, 1, &mut ca, 1);
        let (pb, cb) = added(fold, &[0.25]);
        let sa = 2f64.powi(40);
        let sb = 2f64.powi(20);
        // dst has the larger scale: src is rescaled up; value b/(sa/sb)^2.
        let merged = add_ssq(fold, sb, &pb, 1, &cb, 1, sa, &mut pa, 1, &mut ca, 1);
        assert_eq!(merged, sa);
        let expect = 0.5 + 0.25 / 2f64.powi(40);
        assert_eq!(convert(fold, &pa, 1, &ca, 1), expect);
    }

    #[test]
    fn rescale_complex_divides_both_lanes_exactly() {
        let fold = 3;
        let mut p = vec![0.0f64; 2 * fold];
        let mut c = vec![0.0f64; 2 * fold];
        for &z in &[Complex::new(1.0, 0.5), Complex::new(0.25, -0.125)] {
            add_scalar_complex(fold, z, &mut p, 1, &mut c, 1);
        }
        let before = convert_complex(fold, &p, 1, &c, 1);
        let old = 2f64.powi(100); // on the 20-exponent grid
        let new = 2f64.powi(140);
        rescale_complex(fold, new, old, &mut p, 1, &mut c, 1);
        let after = convert_complex(fold, &p, 1, &c, 1);
        let ratio = (new / old) * (new / old);
        assert_eq!(after.re.to_bits(), (before.re / ratio).to_bits());
        assert_eq!(after.im.to_bits(), (before.im / ratio).to_bits());
    }

    #[test]
    fn rescale_complex_reseeds_only_the_underflowed_lane() {
        let fold = 3;
        let mut p = vec![0.0f64; 2 * fold];
        let mut c = vec![0.0f64; 2 * fold];
        // Real lane far below the imaginary one: the division drives only
        // the real lane past the bottom of the range.
        add_scalar_complex(fold, Complex::new(1e-300, 1.0), &mut p, 1, &mut c, 1);
        let old = 2f64.powi(20);
        let new = 2f64.powi(320);
        rescale_complex(fold, new, old, &mut p, 1, &mut c, 1);
        let ratio = (new / old) * (new / old);
        let z = convert_complex(fold, &p, 1, &c, 1);
        assert_eq!(z.re, 0.0);
        assert_eq!(z.im.to_bits(), (1.0 / ratio).to_bits());
        // The real lane was re-seeded on the bottom class, not cleared.
        assert!(!is_untouched(&p));
    }

    #[test]
    fn add_ssq_complex_reconciles_scales() {
        let fold = 3;
        let mut pa = vec![0.0f64; 2 * fold];
        let mut ca = vec![0.0f64; 2 * fold];
        add_scalar_complex(fold, Complex::new(0.5, 0.25), &mut pa, 1, &mut ca, 1);
        let mut pb = vec![0.0f64; 2 * fold];
        let mut cb = vec![0.0f64; 2 * fold];
        add_scalar_complex(fold, Complex::new(0.25, 1.0), &mut pb, 1, &mut cb, 1);
        let sa = 2f64.powi(40);
        let sb = 2f64.powi(20);
        // dst has the larger scale: src is rescaled up lane-for-lane.
        let merged = add_ssq_complex(fold, sb, &pb, 1, &cb, 1, sa, &mut pa, 1, &mut ca, 1);
        assert_eq!(merged, sa);
        let expect = Complex::new(0.5 + 0.25 / 2f64.powi(40), 0.25 + 1.0 / 2f64.powi(40));
        assert_eq!(convert_complex(fold, &pa, 1, &ca, 1), expect);
    }

    #[test]
    fn denormal_drift_is_observable() {
        let fold = 3;
        let (mut p, mut c) = fresh(fold);
        add_scalar(fold, 1.0, &mut p, 1, &mut c, 1);
        assert!(!has_denormal_bits(fold, &p, 1));
        let (mut p, mut c) = fresh(fold);
        add_scalar(fold, 1e-310, &mut p, 1, &mut c, 1);
        // Zero-window tails sit below the normal range.
        assert!(has_denormal_bits(fold, &p, 1));
        assert_eq!(convert(fold, &p, 1, &c, 1), 1e-310);
    }
}
