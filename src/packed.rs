//! Packed indexed scalars
//!
//! One-allocation handles over the manual algebra: a [`Binned`] bundles the
//! primary and carry vectors of a fold-`K` accumulator into a single
//! `2·K`-scalar block (`[primary | carry]`); [`BinnedComplex`] interleaves
//! real/imaginary lanes into `4·K` scalars. The handles carry their fold, so
//! mismatched merges are caught instead of corrupting bins.
//!
//! The same packed layout is what an external reduction ships between
//! workers: [`combine_slices`] interprets two raw buffers as arrays of
//! packed accumulators and merges them pairwise with the exact associative
//! combiner — precisely the element-type/operator pair a collective reduce
//! needs. With the `serde` feature the handles also serialize for
//! transports that want a self-describing encoding.

#![forbid(unsafe_code)]

use core::fmt;

use num_complex::Complex;

use crate::fp::Binnable;
use crate::manual;
use crate::{check_fold, report_arg_error, ArgError};

/// Packed size, in working scalars, of a real accumulator of fold `fold`.
#[inline]
pub fn packed_len(fold: usize) -> usize {
    2 * fold
}

/// Packed size, in working scalars, of a complex accumulator of fold `fold`.
#[inline]
pub fn packed_len_complex(fold: usize) -> usize {
    4 * fold
}

// ---------------------------------------------------------------------------
// Real handle
// ---------------------------------------------------------------------------

/// A packed real binned accumulator.
///
/// Freshly created or [`Binned::set_zero`]-ed handles represent exactly
/// zero and are the identity of [`Binned::merge`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Binned<R: Binnable> {
    fold: usize,
    buf: Box<[R]>,
}

impl<R: Binnable> Binned<R> {
    /// Allocate a zeroed accumulator of the given fold.
    pub fn new(fold: usize) -> Result<Self, ArgError> {
        check_fold::<R>(fold)?;
        Ok(Self {
            fold,
            buf: vec![R::ZERO; packed_len(fold)].into_boxed_slice(),
        })
    }

    /// Allocate a zeroed accumulator of the precision's default fold.
    pub fn with_default_fold() -> Self {
        Self {
            fold: R::DEFAULT_FOLD,
            buf: vec![R::ZERO; packed_len(R::DEFAULT_FOLD)].into_boxed_slice(),
        }
    }

    /// Build an accumulator representing exactly `x`.
    pub fn from_scalar(fold: usize, x: R) -> Result<Self, ArgError> {
        let mut acc = Self::new(fold)?;
        acc.add_scalar(x);
        Ok(acc)
    }

    /// The fold this handle was allocated with.
    #[inline]
    pub fn fold(&self) -> usize {
        self.fold
    }

    /// Back to the untouched state (represents exactly zero).
    pub fn set_zero(&mut self) {
        for v in self.buf.iter_mut() {
            *v = R::ZERO;
        }
    }

    /// The primary vector (read-only).
    #[inline]
    pub fn primary(&self) -> &[R] {
        &self.buf[..self.fold]
    }

    /// The carry vector (read-only).
    #[inline]
    pub fn carry(&self) -> &[R] {
        &self.buf[self.fold..]
    }

    /// Split into `(primary, carry)` for driving the manual layer directly
    /// (both unit-stride).
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut [R], &mut [R]) {
        self.buf.split_at_mut(self.fold)
    }

    /// True when the handle has never been seeded.
    #[inline]
    pub fn is_untouched(&self) -> bool {
        manual::is_untouched(&self.buf)
    }

    /// Add one scalar (full update/deposit/renormalize cycle).
    pub fn add_scalar(&mut self, x: R) {
        let fold = self.fold;
        let (pri, car) = self.buf.split_at_mut(fold);
        manual::add_scalar(fold, x, pri, 1, car, 1);
    }

    /// The working-precision value this accumulator represents.
    pub fn to_scalar(&self) -> R {
        manual::convert(self.fold, self.primary(), 1, self.carry(), 1)
    }

    /// Merge `src` into `self` with the exact associative combiner.
    pub fn merge(&mut self, src: &Self) -> Result<(), ArgError> {
        if self.fold != src.fold {
            return Err(ArgError::FoldMismatch {
                left: self.fold,
                right: src.fold,
            });
        }
        let fold = self.fold;
        let (dst_pri, dst_car) = self.buf.split_at_mut(fold);
        manual::add_binned(
            fold,
            src.primary(),
            1,
            src.carry(),
            1,
            dst_pri,
            1,
            dst_car,
            1,
        );
        Ok(())
    }

    /// True when any retained primary has drifted into the subnormal range.
    pub fn has_denormal_bits(&self) -> bool {
        manual::has_denormal_bits(self.fold, self.primary(), 1)
    }
}

impl<R: Binnable> fmt::Display for Binned<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "binned accumulator, fold {}", self.fold)?;
        for i in 0..self.fold {
            writeln!(
                f,
                "  bin {i}: primary {:e}, carry {}",
                self.primary()[i],
                self.carry()[i]
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Complex handle
// ---------------------------------------------------------------------------

/// A packed complex binned accumulator (two interleaved real lanes).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinnedComplex<R: Binnable> {
    fold: usize,
    buf: Box<[R]>,
}

impl<R: Binnable> BinnedComplex<R> {
    /// Allocate a zeroed accumulator of the given fold.
    pub fn new(fold: usize) -> Result<Self, ArgError> {
        check_fold::<R>(fold)?;
        Ok(Self {
            fold,
            buf: vec![R::ZERO; packed_len_complex(fold)].into_boxed_slice(),
        })
    }

    /// Allocate a zeroed accumulator of the precision's default fold.
    pub fn with_default_fold() -> Self {
        Self {
            fold: R::DEFAULT_FOLD,
            buf: vec![R::ZERO; packed_len_complex(R::DEFAULT_FOLD)].into_boxed_slice(),
        }
    }

    /// Build an accumulator representing exactly `x`.
    pub fn from_scalar(fold: usize, x: Complex<R>) -> Result<Self, ArgError> {
        let mut acc = Self::new(fold)?;
        acc.add_scalar(x);
        Ok(acc)
    }

    /// The fold this handle was allocated with.
    #[inline]
    pub fn fold(&self) -> usize {
        self.fold
    }

    /// Back to the untouched state.
    pub fn set_zero(&mut self) {
        for v in self.buf.iter_mut() {
            *v = R::ZERO;
        }
    }

    /// Interleaved primary lanes (read-only).
    #[inline]
    pub fn primary(&self) -> &[R] {
        &self.buf[..2 * self.fold]
    }

    /// Interleaved carry lanes (read-only).
    #[inline]
    pub fn carry(&self) -> &[R] {
        &self.buf[2 * self.fold..]
    }

    /// Split into interleaved `(primary, carry)` lanes for the manual layer
    /// (complex-unit stride 1).
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut [R], &mut [R]) {
        self.buf.split_at_mut(2 * self.fold)
    }

    /// Add one complex scalar.
    pub fn add_scalar(&mut self, x: Complex<R>) {
        let fold = self.fold;
        let (pri, car) = self.buf.split_at_mut(2 * fold);
        manual::add_scalar_complex(fold, x, pri, 1, car, 1);
    }

    /// The complex value this accumulator represents.
    pub fn to_scalar(&self) -> Complex<R> {
        manual::convert_complex(self.fold, self.primary(), 1, self.carry(), 1)
    }

    /// Merge `src` into `self`, lane by lane.
    pub fn merge(&mut self, src: &Self) -> Result<(), ArgError> {
        if self.fold != src.fold {
            return Err(ArgError::FoldMismatch {
                left: self.fold,
                right: src.fold,
            });
        }
        let fold = self.fold;
        let (dst_pri, dst_car) = self.buf.split_at_mut(2 * fold);
        manual::add_binned_complex(
            fold,
            src.primary(),
            1,
            src.carry(),
            1,
            dst_pri,
            1,
            dst_car,
            1,
        );
        Ok(())
    }

    /// True when any retained primary of either lane is subnormal.
    pub fn has_denormal_bits(&self) -> bool {
        manual::has_denormal_bits_complex(self.fold, self.primary(), 1)
    }
}

impl<R: Binnable> fmt::Display for BinnedComplex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "binned complex accumulator, fold {}", self.fold)?;
        for i in 0..self.fold {
            writeln!(
                f,
                "  bin {i}: primary {:e}+{:e}i, carry {}+{}i",
                self.primary()[2 * i],
                self.primary()[2 * i + 1],
                self.carry()[2 * i],
                self.carry()[2 * i + 1]
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Buffer-level combiner (the external-reducer operator)
// ---------------------------------------------------------------------------

/// Merge `count` packed real accumulators: `dst[i] ← dst[i] ⊕ src[i]`.
///
/// Both buffers are arrays of `2·fold`-scalar packed accumulators. This is
/// the operator shape a collective reduce applies per rank; it is exact,
/// commutative, and associative, so the reduction tree's shape cannot leak
/// into the result.
pub fn combine_slices_r<R: Binnable>(
    src: &[R],
    dst: &mut [R],
    count: usize,
    fold: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    let stride = packed_len(fold);
    let need = count.saturating_mul(stride);
    if src.len() < need {
        return Err(ArgError::ShortBuffer {
            arg: "src",
            need,
            got: src.len(),
        });
    }
    if dst.len() < need {
        return Err(ArgError::ShortBuffer {
            arg: "dst",
            need,
            got: dst.len(),
        });
    }
    for k in 0..count {
        let s = &src[k * stride..(k + 1) * stride];
        let d = &mut dst[k * stride..(k + 1) * stride];
        let (dp, dc) = d.split_at_mut(fold);
        manual::add_binned(fold, &s[..fold], 1, &s[fold..], 1, dp, 1, dc, 1);
    }
    Ok(())
}

/// Reporting wrapper over [`combine_slices_r`]: on invalid arguments the
/// buffers are left untouched and the condition goes to the error hook.
pub fn combine_slices<R: Binnable>(src: &[R], dst: &mut [R], count: usize, fold: usize) {
    if let Err(e) = combine_slices_r(src, dst, count, fold) {
        report_arg_error(&e);
    }
}

/// Complex variant of [`combine_slices_r`] (`4·fold` scalars per element).
pub fn combine_slices_complex_r<R: Binnable>(
    src: &[R],
    dst: &mut [R],
    count: usize,
    fold: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    let stride = packed_len_complex(fold);
    let need = count.saturating_mul(stride);
    if src.len() < need {
        return Err(ArgError::ShortBuffer {
            arg: "src",
            need,
            got: src.len(),
        });
    }
    if dst.len() < need {
        return Err(ArgError::ShortBuffer {
            arg: "dst",
            need,
            got: dst.len(),
        });
    }
    let half = stride / 2;
    for k in 0..count {
        let s = &src[k * stride..(k + 1) * stride];
        let d = &mut dst[k * stride..(k + 1) * stride];
        let (dp, dc) = d.split_at_mut(half);
        manual::add_binned_complex(fold, &s[..half], 1, &s[half..], 1, dp, 1, dc, 1);
    }
    Ok(())
}

/// Reporting wrapper over [`combine_slices_complex_r`].
pub fn combine_slices_complex<R: Binnable>(src: &[R], dst: &mut [R], count: usize, fold: usize) {
    if let Err(e) = combine_slices_complex_r(src, dst, count, fold) {
        report_arg_error(&e);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        for &x in &[0.0f64, 1.0, -2.5e17, 3.141592653589793, 1e-300] {
            let acc = Binned::from_scalar(3, x).unwrap();
            assert_eq!(acc.to_scalar(), x);
        }
        let z = num_complex::Complex64::new(-8.25, 1e10);
        let acc = BinnedComplex::from_scalar(3, z).unwrap();
        assert_eq!(acc.to_scalar(), z);
    }

    #[test]
    fn merge_matches_flat_accumulation() {
        let xs = [1.5f64, -2.25, 1e12, 7.0, -3.5e-9, 42.0];
        let mut whole = Binned::<f64>::with_default_fold();
        for &x in &xs {
            whole.add_scalar(x);
        }
        let (lo, hi) = xs.split_at(3);
        let mut left = Binned::<f64>::with_default_fold();
        let mut right = Binned::<f64>::with_default_fold();
        for &x in lo {
            left.add_scalar(x);
        }
        for &x in hi {
            right.add_scalar(x);
        }
        left.merge(&right).unwrap();
        assert_eq!(left, whole);
        assert_eq!(left.to_scalar(), whole.to_scalar());
    }

    #[test]
    fn merge_rejects_mismatched_folds() {
        let mut a = Binned::<f64>::new(3).unwrap();
        let b = Binned::<f64>::new(4).unwrap();
        assert_eq!(
            a.merge(&b),
            Err(ArgError::FoldMismatch { left: 3, right: 4 })
        );
    }

    #[test]
    fn fresh_handle_is_merge_identity() {
        let mut acc = Binned::from_scalar(3, 123.456f64).unwrap();
        let zero = Binned::<f64>::new(3).unwrap();
        let before = acc.clone();
        acc.merge(&zero).unwrap();
        assert_eq!(acc, before);

        let mut lhs = Binned::<f64>::new(3).unwrap();
        lhs.merge(&before).unwrap();
        assert_eq!(lhs, before);
    }

    #[test]
    fn combine_slices_merges_pairwise() {
        let fold = 3;
        let stride = packed_len(fold);
        let mut src = vec![0.0f64; 2 * stride];
        let mut dst = vec![0.0f64; 2 * stride];

        let a = Binned::from_scalar(fold, 10.0f64).unwrap();
        let b = Binned::from_scalar(fold, -4.0f64).unwrap();
        let c = Binned::from_scalar(fold, 1.0f64).unwrap();
        src[..fold].copy_from_slice(a.primary());
        src[fold..stride].copy_from_slice(a.carry());
        src[stride..stride + fold].copy_from_slice(b.primary());
        src[stride + fold..].copy_from_slice(b.carry());
        dst[..fold].copy_from_slice(c.primary());
        dst[fold..stride].copy_from_slice(c.carry());

        combine_slices_r(&src, &mut dst, 2, fold).unwrap();

        let first = manual::convert(fold, &dst[..fold], 1, &dst[fold..stride], 1);
        let second = manual::convert(
            fold,
            &dst[stride..stride + fold],
            1,
            &dst[stride + fold..],
            1,
        );
        assert_eq!(first, 11.0);
        assert_eq!(second, -4.0);
    }

    #[test]
    fn display_lists_every_bin() {
        let acc = Binned::from_scalar(3, 2.0f64).unwrap();
        let text = format!("{acc}");
        assert!(text.contains("fold 3"));
        assert!(text.contains("bin 2"));
    }
}
