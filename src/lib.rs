//! Reproducible floating-point reductions
//!
//! This crate computes sums, dot products, norms, and matrix kernels whose
//! results are **bit-identical under any permutation of the inputs, any
//! block decomposition, and any number of participating workers** — at
//! throughput close to an ordinary, non-reproducible loop.
//!
//! ## How
//!
//! A partial reduction is held as a *binned accumulator*: a small, ordered
//! tuple of pre-rounded working-precision values (the primary vector), one
//! per power-of-two magnitude class, plus integer-valued carry counters.
//! Every input lands in a bin position determined only by its exponent —
//! never by arrival order — and the pre-rounding (forcing the addend's low
//! mantissa bit) removes round-to-nearest ties, so each bin absorbs an
//! amount that is a pure function of the value and the bin. Sums over the
//! same multiset of inputs therefore agree to the last bit, and partial
//! accumulators merge through an exact, commutative, associative combiner.
//!
//! ## Layers
//!
//! - [`fp`] — bit utilities over the working scalars (`f32`, `f64`).
//! - [`bins`] — the immutable per-precision bin tables.
//! - [`manual`] — the full algebra over caller-owned strided buffers.
//! - [`packed`] — [`Binned`] / [`BinnedComplex`] one-allocation handles and
//!   the buffer-level combiner for external reducers.
//! - [`blas1`] / [`blas23`] — blocked reduction kernels (`sum`, `asum`,
//!   `dot`, scaled sum of squares, `gemv`, `gemm`) over accumulators.
//! - [`api`] — the reproducible facade: `dsum`, `ddot`, `znrm2`, `sgemm`, …
//!   with fold-explicit and result-returning variants.
//!
//! ## Invariants
//!
//! - Kernels are pure: no I/O, no logging, no allocation beyond their own
//!   accumulator, no panics on the validated path.
//! - NaN and ±∞ are data, not errors: they taint the accumulator stickily
//!   and conversion returns the NaN/±∞ a flat sum would (taint is the one
//!   carve-out from bit-stability; it stays value-correct).
//! - Invalid arguments never panic the facade: the call returns the BLAS
//!   sentinel (`0` / no-op) and the condition is reported through the
//!   process-wide [`set_arg_error_hook`] (default: a `tracing` warning).
//! - Bin tables are immutable, process-wide, and idempotently constructed:
//!   any thread may trigger the build and all of them compute the same
//!   bytes.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

use std::sync::RwLock;

/// Bin tables (process-wide constants).
pub mod bins;
/// Working-precision bit utilities and the [`Binnable`] trait.
pub mod fp;
/// Strided indexed algebra: update / deposit / renormalize / convert /
/// combine / rescale over caller-owned buffers.
pub mod manual;
/// Packed accumulator handles and the buffer-level combiner.
pub mod packed;
/// Vector reduction kernels over accumulators.
pub mod blas1;
/// Matrix kernels (`gemv`, `gemm`) over the dot skeleton.
pub mod blas23;
/// The reproducible facade: per-kind entry points.
pub mod api;

pub use api::*;
pub use blas23::{Order, Transpose};
pub use fp::Binnable;
pub use num_complex::{Complex32, Complex64};
pub use packed::{
    combine_slices, combine_slices_complex, combine_slices_complex_r, combine_slices_r,
    packed_len, packed_len_complex, Binned, BinnedComplex,
};

/// Invalid-argument conditions surfaced by the result-returning APIs.
///
/// The plain facade reports these through the hook and returns the sentinel
/// instead (see the crate docs); nothing here is ever a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    /// Fold outside `2..=MAX_FOLD` for the working precision.
    #[error("fold {fold} outside supported range 2..={max}")]
    FoldOutOfRange {
        /// The fold that was requested.
        fold: usize,
        /// Largest fold the precision supports.
        max: usize,
    },
    /// A vector stride of zero.
    #[error("{arg} stride must be nonzero")]
    ZeroStride {
        /// Which argument carried the stride.
        arg: &'static str,
    },
    /// A buffer shorter than its length/stride arguments require.
    #[error("{arg} too short: need {need} elements, got {got}")]
    ShortBuffer {
        /// Which argument is short.
        arg: &'static str,
        /// Elements required by the call.
        need: usize,
        /// Elements actually supplied.
        got: usize,
    },
    /// Leading dimension smaller than the matrix's minor extent.
    #[error("lda {lda} smaller than minimum {min}")]
    LdaTooSmall {
        /// The leading dimension passed in.
        lda: usize,
        /// The smallest legal value.
        min: usize,
    },
    /// Two accumulators of different folds in one operation.
    #[error("fold mismatch: {left} vs {right}")]
    FoldMismatch {
        /// Fold of the left/destination operand.
        left: usize,
        /// Fold of the right/source operand.
        right: usize,
    },
}

pub(crate) fn check_fold<R: Binnable>(fold: usize) -> Result<(), ArgError> {
    if fold < 2 || fold > R::MAX_FOLD {
        return Err(ArgError::FoldOutOfRange {
            fold,
            max: R::MAX_FOLD,
        });
    }
    Ok(())
}

type ErrorHook = Box<dyn Fn(&ArgError) + Send + Sync>;

static ARG_ERROR_HOOK: RwLock<Option<ErrorHook>> = RwLock::new(None);

/// Install the process-wide invalid-argument hook used by the plain facade.
///
/// The default (no hook installed) emits a `tracing::warn!` event, which the
/// standard subscriber routes to stderr. The hook must not panic.
pub fn set_arg_error_hook(hook: impl Fn(&ArgError) + Send + Sync + 'static) {
    let mut slot = ARG_ERROR_HOOK
        .write()
        .unwrap_or_else(|poison| poison.into_inner());
    *slot = Some(Box::new(hook));
}

pub(crate) fn report_arg_error(err: &ArgError) {
    let slot = ARG_ERROR_HOOK
        .read()
        .unwrap_or_else(|poison| poison.into_inner());
    match slot.as_ref() {
        Some(hook) => hook(err),
        None => tracing::warn!(error = %err, "invalid argument; returning sentinel"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_bounds_are_enforced() {
        assert!(check_fold::<f64>(2).is_ok());
        assert!(check_fold::<f64>(f64::MAX_FOLD).is_ok());
        assert_eq!(
            check_fold::<f64>(1),
            Err(ArgError::FoldOutOfRange {
                fold: 1,
                max: f64::MAX_FOLD
            })
        );
        assert!(check_fold::<f32>(f32::MAX_FOLD + 1).is_err());
    }

    #[test]
    fn hook_receives_reported_errors() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        set_arg_error_hook(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        report_arg_error(&ArgError::ZeroStride { arg: "x" });
        assert!(hits.load(Ordering::SeqCst) >= 1);
        // Restore the default for other tests.
        let mut slot = ARG_ERROR_HOOK.write().unwrap();
        *slot = None;
    }
}
