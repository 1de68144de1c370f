//! Reproducible facade
//!
//! Thin entry points in the classic BLAS shape: allocate a packed
//! accumulator of the precision's default fold, drive the kernel, convert,
//! return the scalar. Three variants per operation and kind:
//!
//! - `dsum(n, x, incx)` — default fold, sentinel on invalid arguments
//!   (`0` for scalars, no-op for in-place), condition reported through
//!   [`crate::set_arg_error_hook`];
//! - `dsum_fold(fold, n, x, incx)` — fold-explicit, fold first, same
//!   sentinel behavior;
//! - `dsum_fold_r(fold, n, x, incx)` — result-returning, for callers that
//!   want the [`ArgError`] itself.
//!
//! The kind prefixes are `s`/`d` (single/double real) and `c`/`z`
//! (single/double complex, with `dotu`/`dotc` in place of `dot`). The
//! generic, fold-first forms (`sum_r`, `dotc_r`, `gemm_r`, …) are public
//! too; the named functions are wrappers over them.
//!
//! Validation happens here, once, before any kernel runs: zero strides,
//! short buffers, out-of-range folds, and undersized leading dimensions.
//! Everything past the checks is pure computation with no panics.

#![forbid(unsafe_code)]

use num_complex::Complex;

use crate::blas1;
use crate::blas23::{
    gemm_complex_kernel, gemm_kernel, gemv_complex_kernel, gemv_dims, gemv_kernel, Order,
    Transpose,
};
use crate::fp::Binnable;
use crate::packed::{Binned, BinnedComplex};
use crate::{check_fold, report_arg_error, ArgError};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_vec(arg: &'static str, n: usize, len: usize, inc: usize) -> Result<(), ArgError> {
    if inc == 0 {
        return Err(ArgError::ZeroStride { arg });
    }
    let need = if n == 0 { 0 } else { (n - 1) * inc + 1 };
    if len < need {
        return Err(ArgError::ShortBuffer { arg, need, got: len });
    }
    Ok(())
}

fn check_mat(
    arg: &'static str,
    order: Order,
    rows: usize,
    cols: usize,
    lda: usize,
    len: usize,
) -> Result<(), ArgError> {
    let (major, minor) = match order {
        Order::RowMajor => (rows, cols),
        Order::ColMajor => (cols, rows),
    };
    if lda < minor.max(1) {
        return Err(ArgError::LdaTooSmall {
            lda,
            min: minor.max(1),
        });
    }
    let need = if major == 0 || minor == 0 {
        0
    } else {
        (major - 1) * lda + minor
    };
    if len < need {
        return Err(ArgError::ShortBuffer { arg, need, got: len });
    }
    Ok(())
}

/// Raw storage dims of a (possibly transposed) logical `rows × cols` operand.
fn raw_dims(trans: Transpose, rows: usize, cols: usize) -> (usize, usize) {
    if trans.is_trans() {
        (cols, rows)
    } else {
        (rows, cols)
    }
}

// ---------------------------------------------------------------------------
// Generic fold-first operations (result-returning)
// ---------------------------------------------------------------------------

/// Reproducible sum of a real vector.
pub fn sum_r<R: Binnable>(fold: usize, n: usize, x: &[R], incx: usize) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::sum_into(fold, n, x, incx, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible absolute-value sum of a real vector.
pub fn asum_r<R: Binnable>(fold: usize, n: usize, x: &[R], incx: usize) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::asum_into(fold, n, x, incx, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible dot product of two real vectors.
pub fn dot_r<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[R],
    incx: usize,
    y: &[R],
    incy: usize,
) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    check_vec("y", n, y.len(), incy)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::dot_into(fold, n, x, incx, y, incy, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible Euclidean norm of a real vector (scaled sum of squares).
pub fn nrm2_r<R: Binnable>(fold: usize, n: usize, x: &[R], incx: usize) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    let scl = blas1::ssq_into(fold, n, x, incx, R::ZERO, pri, 1, car, 1);
    let ssq = acc.to_scalar();
    Ok(if ssq.is_nan_or_inf() {
        ssq
    } else {
        scl * ssq.sqrt()
    })
}

/// Reproducible `y ← α·op(A)·x + β·y` for real scalars.
#[allow(clippy::too_many_arguments)]
pub fn gemv_r<R: Binnable>(
    fold: usize,
    order: Order,
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: R,
    a: &[R],
    lda: usize,
    x: &[R],
    incx: usize,
    beta: R,
    y: &mut [R],
    incy: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    check_mat("a", order, m, n, lda, a.len())?;
    let (rows, inner) = gemv_dims(trans, m, n);
    check_vec("x", inner, x.len(), incx)?;
    check_vec("y", rows, y.len(), incy)?;
    let mut acc = Binned::<R>::new(fold)?;
    gemv_kernel(
        fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy, &mut acc,
    );
    Ok(())
}

/// Reproducible `C ← α·op(A)·op(B) + β·C` for real scalars.
#[allow(clippy::too_many_arguments)]
pub fn gemm_r<R: Binnable>(
    fold: usize,
    order: Order,
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: R,
    a: &[R],
    lda: usize,
    b: &[R],
    ldb: usize,
    beta: R,
    c: &mut [R],
    ldc: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    let (ar, ac) = raw_dims(trans_a, m, k);
    let (br, bc) = raw_dims(trans_b, k, n);
    check_mat("a", order, ar, ac, lda, a.len())?;
    check_mat("b", order, br, bc, ldb, b.len())?;
    check_mat("c", order, m, n, ldc, c.len())?;
    let mut acc = Binned::<R>::new(fold)?;
    gemm_kernel(
        fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc, &mut acc,
    );
    Ok(())
}

/// Reproducible sum of a complex vector.
pub fn sum_complex_r<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
) -> Result<Complex<R>, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = BinnedComplex::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::sum_complex_into(fold, n, x, incx, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible `Σ (|re| + |im|)` of a complex vector (real result).
pub fn asum_complex_r<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::asum_complex_into(fold, n, x, incx, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible unconjugated complex dot product `Σ x_i · y_i`.
pub fn dotu_r<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    y: &[Complex<R>],
    incy: usize,
) -> Result<Complex<R>, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    check_vec("y", n, y.len(), incy)?;
    let mut acc = BinnedComplex::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::dotu_into(fold, n, x, incx, y, incy, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible conjugated complex dot product `Σ conj(x_i) · y_i`.
pub fn dotc_r<R: Binnable + num_traits::Num>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    y: &[Complex<R>],
    incy: usize,
) -> Result<Complex<R>, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    check_vec("y", n, y.len(), incy)?;
    let mut acc = BinnedComplex::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    blas1::dotc_into(fold, n, x, incx, y, incy, pri, 1, car, 1);
    Ok(acc.to_scalar())
}

/// Reproducible Euclidean norm of a complex vector (real result).
pub fn nrm2_complex_r<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
) -> Result<R, ArgError> {
    check_fold::<R>(fold)?;
    check_vec("x", n, x.len(), incx)?;
    let mut acc = Binned::<R>::new(fold)?;
    let (pri, car) = acc.parts_mut();
    let scl = blas1::ssq_complex_into(fold, n, x, incx, R::ZERO, pri, 1, car, 1);
    let ssq = acc.to_scalar();
    Ok(if ssq.is_nan_or_inf() {
        ssq
    } else {
        scl * ssq.sqrt()
    })
}

/// Reproducible `y ← α·op(A)·x + β·y` for complex scalars.
#[allow(clippy::too_many_arguments)]
pub fn gemv_complex_r<R: Binnable + num_traits::Num>(
    fold: usize,
    order: Order,
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: Complex<R>,
    a: &[Complex<R>],
    lda: usize,
    x: &[Complex<R>],
    incx: usize,
    beta: Complex<R>,
    y: &mut [Complex<R>],
    incy: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    check_mat("a", order, m, n, lda, a.len())?;
    let (rows, inner) = gemv_dims(trans, m, n);
    check_vec("x", inner, x.len(), incx)?;
    check_vec("y", rows, y.len(), incy)?;
    let mut acc = BinnedComplex::<R>::new(fold)?;
    gemv_complex_kernel(
        fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy, &mut acc,
    );
    Ok(())
}

/// Reproducible `C ← α·op(A)·op(B) + β·C` for complex scalars.
#[allow(clippy::too_many_arguments)]
pub fn gemm_complex_r<R: Binnable + num_traits::Num>(
    fold: usize,
    order: Order,
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: Complex<R>,
    a: &[Complex<R>],
    lda: usize,
    b: &[Complex<R>],
    ldb: usize,
    beta: Complex<R>,
    c: &mut [Complex<R>],
    ldc: usize,
) -> Result<(), ArgError> {
    check_fold::<R>(fold)?;
    let (ar, ac) = raw_dims(trans_a, m, k);
    let (br, bc) = raw_dims(trans_b, k, n);
    check_mat("a", order, ar, ac, lda, a.len())?;
    check_mat("b", order, br, bc, ldb, b.len())?;
    check_mat("c", order, m, n, ldc, c.len())?;
    let mut acc = BinnedComplex::<R>::new(fold)?;
    gemm_complex_kernel(
        fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc, &mut acc,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Named per-kind wrappers
// ---------------------------------------------------------------------------

macro_rules! real_api {
    (
        $t:ty,
        $sum:ident $sum_fold:ident $sum_fold_r:ident,
        $asum:ident $asum_fold:ident $asum_fold_r:ident,
        $dot:ident $dot_fold:ident $dot_fold_r:ident,
        $nrm2:ident $nrm2_fold:ident $nrm2_fold_r:ident,
        $gemv:ident $gemv_fold:ident $gemv_fold_r:ident,
        $gemm:ident $gemm_fold:ident $gemm_fold_r:ident
    ) => {
        #[doc = concat!("Reproducible sum of a `", stringify!($t), "` vector (default fold).")]
        pub fn $sum(n: usize, x: &[$t], incx: usize) -> $t {
            $sum_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($sum), "`]; sentinel `0` on invalid arguments.")]
        pub fn $sum_fold(fold: usize, n: usize, x: &[$t], incx: usize) -> $t {
            match $sum_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($sum), "`].")]
        pub fn $sum_fold_r(fold: usize, n: usize, x: &[$t], incx: usize) -> Result<$t, ArgError> {
            sum_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible absolute-value sum of a `", stringify!($t), "` vector.")]
        pub fn $asum(n: usize, x: &[$t], incx: usize) -> $t {
            $asum_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($asum), "`].")]
        pub fn $asum_fold(fold: usize, n: usize, x: &[$t], incx: usize) -> $t {
            match $asum_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($asum), "`].")]
        pub fn $asum_fold_r(fold: usize, n: usize, x: &[$t], incx: usize) -> Result<$t, ArgError> {
            asum_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible dot product of two `", stringify!($t), "` vectors.")]
        pub fn $dot(n: usize, x: &[$t], incx: usize, y: &[$t], incy: usize) -> $t {
            $dot_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx, y, incy)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($dot), "`].")]
        pub fn $dot_fold(fold: usize, n: usize, x: &[$t], incx: usize, y: &[$t], incy: usize) -> $t {
            match $dot_fold_r(fold, n, x, incx, y, incy) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($dot), "`].")]
        pub fn $dot_fold_r(
            fold: usize,
            n: usize,
            x: &[$t],
            incx: usize,
            y: &[$t],
            incy: usize,
        ) -> Result<$t, ArgError> {
            dot_r::<$t>(fold, n, x, incx, y, incy)
        }

        #[doc = concat!("Reproducible Euclidean norm of a `", stringify!($t), "` vector.")]
        pub fn $nrm2(n: usize, x: &[$t], incx: usize) -> $t {
            $nrm2_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($nrm2), "`].")]
        pub fn $nrm2_fold(fold: usize, n: usize, x: &[$t], incx: usize) -> $t {
            match $nrm2_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($nrm2), "`].")]
        pub fn $nrm2_fold_r(fold: usize, n: usize, x: &[$t], incx: usize) -> Result<$t, ArgError> {
            nrm2_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible `y ← α·op(A)·x + β·y` over `", stringify!($t), "`.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv(
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            x: &[$t],
            incx: usize,
            beta: $t,
            y: &mut [$t],
            incy: usize,
        ) {
            $gemv_fold(
                <$t as Binnable>::DEFAULT_FOLD,
                order,
                trans,
                m,
                n,
                alpha,
                a,
                lda,
                x,
                incx,
                beta,
                y,
                incy,
            )
        }
        #[doc = concat!("Fold-explicit [`", stringify!($gemv), "`]; no-op on invalid arguments.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv_fold(
            fold: usize,
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            x: &[$t],
            incx: usize,
            beta: $t,
            y: &mut [$t],
            incy: usize,
        ) {
            if let Err(e) =
                $gemv_fold_r(fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
            {
                report_arg_error(&e);
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($gemv), "`].")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv_fold_r(
            fold: usize,
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            x: &[$t],
            incx: usize,
            beta: $t,
            y: &mut [$t],
            incy: usize,
        ) -> Result<(), ArgError> {
            gemv_r::<$t>(fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
        }

        #[doc = concat!("Reproducible `C ← α·op(A)·op(B) + β·C` over `", stringify!($t), "`.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm(
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            b: &[$t],
            ldb: usize,
            beta: $t,
            c: &mut [$t],
            ldc: usize,
        ) {
            $gemm_fold(
                <$t as Binnable>::DEFAULT_FOLD,
                order,
                trans_a,
                trans_b,
                m,
                n,
                k,
                alpha,
                a,
                lda,
                b,
                ldb,
                beta,
                c,
                ldc,
            )
        }
        #[doc = concat!("Fold-explicit [`", stringify!($gemm), "`]; no-op on invalid arguments.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm_fold(
            fold: usize,
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            b: &[$t],
            ldb: usize,
            beta: $t,
            c: &mut [$t],
            ldc: usize,
        ) {
            if let Err(e) = $gemm_fold_r(
                fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
            ) {
                report_arg_error(&e);
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($gemm), "`].")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm_fold_r(
            fold: usize,
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: $t,
            a: &[$t],
            lda: usize,
            b: &[$t],
            ldb: usize,
            beta: $t,
            c: &mut [$t],
            ldc: usize,
        ) -> Result<(), ArgError> {
            gemm_r::<$t>(
                fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
            )
        }
    };
}

real_api!(
    f32,
    ssum ssum_fold ssum_fold_r,
    sasum sasum_fold sasum_fold_r,
    sdot sdot_fold sdot_fold_r,
    snrm2 snrm2_fold snrm2_fold_r,
    sgemv sgemv_fold sgemv_fold_r,
    sgemm sgemm_fold sgemm_fold_r
);

real_api!(
    f64,
    dsum dsum_fold dsum_fold_r,
    dasum dasum_fold dasum_fold_r,
    ddot ddot_fold ddot_fold_r,
    dnrm2 dnrm2_fold dnrm2_fold_r,
    dgemv dgemv_fold dgemv_fold_r,
    dgemm dgemm_fold dgemm_fold_r
);

macro_rules! complex_api {
    (
        $t:ty,
        $sum:ident $sum_fold:ident $sum_fold_r:ident,
        $asum:ident $asum_fold:ident $asum_fold_r:ident,
        $dotu:ident $dotu_fold:ident $dotu_fold_r:ident,
        $dotc:ident $dotc_fold:ident $dotc_fold_r:ident,
        $nrm2:ident $nrm2_fold:ident $nrm2_fold_r:ident,
        $gemv:ident $gemv_fold:ident $gemv_fold_r:ident,
        $gemm:ident $gemm_fold:ident $gemm_fold_r:ident
    ) => {
        #[doc = concat!("Reproducible sum of a complex `", stringify!($t), "` vector.")]
        pub fn $sum(n: usize, x: &[Complex<$t>], incx: usize) -> Complex<$t> {
            $sum_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($sum), "`].")]
        pub fn $sum_fold(fold: usize, n: usize, x: &[Complex<$t>], incx: usize) -> Complex<$t> {
            match $sum_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    Complex::new(0.0, 0.0)
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($sum), "`].")]
        pub fn $sum_fold_r(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
        ) -> Result<Complex<$t>, ArgError> {
            sum_complex_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible `Σ (|re| + |im|)` of a complex `", stringify!($t), "` vector.")]
        pub fn $asum(n: usize, x: &[Complex<$t>], incx: usize) -> $t {
            $asum_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($asum), "`].")]
        pub fn $asum_fold(fold: usize, n: usize, x: &[Complex<$t>], incx: usize) -> $t {
            match $asum_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($asum), "`].")]
        pub fn $asum_fold_r(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
        ) -> Result<$t, ArgError> {
            asum_complex_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible unconjugated dot `Σ x_i·y_i` over complex `", stringify!($t), "`.")]
        pub fn $dotu(
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Complex<$t> {
            $dotu_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx, y, incy)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($dotu), "`].")]
        pub fn $dotu_fold(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Complex<$t> {
            match $dotu_fold_r(fold, n, x, incx, y, incy) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    Complex::new(0.0, 0.0)
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($dotu), "`].")]
        pub fn $dotu_fold_r(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Result<Complex<$t>, ArgError> {
            dotu_r::<$t>(fold, n, x, incx, y, incy)
        }

        #[doc = concat!("Reproducible conjugated dot `Σ conj(x_i)·y_i` over complex `", stringify!($t), "`.")]
        pub fn $dotc(
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Complex<$t> {
            $dotc_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx, y, incy)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($dotc), "`].")]
        pub fn $dotc_fold(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Complex<$t> {
            match $dotc_fold_r(fold, n, x, incx, y, incy) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    Complex::new(0.0, 0.0)
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($dotc), "`].")]
        pub fn $dotc_fold_r(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
            y: &[Complex<$t>],
            incy: usize,
        ) -> Result<Complex<$t>, ArgError> {
            dotc_r::<$t>(fold, n, x, incx, y, incy)
        }

        #[doc = concat!("Reproducible Euclidean norm of a complex `", stringify!($t), "` vector.")]
        pub fn $nrm2(n: usize, x: &[Complex<$t>], incx: usize) -> $t {
            $nrm2_fold(<$t as Binnable>::DEFAULT_FOLD, n, x, incx)
        }
        #[doc = concat!("Fold-explicit [`", stringify!($nrm2), "`].")]
        pub fn $nrm2_fold(fold: usize, n: usize, x: &[Complex<$t>], incx: usize) -> $t {
            match $nrm2_fold_r(fold, n, x, incx) {
                Ok(v) => v,
                Err(e) => {
                    report_arg_error(&e);
                    0.0
                }
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($nrm2), "`].")]
        pub fn $nrm2_fold_r(
            fold: usize,
            n: usize,
            x: &[Complex<$t>],
            incx: usize,
        ) -> Result<$t, ArgError> {
            nrm2_complex_r::<$t>(fold, n, x, incx)
        }

        #[doc = concat!("Reproducible `y ← α·op(A)·x + β·y` over complex `", stringify!($t), "`.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv(
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            x: &[Complex<$t>],
            incx: usize,
            beta: Complex<$t>,
            y: &mut [Complex<$t>],
            incy: usize,
        ) {
            $gemv_fold(
                <$t as Binnable>::DEFAULT_FOLD,
                order,
                trans,
                m,
                n,
                alpha,
                a,
                lda,
                x,
                incx,
                beta,
                y,
                incy,
            )
        }
        #[doc = concat!("Fold-explicit [`", stringify!($gemv), "`]; no-op on invalid arguments.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv_fold(
            fold: usize,
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            x: &[Complex<$t>],
            incx: usize,
            beta: Complex<$t>,
            y: &mut [Complex<$t>],
            incy: usize,
        ) {
            if let Err(e) =
                $gemv_fold_r(fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
            {
                report_arg_error(&e);
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($gemv), "`].")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemv_fold_r(
            fold: usize,
            order: Order,
            trans: Transpose,
            m: usize,
            n: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            x: &[Complex<$t>],
            incx: usize,
            beta: Complex<$t>,
            y: &mut [Complex<$t>],
            incy: usize,
        ) -> Result<(), ArgError> {
            gemv_complex_r::<$t>(fold, order, trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
        }

        #[doc = concat!("Reproducible `C ← α·op(A)·op(B) + β·C` over complex `", stringify!($t), "`.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm(
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            b: &[Complex<$t>],
            ldb: usize,
            beta: Complex<$t>,
            c: &mut [Complex<$t>],
            ldc: usize,
        ) {
            $gemm_fold(
                <$t as Binnable>::DEFAULT_FOLD,
                order,
                trans_a,
                trans_b,
                m,
                n,
                k,
                alpha,
                a,
                lda,
                b,
                ldb,
                beta,
                c,
                ldc,
            )
        }
        #[doc = concat!("Fold-explicit [`", stringify!($gemm), "`]; no-op on invalid arguments.")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm_fold(
            fold: usize,
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            b: &[Complex<$t>],
            ldb: usize,
            beta: Complex<$t>,
            c: &mut [Complex<$t>],
            ldc: usize,
        ) {
            if let Err(e) = $gemm_fold_r(
                fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
            ) {
                report_arg_error(&e);
            }
        }
        #[doc = concat!("Result-returning [`", stringify!($gemm), "`].")]
        #[allow(clippy::too_many_arguments)]
        pub fn $gemm_fold_r(
            fold: usize,
            order: Order,
            trans_a: Transpose,
            trans_b: Transpose,
            m: usize,
            n: usize,
            k: usize,
            alpha: Complex<$t>,
            a: &[Complex<$t>],
            lda: usize,
            b: &[Complex<$t>],
            ldb: usize,
            beta: Complex<$t>,
            c: &mut [Complex<$t>],
            ldc: usize,
        ) -> Result<(), ArgError> {
            gemm_complex_r::<$t>(
                fold, order, trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
            )
        }
    };
}

complex_api!(
    f32,
    csum csum_fold csum_fold_r,
    casum casum_fold casum_fold_r,
    cdotu cdotu_fold cdotu_fold_r,
    cdotc cdotc_fold cdotc_fold_r,
    cnrm2 cnrm2_fold cnrm2_fold_r,
    cgemv cgemv_fold cgemv_fold_r,
    cgemm cgemm_fold cgemm_fold_r
);

complex_api!(
    f64,
    zsum zsum_fold zsum_fold_r,
    zasum zasum_fold zasum_fold_r,
    zdotu zdotu_fold zdotu_fold_r,
    zdotc zdotc_fold zdotc_fold_r,
    znrm2 znrm2_fold znrm2_fold_r,
    zgemv zgemv_fold zgemv_fold_r,
    zgemm zgemm_fold zgemm_fold_r
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
