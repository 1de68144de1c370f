//! Matrix kernels
//!
//! `gemv` and `gemm` are the dot-product skeleton applied per output
//! element: every `y[r]` / `C[i,j]` gets its own binned accumulator, seeded
//! with the `β`-scaled prior value and fed the α-scaled partial products of
//! one row of `op(A)` against a vector / a column of `op(B)`. Scaling by
//! `α` is folded into the streamed element (one rounding, fixed expression),
//! so each contribution is a pure function of its indices and the result is
//! stable under any split of the inner dimension.
//!
//! The accumulator-level entry points (`gemv_into`) deposit into
//! caller-owned packed accumulators and apply no `β` — that is the shape a
//! distributed row-partitioned `gemv` reduces over worker-local
//! accumulators. The `β`-seeded, converting entry points live in
//! [`crate::api`].

#![forbid(unsafe_code)]

use num_complex::Complex;

use crate::blas1::{partial_products, reduce_complex_into, reduce_into};
use crate::fp::Binnable;
use crate::packed::{Binned, BinnedComplex};

/// Storage order of a matrix argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Row-major: element `(i, j)` at `i·lda + j`.
    RowMajor,
    /// Column-major: element `(i, j)` at `j·lda + i`.
    ColMajor,
}

/// Transposition applied to a matrix argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    /// Use the matrix as stored.
    NoTrans,
    /// Use the transpose.
    Trans,
    /// Use the conjugate transpose (same as [`Transpose::Trans`] for real
    /// scalars).
    ConjTrans,
}

impl Transpose {
    /// Whether indices are swapped.
    #[inline]
    pub fn is_trans(self) -> bool {
        !matches!(self, Transpose::NoTrans)
    }
}

/// Flat offset of logical element `(i, j)` under `order`.
#[inline]
pub(crate) fn at(order: Order, lda: usize, i: usize, j: usize) -> usize {
    match order {
        Order::RowMajor => i * lda + j,
        Order::ColMajor => j * lda + i,
    }
}

/// Output length and inner length of `op(A)·x` for an `m × n` stored `A`.
#[inline]
pub(crate) fn gemv_dims(trans: Transpose, m: usize, n: usize) -> (usize, usize) {
    if trans.is_trans() {
        (n, m)
    } else {
        (m, n)
    }
}

#[inline]
fn op_elem<R: Binnable>(
    a: &[R],
    order: Order,
    trans: Transpose,
    lda: usize,
    r: usize,
    k: usize,
) -> R {
    if trans.is_trans() {
        a[at(order, lda, k, r)]
    } else {
        a[at(order, lda, r, k)]
    }
}

#[inline]
fn op_elem_complex<R: Binnable + num_traits::Num>(
    a: &[Complex<R>],
    order: Order,
    trans: Transpose,
    lda: usize,
    r: usize,
    k: usize,
) -> Complex<R> {
    let e = if trans.is_trans() {
        a[at(order, lda, k, r)]
    } else {
        a[at(order, lda, r, k)]
    };
    if matches!(trans, Transpose::ConjTrans) {
        e.conj()
    } else {
        e
    }
}

// ---------------------------------------------------------------------------
// Accumulator-level gemv
// ---------------------------------------------------------------------------

/// `y[r] ⊕= α · (op(A) x)[r]` into one packed accumulator per output row.
///
/// `y.len()` must equal the output length of `op(A)`; dimension and bounds
/// validation belongs to the caller (the facade validates before it gets
/// here). No `β` at this level: a distributed caller seeds or merges
/// separately.
pub fn gemv_into<R: Binnable>(
    order: Order,
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: R,
    a: &[R],
    lda: usize,
    x: &[R],
    incx: usize,
    y: &mut [Binned<R>],
) {
    let (rows, inner) = gemv_dims(trans, m, n);
    debug_assert_eq!(y.len(), rows);
    for (r, acc) in y.iter_mut().enumerate().take(rows) {
        let fold = acc.fold();
        let (pri, car) = acc.parts_mut();
        reduce_into(fold, inner, pri, 1, car, 1, |k| {
            op_elem(a, order, trans, lda, r, k) * (alpha * x[k * incx])
        });
    }
}

/// Complex counterpart of [`gemv_into`].
pub fn gemv_complex_into<R: Binnable + num_traits::Num>(
    order: Order,
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: Complex<R>,
    a: &[Complex<R>],
    lda: usize,
    x: &[Complex<R>],
    incx: usize,
    y: &mut [BinnedComplex<R>],
) {
    let (rows, inner) = gemv_dims(trans, m, n);
    debug_assert_eq!(y.len(), rows);
    for (r, acc) in y.iter_mut().enumerate().take(rows) {
        let fold = acc.fold();
        let (pri, car) = acc.parts_mut();
        reduce_complex_into(fold, inner, pri, 1, car, 1, |k| {
            let e = op_elem_complex(a, order, trans, lda, r, k);
            partial_products(e, alpha * x[k * incx])
        });
    }
}

// ---------------------------------------------------------------------------
// In-place kernels used by the facade (β-seeded, converting)
// ---------------------------------------------------------------------------

pub(crate) fn gemv_kernel<R: Binnable>(
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
    acc: &mut Binned<R>,
) {
    let (rows, inner) = gemv_dims(trans, m, n);
    for r in 0..rows {
        acc.set_zero();
        if beta != R::ZERO {
            acc.add_scalar(beta * y[r * incy]);
        }
        let (pri, car) = acc.parts_mut();
        reduce_into(fold, inner, pri, 1, car, 1, |k| {
            op_elem(a, order, trans, lda, r, k) * (alpha * x[k * incx])
        });
        y[r * incy] = acc.to_scalar();
    }
}

pub(crate) fn gemv_complex_kernel<R: Binnable + num_traits::Num>(
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
    acc: &mut BinnedComplex<R>,
) {
    let (rows, inner) = gemv_dims(trans, m, n);
    let zero = Complex::new(R::ZERO, R::ZERO);
    for r in 0..rows {
        acc.set_zero();
        if beta != zero {
            acc.add_scalar(beta * y[r * incy]);
        }
        let (pri, car) = acc.parts_mut();
        reduce_complex_into(fold, inner, pri, 1, car, 1, |k| {
            let e = op_elem_complex(a, order, trans, lda, r, k);
            partial_products(e, alpha * x[k * incx])
        });
        y[r * incy] = acc.to_scalar();
    }
}

pub(crate) fn gemm_kernel<R: Binnable>(
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
    acc: &mut Binned<R>,
) {
    for i in 0..m {
        for j in 0..n {
            acc.set_zero();
            if beta != R::ZERO {
                acc.add_scalar(beta * c[at(order, ldc, i, j)]);
            }
            let (pri, car) = acc.parts_mut();
            reduce_into(fold, k, pri, 1, car, 1, |l| {
                op_elem(a, order, trans_a, lda, i, l)
                    * (alpha * op_elem(b, order, trans_b, ldb, l, j))
            });
            c[at(order, ldc, i, j)] = acc.to_scalar();
        }
    }
}

pub(crate) fn gemm_complex_kernel<R: Binnable + num_traits::Num>(
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
    acc: &mut BinnedComplex<R>,
) {
    let zero = Complex::new(R::ZERO, R::ZERO);
    for i in 0..m {
        for j in 0..n {
            acc.set_zero();
            if beta != zero {
                acc.add_scalar(beta * c[at(order, ldc, i, j)]);
            }
            let (pri, car) = acc.parts_mut();
            reduce_complex_into(fold, k, pri, 1, car, 1, |l| {
                let e = op_elem_complex(a, order, trans_a, lda, i, l);
                let v = op_elem_complex(b, order, trans_b, ldb, l, j);
                partial_products(e, alpha * v)
            });
            c[at(order, ldc, i, j)] = acc.to_scalar();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_indexing_matches_blas_conventions() {
        // 2x3 matrix [[1,2,3],[4,5,6]].
        let row_major = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let col_major = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0];
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(row_major[at(Order::RowMajor, 3, i, j)], col_major[at(Order::ColMajor, 2, i, j)]);
            }
        }
    }

    #[test]
    fn gemv_into_accumulates_rows() {
        // A = [[1,2],[3,4]] row-major, x = [10, 100].
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let x = [10.0f64, 100.0];
        let mut y = vec![
            Binned::<f64>::with_default_fold(),
            Binned::<f64>::with_default_fold(),
        ];
        gemv_into(Order::RowMajor, Transpose::NoTrans, 2, 2, 1.0, &a, 2, &x, 1, &mut y);
        assert_eq!(y[0].to_scalar(), 210.0);
        assert_eq!(y[1].to_scalar(), 430.0);

        // Transposed: op(A) = A^T, rows are A's columns.
        let mut y = vec![
            Binned::<f64>::with_default_fold(),
            Binned::<f64>::with_default_fold(),
        ];
        gemv_into(Order::RowMajor, Transpose::Trans, 2, 2, 1.0, &a, 2, &x, 1, &mut y);
        assert_eq!(y[0].to_scalar(), 310.0);
        assert_eq!(y[1].to_scalar(), 420.0);
    }
}
