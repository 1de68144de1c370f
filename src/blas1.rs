//! Vector reduction kernels
//!
//! Every kernel here is one instantiation of a single skeleton, the
//! *blocked deposit protocol*:
//!
//! 1. scan the next block (at most [`Binnable::ENDURANCE`] contributions)
//!    for the largest magnitude that will be deposited;
//! 2. [`crate::manual::update`] the accumulator with that bound;
//! 3. [`crate::manual::deposit`] once per contribution;
//! 4. [`crate::manual::renormalize`] at the block boundary.
//!
//! This is the only discipline that keeps the accumulator inside its
//! endurance invariant without paying a renormalize per element. Because
//! the block structure depends only on `n`, and the per-block bound only on
//! the block's multiset of values, the protocol is permutation- and
//! decomposition-stable.
//!
//! Blocks containing NaN/∞ take the taint path instead: non-finite
//! contributions are folded straight into the leading primary under plain
//! float rules (`+∞ + −∞ = NaN`, and so on), which is exactly what
//! conversion of a tainted accumulator reports.
//!
//! The kernels accumulate **into** caller-owned `(primary, carry)` buffers
//! and never convert; the facade in [`crate::api`] pairs them with
//! allocation and conversion. Running a kernel per input partition and
//! merging with [`crate::manual::add_binned`] gives the distributed shape.

#![forbid(unsafe_code)]

use num_complex::Complex;

use crate::fp::Binnable;
use crate::manual;

/// Half-open `(start, end)` block bounds covering `0..n` in steps of `b`.
fn blocks(n: usize, b: usize) -> impl Iterator<Item = (usize, usize)> {
    debug_assert!(b > 0);
    let count = (n + b - 1) / b;
    (0..count).map(move |t| (t * b, ((t + 1) * b).min(n)))
}

/// Reduce `n` real contributions into a binned accumulator with the blocked
/// deposit protocol. `contrib(i)` must be pure: it is evaluated once in the
/// scan pass and once in the deposit pass.
pub fn reduce_into<R, F>(
    fold: usize,
    n: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
    contrib: F,
) where
    R: Binnable,
    F: Fn(usize) -> R,
{
    for (start, end) in blocks(n, R::ENDURANCE) {
        let mut bound = R::ZERO;
        let mut finite = true;
        for i in start..end {
            let a = contrib(i).abs();
            if a.is_nan_or_inf() {
                finite = false;
                break;
            }
            bound = bound.max(a);
        }
        if !finite {
            for i in start..end {
                let c = contrib(i);
                if c.is_nan_or_inf() {
                    pri[0] = pri[0] + c;
                }
            }
            continue;
        }
        if bound == R::ZERO {
            continue;
        }
        manual::update(fold, bound, pri, inc_pri, car, inc_car);
        for i in start..end {
            manual::deposit(fold, contrib(i), pri, inc_pri);
        }
        manual::renormalize(fold, pri, inc_pri, car, inc_car);
    }
}

/// Complex counterpart of [`reduce_into`]: each element yields up to two
/// complex contributions (a dot product deposits its four partial products
/// pairwise, a sum deposits one pair). Blocks are halved so neither lane
/// exceeds its endurance.
pub fn reduce_complex_into<R, F>(
    fold: usize,
    n: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
    contrib: F,
) where
    R: Binnable,
    F: Fn(usize) -> [Complex<R>; 2],
{
    let block = (R::ENDURANCE / 2).max(1);
    for (start, end) in blocks(n, block) {
        let mut re_bound = R::ZERO;
        let mut im_bound = R::ZERO;
        let mut finite = true;
        'scan: for i in start..end {
            for z in contrib(i) {
                let re = z.re.abs();
                let im = z.im.abs();
                if re.is_nan_or_inf() || im.is_nan_or_inf() {
                    finite = false;
                    break 'scan;
                }
                re_bound = re_bound.max(re);
                im_bound = im_bound.max(im);
            }
        }
        if !finite {
            for i in start..end {
                for z in contrib(i) {
                    if z.re.is_nan_or_inf() {
                        pri[0] = pri[0] + z.re;
                    }
                    if z.im.is_nan_or_inf() {
                        pri[1] = pri[1] + z.im;
                    }
                }
            }
            continue;
        }
        if re_bound == R::ZERO && im_bound == R::ZERO {
            continue;
        }
        manual::update_complex(
            fold,
            Complex::new(re_bound, im_bound),
            pri,
            inc_pri,
            car,
            inc_car,
        );
        for i in start..end {
            for z in contrib(i) {
                manual::deposit_complex(fold, z, pri, inc_pri);
            }
        }
        manual::renormalize_complex(fold, pri, inc_pri, car, inc_car);
    }
}

// ---------------------------------------------------------------------------
// Real kernels
// ---------------------------------------------------------------------------

/// `acc += Σ x[i·incx]`.
pub fn sum_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[R],
    incx: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_into(fold, n, pri, inc_pri, car, inc_car, |i| x[i * incx]);
}

/// `acc += Σ |x[i·incx]|`.
pub fn asum_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[R],
    incx: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_into(fold, n, pri, inc_pri, car, inc_car, |i| x[i * incx].abs());
}

/// `acc += Σ x[i·incx] · y[i·incy]`.
pub fn dot_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[R],
    incx: usize,
    y: &[R],
    incy: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_into(fold, n, pri, inc_pri, car, inc_car, |i| {
        x[i * incx] * y[i * incy]
    });
}

// ---------------------------------------------------------------------------
// Complex kernels
// ---------------------------------------------------------------------------

/// The two complex partial-product pairs of `e · v`, split so that no
/// component pays an extra rounding before it reaches its bin.
#[inline]
pub(crate) fn partial_products<R: Binnable>(e: Complex<R>, v: Complex<R>) -> [Complex<R>; 2] {
    [
        Complex::new(e.re * v.re, e.re * v.im),
        Complex::new(-(e.im * v.im), e.im * v.re),
    ]
}

/// `acc += Σ x[i·incx]` over complex elements.
pub fn sum_complex_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    let zero = Complex::new(R::ZERO, R::ZERO);
    reduce_complex_into(fold, n, pri, inc_pri, car, inc_car, |i| [x[i * incx], zero]);
}

/// `acc += Σ (|re x_i| + |im x_i|)` into a **real** accumulator, streamed
/// one component at a time.
pub fn asum_complex_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_into(fold, 2 * n, pri, inc_pri, car, inc_car, |k| {
        let z = x[(k / 2) * incx];
        if k % 2 == 0 {
            z.re.abs()
        } else {
            z.im.abs()
        }
    });
}

/// Unconjugated complex dot: `acc += Σ x_i · y_i`.
pub fn dotu_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    y: &[Complex<R>],
    incy: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_complex_into(fold, n, pri, inc_pri, car, inc_car, |i| {
        partial_products(x[i * incx], y[i * incy])
    });
}

/// Conjugated complex dot: `acc += Σ conj(x_i) · y_i`.
pub fn dotc_into<R: Binnable + num_traits::Num>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    y: &[Complex<R>],
    incy: usize,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) {
    reduce_complex_into(fold, n, pri, inc_pri, car, inc_car, |i| {
        partial_products(x[i * incx].conj(), y[i * incy])
    });
}

// ---------------------------------------------------------------------------
// Scaled sum of squares
// ---------------------------------------------------------------------------

/// Core of the scaled-sum-of-squares kernel over a component stream.
///
/// Deposits `(get(k)/scl)²` with `scl` raised (and the accumulator rescaled
/// exactly) whenever a block's largest magnitude outgrows it. Returns the
/// final scale; the represented value is `scl² · convert(acc)`.
fn ssq_stream<R, F>(
    fold: usize,
    len: usize,
    get: F,
    mut scl: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) -> R
where
    R: Binnable,
    F: Fn(usize) -> R,
{
    for (start, end) in blocks(len, R::ENDURANCE) {
        let mut bound = R::ZERO;
        let mut finite = true;
        for k in start..end {
            let a = get(k).abs();
            if a.is_nan_or_inf() {
                finite = false;
                break;
            }
            bound = bound.max(a);
        }
        if !finite {
            for k in start..end {
                let a = get(k);
                if a.is_nan_or_inf() {
                    pri[0] = pri[0] + a * a;
                }
            }
            continue;
        }
        if bound == R::ZERO {
            continue;
        }
        let new_scl = bound.scale();
        if new_scl > scl {
            manual::rescale(fold, new_scl, scl, pri, inc_pri, car, inc_car);
            scl = new_scl;
        }
        let t = bound / scl;
        manual::update(fold, t * t, pri, inc_pri, car, inc_car);
        for k in start..end {
            let v = get(k) / scl;
            manual::deposit(fold, v * v, pri, inc_pri);
        }
        manual::renormalize(fold, pri, inc_pri, car, inc_car);
    }
    scl
}

/// Scaled sum of squares of a real vector; returns the updated scale.
pub fn ssq_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[R],
    incx: usize,
    scl: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) -> R {
    ssq_stream(fold, n, |i| x[i * incx], scl, pri, inc_pri, car, inc_car)
}

/// Scaled sum of squares of a complex vector (components streamed into a
/// **real** accumulator); returns the updated scale.
pub fn ssq_complex_into<R: Binnable>(
    fold: usize,
    n: usize,
    x: &[Complex<R>],
    incx: usize,
    scl: R,
    pri: &mut [R],
    inc_pri: usize,
    car: &mut [R],
    inc_car: usize,
) -> R {
    ssq_stream(
        fold,
        2 * n,
        |k| {
            let z = x[(k / 2) * incx];
            if k % 2 == 0 {
                z.re
            } else {
                z.im
            }
        },
        scl,
        pri,
        inc_pri,
        car,
        inc_car,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::convert;

    fn run_sum(fold: usize, xs: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut pri = vec![0.0; fold];
        let mut car = vec![0.0; fold];
        sum_into(fold, xs.len(), xs, 1, &mut pri, 1, &mut car, 1);
        (pri, car)
    }

    #[test]
    fn block_bounds_cover_everything_once() {
        let got: Vec<_> = blocks(10, 4).collect();
        assert_eq!(got, vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(blocks(0, 4).count(), 0);
        assert_eq!(blocks(4, 4).collect::<Vec<_>>(), vec![(0, 4)]);
    }

    #[test]
    fn sum_handles_more_than_one_endurance_block() {
        // 2·ENDURANCE + 17 ones: forces interior renormalizations.
        let n = 2 * f64::ENDURANCE + 17;
        let xs = vec![1.0f64; n];
        let (pri, car) = run_sum(3, &xs);
        assert_eq!(convert(3, &pri, 1, &car, 1), n as f64);
    }

    #[test]
    fn strided_access_reads_every_incx_th_element() {
        let xs = [1.0f64, 99.0, 2.0, 99.0, 3.0];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        sum_into(3, 3, &xs, 2, &mut pri, 1, &mut car, 1);
        assert_eq!(convert(3, &pri, 1, &car, 1), 6.0);
    }

    #[test]
    fn asum_is_the_absolute_sum() {
        let xs = [1.5f64, -2.5, 3.0, -4.0];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        asum_into(3, 4, &xs, 1, &mut pri, 1, &mut car, 1);
        assert_eq!(convert(3, &pri, 1, &car, 1), 11.0);
    }

    #[test]
    fn dot_of_small_integers_is_exact() {
        let x = [1.0f64, 2.0, 3.0, 4.0, 5.0];
        let y = [5.0f64, 4.0, 3.0, 2.0, 1.0];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        dot_into(3, 5, &x, 1, &y, 1, &mut pri, 1, &mut car, 1);
        assert_eq!(convert(3, &pri, 1, &car, 1), 35.0);
    }

    #[test]
    fn complex_dot_variants_differ_by_conjugation() {
        let x = [Complex::new(1.0f64, 2.0), Complex::new(-3.0, 0.5)];
        let y = [Complex::new(0.5f64, -1.0), Complex::new(2.0, 4.0)];

        let mut pri = vec![0.0; 6];
        let mut car = vec![0.0; 6];
        dotu_into(3, 2, &x, 1, &y, 1, &mut pri, 1, &mut car, 1);
        let u = crate::manual::convert_complex(3, &pri, 1, &car, 1);
        // (1+2i)(0.5-i) = 2.5 + 0i ; (-3+0.5i)(2+4i) = -8 - 11i
        assert_eq!(u, Complex::new(-5.5, -11.0));

        let mut pri = vec![0.0; 6];
        let mut car = vec![0.0; 6];
        dotc_into(3, 2, &x, 1, &y, 1, &mut pri, 1, &mut car, 1);
        let c = crate::manual::convert_complex(3, &pri, 1, &car, 1);
        // conj: (1-2i)(0.5-i) = -1.5 - 2i ; (-3-0.5i)(2+4i) = -4 - 13i
        assert_eq!(c, Complex::new(-5.5, -15.0));
    }

    #[test]
    fn nonfinite_blocks_taint_with_float_rules() {
        let (pri, car) = run_sum(3, &[f64::INFINITY, 1.0, f64::NEG_INFINITY]);
        assert!(convert(3, &pri, 1, &car, 1).is_nan());

        let (pri, car) = run_sum(3, &[f64::INFINITY, f64::INFINITY, 1.0]);
        assert_eq!(convert(3, &pri, 1, &car, 1), f64::INFINITY);

        let (pri, car) = run_sum(3, &[1.0, f64::NAN, 2.0]);
        assert!(convert(3, &pri, 1, &car, 1).is_nan());
    }

    #[test]
    fn ssq_tracks_the_scale_upward() {
        let xs = [3e200f64, 4e200, 0.0];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        let scl = ssq_into(3, 3, &xs, 1, 0.0, &mut pri, 1, &mut car, 1);
        assert!(scl > 0.0);
        let nrm = scl * convert(3, &pri, 1, &car, 1).sqrt();
        let expect = 5e200;
        assert!((nrm - expect).abs() <= expect * 1e-14, "nrm2 = {nrm:e}");
    }

    #[test]
    fn ssq_scale_survives_block_splits() {
        // Small values first, then a jump that forces a rescale.
        let xs = [1.0f64, 2.0, 1e160, 3.0, 2e160];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        let one_shot_scl = ssq_into(3, 5, &xs, 1, 0.0, &mut pri, 1, &mut car, 1);
        let one_shot = convert(3, &pri, 1, &car, 1);

        let mut pri2 = vec![0.0; 3];
        let mut car2 = vec![0.0; 3];
        let mut scl = 0.0;
        for chunk in xs.chunks(2) {
            scl = ssq_into(3, chunk.len(), chunk, 1, scl, &mut pri2, 1, &mut car2, 1);
        }
        assert_eq!(scl, one_shot_scl);
        assert_eq!(convert(3, &pri2, 1, &car2, 1), one_shot);
    }

    #[test]
    fn complex_ssq_streams_both_components() {
        let xs = [Complex::new(3.0f64, 4.0)];
        let mut pri = vec![0.0; 3];
        let mut car = vec![0.0; 3];
        let scl = ssq_complex_into(3, 1, &xs, 1, 0.0, &mut pri, 1, &mut car, 1);
        let nrm = scl * convert(3, &pri, 1, &car, 1).sqrt();
        assert_eq!(nrm, 5.0);
    }
}
