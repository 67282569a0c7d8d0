//! Strided GEMM kernel behind [`crate::Matrix::multiply`].
//!
//! Transposition is expressed purely through strides, so no transposed copy of
//! either operand is ever materialized.

use crate::Scalar;

/// Computes `c = op(a) * op(b)` where `c` is a dense row-major `(m, n)` buffer.
///
/// Logical element `op(a)[i][p]` lives at `a[i * rsa + p * csa]` and `op(b)[p][j]`
/// at `b[p * rsb + j * csb]`. `c` is zeroed and then accumulated one inner index at
/// a time.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm(
    m: usize,
    n: usize,
    k: usize,
    a: &[Scalar],
    rsa: usize,
    csa: usize,
    b: &[Scalar],
    rsb: usize,
    csb: usize,
    c: &mut [Scalar],
) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert!(c.len() >= m * n);
    debug_assert!(a.len() > (m - 1) * rsa + (k - 1) * csa);
    debug_assert!(b.len() > (k - 1) * rsb + (n - 1) * csb);

    let c = &mut c[..m * n];
    c.fill(0.0);

    for p in 0..k {
        let a0 = p * csa;
        let b0 = p * rsb;
        for i in 0..m {
            let av = a[a0 + i * rsa];
            let row = &mut c[i * n..(i + 1) * n];
            for (j, cv) in row.iter_mut().enumerate() {
                *cv += av * b[b0 + j * csb];
            }
        }
    }
}
