//! Flat-array matrices.
//!
//! A [`Matrix`] is a row-major buffer of [`Scalar`]s with an explicit width (`x`,
//! number of columns) and height (`y`, number of rows).
//!
//! The arithmetic routines are the hot path of the whole crate and do not validate
//! shapes. Every operand shape is a documented precondition; it is checked with
//! `debug_assert!` in debug builds only. Breaking a precondition in a release build
//! yields a panic from slice indexing or a meaningless result, never memory
//! unsafety.

use std::fmt;

use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::matmul;
use crate::{Error, Result};

/// Element type of every matrix.
pub type Scalar = f64;

/// Selects which operands of [`Matrix::multiply`] are read as transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    /// `out = a * b`
    #[default]
    None,
    /// `out = a^T * b`
    A,
    /// `out = a * b^T`
    B,
    /// `out = a^T * b^T`
    Both,
}

impl Transpose {
    #[inline]
    fn a(self) -> bool {
        matches!(self, Transpose::A | Transpose::Both)
    }

    #[inline]
    fn b(self) -> bool {
        matches!(self, Transpose::B | Transpose::Both)
    }
}

#[derive(Clone)]
pub struct Matrix {
    /// Backing buffer. May be longer than `size` after a shrinking
    /// `recreate_if_too_small`; only the first `size` elements are meaningful.
    data: Vec<Scalar>,
    x: usize,
    y: usize,
    size: usize,
}

fn checked_len(x: usize, y: usize) -> Result<usize> {
    if x == 0 || y == 0 {
        return Err(Error::InvalidShape(format!(
            "matrix dimensions must be > 0, got {x}x{y}"
        )));
    }
    x.checked_mul(y).ok_or_else(|| {
        Error::InvalidShape(format!("matrix dimensions {x}x{y} overflow usize"))
    })
}

fn alloc_zeroed(len: usize) -> Result<Vec<Scalar>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| Error::Allocation(format!("matrix buffer of {len} scalars: {e}")))?;
    data.resize(len, 0.0);
    Ok(data)
}

impl Matrix {
    /// Creates a zero-filled `x` (width) by `y` (height) matrix.
    ///
    /// Fails with [`Error::InvalidShape`] if either dimension is zero and with
    /// [`Error::Allocation`] if the buffer cannot be reserved.
    pub fn new(x: usize, y: usize) -> Result<Self> {
        let size = checked_len(x, y)?;
        let data = alloc_zeroed(size)?;
        Ok(Self { data, x, y, size })
    }

    /// Builds a matrix from a row-major buffer of exactly `x * y` scalars.
    pub fn from_flat(x: usize, y: usize, data: Vec<Scalar>) -> Result<Self> {
        let size = checked_len(x, y)?;
        if data.len() != size {
            return Err(Error::InvalidShape(format!(
                "buffer length {} does not match {x}x{y}",
                data.len()
            )));
        }
        Ok(Self { data, x, y, size })
    }

    /// Builds a matrix from per-row vectors (copies into contiguous storage).
    pub fn from_rows(rows: &[Vec<Scalar>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidData("rows must not be empty".to_owned()));
        }
        let x = rows[0].len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != x {
                return Err(Error::InvalidData(format!(
                    "row {i} has len {}, expected {x}",
                    row.len()
                )));
            }
        }

        let mut data = Vec::with_capacity(x * rows.len());
        for row in rows {
            data.extend_from_slice(row);
        }
        Self::from_flat(x, rows.len(), data)
    }

    #[inline]
    fn set_size(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
        self.size = x * y;
    }

    /// Width (number of columns).
    #[inline]
    pub fn width(&self) -> usize {
        self.x
    }

    /// Height (number of rows).
    #[inline]
    pub fn height(&self) -> usize {
        self.y
    }

    /// Number of elements, always `width() * height()`.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn as_slice(&self) -> &[Scalar] {
        &self.data[..self.size]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Scalar] {
        &mut self.data[..self.size]
    }

    /// Element at `row`, `col`. Panics when out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Scalar {
        assert!(
            row < self.y && col < self.x,
            "index ({row}, {col}) out of range for {}x{} matrix",
            self.x,
            self.y
        );
        self.data[row * self.x + col]
    }

    /// Row `r` as a slice of `width()` scalars.
    #[inline]
    pub fn row(&self, r: usize) -> &[Scalar] {
        let start = r * self.x;
        &self.data[start..start + self.x]
    }

    /// Reallocates a fresh zeroed buffer of `x * y` scalars. Old contents are lost.
    ///
    /// On failure `self` is left exactly as it was.
    pub fn recreate(&mut self, x: usize, y: usize) -> Result<()> {
        let len = checked_len(x, y)?;
        self.data = alloc_zeroed(len)?;
        self.set_size(x, y);
        Ok(())
    }

    /// Reshapes to `x` by `y`, reallocating only when `x * y` exceeds the current
    /// buffer capacity.
    ///
    /// When no reallocation happens the contents are stale; callers are expected to
    /// overwrite them.
    pub fn recreate_if_too_small(&mut self, x: usize, y: usize) -> Result<()> {
        let len = checked_len(x, y)?;
        if len > self.data.len() {
            return self.recreate(x, y);
        }
        self.set_size(x, y);
        Ok(())
    }

    /// `out = op(a) * op(b)`, with `op` chosen per operand by `transpose`.
    ///
    /// Preconditions (unchecked in release builds):
    /// - `out.height()` equals the row count of `op(a)`
    /// - `out.width()` equals the column count of `op(b)`
    /// - the column count of `op(a)` equals the row count of `op(b)`
    pub fn multiply(a: &Matrix, b: &Matrix, out: &mut Matrix, transpose: Transpose) {
        let (rsa, csa, k) = if transpose.a() {
            (1, a.x, a.y)
        } else {
            (a.x, 1, a.x)
        };
        let (rsb, csb) = if transpose.b() { (1, b.x) } else { (b.x, 1) };

        debug_assert_eq!(k, if transpose.b() { b.x } else { b.y });
        debug_assert_eq!(out.y, if transpose.a() { a.x } else { a.y });
        debug_assert_eq!(out.x, if transpose.b() { b.y } else { b.x });

        let (m, n) = (out.y, out.x);
        matmul::gemm(
            m,
            n,
            k,
            a.as_slice(),
            rsa,
            csa,
            b.as_slice(),
            rsb,
            csb,
            out.as_mut_slice(),
        );
    }

    /// `out[i] = a[i] * b[i]`. All three must share `size()`.
    #[inline]
    pub fn hadamard(a: &Matrix, b: &Matrix, out: &mut Matrix) {
        debug_assert_eq!(a.size, out.size);
        debug_assert_eq!(b.size, out.size);
        for ((o, &av), &bv) in out.as_mut_slice().iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
            *o = av * bv;
        }
    }

    /// `out[i] = a[i] - b[i]`. All three must share `size()`.
    #[inline]
    pub fn subtract(a: &Matrix, b: &Matrix, out: &mut Matrix) {
        debug_assert_eq!(a.size, out.size);
        debug_assert_eq!(b.size, out.size);
        for ((o, &av), &bv) in out.as_mut_slice().iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
            *o = av - bv;
        }
    }

    /// `self[i] *= scalar`.
    #[inline]
    pub fn scale(&mut self, scalar: Scalar) {
        for v in self.as_mut_slice() {
            *v *= scalar;
        }
    }

    /// `self[i] *= f(b[i])`.
    ///
    /// Folds an activation derivative into an existing delta in one pass.
    #[inline]
    pub fn hadamard_with_map<F>(&mut self, b: &Matrix, f: F)
    where
        F: Fn(Scalar) -> Scalar,
    {
        debug_assert_eq!(self.size, b.size);
        for (v, &bv) in self.as_mut_slice().iter_mut().zip(b.as_slice()) {
            *v *= f(bv);
        }
    }

    /// `self[i] *= self[i]`.
    #[inline]
    pub fn square_elementwise(&mut self) {
        for v in self.as_mut_slice() {
            *v *= *v;
        }
    }

    /// `self[i] += b[i]`.
    #[inline]
    pub fn accumulate(&mut self, b: &Matrix) {
        debug_assert_eq!(self.size, b.size);
        for (v, &bv) in self.as_mut_slice().iter_mut().zip(b.as_slice()) {
            *v += bv;
        }
    }

    /// `self[i] = f(self[i])`.
    #[inline]
    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(Scalar) -> Scalar,
    {
        for v in self.as_mut_slice() {
            *v = f(*v);
        }
    }

    #[inline]
    pub fn fill(&mut self, value: Scalar) {
        self.as_mut_slice().fill(value);
    }

    /// Fills with uniform samples from `[min, max)`.
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R, min: Scalar, max: Scalar) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min < max && (max - min).is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "random fill range must be finite with min < max, got [{min}, {max})"
            )));
        }

        let dist = Uniform::new(min, max);
        for v in self.as_mut_slice() {
            *v = dist.sample(rng);
        }
        Ok(())
    }

    /// Counts rows whose argmax column agrees between `a` and `b`.
    ///
    /// The first occurrence of a row maximum wins. Both matrices must share shape.
    pub fn row_argmax_match_count(a: &Matrix, b: &Matrix) -> usize {
        debug_assert_eq!(a.x, b.x);
        debug_assert_eq!(a.y, b.y);

        (0..a.y)
            .filter(|&r| argmax(a.row(r)) == argmax(b.row(r)))
            .count()
    }
}

#[inline]
fn argmax(row: &[Scalar]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate().skip(1) {
        if v > row[best] {
            best = i;
        }
    }
    best
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}", self.x, self.y)?;
        for r in 0..self.y {
            for v in self.row(r) {
                write!(f, "{v} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
