//! Weight matrices shared by all training threads.
//!
//! Training is Hogwild-style asynchronous SGD: every worker reads and writes
//! the same rows at the same time without locks. To keep that legal Rust, each
//! cell is an `AtomicU32` holding the bits of an `f32`, accessed with
//! `Ordering::Relaxed`. A relaxed load-then-store is not an atomic add, so two
//! threads updating one cell can lose an update. That is accepted: the
//! algorithm tolerates stale and dropped updates, and nothing in the crate
//! relies on per-cell determinism when more than one worker runs.

use std::ops::Index;
use std::sync::atomic::{AtomicU32, Ordering};

use aligned_box::AlignedBox;
use anyhow::{anyhow, Result};
use rand::Rng;

/// Alignment of matrix storage, in bytes.
const ALIGNMENT: usize = 128;

/// One `f32` cell that any thread may read or write.
#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU32,
}

impl Real {
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Not atomic as a whole; a concurrent `add` to the same cell may be lost.
    pub fn add(&self, x: f32) {
        let a = self.get();
        self.set(a + x);
    }
}

/// A dense `rows × dim` matrix of [`Real`] cells.
pub struct SharedMatrix {
    rows: usize,
    dim: usize,
    cells: AlignedBox<[Real]>,
}

impl SharedMatrix {
    /// Allocate a matrix with every cell set to zero.
    pub fn zeros(rows: usize, dim: usize) -> Result<Self> {
        let len = rows
            .checked_mul(dim)
            .ok_or_else(|| anyhow!("weight matrix of {rows} x {dim} is too large"))?;
        // Never ask the allocator for zero bytes.
        let cells = AlignedBox::slice_from_default(ALIGNMENT, len.max(1))
            .map_err(|err| anyhow!("failed to allocate {rows} x {dim} weight matrix: {err:?}"))?;
        Ok(SharedMatrix { rows, dim, cells })
    }

    /// Allocate a matrix with cells drawn uniformly from `(-0.5, 0.5) / dim`.
    pub fn random<R: Rng>(rows: usize, dim: usize, rng: &mut R) -> Result<Self> {
        let matrix = Self::zeros(rows, dim)?;
        for cell in &matrix.cells[..rows * dim] {
            cell.set((rng.gen::<f32>() - 0.5) / dim as f32);
        }
        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `dot(row i, v)`.
    pub fn dot(&self, i: usize, v: &[f32]) -> f32 {
        debug_assert_eq!(v.len(), self.dim);
        self[i].iter().zip(v).map(|(w, &x)| w.get() * x).sum()
    }

    /// `out += scale * row i`.
    pub fn add_row_to(&self, i: usize, scale: f32, out: &mut [f32]) {
        for (o, w) in out.iter_mut().zip(&self[i]) {
            *o += scale * w.get();
        }
    }

    /// `row i += scale * v`.
    pub fn add_to_row(&self, i: usize, scale: f32, v: &[f32]) {
        for (w, &x) in self[i].iter().zip(v) {
            w.add(scale * x);
        }
    }

    /// Copy row `i` into `out`.
    pub fn read_row(&self, i: usize, out: &mut [f32]) {
        for (o, w) in out.iter_mut().zip(&self[i]) {
            *o = w.get();
        }
    }

    /// Snapshot of the whole matrix in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.cells[..self.rows * self.dim].iter().map(Real::get).collect()
    }
}

impl Index<usize> for SharedMatrix {
    type Output = [Real];

    fn index(&self, i: usize) -> &[Real] {
        &self.cells[i * self.dim..][..self.dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn row_arithmetic() {
        let m = SharedMatrix::zeros(3, 2).unwrap();
        m.add_to_row(1, 2.0, &[1.0, -1.0]);
        assert_eq!(m.to_vec(), vec![0.0, 0.0, 2.0, -2.0, 0.0, 0.0]);
        assert_eq!(m.dot(1, &[0.5, 0.5]), 0.0);
        assert_eq!(m.dot(1, &[1.0, 0.0]), 2.0);

        let mut out = vec![1.0, 1.0];
        m.add_row_to(1, 0.5, &mut out);
        assert_eq!(out, vec![2.0, 0.0]);
        m.read_row(1, &mut out);
        assert_eq!(out, vec![2.0, -2.0]);
    }

    #[test]
    fn random_init_is_small() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = SharedMatrix::random(50, 10, &mut rng).unwrap();
        assert!(m.to_vec().iter().all(|&x| x.abs() <= 0.05));
        assert!(m.to_vec().iter().any(|&x| x != 0.0));
    }

    #[test]
    fn empty_matrix() {
        let m = SharedMatrix::zeros(0, 4).unwrap();
        assert_eq!(m.rows(), 0);
        assert!(m.to_vec().is_empty());
    }

    #[test]
    fn concurrent_writers_do_not_tear_cells() {
        let m = SharedMatrix::zeros(1, 4).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        m.add_to_row(0, 1.0, &[1.0, 1.0, 1.0, 1.0]);
                    }
                });
            }
        });
        // Updates may be lost, but every cell holds a value some thread wrote.
        for x in m.to_vec() {
            assert!(x >= 1.0 && x <= 4000.0 && x.fract() == 0.0, "{x}");
        }
    }
}
