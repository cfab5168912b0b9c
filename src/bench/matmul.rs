//! Square matrix multiplication kernels.

use rand::Rng;

use crate::constants::matmul::TILE;

/// Dense row-major `n x n` matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Entries drawn uniformly from `[0, 1)`.
    pub fn random<R: Rng>(n: usize, rng: &mut R) -> Self {
        Self {
            n,
            data: (0..n * n).map(|_| rng.gen::<f64>()).collect(),
        }
    }

    /// Build from row-major `data`; `None` unless `data.len() == n * n`.
    pub fn from_rows(n: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == n * n).then_some(Self { n, data })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// A way of computing `c = a * b` for square matrices of equal size.
pub trait MatMulKernel {
    fn name(&self) -> &'static str;

    /// Overwrite `c` with `a * b`.
    ///
    /// # Panics
    ///
    /// If the three matrices do not share the same `n`.
    fn multiply(&self, a: &Matrix, b: &Matrix, c: &mut Matrix);
}

fn shared_size(a: &Matrix, b: &Matrix, c: &Matrix) -> usize {
    assert_eq!(a.n, b.n, "operand sizes differ");
    assert_eq!(a.n, c.n, "output size differs from operands");
    a.n
}

/// Textbook i-j-k triple loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveMatMul;

impl MatMulKernel for NaiveMatMul {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) {
        let n = shared_size(a, b, c);
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += a.data[i * n + k] * b.data[k * n + j];
                }
                c.data[i * n + j] = sum;
            }
        }
    }
}

/// Cache-tiled multiply with an i-k-j inner order so `b` and `c` are walked by row.
#[derive(Debug, Clone, Copy)]
pub struct BlockedMatMul {
    tile: usize,
}

impl BlockedMatMul {
    pub fn new(tile: usize) -> Self {
        Self { tile: tile.max(1) }
    }
}

impl Default for BlockedMatMul {
    fn default() -> Self {
        Self::new(TILE)
    }
}

impl MatMulKernel for BlockedMatMul {
    fn name(&self) -> &'static str {
        "blocked"
    }

    fn multiply(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) {
        let n = shared_size(a, b, c);
        let tile = self.tile;
        c.data.fill(0.0);

        for ii in (0..n).step_by(tile) {
            let i_end = (ii + tile).min(n);
            for kk in (0..n).step_by(tile) {
                let k_end = (kk + tile).min(n);
                for jj in (0..n).step_by(tile) {
                    let j_end = (jj + tile).min(n);

                    for i in ii..i_end {
                        let c_row = &mut c.data[i * n + jj..i * n + j_end];
                        for k in kk..k_end {
                            let a_ik = a.data[i * n + k];
                            let b_row = &b.data[k * n + jj..k * n + j_end];
                            for (c_ij, b_kj) in c_row.iter_mut().zip(b_row) {
                                *c_ij += a_ik * b_kj;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn product(kernel: &dyn MatMulKernel, a: &Matrix, b: &Matrix) -> Matrix {
        let mut c = Matrix::zeros(a.n());
        kernel.multiply(a, b, &mut c);
        c
    }

    #[test]
    fn test_naive_known_product() {
        let a = Matrix::from_rows(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_rows(2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();

        let c = product(&NaiveMatMul, &a, &b);
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_blocked_matches_naive_across_tile_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        // 37 is not a multiple of the tile, so partial tiles are exercised
        let a = Matrix::random(37, &mut rng);
        let b = Matrix::random(37, &mut rng);

        let naive = product(&NaiveMatMul, &a, &b);
        let blocked = product(&BlockedMatMul::new(8), &a, &b);

        for (x, y) in naive.as_slice().iter().zip(blocked.as_slice()) {
            assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_blocked_overwrites_previous_result() {
        let a = Matrix::from_rows(2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let b = Matrix::from_rows(2, vec![2.0, 3.0, 4.0, 5.0]).unwrap();
        let mut c = Matrix::from_rows(2, vec![100.0; 4]).unwrap();

        BlockedMatMul::default().multiply(&a, &b, &mut c);
        assert_eq!(c, b);
    }

    #[test]
    fn test_random_entries_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = Matrix::random(16, &mut rng);
        assert!(m.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
        assert_eq!(m.get(0, 0), m.as_slice()[0]);
    }

    #[test]
    #[should_panic(expected = "operand sizes differ")]
    fn test_naive_rejects_mismatched_operands() {
        let a = Matrix::zeros(3);
        let b = Matrix::zeros(2);
        let mut c = Matrix::zeros(3);
        NaiveMatMul.multiply(&a, &b, &mut c);
    }

    #[test]
    #[should_panic(expected = "output size differs")]
    fn test_blocked_rejects_mismatched_output() {
        let a = Matrix::zeros(4);
        let b = Matrix::zeros(4);
        let mut c = Matrix::zeros(2);
        BlockedMatMul::default().multiply(&a, &b, &mut c);
    }
}
