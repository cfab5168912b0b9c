//! CPU-bound kernels used to saturate the pinned core.
//!
//! Kernels run in short chunks so the caller can check for stop and pin requests
//! between them. Results go through `black_box` so the work is never optimized away.

use std::hint::black_box;

use crate::config::{Config, WorkloadKind};
use crate::constants::workload::SPIN_ITERATIONS_PER_CHUNK;

/// A busy computation executed one bounded chunk at a time.
pub trait Kernel: Send {
    fn name(&self) -> &'static str;

    /// Run one chunk and return a value derived from the work done.
    fn run_chunk(&mut self) -> u64;
}

/// Trial division primality test.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut divisor = 2u64;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}

/// Counts primes in a fixed window by trial division, once per chunk.
#[derive(Debug, Clone)]
pub struct PrimeScan {
    start: u64,
    end: u64,
}

impl PrimeScan {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

impl Kernel for PrimeScan {
    fn name(&self) -> &'static str {
        "prime"
    }

    fn run_chunk(&mut self) -> u64 {
        (black_box(self.start)..black_box(self.end))
            .filter(|&n| is_prime(n))
            .count() as u64
    }
}

/// Tight multiply-add loop with no memory traffic.
#[derive(Debug, Clone)]
pub struct SpinArithmetic {
    state: u64,
    iterations: u64,
}

impl SpinArithmetic {
    pub fn new(iterations: u64) -> Self {
        Self {
            state: 1,
            iterations,
        }
    }
}

impl Default for SpinArithmetic {
    fn default() -> Self {
        Self::new(SPIN_ITERATIONS_PER_CHUNK)
    }
}

impl Kernel for SpinArithmetic {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn run_chunk(&mut self) -> u64 {
        let mut x = black_box(self.state);
        for _ in 0..self.iterations {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        }
        self.state = x;
        x
    }
}

/// Build the kernel selected by `config`.
pub fn build_kernel(config: &Config) -> Box<dyn Kernel> {
    match config.workload {
        WorkloadKind::Prime => Box::new(PrimeScan::new(
            config.prime_window_start,
            config.prime_window_end,
        )),
        WorkloadKind::Spin => Box::new(SpinArithmetic::default()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let primes: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(100_003));
        assert!(!is_prime(100_001));
    }

    #[test]
    fn test_is_prime_near_integer_limits() {
        assert!(!is_prime(u64::MAX));
        assert!(!is_prime(u64::MAX - 1));
        // Largest 32-bit prime, and the square of the largest 16-bit prime.
        assert!(is_prime(4_294_967_291));
        assert!(!is_prime(65_521 * 65_521));
        assert!(!is_prime(49));
    }

    #[test]
    fn test_prime_scan_is_deterministic() {
        let mut kernel = PrimeScan::new(100_000, 100_500);
        let first = kernel.run_chunk();
        assert!(first > 0);
        assert_eq!(kernel.run_chunk(), first);
    }

    #[test]
    fn test_spin_advances_state() {
        let mut kernel = SpinArithmetic::new(16);
        let a = kernel.run_chunk();
        let b = kernel.run_chunk();
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_kernel_follows_config() {
        let mut config = Config::default();
        assert_eq!(build_kernel(&config).name(), "prime");
        config.workload = WorkloadKind::Spin;
        assert_eq!(build_kernel(&config).name(), "spin");
    }
}
