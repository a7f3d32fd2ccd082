//! Flat RNS polynomial storage: `L` primes x `N` coefficients, laid out as
//! `coeff[i * N + j]` (`i` the prime index, `j` the coefficient slot).
//!
//! This is the safe replacement for the original's raw-pointer-and-length
//! buffer plumbing (Design Notes' "manual buffer plumbing" section): every
//! multi-precision routine in this crate takes `&[u64]`/`&mut [u64]`
//! slices, and `RnsPoly` hands out per-prime sub-slices instead of pointer
//! arithmetic.

use crate::modulus::{self, Modulus};
use zeroize::Zeroize;

/// An `L x N` grid of `u64` RNS residues, one row per prime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RnsPoly {
    data: Vec<u64>,
    prime_count: usize,
    degree: usize,
}

impl RnsPoly {
    pub fn zero(prime_count: usize, degree: usize) -> Self {
        RnsPoly { data: vec![0u64; prime_count * degree], prime_count, degree }
    }

    pub fn from_rows(rows: &[Vec<u64>]) -> Self {
        let prime_count = rows.len();
        let degree = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(prime_count * degree);
        for row in rows {
            debug_assert_eq!(row.len(), degree);
            data.extend_from_slice(row);
        }
        RnsPoly { data, prime_count, degree }
    }

    pub fn prime_count(&self) -> usize {
        self.prime_count
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.data
    }

    pub fn row(&self, prime_index: usize) -> &[u64] {
        let start = prime_index * self.degree;
        &self.data[start..start + self.degree]
    }

    pub fn row_mut(&mut self, prime_index: usize) -> &mut [u64] {
        let start = prime_index * self.degree;
        &mut self.data[start..start + self.degree]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u64]> {
        self.data.chunks(self.degree)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u64]> {
        self.data.chunks_mut(self.degree)
    }

    /// Drops the last row (used by rescale: the reduced chain has one
    /// fewer prime).
    pub fn drop_last_prime(&self) -> RnsPoly {
        debug_assert!(self.prime_count > 0);
        let new_count = self.prime_count - 1;
        RnsPoly {
            data: self.data[..new_count * self.degree].to_vec(),
            prime_count: new_count,
            degree: self.degree,
        }
    }

    /// Elementwise `self + other`, reduced per-prime against `moduli`
    /// (one modulus per row, in prime order).
    pub fn add_mod(&self, other: &RnsPoly, moduli: &[Modulus]) -> RnsPoly {
        self.zip_rows(other, moduli, modulus::add_mod)
    }

    /// Elementwise dyadic (NTT-domain) product `self * other`.
    pub fn mul_mod(&self, other: &RnsPoly, moduli: &[Modulus]) -> RnsPoly {
        self.zip_rows(other, moduli, modulus::mul_mod)
    }

    pub fn negate_mod(&self, moduli: &[Modulus]) -> RnsPoly {
        let mut out = self.clone();
        for (row, m) in out.rows_mut().zip(moduli) {
            for slot in row.iter_mut() {
                *slot = modulus::negate_mod(*slot, m);
            }
        }
        out
    }

    fn zip_rows(&self, other: &RnsPoly, moduli: &[Modulus], op: fn(u64, u64, &Modulus) -> u64) -> RnsPoly {
        debug_assert_eq!(self.prime_count, other.prime_count);
        debug_assert_eq!(self.degree, other.degree);
        let mut out = RnsPoly::zero(self.prime_count, self.degree);
        for i in 0..self.prime_count {
            let a = self.row(i);
            let b = other.row(i);
            let dest = out.row_mut(i);
            for j in 0..self.degree {
                dest[j] = op(a[j], b[j], &moduli[i]);
            }
        }
        out
    }
}

impl Zeroize for RnsPoly {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_trip() {
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let poly = RnsPoly::from_rows(&rows);
        assert_eq!(poly.row(0), &[1, 2, 3]);
        assert_eq!(poly.row(1), &[4, 5, 6]);
        assert_eq!(poly.prime_count(), 2);
        assert_eq!(poly.degree(), 3);
    }

    #[test]
    fn drop_last_prime_shrinks() {
        let rows = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        let poly = RnsPoly::from_rows(&rows);
        let shorter = poly.drop_last_prime();
        assert_eq!(shorter.prime_count(), 2);
        assert_eq!(shorter.row(1), &[3, 4]);
    }
}
