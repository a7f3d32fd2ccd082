//! Negacyclic NTT tables and Harvey's lazy-butterfly forward/inverse
//! transforms with Shoup precomputation.
//!
//! Grounded on `hedge/math/smallntt.c`: `ntt_negacyclic_harvey_lazy`
//! (Cooley-Tukey forward), `inverse_ntt_negacyclic_harvey_lazy`
//! (Gentleman-Sande inverse, `N^-1` folded into the `..._div_two` twiddles
//! via one halving per stage), and `ntt_powers_of_primitive_root` /
//! `ntt_scale_powers_of_primitive_root` for table construction. The
//! function-pointer table on `SmallNTTTables_t` is collapsed to plain
//! methods on `NttTable`, per Design Notes.

use crate::modulus::{halve_mod, inv_mod, mul_mod, Modulus};
use crate::primes::try_minimal_primitive_root;
use crate::wide;

/// Forward/inverse NTT tables for one prime `q` and degree `N`.
#[derive(Debug, Clone)]
pub struct NttTable {
    modulus: Modulus,
    coeff_count: usize,
    #[allow(dead_code)]
    coeff_count_power: u32,
    root: u64,
    n_inv: u64,
    root_powers: Vec<u64>,
    scaled_root_powers: Vec<u64>,
    #[allow(dead_code)]
    inv_root_powers: Vec<u64>,
    #[allow(dead_code)]
    scaled_inv_root_powers: Vec<u64>,
    inv_root_powers_div_two: Vec<u64>,
    scaled_inv_root_powers_div_two: Vec<u64>,
}

impl NttTable {
    /// Generates forward and inverse tables together. Returns `None` (a
    /// "reset" state, per §4.D) if no primitive `2N`-th root exists for
    /// `modulus`, or if `N^{-1} mod q` fails to invert.
    pub fn generate(coeff_count_power: u32, modulus: &Modulus) -> Option<Self> {
        let coeff_count = 1usize << coeff_count_power;
        let root = try_minimal_primitive_root(coeff_count as u64, modulus)?;
        let inv_root = inv_mod(root, modulus)?;
        let n_inv = inv_mod(coeff_count as u64, modulus)?;
        let inv_two = inv_mod(2, modulus)?;

        let root_powers = powers_bit_reversed(root, coeff_count, coeff_count_power, modulus);
        let scaled_root_powers = scale_powers(&root_powers, modulus);

        let inv_root_powers = powers_bit_reversed(inv_root, coeff_count, coeff_count_power, modulus);
        let scaled_inv_root_powers = scale_powers(&inv_root_powers, modulus);

        let inv_root_powers_div_two: Vec<u64> =
            inv_root_powers.iter().map(|&x| mul_mod(x, inv_two, modulus)).collect();
        let scaled_inv_root_powers_div_two = scale_powers(&inv_root_powers_div_two, modulus);

        Some(NttTable {
            modulus: *modulus,
            coeff_count,
            coeff_count_power,
            root,
            n_inv,
            root_powers,
            scaled_root_powers,
            inv_root_powers,
            scaled_inv_root_powers,
            inv_root_powers_div_two,
            scaled_inv_root_powers_div_two,
        })
    }

    pub fn coeff_count(&self) -> usize {
        self.coeff_count
    }

    pub fn modulus(&self) -> &Modulus {
        &self.modulus
    }

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn n_inv(&self) -> u64 {
        self.n_inv
    }

    /// Forward negacyclic NTT, normalized to `[0, q)`.
    pub fn forward_inplace(&self, operand: &mut [u64]) {
        self.forward_lazy(operand);
        let q = self.modulus.value();
        let two_q = q * 2;
        for x in operand.iter_mut() {
            if *x >= two_q {
                *x -= two_q;
            }
            if *x >= q {
                *x -= q;
            }
        }
    }

    /// Inverse negacyclic NTT, normalized to `[0, q)`.
    pub fn inverse_inplace(&self, operand: &mut [u64]) {
        self.inverse_lazy(operand);
        let q = self.modulus.value();
        for x in operand.iter_mut() {
            if *x >= q {
                *x -= q;
            }
        }
    }

    /// Cooley-Tukey forward butterfly. Inputs must lie in `[0, 2q)`;
    /// outputs lie in `[0, 4q)`.
    fn forward_lazy(&self, operand: &mut [u64]) {
        let n = self.coeff_count;
        debug_assert_eq!(operand.len(), n);
        let q = self.modulus.value();
        let two_q = q * 2;
        let mut t = n;
        let mut m = 1usize;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let root_idx = m + i;
                let w = self.root_powers[root_idx];
                let w_prime = self.scaled_root_powers[root_idx];
                for j in j1..j2 {
                    let x = operand[j];
                    let y = operand[j + t];
                    let curr_x = if x >= two_q { x - two_q } else { x };
                    let q_hi = wide::mul64_hw64(w_prime, y);
                    let q_val = w.wrapping_mul(y).wrapping_sub(q_hi.wrapping_mul(q));
                    operand[j] = curr_x.wrapping_add(q_val);
                    operand[j + t] = curr_x.wrapping_add(two_q).wrapping_sub(q_val);
                }
            }
            m <<= 1;
        }
    }

    /// Gentleman-Sande inverse butterfly, `N^{-1}` folded in one halving
    /// per stage via the `..._div_two` twiddles.
    fn inverse_lazy(&self, operand: &mut [u64]) {
        let n = self.coeff_count;
        debug_assert_eq!(operand.len(), n);
        let q = self.modulus.value();
        let two_q = q * 2;
        let mut m = n >> 1;
        let mut t = 1usize;
        while m >= 1 {
            let mut j1 = 0usize;
            for i in 0..m {
                let j2 = j1 + t;
                let root_idx = m + i;
                let w = self.inv_root_powers_div_two[root_idx];
                let w_prime = self.scaled_inv_root_powers_div_two[root_idx];
                for j in j1..j2 {
                    let u = operand[j];
                    let v = operand[j + t];
                    let t_val = u.wrapping_add(two_q).wrapping_sub(v);
                    let mut curr_u = u.wrapping_add(v);
                    if curr_u >= two_q {
                        curr_u -= two_q;
                    }
                    operand[j] = halve_mod(curr_u, &self.modulus);
                    let h = wide::mul64_hw64(w_prime, t_val);
                    operand[j + t] = t_val.wrapping_mul(w).wrapping_sub(h.wrapping_mul(q));
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m >>= 1;
        }
    }
}

/// `dest[br(j)] = root^j mod q` for `j = 0..coeff_count`.
fn powers_bit_reversed(root: u64, coeff_count: usize, log_n: u32, modulus: &Modulus) -> Vec<u64> {
    let mut dest = vec![0u64; coeff_count];
    let mut power = 1u64;
    for j in 0..coeff_count {
        dest[bit_reverse(j as u64, log_n) as usize] = power;
        power = mul_mod(power, root, modulus);
    }
    dest
}

/// Shoup precomputation: `floor(x * 2^64 / q)` for each table entry.
fn scale_powers(values: &[u64], modulus: &Modulus) -> Vec<u64> {
    values
        .iter()
        .map(|&x| {
            let ((lo, _hi), _r) = wide::divide128_by_64((0, x), modulus.value());
            lo
        })
        .collect()
}

pub fn bit_reverse(mut value: u64, bit_count: u32) -> u64 {
    let mut result = 0u64;
    for _ in 0..bit_count {
        result = (result << 1) | (value & 1);
        value >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::get_primes;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn ntt_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for &log_n in &[3u32, 6, 8] {
            let degree = 1u64 << log_n;
            let q = Modulus::new(get_primes(degree, 30, 1).unwrap()[0]).unwrap();
            let table = NttTable::generate(log_n, &q).unwrap();
            let n = degree as usize;
            let original: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q.value())).collect();
            let mut buf = original.clone();
            table.forward_inplace(&mut buf);
            table.inverse_inplace(&mut buf);
            assert_eq!(buf, original, "round trip failed for log_n={log_n}");
        }
    }

    #[test]
    fn bit_reverse_self_inverse() {
        for v in 0..16u64 {
            assert_eq!(bit_reverse(bit_reverse(v, 4), 4), v);
        }
    }
}
