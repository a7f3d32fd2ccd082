//! RNG and the three sampling distributions CKKS needs (§4.L).
//!
//! Grounded on the teacher's own `sampling.rs`: functions take `&mut impl
//! Rng`-shaped access and build one coefficient at a time into an owned
//! buffer, same as `sample_uniform_poly`/`sample_binomial` there. The one
//! addition is `CkksRng`, a small enum switching between an OS-backed
//! CSPRNG for production use and a seeded `ChaCha20Rng` for deterministic
//! tests, per Design Notes' "keep the deterministic PRNG behind a
//! test-only switch" instruction.

use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::modulus::Modulus;
use crate::rns_poly::RnsPoly;

/// Standard deviation used for every CKKS error sample.
pub const ERROR_STDDEV: f64 = 3.2;
/// Draws beyond this many standard deviations are clipped back to the
/// boundary, matching the original's max-deviation clamp.
pub const MAX_DEVIATION_SIGMAS: f64 = 6.0;

/// A per-operation RNG: the OS CSPRNG in production, or a seeded
/// `ChaCha20Rng` for reproducible tests. The seeded variant is
/// `#[doc(hidden)]` and reachable only through code that opts in
/// explicitly; nothing in the encrypt/decrypt/encode path chooses it.
pub enum CkksRng {
    Os(rand::rngs::OsRng),
    #[doc(hidden)]
    Seeded(ChaCha20Rng),
}

impl CkksRng {
    pub fn new() -> Self {
        CkksRng::Os(rand::rngs::OsRng)
    }

    #[doc(hidden)]
    pub fn from_seed(seed: u64) -> Self {
        CkksRng::Seeded(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl Default for CkksRng {
    fn default() -> Self {
        CkksRng::new()
    }
}

impl RngCore for CkksRng {
    fn next_u32(&mut self) -> u32 {
        match self {
            CkksRng::Os(r) => r.next_u32(),
            CkksRng::Seeded(r) => r.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            CkksRng::Os(r) => r.next_u64(),
            CkksRng::Seeded(r) => r.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            CkksRng::Os(r) => r.fill_bytes(dest),
            CkksRng::Seeded(r) => r.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self {
            CkksRng::Os(r) => r.try_fill_bytes(dest),
            CkksRng::Seeded(r) => r.try_fill_bytes(dest),
        }
    }
}

impl CryptoRng for CkksRng {}

/// Uniform sample in `[0, q)`.
pub fn sample_uniform_u64(rng: &mut impl RngCore, modulus: &Modulus) -> u64 {
    rng.gen_range(0..modulus.value())
}

/// Fills an RNS polynomial with independent uniform residues per prime —
/// used to draw the public "a" term directly in NTT form, since a uniform
/// NTT-domain polynomial corresponds to a uniform coefficient-domain one.
pub fn sample_uniform_poly(rng: &mut impl RngCore, moduli: &[Modulus], degree: usize) -> RnsPoly {
    let mut poly = RnsPoly::zero(moduli.len(), degree);
    for (i, m) in moduli.iter().enumerate() {
        let row = poly.row_mut(i);
        for slot in row.iter_mut() {
            *slot = sample_uniform_u64(rng, m);
        }
    }
    poly
}

/// Marsaglia polar method: returns a centered normal sample with standard
/// deviation `stddev`, clipped to `MAX_DEVIATION_SIGMAS * stddev`.
pub fn sample_normal(rng: &mut impl RngCore, stddev: f64) -> f64 {
    loop {
        let u: f64 = rng.gen_range(-1.0..1.0);
        let v: f64 = rng.gen_range(-1.0..1.0);
        let s = u * u + v * v;
        if s >= 1.0 || s == 0.0 {
            continue;
        }
        let factor = (-2.0 * s.ln() / s).sqrt();
        let sample = u * factor * stddev;
        let bound = MAX_DEVIATION_SIGMAS * stddev;
        return sample.clamp(-bound, bound);
    }
}

fn centered_i64_to_residues(value: i64, moduli: &[Modulus], out: &mut [u64]) {
    for (slot, m) in out.iter_mut().zip(moduli) {
        *slot = if value >= 0 {
            (value as u64) % m.value()
        } else {
            m.value() - ((-value) as u64 % m.value())
        };
    }
}

/// Samples a coefficient-domain error polynomial: one normal draw per
/// coefficient (shared across primes, since it represents a single small
/// integer), reduced into every prime's residue with negative values
/// stored as `q_i - |c|`.
pub fn sample_error_poly(rng: &mut impl RngCore, moduli: &[Modulus], degree: usize) -> RnsPoly {
    let mut poly = RnsPoly::zero(moduli.len(), degree);
    let mut column = vec![0u64; moduli.len()];
    for j in 0..degree {
        let draw = sample_normal(rng, ERROR_STDDEV).round() as i64;
        centered_i64_to_residues(draw, moduli, &mut column);
        for (i, &v) in column.iter().enumerate() {
            poly.row_mut(i)[j] = v;
        }
    }
    poly
}

/// Samples the ternary secret-key polynomial: each coefficient is a
/// normal draw rounded into `{-1, 0, 1}` (approximate ternary, matching
/// the original's rounding rather than a uniform trit draw), stored as
/// `q_i - 1` for `-1` in each residue.
pub fn sample_ternary_poly(rng: &mut impl RngCore, moduli: &[Modulus], degree: usize) -> RnsPoly {
    let mut poly = RnsPoly::zero(moduli.len(), degree);
    let mut column = vec![0u64; moduli.len()];
    for j in 0..degree {
        let draw = sample_normal(rng, 1.0).round().clamp(-1.0, 1.0) as i64;
        centered_i64_to_residues(draw, moduli, &mut column);
        for (i, &v) in column.iter().enumerate() {
            poly.row_mut(i)[j] = v;
        }
    }
    poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::get_primes;

    fn test_moduli() -> Vec<Modulus> {
        get_primes(16, 30, 2).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect()
    }

    #[test]
    fn uniform_sample_is_in_range() {
        let mut rng = CkksRng::from_seed(1);
        let m = test_moduli().remove(0);
        for _ in 0..200 {
            let x = sample_uniform_u64(&mut rng, &m);
            assert!(x < m.value());
        }
    }

    #[test]
    fn normal_sample_is_clipped() {
        let mut rng = CkksRng::from_seed(2);
        let bound = MAX_DEVIATION_SIGMAS * ERROR_STDDEV;
        for _ in 0..5000 {
            let x = sample_normal(&mut rng, ERROR_STDDEV);
            assert!(x.abs() <= bound + 1e-9);
        }
    }

    #[test]
    fn ternary_poly_has_only_allowed_residues() {
        let mut rng = CkksRng::from_seed(3);
        let moduli = test_moduli();
        let poly = sample_ternary_poly(&mut rng, &moduli, 16);
        for (i, m) in moduli.iter().enumerate() {
            for &v in poly.row(i) {
                assert!(v == 0 || v == 1 || v == m.value() - 1);
            }
        }
    }

    #[test]
    fn uniform_poly_fills_every_row_within_its_modulus() {
        let mut rng = CkksRng::from_seed(4);
        let moduli = test_moduli();
        let poly = sample_uniform_poly(&mut rng, &moduli, 16);
        for (i, m) in moduli.iter().enumerate() {
            assert!(poly.row(i).iter().all(|&x| x < m.value()));
        }
    }
}
