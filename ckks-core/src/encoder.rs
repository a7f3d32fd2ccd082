//! CKKS encoder/decoder (§4.H): complex vector <-> RNS plaintext via an
//! in-place FFT over the canonical embedding and per-coefficient RNS
//! decomposition.
//!
//! Grounded on `hedge/hedge/ckks.c`: `new_CKKSEncoder` builds
//! `matrix_reps_index_map_` (the canonical-embedding permutation, built
//! from the `gen = 3` multiplicative accumulator and bit-reversal) and the
//! `roots_`/`inv_roots_` tables; `encode_internal` runs the decimation-in-
//! frequency inverse FFT then picks one of three decomposition paths by
//! coefficient bit-width; `decode_internal` runs the CRT recombination
//! into a wide integer, centers it, rescales to `f64`, and runs the
//! matching decimation-in-time forward FFT.

use std::f64::consts::PI;

use num_bigint::BigUint;
use num_complex::Complex64;
use num_traits::ToPrimitive;

use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::modulus::{barrett_reduce_128, mul_mod, negate_mod, Modulus};
use crate::ntt::bit_reverse;
use crate::params::ParmsId;
use crate::plaintext::Plaintext;
use crate::rns_poly::RnsPoly;

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Builds and tears down the canonical-embedding permutation and twiddle
/// tables once per polynomial degree; encode/decode then just look things
/// up in `self`.
pub struct CkksEncoder {
    degree: usize,
    slots: usize,
    log_n: u32,
    matrix_reps_index_map: Vec<usize>,
    roots: Vec<Complex64>,
    inv_roots: Vec<Complex64>,
}

impl CkksEncoder {
    pub fn new(degree: u64) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 2 {
            return Err(CkksError::InvalidArgument(format!("poly_modulus_degree {degree} must be a power of two")));
        }
        let degree = degree as usize;
        let slots = degree / 2;
        let log_n = degree.trailing_zeros();
        let m = (degree as u64) << 1;

        let mut matrix_reps_index_map = vec![0usize; degree];
        let gen: u64 = 3;
        let mut pos: u64 = 1;
        for i in 0..slots {
            let index1 = (pos - 1) >> 1;
            let index2 = (m - pos - 1) >> 1;
            matrix_reps_index_map[i] = bit_reverse(index1, log_n) as usize;
            matrix_reps_index_map[slots | i] = bit_reverse(index2, log_n) as usize;
            pos = (pos * gen) & (m - 1);
        }

        let angle = 2.0 * PI / (m as f64);
        let psi = Complex64::new(angle.cos(), angle.sin());
        let mut roots = vec![Complex64::new(0.0, 0.0); degree];
        let mut inv_roots = vec![Complex64::new(0.0, 0.0); degree];
        for i in 0..degree {
            let r = psi.powf(bit_reverse(i as u64, log_n) as f64);
            roots[i] = r;
            inv_roots[i] = Complex64::new(1.0, 0.0) / r;
        }

        Ok(CkksEncoder { degree, slots, log_n, matrix_reps_index_map, roots, inv_roots })
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Encodes `values` (length `<= slot_count()`) into a plaintext tied to
    /// `parms_id` at scale `scale`.
    pub fn encode(&self, context: &Context, values: &[Complex64], parms_id: ParmsId, scale: f64) -> Result<Plaintext> {
        let ctxdata = context
            .get(parms_id)
            .ok_or_else(|| CkksError::InvalidArgument("parms_id is not valid for encryption parameters".into()))?;
        if values.len() > self.slots {
            return Err(CkksError::InvalidArgument("values has invalid size".into()));
        }
        if scale <= 0.0 {
            return Err(CkksError::InvalidArgument("scale must be positive".into()));
        }

        let coeff_modulus = ctxdata.parms().coeff_modulus();
        let coeff_mod_count = coeff_modulus.len();
        let coeff_count = self.degree;
        let total_bits = ctxdata.total_modulus_bit_count() as i32;

        if (scale.log2() as i32) + 1 >= total_bits {
            return Err(CkksError::InvalidArgument("scale out of bounds".into()));
        }

        let mut buf = vec![Complex64::new(0.0, 0.0); coeff_count];
        for (i, &v) in values.iter().enumerate() {
            buf[self.matrix_reps_index_map[i]] = v;
            buf[self.matrix_reps_index_map[i + self.slots]] = v.conj();
        }

        self.inverse_fft_in_place(&mut buf);

        let n_inv_scale = scale / (coeff_count as f64);
        let mut max_coeff_bit_count = 1i32;
        for c in buf.iter_mut() {
            *c *= n_inv_scale;
            let bits = if c.re.abs() > 0.0 { (c.re.abs().log2() as i32) + 2 } else { 1 };
            max_coeff_bit_count = max_coeff_bit_count.max(bits);
        }
        if max_coeff_bit_count >= total_bits {
            return Err(CkksError::InvalidArgument("encoded values are too large".into()));
        }

        let mut poly = RnsPoly::zero(coeff_mod_count, coeff_count);

        if max_coeff_bit_count <= 64 {
            for i in 0..coeff_count {
                let coeffd = buf[i].re.round();
                let is_negative = coeffd.is_sign_negative();
                let coeffu = coeffd.abs() as u64;
                for (j, m) in coeff_modulus.iter().enumerate() {
                    let reduced = coeffu % m.value();
                    poly.row_mut(j)[i] = if is_negative { negate_mod(reduced, m) } else { reduced };
                }
            }
        } else if max_coeff_bit_count <= 128 {
            for i in 0..coeff_count {
                let coeffd = buf[i].re.round();
                let is_negative = coeffd.is_sign_negative();
                let coeffd = coeffd.abs();
                let low = (coeffd % TWO_POW_64) as u64;
                let high = (coeffd / TWO_POW_64) as u64;
                for (j, m) in coeff_modulus.iter().enumerate() {
                    let reduced = barrett_reduce_128((low, high), m);
                    poly.row_mut(j)[i] = if is_negative { negate_mod(reduced, m) } else { reduced };
                }
            }
        } else {
            for i in 0..coeff_count {
                let coeffd = buf[i].re.round();
                let is_negative = coeffd.is_sign_negative();
                let mut remaining = coeffd.abs();
                let mut limbs = Vec::new();
                while remaining >= 1.0 {
                    limbs.push((remaining % TWO_POW_64) as u64);
                    remaining = (remaining / TWO_POW_64).floor();
                }
                if limbs.is_empty() {
                    limbs.push(0);
                }
                for (j, m) in coeff_modulus.iter().enumerate() {
                    let reduced = decompose_single_coeff(&limbs, m);
                    poly.row_mut(j)[i] = if is_negative { negate_mod(reduced, m) } else { reduced };
                }
            }
        }

        for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
            table.forward_inplace(poly.row_mut(j));
        }

        Ok(Plaintext::from_encoded(poly, parms_id, scale))
    }

    /// Decodes a plaintext in NTT form back into a length-`slot_count()`
    /// complex vector (only the real part is meaningful for CKKS).
    pub fn decode(&self, context: &Context, plain: &Plaintext) -> Result<Vec<Complex64>> {
        if !context.is_valid_for(plain.parms_id()) {
            return Err(CkksError::InvalidArgument("plain is not valid for encryption parameters".into()));
        }
        if !plain.is_ntt_form() {
            return Err(CkksError::InvalidArgument("plain is not in NTT form".into()));
        }
        let ctxdata = context.get(plain.parms_id()).expect("validated above");
        let coeff_modulus = ctxdata.parms().coeff_modulus();
        let coeff_mod_count = coeff_modulus.len();
        let coeff_count = self.degree;

        let total_bits = ctxdata.total_modulus_bit_count() as i32;
        if plain.scale() <= 0.0 || (plain.scale().log2() as i32) >= total_bits {
            return Err(CkksError::InvalidArgument("scale out of bounds".into()));
        }

        let mut plain_copy = plain.data().clone();
        for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
            table.inverse_inplace(plain_copy.row_mut(j));
        }

        let bc = ctxdata.base_converter();
        let total_modulus = ctxdata.total_modulus();
        let upper_half_threshold = ctxdata.upper_half_threshold();
        let inv_scale = 1.0 / plain.scale();

        let q_div_qj: Vec<BigUint> =
            coeff_modulus.iter().map(|m| total_modulus / BigUint::from(m.value())).collect();

        let mut res = vec![Complex64::new(0.0, 0.0); coeff_count];
        for i in 0..coeff_count {
            let mut acc = BigUint::from(0u32);
            for j in 0..coeff_mod_count {
                let t = mul_mod(plain_copy.row(j)[i], bc.inv_punctured_product_mod_base()[j], &coeff_modulus[j]);
                acc += BigUint::from(t) * &q_div_qj[j];
            }
            acc %= total_modulus;

            let value = if &acc >= upper_half_threshold {
                -bigint_scaled_to_f64(&(total_modulus - &acc), inv_scale)
            } else {
                bigint_scaled_to_f64(&acc, inv_scale)
            };
            res[i] = Complex64::new(value, 0.0);
        }

        self.forward_fft_in_place(&mut res);

        Ok((0..self.slots).map(|i| Complex64::new(res[self.matrix_reps_index_map[i]].re, 0.0)).collect())
    }

    /// Decimation-in-frequency inverse FFT (§4.H encode step 2).
    fn inverse_fft_in_place(&self, buf: &mut [Complex64]) {
        let n = self.degree;
        let mut tt = 1usize;
        for i in 0..self.log_n {
            let mm = 1usize << (self.log_n - i);
            let h = mm / 2;
            let mut k_start = 0usize;
            for j in 0..h {
                let k_end = k_start + tt;
                let s = self.inv_roots[h + j];
                for k in k_start..k_end {
                    let u = buf[k];
                    let v = buf[k + tt];
                    buf[k] = u + v;
                    buf[k + tt] = (u - v) * s;
                }
                k_start += 2 * tt;
            }
            tt *= 2;
        }
        debug_assert_eq!(tt, n);
    }

    /// Decimation-in-time forward FFT (§4.H decode step 5).
    fn forward_fft_in_place(&self, buf: &mut [Complex64]) {
        let mut tt = self.degree;
        for i in 0..self.log_n {
            let mm = 1usize << i;
            tt >>= 1;
            for j in 0..mm {
                let j1 = 2 * j * tt;
                let j2 = j1 + tt;
                let s = self.roots[mm + j];
                for k in j1..j2 {
                    let u = buf[k];
                    let v = buf[k + tt] * s;
                    buf[k] = u + v;
                    buf[k + tt] = u - v;
                }
            }
        }
    }
}

/// Generic-path coefficient decomposition: repeatedly Barrett-reduces a
/// 128-bit sliding window down a little-endian multi-limb integer.
fn decompose_single_coeff(limbs: &[u64], modulus: &Modulus) -> u64 {
    if limbs.len() == 1 {
        return limbs[0] % modulus.value();
    }
    let mut copy = limbs.to_vec();
    for k in (1..copy.len()).rev() {
        copy[k - 1] = barrett_reduce_128((copy[k - 1], copy[k]), modulus);
    }
    copy[0]
}

fn bigint_scaled_to_f64(value: &BigUint, inv_scale: f64) -> f64 {
    let mut acc = 0.0f64;
    let mut scale_pow = inv_scale;
    for digit in value.to_u64_digits() {
        if digit != 0 {
            acc += digit.to_f64().unwrap() * scale_pow;
        }
        scale_pow *= TWO_POW_64;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncryptParameters;
    use crate::primes::get_primes;
    use crate::security::SecurityLevel;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn test_context(degree: u64, bits: &[u32]) -> Context {
        let moduli: Vec<Modulus> =
            bits.iter().map(|&b| Modulus::new(get_primes(degree, b, 1).unwrap()[0]).unwrap()).collect();
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        Context::new(parms, SecurityLevel::None).unwrap()
    }

    #[test]
    fn s3_constant_zero_round_trips_exactly() {
        let degree = 8192;
        let ctx = test_context(degree, &[40, 40, 40]);
        let encoder = CkksEncoder::new(degree).unwrap();
        let values = vec![Complex64::new(0.0, 0.0); encoder.slot_count()];
        let pt = encoder.encode(&ctx, &values, ctx.first_parms_id(), 2f64.powi(30)).unwrap();
        let decoded = encoder.decode(&ctx, &pt).unwrap();
        for v in decoded {
            assert!(v.re.abs() < 1e-6, "expected exact zero, got {v}");
        }
    }

    #[test]
    fn s2_single_scalar_round_trips_within_tolerance() {
        let degree = 4096;
        let ctx = test_context(degree, &[40, 20, 40]);
        let encoder = CkksEncoder::new(degree).unwrap();
        let mut values = vec![Complex64::new(0.0, 0.0); encoder.slot_count()];
        values[0] = Complex64::new(7.0, 0.0);
        let pt = encoder.encode(&ctx, &values, ctx.first_parms_id(), 2f64.powi(20)).unwrap();
        let decoded = encoder.decode(&ctx, &pt).unwrap();
        assert!((decoded[0].re - 7.0).abs() < 0.05, "got {}", decoded[0].re);
    }

    #[test]
    fn property_1_ring_identity_encode_decode() {
        let degree = 8192;
        let ctx = test_context(degree, &[60, 40, 40, 60]);
        let encoder = CkksEncoder::new(degree).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let m = 16;
        let scale = 2f64.powi(40);

        let mut values = vec![Complex64::new(0.0, 0.0); encoder.slot_count()];
        let mut max_abs = 0.0f64;
        for v in values.iter_mut().take(m) {
            let re: f64 = rng.gen_range(-1.0e10..1.0e10);
            let im: f64 = rng.gen_range(-1.0e10..1.0e10);
            *v = Complex64::new(re, im);
            max_abs = max_abs.max(re.abs()).max(im.abs());
        }

        let pt = encoder.encode(&ctx, &values, ctx.first_parms_id(), scale).unwrap();
        let decoded = encoder.decode(&ctx, &pt).unwrap();

        let bound = max_abs * 2f64.powi(-10);
        for i in 0..m {
            assert!((decoded[i].re - values[i].re).abs() < bound.max(1e-3), "slot {i} exceeded tolerance");
        }
    }
}
