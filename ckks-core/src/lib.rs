//! RNS-CKKS approximate-arithmetic homomorphic encryption primitives:
//! residue-number-system polynomial arithmetic, a negacyclic NTT, a CKKS
//! encoder/decoder, and symmetric/asymmetric encryption of zero. See
//! `DESIGN.md` for how each module is grounded.

pub mod base_converter;
pub mod ciphertext;
pub mod context;
pub mod decryptor;
pub mod encoder;
pub mod encryptor;
pub mod error;
pub mod hashing;
pub mod keygen;
pub mod modulus;
pub mod ntt;
pub mod params;
pub mod plaintext;
pub mod primes;
pub mod rns_poly;
pub mod sampling;
pub mod security;
pub mod serialize;
pub mod wide;

use num_complex::Complex64;

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::decryptor::Decryptor;
use crate::encoder::CkksEncoder;
use crate::encryptor::Encryptor;
use crate::error::{CkksError, Result};
use crate::keygen::{KeyGenerator, PublicKey, SecretKey};
use crate::modulus::Modulus;
use crate::params::EncryptParameters;
use crate::primes::get_primes;
use crate::sampling::CkksRng;
use crate::security::SecurityLevel;

/// The library's single entrypoint surface (§6): build a context from a
/// degree and a coefficient-modulus bit-size profile, generate keys, then
/// encrypt/decrypt arrays of doubles or encode/decode without encryption.
pub struct CkksEngine {
    context: Context,
    encoder: CkksEncoder,
    secret_key: Option<SecretKey>,
    public_key: Option<PublicKey>,
}

impl CkksEngine {
    /// `bit_sizes` is typically `[60, s, s, 60]` where `s` matches the
    /// intended rescale step; repeated sizes get distinct primes.
    pub fn new(degree: u64, bit_sizes: &[u32], security_level: SecurityLevel) -> Result<Self> {
        if bit_sizes.is_empty() {
            return Err(CkksError::InvalidArgument("bit_sizes must not be empty".into()));
        }
        let coeff_modulus = distinct_primes_per_bucket(degree, bit_sizes)?;
        let parms = EncryptParameters::new_ckks(degree, coeff_modulus).map_err(CkksError::InvalidArgument)?;
        let context = Context::new(parms, security_level).map_err(CkksError::ParameterNotSet)?;
        let encoder = CkksEncoder::new(degree)?;
        Ok(CkksEngine { context, encoder, secret_key: None, public_key: None })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn generate_keys(&mut self, rng: &mut CkksRng) {
        let sk = KeyGenerator::generate_secret_key(&self.context, rng);
        let pk = KeyGenerator::generate_public_key(&self.context, &sk, rng);
        self.secret_key = Some(sk);
        self.public_key = Some(pk);
    }

    pub fn encode(&self, values: &[Complex64], scale: f64) -> Result<crate::plaintext::Plaintext> {
        self.encoder.encode(&self.context, values, self.context.first_parms_id(), scale)
    }

    pub fn decode(&self, plain: &crate::plaintext::Plaintext) -> Result<Vec<Complex64>> {
        self.encoder.decode(&self.context, plain)
    }

    /// Encrypts a length-`<= N/2` array of doubles at the data chain's
    /// first level.
    pub fn encrypt(&self, values: &[f64], scale: f64, rng: &mut CkksRng) -> Result<Ciphertext> {
        let pk = self.public_key.as_ref().ok_or_else(|| {
            CkksError::ParameterNotSet("call generate_keys before encrypt".into())
        })?;
        let complex_values: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        let plain = self.encode(&complex_values, scale)?;
        Encryptor::new(&self.context, pk).encrypt(&plain, rng)
    }

    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Vec<f64>> {
        let sk = self.secret_key.as_ref().ok_or_else(|| {
            CkksError::ParameterNotSet("call generate_keys before decrypt".into())
        })?;
        let plain = Decryptor::new(&self.context, sk).decrypt(ct)?;
        let decoded = self.decode(&plain)?;
        Ok(decoded.into_iter().map(|c| c.re).collect())
    }

    /// Consumes the engine, dropping (and, for the secret key,
    /// zeroizing) every owned buffer.
    pub fn destroy(self) {}
}

fn distinct_primes_per_bucket(degree: u64, bit_sizes: &[u32]) -> Result<Vec<Modulus>> {
    use std::collections::HashMap;
    let mut needed: HashMap<u32, usize> = HashMap::new();
    for &b in bit_sizes {
        *needed.entry(b).or_insert(0) += 1;
    }
    let mut pool: HashMap<u32, std::vec::IntoIter<u64>> = HashMap::new();
    for (&bits, &count) in &needed {
        let primes = get_primes(degree, bits, count)
            .ok_or_else(|| CkksError::RngFailure(format!("prime search exhausted for {bits}-bit moduli")))?;
        pool.insert(bits, primes.into_iter());
    }
    bit_sizes
        .iter()
        .map(|&b| {
            let value = pool.get_mut(&b).unwrap().next().expect("bucket sized exactly to its occurrence count");
            Modulus::new(value).ok_or_else(|| CkksError::LogicError("generated prime failed modulus validation".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_engine_round_trip_scalar() {
        let mut engine = CkksEngine::new(4096, &[40, 20, 40], SecurityLevel::None).unwrap();
        let mut rng = CkksRng::from_seed(123);
        engine.generate_keys(&mut rng);

        let mut values = vec![0.0; engine.encoder.slot_count()];
        values[0] = 3.5;
        let ct = engine.encrypt(&values, 2f64.powi(20), &mut rng).unwrap();
        let decrypted = engine.decrypt(&ct).unwrap();
        assert!((decrypted[0] - 3.5).abs() < 0.05, "got {}", decrypted[0]);
    }

    #[test]
    fn rejects_encrypt_before_keygen() {
        let engine = CkksEngine::new(4096, &[40, 20, 40], SecurityLevel::None).unwrap();
        let mut rng = CkksRng::from_seed(1);
        let values = vec![0.0; engine.encoder.slot_count()];
        assert!(engine.encrypt(&values, 2f64.powi(20), &mut rng).is_err());
    }
}
