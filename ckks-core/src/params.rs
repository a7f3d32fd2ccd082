//! `EncryptParameters` and `ParmsId` (§3, §4.F steps 1-2).
//!
//! Grounded on `hedge/hedge/encryptionparams.c`/`.h`: the original recomputes
//! a hash whenever the modulus chain or degree is mutated. This crate makes
//! `EncryptParameters` immutable after construction instead (no interior
//! setters), so the hash is simply computed once, in the constructor.

use crate::hashing::sha3_256;
use crate::modulus::{Modulus, MAX_USER_MODULUS_BIT_COUNT, MIN_USER_MODULUS_BIT_COUNT};

pub const MIN_COEFF_MODULUS_COUNT: usize = 1;
pub const MAX_COEFF_MODULUS_COUNT: usize = 62;
pub const MIN_POLY_DEGREE: u64 = 2;
pub const MAX_POLY_DEGREE: u64 = 32768;

/// Only CKKS is implemented; BFV exists as an enum value per §1's non-goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeType {
    Ckks,
    Bfv,
}

/// A 256-bit hash of the parameter tuple `(scheme, N, q_1..q_L,
/// plain_modulus)`. The all-zero value is reserved: it means "not-NTT-form
/// / uninitialized" wherever it appears on a `Plaintext`/`Ciphertext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParmsId(pub [u64; 4]);

impl ParmsId {
    pub const ZERO: ParmsId = ParmsId([0, 0, 0, 0]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }
}

fn compute_parms_id(scheme: SchemeType, degree: u64, coeff_modulus: &[Modulus], plain_modulus: &Modulus) -> ParmsId {
    let mut bytes = Vec::with_capacity(8 * (3 + coeff_modulus.len()));
    bytes.extend_from_slice(&(scheme as u64).to_le_bytes());
    bytes.extend_from_slice(&degree.to_le_bytes());
    for m in coeff_modulus {
        bytes.extend_from_slice(&m.value().to_le_bytes());
    }
    bytes.extend_from_slice(&plain_modulus.value().to_le_bytes());
    let digest = sha3_256(&bytes);
    let mut words = [0u64; 4];
    for (i, word) in words.iter_mut().enumerate() {
        *word = u64::from_le_bytes(digest[i * 8..i * 8 + 8].try_into().unwrap());
    }
    // A derived id of exactly zero is a (practically impossible) hash
    // collision with the reserved marker; §7 calls this a LogicError at
    // the framing layer. We nudge the low word so storage invariants
    // elsewhere (zero == uninitialized) stay sound even in that case.
    if words == [0, 0, 0, 0] {
        words[0] = 1;
    }
    ParmsId(words)
}

/// Immutable-after-construction descriptor: scheme, degree, coefficient
/// modulus chain, and plain modulus (must be zero for CKKS).
#[derive(Debug, Clone)]
pub struct EncryptParameters {
    scheme: SchemeType,
    poly_modulus_degree: u64,
    coeff_modulus: Vec<Modulus>,
    plain_modulus: Modulus,
    parms_id: ParmsId,
}

impl EncryptParameters {
    /// Constructs and validates CKKS parameters. Plain modulus is always
    /// zero for CKKS; callers never set one directly.
    pub fn new_ckks(poly_modulus_degree: u64, coeff_modulus: Vec<Modulus>) -> Result<Self, String> {
        if !poly_modulus_degree.is_power_of_two()
            || poly_modulus_degree < MIN_POLY_DEGREE
            || poly_modulus_degree > MAX_POLY_DEGREE
        {
            return Err(format!("poly_modulus_degree {poly_modulus_degree} must be a power of two in [2, 32768]"));
        }
        if coeff_modulus.is_empty() || coeff_modulus.len() > MAX_COEFF_MODULUS_COUNT {
            return Err(format!(
                "coeff_modulus count {} must be in [{}, {}]",
                coeff_modulus.len(),
                MIN_COEFF_MODULUS_COUNT,
                MAX_COEFF_MODULUS_COUNT
            ));
        }
        for m in &coeff_modulus {
            if m.bit_count() < MIN_USER_MODULUS_BIT_COUNT || m.bit_count() > MAX_USER_MODULUS_BIT_COUNT {
                return Err(format!("modulus bit count {} out of [2, 60]", m.bit_count()));
            }
            if !m.is_prime() {
                return Err(format!("modulus {} is not prime", m.value()));
            }
        }
        for i in 0..coeff_modulus.len() {
            for j in (i + 1)..coeff_modulus.len() {
                if gcd(coeff_modulus[i].value(), coeff_modulus[j].value()) != 1 {
                    return Err("coefficient moduli must be pairwise coprime".to_string());
                }
            }
        }
        let plain_modulus = Modulus::new(0).unwrap();
        let parms_id = compute_parms_id(SchemeType::Ckks, poly_modulus_degree, &coeff_modulus, &plain_modulus);
        Ok(EncryptParameters {
            scheme: SchemeType::Ckks,
            poly_modulus_degree,
            coeff_modulus,
            plain_modulus,
            parms_id,
        })
    }

    /// Rebuilds parameters over a shorter coefficient-modulus chain (used
    /// by context construction to walk the chain one dropped prime at a
    /// time). Skips the pairwise-coprime recheck since it only removes
    /// entries from an already-validated chain.
    pub(crate) fn with_dropped_last_modulus(&self) -> Option<Self> {
        if self.coeff_modulus.len() <= 1 {
            return None;
        }
        let coeff_modulus = self.coeff_modulus[..self.coeff_modulus.len() - 1].to_vec();
        let parms_id = compute_parms_id(self.scheme, self.poly_modulus_degree, &coeff_modulus, &self.plain_modulus);
        Some(EncryptParameters {
            scheme: self.scheme,
            poly_modulus_degree: self.poly_modulus_degree,
            coeff_modulus,
            plain_modulus: self.plain_modulus,
            parms_id,
        })
    }

    pub fn scheme(&self) -> SchemeType {
        self.scheme
    }

    pub fn poly_modulus_degree(&self) -> u64 {
        self.poly_modulus_degree
    }

    pub fn coeff_modulus(&self) -> &[Modulus] {
        &self.coeff_modulus
    }

    pub fn plain_modulus(&self) -> &Modulus {
        &self.plain_modulus
    }

    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::get_primes;

    fn make_moduli(degree: u64, bit_sizes: &[u32]) -> Vec<Modulus> {
        bit_sizes
            .iter()
            .map(|&bits| Modulus::new(get_primes(degree, bits, 1).unwrap()[0]).unwrap())
            .collect()
    }

    #[test]
    fn valid_parameters_construct() {
        let degree = 8192;
        let moduli = make_moduli(degree, &[60, 40, 40, 60]);
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        assert!(!parms.parms_id().is_zero());
    }

    #[test]
    fn rejects_non_power_of_two_degree() {
        let moduli = make_moduli(8192, &[40]);
        assert!(EncryptParameters::new_ckks(6000, moduli).is_err());
    }

    #[test]
    fn dropping_last_modulus_changes_parms_id() {
        let degree = 4096;
        let moduli = make_moduli(degree, &[40, 20, 40]);
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        let dropped = parms.with_dropped_last_modulus().unwrap();
        assert_ne!(parms.parms_id(), dropped.parms_id());
        assert_eq!(dropped.coeff_modulus().len(), 2);
    }
}
