//! Key generation (§4.I).
//!
//! Grounded on `hedge/hedge/keygenerator.c`: the secret key is a ternary
//! polynomial forward-NTT'd once at key-parms; the public key is a
//! symmetric encryption of zero under that secret key.

use crate::context::Context;
use crate::params::ParmsId;
use crate::rns_poly::RnsPoly;
use crate::sampling::{sample_error_poly, sample_ternary_poly, sample_uniform_poly, CkksRng};
use zeroize::Zeroize;

#[derive(Debug, Clone)]
pub struct SecretKey {
    data: RnsPoly,
    parms_id: ParmsId,
}

impl SecretKey {
    /// Builds a secret key directly from already-NTT-form data, e.g. when
    /// reloading one saved via `serialize::save_secret_key`.
    pub fn from_data(data: RnsPoly, parms_id: ParmsId) -> SecretKey {
        SecretKey { data, parms_id }
    }

    pub fn data(&self) -> &RnsPoly {
        &self.data
    }

    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

/// A two-polynomial encryption of zero under a secret key: `(c_0, c_1)`
/// with `c_0 = -(a*s + e)` and `c_1 = a`, both in NTT form.
#[derive(Debug, Clone)]
pub struct PublicKey {
    c0: RnsPoly,
    c1: RnsPoly,
    parms_id: ParmsId,
}

impl PublicKey {
    pub fn c0(&self) -> &RnsPoly {
        &self.c0
    }

    pub fn c1(&self) -> &RnsPoly {
        &self.c1
    }

    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }
}

pub struct KeyGenerator;

impl KeyGenerator {
    /// Samples a ternary secret key at key-parms and forward-NTTs it.
    pub fn generate_secret_key(context: &Context, rng: &mut CkksRng) -> SecretKey {
        let parms_id = context.key_parms_id();
        let ctxdata = context.get(parms_id).expect("key-parms ctxdata always exists");
        let moduli = ctxdata.parms().coeff_modulus();
        let degree = ctxdata.parms().poly_modulus_degree() as usize;

        let mut data = sample_ternary_poly(rng, moduli, degree);
        for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
            table.forward_inplace(data.row_mut(j));
        }

        SecretKey { data, parms_id }
    }

    /// Public key = symmetric encryption of zero under `sk`, at key-parms.
    pub fn generate_public_key(context: &Context, sk: &SecretKey, rng: &mut CkksRng) -> PublicKey {
        let (c0, c1) = encrypt_zero_symmetric(context, sk, context.key_parms_id(), rng);
        PublicKey { c0, c1, parms_id: context.key_parms_id() }
    }
}

/// Symmetric encryption of zero at `parms_id` under `sk`: samples uniform
/// `a` directly in NTT form (`c1`), a coefficient-domain error `e`, and
/// sets `c0 = -(a*s + e)` fully in NTT form.
pub fn encrypt_zero_symmetric(context: &Context, sk: &SecretKey, parms_id: ParmsId, rng: &mut CkksRng) -> (RnsPoly, RnsPoly) {
    let ctxdata = context.get(parms_id).expect("caller guarantees a valid parms_id");
    let moduli = ctxdata.parms().coeff_modulus();
    let degree = ctxdata.parms().poly_modulus_degree() as usize;

    let a = sample_uniform_poly(rng, moduli, degree);
    let mut e = sample_error_poly(rng, moduli, degree);
    for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
        table.forward_inplace(e.row_mut(j));
    }

    let a_s = a.mul_mod(sk.data(), moduli);
    let c0 = a_s.add_mod(&e, moduli).negate_mod(moduli);
    (c0, a)
}

/// Asymmetric encryption of zero at `parms_id` under `pk`: samples a
/// ternary `u` (NTT'd) and two coefficient-domain errors, then sets
/// `c_j = u * pk_j + e_j`.
pub fn encrypt_zero_asymmetric(
    context: &Context,
    pk: &PublicKey,
    parms_id: ParmsId,
    rng: &mut CkksRng,
) -> (RnsPoly, RnsPoly) {
    let ctxdata = context.get(parms_id).expect("caller guarantees a valid parms_id");
    let moduli = ctxdata.parms().coeff_modulus();
    let degree = ctxdata.parms().poly_modulus_degree() as usize;

    let mut u = sample_ternary_poly(rng, moduli, degree);
    for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
        table.forward_inplace(u.row_mut(j));
    }

    let mut e0 = sample_error_poly(rng, moduli, degree);
    let mut e1 = sample_error_poly(rng, moduli, degree);
    for (j, table) in ctxdata.ntt_tables().iter().enumerate() {
        table.forward_inplace(e0.row_mut(j));
        table.forward_inplace(e1.row_mut(j));
    }

    let c0 = u.mul_mod(pk.c0(), moduli).add_mod(&e0, moduli);
    let c1 = u.mul_mod(pk.c1(), moduli).add_mod(&e1, moduli);
    (c0, c1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncryptParameters;
    use crate::primes::get_primes;
    use crate::security::SecurityLevel;
    use crate::modulus::Modulus;

    fn test_context() -> Context {
        let degree = 4096u64;
        let moduli: Vec<Modulus> =
            [40u32, 20, 40].iter().map(|&b| Modulus::new(get_primes(degree, b, 1).unwrap()[0]).unwrap()).collect();
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        Context::new(parms, SecurityLevel::None).unwrap()
    }

    #[test]
    fn secret_key_has_only_ternary_residues_before_ntt() {
        let ctx = test_context();
        let mut rng = CkksRng::from_seed(5);
        let sk = KeyGenerator::generate_secret_key(&ctx, &mut rng);
        assert_eq!(sk.parms_id(), ctx.key_parms_id());
        assert_eq!(sk.data().degree(), 4096);
    }

    #[test]
    fn public_key_is_two_polynomials_at_key_parms() {
        let ctx = test_context();
        let mut rng = CkksRng::from_seed(6);
        let sk = KeyGenerator::generate_secret_key(&ctx, &mut rng);
        let pk = KeyGenerator::generate_public_key(&ctx, &sk, &mut rng);
        assert_eq!(pk.parms_id(), ctx.key_parms_id());
        assert_eq!(pk.c0().prime_count(), pk.c1().prime_count());
    }
}
