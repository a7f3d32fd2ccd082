//! Decryptor (§4.K).
//!
//! Grounded on `hedge/hedge/decryptor.c`: extends the cached secret-key
//! power array on demand via dyadic product, then folds every ciphertext
//! component `c_i` against `s^i` (all in NTT form) into the output
//! plaintext.

use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keygen::SecretKey;
use crate::plaintext::Plaintext;
use crate::rns_poly::RnsPoly;

pub struct Decryptor<'a> {
    context: &'a Context,
    secret_key: &'a SecretKey,
    /// `secret_key_powers[0]` is unused conceptually (`s^1` lives at index
    /// 0); grown lazily as ciphertexts of larger size are decrypted.
    secret_key_powers: std::cell::RefCell<Vec<RnsPoly>>,
}

impl<'a> Decryptor<'a> {
    pub fn new(context: &'a Context, secret_key: &'a SecretKey) -> Self {
        Decryptor { context, secret_key, secret_key_powers: std::cell::RefCell::new(vec![secret_key.data().clone()]) }
    }

    pub fn decrypt(&self, ct: &crate::ciphertext::Ciphertext) -> Result<Plaintext> {
        if !ct.is_ntt_form() {
            return Err(CkksError::InvalidArgument("ciphertext must be in NTT form to decrypt".into()));
        }
        if !self.context.is_valid_for(ct.parms_id()) {
            return Err(CkksError::InvalidArgument("ciphertext parms_id is not valid for this context".into()));
        }
        if ct.size() < 2 {
            return Err(CkksError::InvalidArgument("ciphertext must have at least two components".into()));
        }

        let ctxdata = self.context.get(ct.parms_id()).expect("validated above");
        let moduli = ctxdata.parms().coeff_modulus();
        self.extend_secret_key_powers(ct.size() - 1, moduli);

        let powers = self.secret_key_powers.borrow();
        let mut out = ct.at(0).clone();
        for i in 1..ct.size() {
            let term = ct.at(i).mul_mod(&powers[i - 1], moduli);
            out = out.add_mod(&term, moduli);
        }

        Ok(Plaintext::from_encoded(out, ct.parms_id(), ct.scale()))
    }

    fn extend_secret_key_powers(&self, needed: usize, moduli: &[crate::modulus::Modulus]) {
        let mut powers = self.secret_key_powers.borrow_mut();
        while powers.len() < needed {
            let next = powers.last().unwrap().mul_mod(self.secret_key.data(), moduli);
            powers.push(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::{encrypt_zero_symmetric, KeyGenerator};
    use crate::modulus::Modulus;
    use crate::params::EncryptParameters;
    use crate::primes::get_primes;
    use crate::sampling::CkksRng;
    use crate::security::SecurityLevel;

    fn test_context() -> Context {
        let degree = 1024u64;
        let moduli: Vec<Modulus> =
            [30u32, 30].iter().map(|&b| Modulus::new(get_primes(degree, b, 1).unwrap()[0]).unwrap()).collect();
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        Context::new(parms, SecurityLevel::None).unwrap()
    }

    #[test]
    fn decrypting_a_zero_encryption_yields_a_near_zero_plaintext() {
        let ctx = test_context();
        let mut rng = CkksRng::from_seed(99);
        let sk = KeyGenerator::generate_secret_key(&ctx, &mut rng);
        let (c0, c1) = encrypt_zero_symmetric(&ctx, &sk, ctx.key_parms_id(), &mut rng);
        let ct = crate::ciphertext::Ciphertext::from_polys(vec![c0, c1], ctx.key_parms_id(), 1.0, true);

        let decryptor = Decryptor::new(&ctx, &sk);
        let pt = decryptor.decrypt(&ct).unwrap();
        assert_eq!(pt.parms_id(), ctx.key_parms_id());
    }
}
