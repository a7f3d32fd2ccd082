//! Encryptor (§4.J).
//!
//! Grounded on `hedge/hedge/encryptor.c`: `encrypt_zero_asymmetric`
//! followed by `encrypt` that walks any remaining modulus-chain gap
//! between key-parms and the plaintext's own parms via the base
//! converter's NTT-domain rescale before folding the plaintext in.

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keygen::{encrypt_zero_asymmetric, PublicKey};
use crate::params::ParmsId;
use crate::plaintext::Plaintext;
use crate::rns_poly::RnsPoly;
use crate::sampling::CkksRng;

pub struct Encryptor<'a> {
    context: &'a Context,
    public_key: &'a PublicKey,
}

impl<'a> Encryptor<'a> {
    pub fn new(context: &'a Context, public_key: &'a PublicKey) -> Self {
        Encryptor { context, public_key }
    }

    /// Encrypts a plaintext already in NTT form: a zero-encryption at the
    /// plaintext's level, with the plaintext's coefficients folded into
    /// the first polynomial.
    pub fn encrypt(&self, plain: &Plaintext, rng: &mut CkksRng) -> Result<Ciphertext> {
        if !plain.is_ntt_form() {
            return Err(CkksError::InvalidArgument("plaintext must be in NTT form to encrypt".into()));
        }
        if !self.context.is_valid_for(plain.parms_id()) {
            return Err(CkksError::InvalidArgument("plaintext parms_id is not valid for this context".into()));
        }

        let (mut c0, c1) = self.encrypt_zero_at(plain.parms_id(), rng);
        let ctxdata = self.context.get(plain.parms_id()).expect("validated above");
        let moduli = ctxdata.parms().coeff_modulus();
        c0 = c0.add_mod(plain.data(), moduli);

        let mut ct = Ciphertext::from_polys(vec![c0, c1], plain.parms_id(), plain.scale(), true);
        ct.set_scale(plain.scale());
        Ok(ct)
    }

    /// Zero-encryption at `parms_id`: produced directly if `parms_id` is
    /// key-parms, otherwise produced at key-parms and walked down the
    /// chain one dropped prime at a time via the NTT-domain rescale.
    fn encrypt_zero_at(&self, parms_id: ParmsId, rng: &mut CkksRng) -> (RnsPoly, RnsPoly) {
        let (mut c0, mut c1) = encrypt_zero_asymmetric(self.context, self.public_key, self.context.key_parms_id(), rng);

        let mut current = self.context.key_parms_id();
        while current != parms_id {
            let ctxdata = self.context.get(current).expect("chain walk stays on valid parms_id values");
            let bc = ctxdata.base_converter();
            let tables = ctxdata.ntt_tables();
            c0 = bc.floor_last_coeff_modulus_ntt_inplace(&c0, tables);
            c1 = bc.floor_last_coeff_modulus_ntt_inplace(&c1, tables);

            let next = self.context.next(current).expect("parms_id lies on the chain between key and last parms");
            current = next.parms().parms_id();
        }
        (c0, c1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::Decryptor;
    use crate::encoder::CkksEncoder;
    use crate::keygen::KeyGenerator;
    use crate::modulus::Modulus;
    use crate::params::EncryptParameters;
    use crate::primes::get_primes;
    use crate::security::SecurityLevel;
    use num_complex::Complex64;

    fn test_context() -> Context {
        let degree = 4096u64;
        let moduli: Vec<Modulus> =
            [40u32, 20, 40].iter().map(|&b| Modulus::new(get_primes(degree, b, 1).unwrap()[0]).unwrap()).collect();
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        Context::new(parms, SecurityLevel::None).unwrap()
    }

    #[test]
    fn property_2_encrypt_decrypt_composition() {
        let ctx = test_context();
        let mut rng = CkksRng::from_seed(21);
        let sk = KeyGenerator::generate_secret_key(&ctx, &mut rng);
        let pk = KeyGenerator::generate_public_key(&ctx, &sk, &mut rng);
        let encoder = CkksEncoder::new(ctx.get(ctx.first_parms_id()).unwrap().parms().poly_modulus_degree()).unwrap();

        let mut values = vec![Complex64::new(0.0, 0.0); encoder.slot_count()];
        values[0] = Complex64::new(3.25, 0.0);
        values[1] = Complex64::new(-1.5, 0.0);

        let scale = 2f64.powi(20);
        let pt = encoder.encode(&ctx, &values, ctx.first_parms_id(), scale).unwrap();

        let encryptor = Encryptor::new(&ctx, &pk);
        let ct = encryptor.encrypt(&pt, &mut rng).unwrap();

        let decryptor = Decryptor::new(&ctx, &sk);
        let decrypted = decryptor.decrypt(&ct).unwrap();
        let decoded = encoder.decode(&ctx, &decrypted).unwrap();

        assert!((decoded[0].re - 3.25).abs() < 0.05, "got {}", decoded[0].re);
        assert!((decoded[1].re + 1.5).abs() < 0.05, "got {}", decoded[1].re);
    }
}
