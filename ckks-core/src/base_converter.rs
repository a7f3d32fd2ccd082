//! RNS <-> auxiliary-base conversion tables (§4.E).
//!
//! Grounded on `hedge/math/baseconverter.c`: `floor_last_coeff_modulus_inplace`
//! (rescale: `poly_i <- q_L^{-1} * (poly_i - poly_L mod q_i) mod q_i` for
//! every `i < L`) and its NTT-domain sibling (inverse-NTT the last residue
//! first, reduce, then forward-NTT each lower residue with its own table).
//! The auxiliary base and `m_sk` are carried per the Data Model but have no
//! exercised fast-base-conversion path here — see `DESIGN.md` for why.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::modulus::{inv_mod, mul_mod, sub_mod, Modulus};
use crate::ntt::NttTable;
use crate::rns_poly::RnsPoly;

/// The special modulus `m_sk`, used alongside the auxiliary base for
/// fast-floor/key-switching-adjacent bookkeeping. Reserved out of the
/// `2^61 - k*2^18 + 1` family the auxiliary base is drawn from (so is
/// `gamma = 0x1fffffffffc80001`, which this crate has no use for).
const M_SK: u64 = 0x1fffffffffe00001;

/// The fixed auxiliary base used for rescaling and fast-floor operations,
/// reproduced verbatim (bit-for-bit, in order) from `aux_small_mods` in
/// `hedge/math/baseconverter.c`. This is not the full set of primes of the
/// form `2^61 - k*2^18 + 1`: two such primes are reserved elsewhere in the
/// same file as distinguished moduli (`m_sk` above and `gamma =
/// 0x1fffffffffc80001`) and are excluded from this table.
pub fn special_auxiliary_primes() -> Vec<u64> {
    AUX_SMALL_MODS.to_vec()
}

const AUX_SMALL_MODS: [u64; 128] = [
    0x1fffffffffb40001, 0x1fffffffff500001, 0x1fffffffff380001, 0x1fffffffff000001,
    0x1ffffffffef00001, 0x1ffffffffee80001, 0x1ffffffffeb40001, 0x1ffffffffe780001,
    0x1ffffffffe600001, 0x1ffffffffe4c0001, 0x1ffffffffdf40001, 0x1ffffffffdac0001,
    0x1ffffffffda40001, 0x1ffffffffc680001, 0x1ffffffffc000001, 0x1ffffffffb880001,
    0x1ffffffffb7c0001, 0x1ffffffffb300001, 0x1ffffffffb1c0001, 0x1ffffffffadc0001,
    0x1ffffffffa400001, 0x1ffffffffa140001, 0x1ffffffff9d80001, 0x1ffffffff9140001,
    0x1ffffffff8ac0001, 0x1ffffffff8a80001, 0x1ffffffff81c0001, 0x1ffffffff7800001,
    0x1ffffffff7680001, 0x1ffffffff7080001, 0x1ffffffff6c80001, 0x1ffffffff6140001,
    0x1ffffffff5f40001, 0x1ffffffff5700001, 0x1ffffffff4bc0001, 0x1ffffffff4380001,
    0x1ffffffff3240001, 0x1ffffffff2dc0001, 0x1ffffffff1a40001, 0x1ffffffff11c0001,
    0x1ffffffff0fc0001, 0x1ffffffff0d80001, 0x1ffffffff0c80001, 0x1ffffffff08c0001,
    0x1fffffffefd00001, 0x1fffffffef9c0001, 0x1fffffffef600001, 0x1fffffffeef40001,
    0x1fffffffeed40001, 0x1fffffffeed00001, 0x1fffffffeebc0001, 0x1fffffffed540001,
    0x1fffffffed440001, 0x1fffffffed2c0001, 0x1fffffffed200001, 0x1fffffffec940001,
    0x1fffffffec6c0001, 0x1fffffffebe80001, 0x1fffffffebac0001, 0x1fffffffeba40001,
    0x1fffffffeb4c0001, 0x1fffffffeb280001, 0x1fffffffea780001, 0x1fffffffea440001,
    0x1fffffffe9f40001, 0x1fffffffe97c0001, 0x1fffffffe9300001, 0x1fffffffe8d00001,
    0x1fffffffe8400001, 0x1fffffffe7cc0001, 0x1fffffffe7bc0001, 0x1fffffffe7a80001,
    0x1fffffffe7600001, 0x1fffffffe7500001, 0x1fffffffe6fc0001, 0x1fffffffe6d80001,
    0x1fffffffe6ac0001, 0x1fffffffe6000001, 0x1fffffffe5d40001, 0x1fffffffe5a00001,
    0x1fffffffe5940001, 0x1fffffffe54c0001, 0x1fffffffe5340001, 0x1fffffffe4bc0001,
    0x1fffffffe4a40001, 0x1fffffffe3fc0001, 0x1fffffffe3540001, 0x1fffffffe2b00001,
    0x1fffffffe2680001, 0x1fffffffe0480001, 0x1fffffffe00c0001, 0x1fffffffdfd00001,
    0x1fffffffdfc40001, 0x1fffffffdf700001, 0x1fffffffdf340001, 0x1fffffffdef80001,
    0x1fffffffdea80001, 0x1fffffffde680001, 0x1fffffffde000001, 0x1fffffffdde40001,
    0x1fffffffddd80001, 0x1fffffffddd00001, 0x1fffffffddb40001, 0x1fffffffdd780001,
    0x1fffffffdd4c0001, 0x1fffffffdcb80001, 0x1fffffffdca40001, 0x1fffffffdc380001,
    0x1fffffffdc040001, 0x1fffffffdbb40001, 0x1fffffffdba80001, 0x1fffffffdb9c0001,
    0x1fffffffdb740001, 0x1fffffffdb380001, 0x1fffffffda600001, 0x1fffffffda340001,
    0x1fffffffda180001, 0x1fffffffd9700001, 0x1fffffffd9680001, 0x1fffffffd9440001,
    0x1fffffffd9080001, 0x1fffffffd8c80001, 0x1fffffffd8800001, 0x1fffffffd82c0001,
    0x1fffffffd7cc0001, 0x1fffffffd7b80001, 0x1fffffffd7840001, 0x1fffffffd73c0001,
];

/// Tables translating between the main RNS base `{q_i}` and an auxiliary
/// base `{m_k}` plus the special modulus `m_sk` (§3's Data Model).
#[derive(Debug, Clone)]
pub struct BaseConverter {
    coeff_base: Vec<Modulus>,
    aux_base: Vec<Modulus>,
    m_sk: Modulus,
    /// `q_L^{-1} mod q_i`, for `i < L - 1`.
    inv_last_coeff_mod_array: Vec<u64>,
    /// `(Q / q_i)^{-1} mod q_i`, for every `i`.
    inv_punctured_product_mod_base: Vec<u64>,
    total_modulus: BigUint,
}

impl BaseConverter {
    pub fn new(coeff_base: Vec<Modulus>, aux_base: Vec<Modulus>) -> Option<Self> {
        let l = coeff_base.len();
        let total_modulus: BigUint = coeff_base.iter().map(|m| BigUint::from(m.value())).product();
        let m_sk = Modulus::new(M_SK)?;

        let inv_last_coeff_mod_array = if l > 1 {
            let q_l = coeff_base[l - 1].value();
            let mut out = Vec::with_capacity(l - 1);
            for qi in &coeff_base[..l - 1] {
                let q_l_mod_qi = q_l % qi.value();
                out.push(inv_mod(q_l_mod_qi, qi)?);
            }
            out
        } else {
            Vec::new()
        };

        let mut inv_punctured_product_mod_base = Vec::with_capacity(l);
        for qi in &coeff_base {
            let q_div_qi = &total_modulus / BigUint::from(qi.value());
            let q_div_qi_mod_qi = (&q_div_qi % BigUint::from(qi.value())).to_u64().unwrap();
            inv_punctured_product_mod_base.push(inv_mod(q_div_qi_mod_qi, qi)?);
        }

        Some(BaseConverter {
            coeff_base,
            aux_base,
            m_sk,
            inv_last_coeff_mod_array,
            inv_punctured_product_mod_base,
            total_modulus,
        })
    }

    pub fn total_modulus(&self) -> &BigUint {
        &self.total_modulus
    }

    pub fn coeff_base(&self) -> &[Modulus] {
        &self.coeff_base
    }

    pub fn aux_base(&self) -> &[Modulus] {
        &self.aux_base
    }

    pub fn m_sk(&self) -> &Modulus {
        &self.m_sk
    }

    /// `(Q / q_i)^{-1} mod q_i`, indexed by coefficient-base position —
    /// the table the decoder's CRT recombination multiplies through.
    pub fn inv_punctured_product_mod_base(&self) -> &[u64] {
        &self.inv_punctured_product_mod_base
    }

    /// Rescale: treats `poly` as an integer over `q_1..q_L`, divides by
    /// `q_L` and rounds, producing an RNS polynomial over `q_1..q_{L-1}`.
    pub fn floor_last_coeff_modulus_inplace(&self, poly: &RnsPoly) -> RnsPoly {
        let l = poly.prime_count();
        let degree = poly.degree();
        let last_row = poly.row(l - 1).to_vec();
        let mut out = poly.drop_last_prime();
        for i in 0..l - 1 {
            let qi = &self.coeff_base[i];
            let inv_last = self.inv_last_coeff_mod_array[i];
            let row = out.row_mut(i);
            for j in 0..degree {
                let last_mod_qi = last_row[j] % qi.value();
                let diff = sub_mod(row[j], last_mod_qi, qi);
                row[j] = mul_mod(diff, inv_last, qi);
            }
        }
        out
    }

    /// NTT-domain rescale variant: inverse-NTT the last residue, reduce,
    /// then forward-NTT each lower residue with its own table before
    /// combining.
    pub fn floor_last_coeff_modulus_ntt_inplace(&self, poly: &RnsPoly, ntt_tables: &[NttTable]) -> RnsPoly {
        let l = poly.prime_count();
        let degree = poly.degree();
        let mut last_row = poly.row(l - 1).to_vec();
        ntt_tables[l - 1].inverse_inplace(&mut last_row);

        let mut out = poly.drop_last_prime();
        for i in 0..l - 1 {
            let qi = &self.coeff_base[i];
            let mut tmp: Vec<u64> = last_row.iter().map(|&v| v % qi.value()).collect();
            ntt_tables[i].forward_inplace(&mut tmp);
            let inv_last = self.inv_last_coeff_mod_array[i];
            let row = out.row_mut(i);
            for j in 0..degree {
                let diff = sub_mod(row[j], tmp[j], qi);
                row[j] = mul_mod(diff, inv_last, qi);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::get_primes;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn special_primes_match_verbatim_table_and_exclude_reserved_moduli() {
        let primes = special_auxiliary_primes();
        assert_eq!(primes.len(), 128);
        assert_eq!(primes[0], 0x1fffffffffb40001);
        assert_eq!(primes[127], 0x1fffffffd73c0001);
        assert!(!primes.contains(&M_SK));
        assert!(!primes.contains(&0x1fffffffffc80001));
    }

    #[test]
    fn property_8_rescale_correctness() {
        let degree = 8usize;
        let primes: Vec<Modulus> = get_primes(degree as u64, 30, 3).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect();
        let aux: Vec<Modulus> = get_primes(degree as u64, 30, 2).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect();
        let bc = BaseConverter::new(primes.clone(), aux).unwrap();

        let q_total: u128 = primes.iter().map(|m| m.value() as u128).product();
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        for _ in 0..20 {
            let x: u128 = rng.gen_range(0..q_total);
            let rows: Vec<Vec<u64>> = primes.iter().map(|m| vec![(x % m.value() as u128) as u64; degree]).collect();
            let poly = RnsPoly::from_rows(&rows);
            let rescaled = bc.floor_last_coeff_modulus_inplace(&poly);

            let q_last = primes.last().unwrap().value() as u128;
            let expected = ((x as f64) / (q_last as f64)).round() as i128;
            for (i, m) in primes[..primes.len() - 1].iter().enumerate() {
                let got = rescaled.row(i)[0] as i128;
                let want = ((expected % m.value() as i128) + m.value() as i128) % m.value() as i128;
                // allow +-1 due to rounding-direction ties between the two
                // equally valid roundings at a half-integer boundary
                let diff = (got - want).rem_euclid(m.value() as i128);
                assert!(diff == 0 || diff == 1 || diff == m.value() as i128 - 1, "i={i} got={got} want={want}");
            }
        }
    }
}
