//! Context construction and the ctxdata chain (§4.F).
//!
//! Grounded on `hedge/hedge/context.c`: `init_hcontext_with_parms` clones
//! the parameters, registers the key-parms `ctxdata` in a map keyed by
//! `ParmsId`, then walks `create_next_ctxdata` while dropping the last
//! prime, linking a doubly-linked chain and assigning `chain_index` in
//! decreasing order from the head. Design Notes replace both the
//! process-wide parms-id map and the doubly-linked list with an owned
//! arena (`Vec<ContextData>`) indexed by `usize`.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use tracing::{debug, warn};

use crate::base_converter::{special_auxiliary_primes, BaseConverter};
use crate::modulus::Modulus;
use crate::ntt::NttTable;
use crate::params::{EncryptParameters, ParmsId};
use crate::security::{max_total_coeff_modulus_bits, SecurityLevel};

/// Per-parameter-set precomputation: NTT tables, base converter, and the
/// chain position. Indices into `Context::data` replace raw `prev`/`next`
/// pointers.
#[derive(Debug, Clone)]
pub struct ContextData {
    parms: EncryptParameters,
    ntt_tables: Vec<NttTable>,
    base_converter: BaseConverter,
    total_modulus: BigUint,
    total_modulus_bit_count: u64,
    upper_half_threshold: BigUint,
    chain_index: usize,
    prev: Option<usize>,
    next: Option<usize>,
    parameters_set: bool,
}

impl ContextData {
    pub fn parms(&self) -> &EncryptParameters {
        &self.parms
    }

    pub fn ntt_tables(&self) -> &[NttTable] {
        &self.ntt_tables
    }

    pub fn base_converter(&self) -> &BaseConverter {
        &self.base_converter
    }

    pub fn total_modulus(&self) -> &BigUint {
        &self.total_modulus
    }

    pub fn total_modulus_bit_count(&self) -> u64 {
        self.total_modulus_bit_count
    }

    pub fn upper_half_threshold(&self) -> &BigUint {
        &self.upper_half_threshold
    }

    pub fn chain_index(&self) -> usize {
        self.chain_index
    }

    pub fn parameters_set(&self) -> bool {
        self.parameters_set
    }
}

/// Owns the ctxdata chain: an arena in chain-index order, a lookup map
/// keyed by `ParmsId`, and the three distinguished positions (key, first,
/// last).
#[derive(Debug, Clone)]
pub struct Context {
    data: Vec<ContextData>,
    index_by_parms_id: HashMap<ParmsId, usize>,
    key_parms_id: ParmsId,
    first_parms_id: ParmsId,
    last_parms_id: ParmsId,
    using_keyswitching: bool,
}

impl Context {
    /// Builds a context from a top-level `EncryptParameters`, expanding the
    /// modulus chain by repeatedly dropping the last prime until doing so
    /// would leave fewer than one prime or violate the requested security
    /// level.
    pub fn new(parms: EncryptParameters, security_level: SecurityLevel) -> Result<Self, String> {
        let aux_primes = special_auxiliary_primes();

        let mut data = Vec::new();
        let mut index_by_parms_id = HashMap::new();

        let key_parms_id = parms.parms_id();
        let key_index = build_ctxdata(&parms, security_level, &aux_primes, 0, None)?;
        data.push(key_index);
        index_by_parms_id.insert(key_parms_id, 0);
        debug!(chain_index = 0, parms_id = ?key_parms_id, "registered key-parms ctxdata");

        let mut first_parms_id = key_parms_id;
        let mut last_parms_id = key_parms_id;
        let mut prev_index = 0usize;
        let mut current_parms = parms.clone();

        if parms.coeff_modulus().len() > 1 {
            loop {
                let Some(next_parms) = current_parms.with_dropped_last_modulus() else {
                    break;
                };
                match build_ctxdata(&next_parms, security_level, &aux_primes, data.len(), Some(prev_index)) {
                    Ok(mut next_data) => {
                        let next_index = data.len();
                        next_data.prev = Some(prev_index);
                        data[prev_index].next = Some(next_index);
                        let id = next_parms.parms_id();
                        index_by_parms_id.insert(id, next_index);
                        if next_index == 1 {
                            first_parms_id = id;
                        }
                        last_parms_id = id;
                        debug!(chain_index = next_index, parms_id = ?id, "linked ctxdata into chain");
                        data.push(next_data);
                        prev_index = next_index;
                        current_parms = next_parms;
                    }
                    Err(reason) => {
                        warn!(%reason, "stopping chain expansion: next step would be invalid");
                        break;
                    }
                }
            }
        }

        // chain_index counts down from the head: the head (index 0 in our
        // arena) gets the highest value.
        let head_index = data.len() - 1;
        for (arena_index, ctxdata) in data.iter_mut().enumerate() {
            ctxdata.chain_index = head_index - arena_index;
        }

        let using_keyswitching = first_parms_id != key_parms_id;

        Ok(Context {
            data,
            index_by_parms_id,
            key_parms_id,
            first_parms_id,
            last_parms_id,
            using_keyswitching,
        })
    }

    pub fn key_parms_id(&self) -> ParmsId {
        self.key_parms_id
    }

    pub fn first_parms_id(&self) -> ParmsId {
        self.first_parms_id
    }

    pub fn last_parms_id(&self) -> ParmsId {
        self.last_parms_id
    }

    pub fn using_keyswitching(&self) -> bool {
        self.using_keyswitching
    }

    pub fn get(&self, parms_id: ParmsId) -> Option<&ContextData> {
        self.index_by_parms_id.get(&parms_id).map(|&i| &self.data[i])
    }

    pub fn is_valid_for(&self, parms_id: ParmsId) -> bool {
        self.index_by_parms_id.contains_key(&parms_id)
    }

    /// The ctxdata one step closer to `first_parms` than `parms_id`, if any.
    pub fn next(&self, parms_id: ParmsId) -> Option<&ContextData> {
        let &i = self.index_by_parms_id.get(&parms_id)?;
        let next_index = self.data[i].next?;
        Some(&self.data[next_index])
    }

    /// The ctxdata one step closer to `key_parms` than `parms_id`, if any.
    pub fn prev(&self, parms_id: ParmsId) -> Option<&ContextData> {
        let &i = self.index_by_parms_id.get(&parms_id)?;
        let prev_index = self.data[i].prev?;
        Some(&self.data[prev_index])
    }

    /// Chain walked from key-parms to last-parms, for chain-monotonicity
    /// checks (property 6).
    pub fn chain(&self) -> &[ContextData] {
        &self.data
    }
}

fn build_ctxdata(
    parms: &EncryptParameters,
    security_level: SecurityLevel,
    aux_primes: &[u64],
    _arena_index: usize,
    _prev: Option<usize>,
) -> Result<ContextData, String> {
    let coeff_modulus = parms.coeff_modulus();
    let total_modulus: BigUint = coeff_modulus.iter().map(|m| BigUint::from(m.value())).product();
    let total_modulus_bit_count = total_modulus.bits();

    if let Some(budget) = max_total_coeff_modulus_bits(parms.poly_modulus_degree(), security_level) {
        if total_modulus_bit_count > budget as u64 {
            return Err(format!(
                "total coefficient modulus bit count {total_modulus_bit_count} exceeds security budget {budget}"
            ));
        }
    }

    let upper_half_threshold = (&total_modulus + BigUint::from(1u32)) / BigUint::from(2u32);

    let log_n = parms.poly_modulus_degree().trailing_zeros();
    let mut ntt_tables = Vec::with_capacity(coeff_modulus.len());
    for m in coeff_modulus {
        match NttTable::generate(log_n, m) {
            Some(t) => ntt_tables.push(t),
            None => return Err(format!("no primitive 2N-th root for modulus {}", m.value())),
        }
    }

    let aux_count = coeff_modulus.len() + 1;
    let aux_base: Vec<Modulus> = aux_primes
        .iter()
        .take(aux_count)
        .map(|&p| Modulus::new(p).expect("special auxiliary primes are valid moduli"))
        .collect();
    let base_converter = BaseConverter::new(coeff_modulus.to_vec(), aux_base)
        .ok_or_else(|| "failed to build base converter tables".to_string())?;

    Ok(ContextData {
        parms: parms.clone(),
        ntt_tables,
        base_converter,
        total_modulus_bit_count: total_modulus_bit_count,
        total_modulus,
        upper_half_threshold,
        chain_index: 0,
        prev: None,
        next: None,
        parameters_set: true,
    })
}

#[allow(dead_code)]
fn bigint_to_u64_lossy(v: &BigUint) -> u64 {
    v.to_u64().unwrap_or(u64::MAX)
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
    fn s4_security_rejection() {
        let degree = 8192;
        let moduli = make_moduli(degree, &[60; 10]);
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        let result = Context::new(parms, SecurityLevel::Tc128);
        assert!(result.is_err(), "600-bit chain at N=8192/128-bit should be rejected");
    }

    #[test]
    fn property_6_chain_monotonicity() {
        let degree = 4096;
        let moduli = make_moduli(degree, &[40, 20, 20, 40]);
        let parms = EncryptParameters::new_ckks(degree, moduli).unwrap();
        let ctx = Context::new(parms, SecurityLevel::None).unwrap();

        assert_eq!(ctx.first_parms_id() == ctx.key_parms_id(), ctx.chain().len() == 1);
        assert_eq!(ctx.using_keyswitching(), ctx.first_parms_id() != ctx.key_parms_id());

        let mut prev_index = usize::MAX;
        let mut prev_count = usize::MAX;
        for cd in ctx.chain() {
            if prev_index != usize::MAX {
                assert!(cd.chain_index() < prev_index);
                assert!(cd.parms().coeff_modulus().len() < prev_count);
            }
            prev_index = cd.chain_index();
            prev_count = cd.parms().coeff_modulus().len();
        }
    }
}
