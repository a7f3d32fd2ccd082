//! Ciphertext container (§4.G).
//!
//! Grounded on `hedge/hedge/ciphertext.c`: a ciphertext is a small vector
//! of same-shaped RNS polynomials (`size` of them — 2 fresh off encryption,
//! growing under relinearization-free multiplication) tagged with the
//! level's `ParmsId`, an NTT-form flag, and a scale.

use crate::params::ParmsId;
use crate::rns_poly::RnsPoly;

/// Ciphertexts never grow past this many polynomial components; encryption
/// produces 2, and this crate's multiply (no relinearization) produces at
/// most 3, so this is a generous upper bound used only to size `reserve`
/// calls ahead of time.
pub const HEDGE_CIPHERTEXT_SIZE_MAX: usize = 16;

#[derive(Debug, Clone)]
pub struct Ciphertext {
    polys: Vec<RnsPoly>,
    parms_id: ParmsId,
    scale: f64,
    is_ntt_form: bool,
}

impl Ciphertext {
    pub fn new() -> Self {
        Ciphertext { polys: Vec::new(), parms_id: ParmsId::ZERO, scale: 1.0, is_ntt_form: false }
    }

    pub fn from_polys(polys: Vec<RnsPoly>, parms_id: ParmsId, scale: f64, is_ntt_form: bool) -> Self {
        debug_assert!(polys.len() <= HEDGE_CIPHERTEXT_SIZE_MAX);
        Ciphertext { polys, parms_id, scale, is_ntt_form }
    }

    pub fn size(&self) -> usize {
        self.polys.len()
    }

    /// Reserves capacity for up to `HEDGE_CIPHERTEXT_SIZE_MAX` polynomial
    /// components without reallocating on every growth step.
    pub fn reserve(&mut self, additional: usize) {
        self.polys.reserve(additional.min(HEDGE_CIPHERTEXT_SIZE_MAX));
    }

    pub fn resize(&mut self, new_size: usize, prime_count: usize, degree: usize) {
        self.polys.resize_with(new_size, || RnsPoly::zero(prime_count, degree));
    }

    pub fn at(&self, poly_index: usize) -> &RnsPoly {
        &self.polys[poly_index]
    }

    pub fn at_mut(&mut self, poly_index: usize) -> &mut RnsPoly {
        &mut self.polys[poly_index]
    }

    pub fn polys(&self) -> &[RnsPoly] {
        &self.polys
    }

    pub fn polys_mut(&mut self) -> &mut [RnsPoly] {
        &mut self.polys
    }

    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }

    pub fn set_parms_id(&mut self, parms_id: ParmsId) {
        self.parms_id = parms_id;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn is_ntt_form(&self) -> bool {
        self.is_ntt_form
    }

    pub fn is_transparent(&self) -> bool {
        self.polys.is_empty() || self.polys.iter().all(|p| p.as_slice().iter().all(|&x| x == 0))
    }
}

impl Default for Ciphertext {
    fn default() -> Self {
        Ciphertext::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ciphertext_is_transparent() {
        let ct = Ciphertext::new();
        assert!(ct.is_transparent());
        assert_eq!(ct.size(), 0);
    }

    #[test]
    fn resize_grows_with_zeroed_polys() {
        let mut ct = Ciphertext::new();
        ct.resize(2, 3, 8);
        assert_eq!(ct.size(), 2);
        assert_eq!(ct.at(0).prime_count(), 3);
        assert_eq!(ct.at(0).degree(), 8);
        assert!(ct.is_transparent());
    }

    #[test]
    fn at_mut_allows_component_writes() {
        let mut ct = Ciphertext::new();
        ct.resize(2, 1, 4);
        ct.at_mut(0).row_mut(0)[0] = 7;
        assert!(!ct.is_transparent());
        assert_eq!(ct.at(0).row(0)[0], 7);
    }
}
