//! Plaintext container (§4.G).
//!
//! Grounded on `hedge/hedge/plaintext.c`: a plaintext is a flat coefficient
//! buffer tagged with the `ParmsId` of the level it was encoded for and,
//! for CKKS, a scale. `parms_id == ParmsId::ZERO` means "not tied to any
//! context yet" (freshly parsed from a hex string, or default-constructed).

use crate::params::ParmsId;
use crate::rns_poly::RnsPoly;

/// A CKKS plaintext: an RNS polynomial (NTT form once it has been produced
/// by the encoder) plus the scale it was encoded at.
#[derive(Debug, Clone)]
pub struct Plaintext {
    data: RnsPoly,
    parms_id: ParmsId,
    scale: f64,
}

impl Plaintext {
    /// An empty plaintext not yet tied to any context.
    pub fn new() -> Self {
        Plaintext { data: RnsPoly::zero(0, 0), parms_id: ParmsId::ZERO, scale: 1.0 }
    }

    pub fn from_encoded(data: RnsPoly, parms_id: ParmsId, scale: f64) -> Self {
        Plaintext { data, parms_id, scale }
    }

    pub fn data(&self) -> &RnsPoly {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut RnsPoly {
        &mut self.data
    }

    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    /// A plaintext produced by the encoder is always tagged with the
    /// level's `ParmsId` and stored in NTT form; an untagged plaintext
    /// (just parsed, or default-constructed) is not.
    pub fn is_ntt_form(&self) -> bool {
        !self.parms_id.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.data.as_slice().iter().all(|&x| x == 0)
    }

    /// Count of coefficients (within the first RNS row) that are non-zero,
    /// used to report how much of a plaintext's degree is actually in use.
    pub fn significant_coeff_count(&self) -> usize {
        if self.data.prime_count() == 0 {
            return 0;
        }
        let row = self.data.row(0);
        match row.iter().rposition(|&x| x != 0) {
            Some(idx) => idx + 1,
            None => 0,
        }
    }

    /// Parses a plaintext directly from a hex string of coefficients in
    /// `coeffN-1 ... coeff1 coeff0` order (one 64-bit coefficient per 16
    /// hex digits), matching the original's human-readable plaintext
    /// constructor. The result is untagged (`parms_id` stays `ZERO`) until
    /// it passes through the encoder for a specific context.
    pub fn from_hex_string(hex_str: &str) -> Result<Self, String> {
        let trimmed = hex_str.trim();
        if trimmed.is_empty() {
            return Ok(Plaintext::new());
        }
        if trimmed.len() % 16 != 0 {
            return Err(format!("hex string length {} is not a multiple of 16", trimmed.len()));
        }
        let coeff_count = trimmed.len() / 16;
        let mut coeffs = vec![0u64; coeff_count];
        for (i, chunk_index) in (0..coeff_count).enumerate() {
            let start = chunk_index * 16;
            let chunk = &trimmed[start..start + 16];
            let word = u64::from_str_radix(chunk, 16).map_err(|e| format!("invalid hex digit: {e}"))?;
            // input is most-significant coefficient first
            coeffs[coeff_count - 1 - i] = word;
        }
        Ok(Plaintext { data: RnsPoly::from_rows(&[coeffs]), parms_id: ParmsId::ZERO, scale: 1.0 })
    }
}

impl Default for Plaintext {
    fn default() -> Self {
        Plaintext::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_preserves_coefficient_order() {
        let pt = Plaintext::from_hex_string("00000000000000FF0000000000000A01").unwrap();
        // two 16-digit groups: most-significant first in the string
        assert_eq!(pt.data().degree(), 2);
        assert_eq!(pt.data().row(0)[0], 0x0000000000000A01);
        assert_eq!(pt.data().row(0)[1], 0x00000000000000FF);
    }

    #[test]
    fn fresh_plaintext_is_not_ntt_form_and_is_zero() {
        let pt = Plaintext::new();
        assert!(!pt.is_ntt_form());
        assert!(pt.is_zero());
        assert_eq!(pt.significant_coeff_count(), 0);
    }

    #[test]
    fn rejects_malformed_hex_length() {
        assert!(Plaintext::from_hex_string("ABC").is_err());
    }
}
