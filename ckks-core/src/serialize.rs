//! Byte-stream save/load (§6).
//!
//! Grounded on `hedge/hedge/plaintext.c`/`ciphertext.c`'s `save`/`load`
//! field order, little-endian tightly-packed layout. §6 flags that the
//! original omits a format version or magic number; this crate adds both
//! ahead of the field layout, as the spec requires for safe interchange.

use crate::ciphertext::Ciphertext;
use crate::error::{CkksError, Result};
use crate::keygen::{PublicKey, SecretKey};
use crate::params::ParmsId;
use crate::plaintext::Plaintext;
use crate::rns_poly::RnsPoly;

const MAGIC: &[u8; 4] = b"CKKS";
const FORMAT_VERSION: u16 = 1;

fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
}

fn read_header(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < 6 {
        return Err(CkksError::InvalidArgument("stream too short for a header".into()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(CkksError::InvalidArgument("bad magic number".into()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(CkksError::InvalidArgument(format!("unsupported format version {version}")));
    }
    Ok(6)
}

fn write_parms_id(out: &mut Vec<u8>, id: ParmsId) {
    for word in id.0 {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

fn read_parms_id(bytes: &[u8], offset: &mut usize) -> Result<ParmsId> {
    if bytes.len() < *offset + 32 {
        return Err(CkksError::InvalidArgument("truncated parms_id".into()));
    }
    let mut words = [0u64; 4];
    for word in words.iter_mut() {
        *word = u64::from_le_bytes(bytes[*offset..*offset + 8].try_into().unwrap());
        *offset += 8;
    }
    Ok(ParmsId(words))
}

pub fn save_plaintext(plain: &Plaintext) -> Vec<u8> {
    let mut out = Vec::new();
    write_header(&mut out);
    write_parms_id(&mut out, plain.parms_id());
    out.extend_from_slice(&plain.scale().to_le_bytes());
    let coeffs = plain.data().as_slice();
    out.extend_from_slice(&(coeffs.len() as u64).to_le_bytes());
    for &c in coeffs {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

pub fn load_plaintext(bytes: &[u8], prime_count: usize) -> Result<Plaintext> {
    let mut offset = read_header(bytes)?;
    let parms_id = read_parms_id(bytes, &mut offset)?;
    if bytes.len() < offset + 16 {
        return Err(CkksError::InvalidArgument("truncated plaintext header".into()));
    }
    let scale = f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
    offset += 8;
    let coeff_count = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    offset += 8;
    if bytes.len() < offset + coeff_count * 8 {
        return Err(CkksError::InvalidArgument("truncated plaintext coefficients".into()));
    }
    let mut flat = Vec::with_capacity(coeff_count);
    for _ in 0..coeff_count {
        flat.push(u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()));
        offset += 8;
    }
    if prime_count == 0 || coeff_count % prime_count != 0 {
        return Err(CkksError::InvalidArgument("coefficient count does not divide evenly by prime count".into()));
    }
    let degree = coeff_count / prime_count;
    let rows: Vec<Vec<u64>> = flat.chunks(degree).map(|c| c.to_vec()).collect();
    Ok(Plaintext::from_encoded(RnsPoly::from_rows(&rows), parms_id, scale))
}

pub fn save_ciphertext(ct: &Ciphertext) -> Vec<u8> {
    let mut out = Vec::new();
    write_header(&mut out);
    write_parms_id(&mut out, ct.parms_id());
    out.push(ct.is_ntt_form() as u8);
    out.extend_from_slice(&(ct.size() as u64).to_le_bytes());
    let degree = ct.polys().first().map(|p| p.degree()).unwrap_or(0);
    let prime_count = ct.polys().first().map(|p| p.prime_count()).unwrap_or(0);
    out.extend_from_slice(&(degree as u64).to_le_bytes());
    out.extend_from_slice(&(prime_count as u64).to_le_bytes());
    out.extend_from_slice(&ct.scale().to_le_bytes());
    let data_count: usize = ct.polys().iter().map(|p| p.as_slice().len()).sum();
    out.extend_from_slice(&(data_count as u64).to_le_bytes());
    for poly in ct.polys() {
        for &c in poly.as_slice() {
            out.extend_from_slice(&c.to_le_bytes());
        }
    }
    out
}

pub fn load_ciphertext(bytes: &[u8]) -> Result<Ciphertext> {
    let mut offset = read_header(bytes)?;
    let parms_id = read_parms_id(bytes, &mut offset)?;
    if bytes.len() < offset + 1 + 8 * 5 {
        return Err(CkksError::InvalidArgument("truncated ciphertext header".into()));
    }
    let is_ntt = bytes[offset] != 0;
    offset += 1;
    let size = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    offset += 8;
    let degree = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    offset += 8;
    let prime_count = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    offset += 8;
    let scale = f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
    offset += 8;
    let data_count = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
    offset += 8;
    if data_count != size * prime_count * degree {
        return Err(CkksError::InvalidArgument("data_count inconsistent with size/N/L".into()));
    }
    if bytes.len() < offset + data_count * 8 {
        return Err(CkksError::InvalidArgument("truncated ciphertext data".into()));
    }
    let mut polys = Vec::with_capacity(size);
    for _ in 0..size {
        let mut rows = Vec::with_capacity(prime_count);
        for _ in 0..prime_count {
            let mut row = Vec::with_capacity(degree);
            for _ in 0..degree {
                row.push(u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()));
                offset += 8;
            }
            rows.push(row);
        }
        polys.push(RnsPoly::from_rows(&rows));
    }
    Ok(Ciphertext::from_polys(polys, parms_id, scale, is_ntt))
}

/// Saves a public key as the save of its underlying two-polynomial
/// ciphertext, per §6.
pub fn save_public_key(pk: &PublicKey) -> Vec<u8> {
    let ct = Ciphertext::from_polys(vec![pk.c0().clone(), pk.c1().clone()], pk.parms_id(), 1.0, true);
    save_ciphertext(&ct)
}

pub fn load_public_key(bytes: &[u8]) -> Result<(RnsPoly, RnsPoly, ParmsId)> {
    let ct = load_ciphertext(bytes)?;
    if ct.size() != 2 {
        return Err(CkksError::InvalidArgument("a public key must decode to exactly two polynomials".into()));
    }
    Ok((ct.at(0).clone(), ct.at(1).clone(), ct.parms_id()))
}

/// Saves a secret key as the save of its underlying plaintext, per §6.
pub fn save_secret_key(sk: &SecretKey) -> Vec<u8> {
    let pt = Plaintext::from_encoded(sk.data().clone(), sk.parms_id(), 1.0);
    save_plaintext(&pt)
}

/// Loads a secret key saved by `save_secret_key`.
pub fn load_secret_key(bytes: &[u8], prime_count: usize) -> Result<SecretKey> {
    let pt = load_plaintext(bytes, prime_count)?;
    Ok(SecretKey::from_data(pt.data().clone(), pt.parms_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::Modulus;
    use crate::primes::get_primes;

    #[test]
    fn plaintext_round_trips() {
        let moduli: Vec<Modulus> = get_primes(8, 30, 2).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect();
        let rows: Vec<Vec<u64>> = moduli.iter().map(|m| (0..8).map(|i| i as u64 % m.value()).collect()).collect();
        let pt = Plaintext::from_encoded(RnsPoly::from_rows(&rows), ParmsId([1, 2, 3, 4]), 1024.0);
        let bytes = save_plaintext(&pt);
        let loaded = load_plaintext(&bytes, moduli.len()).unwrap();
        assert_eq!(loaded.parms_id(), pt.parms_id());
        assert_eq!(loaded.scale(), pt.scale());
        assert_eq!(loaded.data().as_slice(), pt.data().as_slice());
    }

    #[test]
    fn ciphertext_round_trips() {
        let moduli: Vec<Modulus> = get_primes(8, 30, 2).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect();
        let rows: Vec<Vec<u64>> = moduli.iter().map(|m| (0..8).map(|i| i as u64 % m.value()).collect()).collect();
        let poly = RnsPoly::from_rows(&rows);
        let ct = Ciphertext::from_polys(vec![poly.clone(), poly], ParmsId([5, 6, 7, 8]), 2048.0, true);
        let bytes = save_ciphertext(&ct);
        let loaded = load_ciphertext(&bytes).unwrap();
        assert_eq!(loaded.parms_id(), ct.parms_id());
        assert_eq!(loaded.size(), ct.size());
        assert_eq!(loaded.at(0).as_slice(), ct.at(0).as_slice());
    }

    #[test]
    fn secret_key_round_trips() {
        let moduli: Vec<Modulus> = get_primes(8, 30, 2).unwrap().into_iter().map(|p| Modulus::new(p).unwrap()).collect();
        let rows: Vec<Vec<u64>> = moduli.iter().map(|m| (0..8).map(|i| i as u64 % m.value()).collect()).collect();
        let sk = SecretKey::from_data(RnsPoly::from_rows(&rows), ParmsId([9, 10, 11, 12]));
        let bytes = save_secret_key(&sk);
        let loaded = load_secret_key(&bytes, moduli.len()).unwrap();
        assert_eq!(loaded.parms_id(), sk.parms_id());
        assert_eq!(loaded.data().as_slice(), sk.data().as_slice());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 40];
        assert!(load_ciphertext(&bytes).is_err());
    }
}
