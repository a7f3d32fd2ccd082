//! Security-level lookup table from the HomomorphicEncryption.org standard.
//!
//! A context whose total coefficient-modulus bit count exceeds the budget
//! for `(N, level)` is rejected during construction (§4.F step 3, §4.C).

/// Target classical/quantum security level for a modulus chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    None,
    Tc128,
    Tc192,
    Tc256,
}

/// Maximum total coefficient-modulus bit count for `(degree, level)`,
/// drawn from the HomomorphicEncryption.org security standard tables.
/// `SecurityLevel::None` imposes no budget.
pub fn max_total_coeff_modulus_bits(degree: u64, level: SecurityLevel) -> Option<u32> {
    if level == SecurityLevel::None {
        return None;
    }
    // (N, 128-bit, 192-bit, 256-bit) rows from the standard's table 1.
    const TABLE: &[(u64, u32, u32, u32)] = &[
        (1024, 27, 19, 14),
        (2048, 54, 37, 29),
        (4096, 109, 75, 58),
        (8192, 218, 152, 118),
        (16384, 438, 305, 237),
        (32768, 881, 611, 476),
    ];
    for &(n, tc128, tc192, tc256) in TABLE {
        if n == degree {
            return Some(match level {
                SecurityLevel::Tc128 => tc128,
                SecurityLevel::Tc192 => tc192,
                SecurityLevel::Tc256 => tc256,
                SecurityLevel::None => unreachable!(),
            });
        }
    }
    None
}
