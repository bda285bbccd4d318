//! 40-bit BCH checksum over GF(2^5).

use bitcoin::bech32::Fe32;

const GENERATORS: [u64; 5] = [
    0x98f2bc8e61,
    0x79b76d99e2,
    0xf33e5fb3c4,
    0xae2eabe2a8,
    0x1e4f43e470,
];

pub const CHECKSUM_LEN: usize = 8;

/// 40-bit polymod over field elements, xored with 1 at the end.
pub fn polymod(values: impl IntoIterator<Item = Fe32>) -> u64 {
    let mut chk: u64 = 1;
    for value in values {
        let top = chk >> 35;
        chk = ((chk & 0x07_ffff_ffff) << 5) ^ u64::from(value.to_u8());
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk ^ 1
}

/// Prefix characters keep their low five bits, then a zero separator.
fn prefix_fes(prefix: &str) -> impl Iterator<Item = Fe32> + '_ {
    prefix
        .bytes()
        .map(|b| Fe32::try_from(b & 0x1f).unwrap_or(Fe32::Q))
        .chain(std::iter::once(Fe32::Q))
}

pub(super) fn create(prefix: &str, payload: &[Fe32]) -> [Fe32; CHECKSUM_LEN] {
    let input = prefix_fes(prefix)
        .chain(payload.iter().copied())
        .chain(std::iter::repeat(Fe32::Q).take(CHECKSUM_LEN));
    let poly = polymod(input);

    let mut out = [Fe32::Q; CHECKSUM_LEN];
    for (i, fe) in out.iter_mut().enumerate() {
        *fe = Fe32::try_from(((poly >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f) as u8).unwrap_or(Fe32::Q);
    }
    out
}

/// True when `fes` (payload followed by checksum) verifies under `prefix`.
pub(super) fn verify(prefix: &str, fes: &[Fe32]) -> bool {
    polymod(prefix_fes(prefix).chain(fes.iter().copied())) == 0
}
