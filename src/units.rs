//! BCH <-> satoshi conversion. Only used at the outer boundary (CLI, HTTP);
//! fee and sum arithmetic stays in integer satoshis.

pub const SATS_PER_BCH: u64 = 100_000_000;

pub fn sats_to_bch(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BCH as f64
}

/// Rounds to the nearest satoshi. Negative, NaN and out-of-range inputs are rejected.
pub fn bch_to_sats(bch: f64) -> Option<u64> {
    if !bch.is_finite() || bch < 0.0 {
        return None;
    }
    let sats = (bch * SATS_PER_BCH as f64).round();
    if sats > u64::MAX as f64 {
        return None;
    }
    Some(sats as u64)
}

/// Fixed eight-decimal rendering, e.g. `0.00150000`.
pub fn format_bch(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BCH, sats % SATS_PER_BCH)
}
