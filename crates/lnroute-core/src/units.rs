//! Satoshi / millisatoshi conversions.

use crate::error::CoreError;

/// Millisatoshis per satoshi.
pub const MSAT_PER_SAT: u64 = 1_000;

/// Denominator of `fee_rate_milli_msat` (parts per million).
pub const FEE_RATE_DENOMINATOR: u128 = 1_000_000;

/// Convert satoshis to millisatoshis, failing on overflow.
pub fn sat_to_msat(sat: u64) -> Result<u64, CoreError> {
    sat.checked_mul(MSAT_PER_SAT)
        .ok_or_else(|| CoreError::AmountOverflow(format!("{} sat in msat", sat)))
}

/// Truncate millisatoshis to whole satoshis.
pub fn msat_to_sat(msat: u64) -> u64 {
    msat / MSAT_PER_SAT
}
