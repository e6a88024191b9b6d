//! Fixed-point money helpers
//!
//! All monetary arithmetic in the engine runs on [`BigDecimal`]; binary
//! floating point would drift across up to 60 schedule periods.

use bigdecimal::{BigDecimal, RoundingMode};

/// Round a decimal amount to the cent, half-up
pub fn round2(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// One cent, the engine-wide amount comparison tolerance
pub fn cent() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Whether two amounts agree within one cent
pub fn within_cent(a: &BigDecimal, b: &BigDecimal) -> bool {
    (a - b).abs() < cent()
}

/// Integer power of a decimal base, rounded per step to keep digits bounded
///
/// The per-step scale of 24 fractional digits leaves the cumulative error far
/// below a cent over the 60-period maximum tenor.
pub fn pow(base: &BigDecimal, exp: u32) -> BigDecimal {
    let mut acc = BigDecimal::from(1);
    for _ in 0..exp {
        acc = (&acc * base).with_scale_round(24, RoundingMode::HalfUp);
    }
    acc
}
