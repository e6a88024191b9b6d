//! Amortization schedule generation
//!
//! Two variants share the calendar and money conventions defined here: the
//! annuity schedule ([`annuity`]) and the actual/365 schedule with moratorium
//! interest capitalization ([`actual365`]). Both are pure projections of loan
//! terms; identical inputs always produce an identical schedule.

pub mod actual365;
pub mod annuity;

use bigdecimal::BigDecimal;
use chrono::{Months, NaiveDate};

use crate::types::*;
use crate::utils::money;

/// Monthly periodic rate: annual percentage / 12 / 100
pub(crate) fn monthly_rate(annual_rate: &BigDecimal) -> BigDecimal {
    annual_rate / BigDecimal::from(1200)
}

/// Calendar-month addition with day-of-month clamping
///
/// Jan 31 + 1 month lands on Feb 29 in a leap year, not on a fixed 30-day
/// offset.
pub fn add_months(date: NaiveDate, months: u32) -> ServicingResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| {
            ServicingError::Validation(format!(
                "Date {} + {} months is out of range",
                date, months
            ))
        })
}

/// First installment due date: one period after commencement
pub fn commencement_date(terms: &LoanTerms) -> ServicingResult<NaiveDate> {
    add_months(terms.disbursement_date, terms.moratorium_months)
}

/// Total amount expected over the full tenor, summed from the schedule
///
/// This is the single source the outstanding-balance invariant is computed
/// against: outstanding = expected total - total paid.
pub fn total_expected(terms: &LoanTerms) -> ServicingResult<BigDecimal> {
    let schedule = annuity::generate(terms)?;
    let mut total = BigDecimal::from(0);
    for entry in &schedule {
        total += &entry.payment;
    }
    Ok(money::round2(&total))
}
