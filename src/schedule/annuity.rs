//! Annuity (equal-installment) amortization

use bigdecimal::BigDecimal;

use super::{add_months, commencement_date, monthly_rate};
use crate::types::*;
use crate::utils::money;

/// Equated monthly installment for the given terms
///
/// EMI = P * r * (1+r)^n / ((1+r)^n - 1) with r the monthly periodic rate,
/// rounded to the cent; a zero-rate loan pays the principal in equal parts.
pub fn monthly_emi(terms: &LoanTerms) -> ServicingResult<BigDecimal> {
    terms.validate()?;

    let n = terms.tenor_months;
    if terms.annual_rate == BigDecimal::from(0) {
        return Ok(money::round2(&(&terms.principal / BigDecimal::from(n))));
    }

    let r = monthly_rate(&terms.annual_rate);
    let factor = money::pow(&(BigDecimal::from(1) + &r), n);
    let numerator = &terms.principal * &r * &factor;
    let denominator = &factor - BigDecimal::from(1);
    Ok(money::round2(&(numerator / denominator)))
}

/// Generate the annuity amortization schedule for the given terms
///
/// Installment m falls due m calendar months after commencement. Every entry
/// but the last pays exactly the EMI; the final entry retires the remaining
/// balance and absorbs rounding residue so its closing balance is exactly
/// zero.
pub fn generate(terms: &LoanTerms) -> ServicingResult<Vec<ScheduleEntry>> {
    let emi = monthly_emi(terms)?;
    let r = monthly_rate(&terms.annual_rate);
    let commencement = commencement_date(terms)?;

    let mut entries = Vec::with_capacity(terms.tenor_months as usize);
    let mut opening = money::round2(&terms.principal);

    for month in 1..=terms.tenor_months {
        let due_date = add_months(commencement, month)?;
        let interest = money::round2(&(&opening * &r));

        let (principal, payment, closing) = if month < terms.tenor_months {
            let principal = &emi - &interest;
            let closing = &opening - &principal;
            (principal, emi.clone(), closing)
        } else {
            // Final installment absorbs rounding residue
            let principal = opening.clone();
            let payment = &principal + &interest;
            (principal, payment, BigDecimal::from(0))
        };

        entries.push(ScheduleEntry {
            month,
            kind: ScheduleEntryKind::Repayment,
            due_date,
            opening_balance: opening.clone(),
            interest,
            principal,
            payment,
            closing_balance: closing.clone(),
        });

        opening = closing;
    }

    Ok(entries)
}
