//! Actual/365 amortization with moratorium interest capitalization
//!
//! Interest accrues on the running balance at annual rate / 365 over the
//! actual calendar gap between due dates. Interest accrued during the
//! moratorium is capitalized into the balance before the repayment phase, and
//! the period payment is the annuity payment on that capitalized balance.

use bigdecimal::BigDecimal;

use super::{add_months, commencement_date, monthly_rate};
use crate::types::*;
use crate::utils::money;

/// Interest on `balance` over `days` at `annual_rate` percent, actual/365
fn accrued_interest(balance: &BigDecimal, annual_rate: &BigDecimal, days: i64) -> BigDecimal {
    let daily = annual_rate / BigDecimal::from(36500);
    money::round2(&(balance * daily * BigDecimal::from(days)))
}

/// Annuity payment on a capitalized balance
fn period_payment(balance: &BigDecimal, annual_rate: &BigDecimal, n: u32) -> BigDecimal {
    if *annual_rate == BigDecimal::from(0) {
        return money::round2(&(balance / BigDecimal::from(n)));
    }

    let r = monthly_rate(annual_rate);
    let factor = money::pow(&(BigDecimal::from(1) + &r), n);
    money::round2(&(balance * &r * &factor / (&factor - BigDecimal::from(1))))
}

/// Generate the actual/365 schedule for the given terms
///
/// Rows in due-date order: one `Disbursement` row, one
/// `InterestCapitalization` row per moratorium month, then `tenor_months`
/// `Repayment` rows, the last of which closes the balance to exactly zero.
pub fn generate(terms: &LoanTerms) -> ServicingResult<Vec<ScheduleEntry>> {
    terms.validate()?;

    let mut entries = Vec::with_capacity((1 + terms.moratorium_months + terms.tenor_months) as usize);
    let mut balance = money::round2(&terms.principal);

    entries.push(ScheduleEntry {
        month: 0,
        kind: ScheduleEntryKind::Disbursement,
        due_date: terms.disbursement_date,
        opening_balance: BigDecimal::from(0),
        interest: BigDecimal::from(0),
        principal: balance.clone(),
        payment: BigDecimal::from(0),
        closing_balance: balance.clone(),
    });

    // Moratorium: unpaid interest rolls into the balance each month
    let mut cursor = terms.disbursement_date;
    for offset in 1..=terms.moratorium_months {
        let due_date = add_months(terms.disbursement_date, offset)?;
        let days = (due_date - cursor).num_days();
        let interest = accrued_interest(&balance, &terms.annual_rate, days);
        let closing = &balance + &interest;

        entries.push(ScheduleEntry {
            month: 0,
            kind: ScheduleEntryKind::InterestCapitalization,
            due_date,
            opening_balance: balance.clone(),
            interest,
            principal: BigDecimal::from(0),
            payment: BigDecimal::from(0),
            closing_balance: closing.clone(),
        });

        balance = closing;
        cursor = due_date;
    }

    // Repayment phase on the capitalized balance
    let payment = period_payment(&balance, &terms.annual_rate, terms.tenor_months);
    let commencement = commencement_date(terms)?;
    let mut previous_due = commencement;

    for month in 1..=terms.tenor_months {
        let due_date = add_months(commencement, month)?;
        let days = (due_date - previous_due).num_days();
        let interest = accrued_interest(&balance, &terms.annual_rate, days);

        let (principal, paid, closing) = if month < terms.tenor_months {
            let principal = &payment - &interest;
            let closing = &balance - &principal;
            (principal, payment.clone(), closing)
        } else {
            let principal = balance.clone();
            let paid = &principal + &interest;
            (principal, paid, BigDecimal::from(0))
        };

        entries.push(ScheduleEntry {
            month,
            kind: ScheduleEntryKind::Repayment,
            due_date,
            opening_balance: balance.clone(),
            interest,
            principal,
            payment: paid,
            closing_balance: closing.clone(),
        });

        balance = closing;
        previous_due = due_date;
    }

    Ok(entries)
}
