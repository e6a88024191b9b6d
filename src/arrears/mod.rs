//! Arrears and days-past-due classification
//!
//! One classifier, one convention: day-exact counting where the due date
//! itself is day 0 (not yet overdue) and day 1 begins the calendar day after.
//! A schedule month counts as paid when any transaction names it as its
//! month-for, regardless of whether the amount covers the full EMI.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::schedule;
use crate::types::*;
use crate::utils::money;

/// Portfolio-at-risk bucket keyed to days past due of the earliest unpaid
/// installment
///
/// Thresholds are lower bounds: a loan enters `Par30` at 30 days past due and
/// `Par90` (the NPL boundary) at 90.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    /// No installment 30 or more days past due
    Current,
    /// 30-59 days past due
    Par30,
    /// 60-89 days past due
    Par60,
    /// 90-119 days past due
    Par90,
    /// 120-179 days past due
    Par120,
    /// 180 or more days past due
    Par180,
    /// Outstanding balance cleared or loan marked completed
    FullyRepaid,
}

impl RiskClass {
    /// Bucket for a days-past-due figure
    pub fn from_days_overdue(days_overdue: i64) -> Self {
        match days_overdue {
            d if d >= 180 => RiskClass::Par180,
            d if d >= 120 => RiskClass::Par120,
            d if d >= 90 => RiskClass::Par90,
            d if d >= 60 => RiskClass::Par60,
            d if d >= 30 => RiskClass::Par30,
            _ => RiskClass::Current,
        }
    }

    /// Non-performing: 90 or more days past due
    pub fn is_npl(&self) -> bool {
        matches!(self, RiskClass::Par90 | RiskClass::Par120 | RiskClass::Par180)
    }
}

/// Arrears state of one loan at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrearsStatus {
    /// Date the evaluation was run against
    pub as_of_date: NaiveDate,
    /// Whole days since the earliest unpaid installment fell due
    pub days_overdue: i64,
    /// Unpaid installments due strictly before the as-of date
    pub months_in_arrears: u32,
    /// Months in arrears times the monthly EMI
    pub arrears_amount: BigDecimal,
    /// Risk bucket
    pub classification: RiskClass,
}

impl ArrearsStatus {
    fn fully_repaid(as_of_date: NaiveDate) -> Self {
        Self {
            as_of_date,
            days_overdue: 0,
            months_in_arrears: 0,
            arrears_amount: BigDecimal::from(0),
            classification: RiskClass::FullyRepaid,
        }
    }
}

/// Evaluate a loan's arrears state against its payment ledger
///
/// Depends on the annuity schedule's due dates; the loan's own cached
/// aggregates decide only the fully-repaid short circuit.
pub fn evaluate(
    loan: &Loan,
    transactions: &[Transaction],
    as_of_date: NaiveDate,
) -> ServicingResult<ArrearsStatus> {
    if loan.status == LoanStatus::Completed || loan.outstanding_balance <= BigDecimal::from(0) {
        return Ok(ArrearsStatus::fully_repaid(as_of_date));
    }

    let schedule = schedule::annuity::generate(&loan.terms)?;

    let paid_months: HashSet<u32> = transactions
        .iter()
        .filter(|txn| txn.beneficiary_id == loan.beneficiary_id)
        .map(|txn| txn.month_for)
        .collect();

    // Count of installments due on or before the as-of date, capped at tenor
    // by construction of the schedule
    let due_entries: Vec<&ScheduleEntry> = schedule
        .iter()
        .filter(|entry| entry.due_date <= as_of_date)
        .collect();

    let first_unpaid = due_entries
        .iter()
        .find(|entry| !paid_months.contains(&entry.month));

    let days_overdue = match first_unpaid {
        Some(entry) => (as_of_date - entry.due_date).num_days().max(0),
        None => 0,
    };

    let months_in_arrears = due_entries
        .iter()
        .filter(|entry| entry.due_date < as_of_date && !paid_months.contains(&entry.month))
        .count() as u32;

    let arrears_amount =
        money::round2(&(&loan.monthly_emi * BigDecimal::from(months_in_arrears)));

    Ok(ArrearsStatus {
        as_of_date,
        days_overdue,
        months_in_arrears,
        arrears_amount,
        classification: RiskClass::from_days_overdue(days_overdue),
    })
}

/// Per-bucket slice of a portfolio summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BucketSummary {
    /// Loans in the bucket
    pub loan_count: usize,
    /// Outstanding balance held by the bucket
    pub outstanding_balance: BigDecimal,
}

/// Portfolio-at-risk summary across many loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Date the evaluation was run against
    pub as_of_date: NaiveDate,
    /// Loans evaluated
    pub total_loans: usize,
    /// Outstanding balance across all evaluated loans
    pub total_outstanding: BigDecimal,
    /// Per-bucket counts and outstanding value
    pub buckets: HashMap<RiskClass, BucketSummary>,
    /// Outstanding balance of loans 30 or more days past due
    pub par30_balance: BigDecimal,
    /// Outstanding balance of non-performing loans (90 or more days past due)
    pub npl_balance: BigDecimal,
}

impl PortfolioSummary {
    /// PAR 30 share of total outstanding, zero for an empty portfolio
    pub fn par30_ratio(&self) -> BigDecimal {
        ratio(&self.par30_balance, &self.total_outstanding)
    }

    /// NPL share of total outstanding, zero for an empty portfolio
    pub fn npl_ratio(&self) -> BigDecimal {
        ratio(&self.npl_balance, &self.total_outstanding)
    }
}

fn ratio(part: &BigDecimal, whole: &BigDecimal) -> BigDecimal {
    if *whole <= BigDecimal::from(0) {
        return BigDecimal::from(0);
    }
    (part / whole).with_scale_round(4, bigdecimal::RoundingMode::HalfUp)
}

/// Aggregate per-loan classifications into a portfolio summary
pub fn portfolio_summary(
    loans: &[(Loan, Vec<Transaction>)],
    as_of_date: NaiveDate,
) -> ServicingResult<PortfolioSummary> {
    let mut buckets: HashMap<RiskClass, BucketSummary> = HashMap::new();
    let mut total_outstanding = BigDecimal::from(0);
    let mut par30_balance = BigDecimal::from(0);
    let mut npl_balance = BigDecimal::from(0);

    for (loan, transactions) in loans {
        let status = evaluate(loan, transactions, as_of_date)?;
        total_outstanding += &loan.outstanding_balance;

        let bucket = buckets.entry(status.classification).or_default();
        bucket.loan_count += 1;
        bucket.outstanding_balance += &loan.outstanding_balance;

        if status.days_overdue >= 30 && status.classification != RiskClass::FullyRepaid {
            par30_balance += &loan.outstanding_balance;
        }
        if status.classification.is_npl() {
            npl_balance += &loan.outstanding_balance;
        }
    }

    Ok(PortfolioSummary {
        as_of_date,
        total_loans: loans.len(),
        total_outstanding,
        buckets,
        par30_balance,
        npl_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::annuity;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_loan() -> Loan {
        let terms = LoanTerms {
            principal: dec("1200000"),
            annual_rate: dec("6"),
            tenor_months: 24,
            moratorium_months: 0,
            disbursement_date: date(2024, 1, 15),
        };
        let emi = annuity::monthly_emi(&terms).unwrap();
        let expected = crate::schedule::total_expected(&terms).unwrap();
        let now = chrono::Utc::now().naive_utc();

        Loan {
            id: Uuid::new_v4(),
            beneficiary_id: Uuid::new_v4(),
            commencement_date: date(2024, 1, 15),
            termination_date: date(2026, 1, 15),
            monthly_emi: emi,
            total_paid: BigDecimal::from(0),
            outstanding_balance: expected,
            status: LoanStatus::Active,
            created_at: now,
            updated_at: now,
            terms,
        }
    }

    fn payment(loan: &Loan, month_for: u32) -> Transaction {
        Transaction::new(
            loan.beneficiary_id,
            loan.monthly_emi.clone(),
            format!("RRR-{}", month_for),
            date(2024, 2, 15),
            month_for,
            None,
        )
    }

    #[test]
    fn test_current_before_first_due_date() {
        let loan = test_loan();
        // First installment due 2024-02-15
        let status = evaluate(&loan, &[], date(2024, 2, 1)).unwrap();
        assert_eq!(status.days_overdue, 0);
        assert_eq!(status.months_in_arrears, 0);
        assert_eq!(status.classification, RiskClass::Current);
    }

    #[test]
    fn test_due_date_is_day_zero() {
        let loan = test_loan();
        let status = evaluate(&loan, &[], date(2024, 2, 15)).unwrap();
        assert_eq!(status.days_overdue, 0);
        // Due exactly today counts as overdue but not yet in arrears
        assert_eq!(status.months_in_arrears, 0);

        let status = evaluate(&loan, &[], date(2024, 2, 16)).unwrap();
        assert_eq!(status.days_overdue, 1);
        assert_eq!(status.months_in_arrears, 1);
    }

    #[test]
    fn test_days_overdue_non_decreasing() {
        let loan = test_loan();
        let ledger = vec![payment(&loan, 1)];

        let mut previous = 0;
        for offset in 0..200u64 {
            let as_of = date(2024, 2, 1) + chrono::Duration::days(offset as i64);
            let status = evaluate(&loan, &ledger, as_of).unwrap();
            assert!(status.days_overdue >= previous);
            previous = status.days_overdue;
        }
    }

    #[test]
    fn test_payment_against_earliest_unpaid_month_resets_clock() {
        let loan = test_loan();
        let as_of = date(2024, 4, 1);

        // Months 1 and 2 due (Feb 15, Mar 15), nothing paid
        let status = evaluate(&loan, &[], as_of).unwrap();
        assert_eq!(status.days_overdue, 46);
        assert_eq!(status.months_in_arrears, 2);

        // Paying month 1 moves the clock to month 2's due date
        let status = evaluate(&loan, &[payment(&loan, 1)], as_of).unwrap();
        assert_eq!(status.days_overdue, 17);
        assert_eq!(status.months_in_arrears, 1);
    }

    #[test]
    fn test_partial_amount_still_counts_month_as_paid() {
        let loan = test_loan();
        let mut partial = payment(&loan, 1);
        partial.amount = dec("10.00");

        let status = evaluate(&loan, &[partial], date(2024, 3, 1)).unwrap();
        assert_eq!(status.days_overdue, 0);
        assert_eq!(status.classification, RiskClass::Current);
    }

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(RiskClass::from_days_overdue(0), RiskClass::Current);
        assert_eq!(RiskClass::from_days_overdue(29), RiskClass::Current);
        assert_eq!(RiskClass::from_days_overdue(30), RiskClass::Par30);
        assert_eq!(RiskClass::from_days_overdue(59), RiskClass::Par30);
        assert_eq!(RiskClass::from_days_overdue(60), RiskClass::Par60);
        assert_eq!(RiskClass::from_days_overdue(90), RiskClass::Par90);
        assert_eq!(RiskClass::from_days_overdue(120), RiskClass::Par120);
        assert_eq!(RiskClass::from_days_overdue(180), RiskClass::Par180);
        assert_eq!(RiskClass::from_days_overdue(400), RiskClass::Par180);

        assert!(!RiskClass::Par60.is_npl());
        assert!(RiskClass::Par90.is_npl());
        assert!(RiskClass::Par180.is_npl());
    }

    #[test]
    fn test_arrears_amount_is_months_times_emi() {
        let loan = test_loan();
        let status = evaluate(&loan, &[], date(2024, 5, 1)).unwrap();
        assert_eq!(status.months_in_arrears, 3);
        assert_eq!(
            status.arrears_amount,
            money::round2(&(&loan.monthly_emi * BigDecimal::from(3)))
        );
    }

    #[test]
    fn test_completed_loan_is_fully_repaid_regardless_of_ledger() {
        let mut loan = test_loan();
        loan.status = LoanStatus::Completed;

        let status = evaluate(&loan, &[], date(2025, 1, 1)).unwrap();
        assert_eq!(status.classification, RiskClass::FullyRepaid);
        assert_eq!(status.days_overdue, 0);

        let mut loan = test_loan();
        loan.outstanding_balance = BigDecimal::from(0);
        let status = evaluate(&loan, &[], date(2025, 1, 1)).unwrap();
        assert_eq!(status.classification, RiskClass::FullyRepaid);
    }

    #[test]
    fn test_portfolio_summary_buckets() {
        let current = test_loan();
        let mut repaid = test_loan();
        repaid.status = LoanStatus::Completed;

        let loans = vec![
            (current.clone(), vec![payment(&current, 1), payment(&current, 2)]),
            (repaid, vec![]),
        ];

        let summary = portfolio_summary(&loans, date(2024, 4, 1)).unwrap();
        assert_eq!(summary.total_loans, 2);
        assert_eq!(summary.buckets[&RiskClass::Current].loan_count, 1);
        assert_eq!(summary.buckets[&RiskClass::FullyRepaid].loan_count, 1);
        assert_eq!(summary.npl_balance, BigDecimal::from(0));
        assert_eq!(summary.npl_ratio(), BigDecimal::from(0));
    }

    #[test]
    fn test_portfolio_ratios() {
        let mut delinquent = test_loan();
        delinquent.terms.disbursement_date = date(2023, 6, 15);
        delinquent.commencement_date = date(2023, 6, 15);
        let healthy = test_loan();

        let loans = vec![
            (delinquent.clone(), vec![]),
            (healthy.clone(), vec![payment(&healthy, 1)]),
        ];

        // Delinquent loan's first installment fell due 2023-07-15
        let summary = portfolio_summary(&loans, date(2024, 2, 1)).unwrap();
        assert_eq!(summary.npl_balance, delinquent.outstanding_balance);

        let expected = (&delinquent.outstanding_balance
            / (&delinquent.outstanding_balance + &healthy.outstanding_balance))
            .with_scale_round(4, bigdecimal::RoundingMode::HalfUp);
        assert_eq!(summary.npl_ratio(), expected);
        assert_eq!(summary.par30_ratio(), expected);
    }
}
