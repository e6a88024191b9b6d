//! Core types and data structures for the loan servicing system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Disbursed and still repaying
    Active,
    /// Ledger fully covers the expected total
    Completed,
    /// Written off / in recovery
    Defaulted,
}

/// Lifecycle status of a loan batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    Active,
    Closed,
}

/// Contractual terms of a loan, fixed at disbursement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount disbursed
    pub principal: BigDecimal,
    /// Annual interest rate in percent (e.g. 6.0 for 6%)
    pub annual_rate: BigDecimal,
    /// Repayment tenor in months (1-60)
    pub tenor_months: u32,
    /// Grace period between disbursement and the first installment, in months
    pub moratorium_months: u32,
    /// Date the principal was disbursed
    pub disbursement_date: NaiveDate,
}

impl LoanTerms {
    /// Validate the terms before any schedule math runs on them
    pub fn validate(&self) -> ServicingResult<()> {
        if self.principal <= BigDecimal::from(0) {
            return Err(ServicingError::Validation(
                "Principal must be positive".to_string(),
            ));
        }

        if self.annual_rate < BigDecimal::from(0) {
            return Err(ServicingError::Validation(
                "Annual rate cannot be negative".to_string(),
            ));
        }

        if self.tenor_months < 1 || self.tenor_months > 60 {
            return Err(ServicingError::Validation(format!(
                "Tenor must be between 1 and 60 months, got {}",
                self.tenor_months
            )));
        }

        Ok(())
    }
}

/// A serviced loan with its cached ledger aggregates
///
/// `total_paid` and `outstanding_balance` are denormalizations of the
/// transaction ledger. They are recomputed wholesale from the ledger on every
/// mutating write rather than patched incrementally from call sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique identifier for the loan
    pub id: Uuid,
    /// Beneficiary the loan was disbursed to
    pub beneficiary_id: Uuid,
    /// Contractual terms
    pub terms: LoanTerms,
    /// Disbursement date advanced by the moratorium
    pub commencement_date: NaiveDate,
    /// Due date of the final installment
    pub termination_date: NaiveDate,
    /// Equated monthly installment
    pub monthly_emi: BigDecimal,
    /// Cumulative amount received against this loan
    pub total_paid: BigDecimal,
    /// Total expected over the full tenor minus total paid
    pub outstanding_balance: BigDecimal,
    /// Current lifecycle status
    pub status: LoanStatus,
    /// When the loan record was created
    pub created_at: NaiveDateTime,
    /// When the loan record was last updated
    pub updated_at: NaiveDateTime,
}

/// Tag distinguishing amortization schedule row kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleEntryKind {
    /// Principal drawdown at the start of the schedule
    Disbursement,
    /// Accrued moratorium interest rolled into the balance
    InterestCapitalization,
    /// A regular installment
    Repayment,
}

/// One row of an amortization schedule
///
/// Derived from loan terms on demand, never persisted. The schedule is the
/// expected repayment path, independent of actual payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based installment index; 0 for disbursement and capitalization rows
    pub month: u32,
    /// Row kind
    pub kind: ScheduleEntryKind,
    /// Date the row falls due
    pub due_date: NaiveDate,
    /// Balance before this row is applied
    pub opening_balance: BigDecimal,
    /// Interest component
    pub interest: BigDecimal,
    /// Principal component
    pub principal: BigDecimal,
    /// Amount payable for the period (zero for non-repayment rows)
    pub payment: BigDecimal,
    /// Balance after this row is applied
    pub closing_balance: BigDecimal,
}

/// A recorded repayment against a beneficiary's loan
///
/// Immutable once written; removed only through the explicit reversal path,
/// which also recomputes the loan's cached aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: Uuid,
    /// Beneficiary the payment was received for
    pub beneficiary_id: Uuid,
    /// Amount received
    pub amount: BigDecimal,
    /// Remittance reference (RRR) of the payment
    pub remittance_reference: String,
    /// Date the payment was made
    pub date_paid: NaiveDate,
    /// 1-based schedule month this payment satisfies
    pub month_for: u32,
    /// Optional operator notes
    pub notes: Option<String>,
    /// When the record was created
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Create a new transaction record
    pub fn new(
        beneficiary_id: Uuid,
        amount: BigDecimal,
        remittance_reference: String,
        date_paid: NaiveDate,
        month_for: u32,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            beneficiary_id,
            amount,
            remittance_reference,
            date_paid,
            month_for,
            notes,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// A loan beneficiary and the identifying fields bulk uploads match against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Unique identifier for the beneficiary
    pub id: Uuid,
    /// Salutation, as uploaded
    pub title: Option<String>,
    /// Surname
    pub surname: String,
    /// First name
    pub first_name: String,
    /// Other / middle name
    pub other_name: Option<String>,
    /// Batch the beneficiary belongs to
    pub batch_id: Uuid,
    /// National Housing Fund number
    pub nhf_number: Option<String>,
    /// Loan reference number
    pub loan_reference_number: Option<String>,
    /// Staff / employee id
    pub staff_id: Option<String>,
    /// Current monthly EMI, used for group expectations in bulk allocation
    pub monthly_emi: BigDecimal,
}

impl Beneficiary {
    /// Full concatenated name (surname + first + other)
    pub fn full_name(&self) -> String {
        let mut name = format!("{} {}", self.surname, self.first_name);
        if let Some(other) = &self.other_name {
            if !other.trim().is_empty() {
                name.push(' ');
                name.push_str(other);
            }
        }
        name
    }
}

/// A group of loans serviced together (typically one employer or branch)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanBatch {
    /// Unique identifier for the batch
    pub id: Uuid,
    /// Short batch code used on uploads
    pub code: String,
    /// Human-readable batch name
    pub name: String,
    /// State or branch the batch belongs to
    pub state_branch: String,
    /// Current lifecycle status
    pub status: BatchStatus,
}

/// One remittance event against a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRepayment {
    /// Unique identifier for the record
    pub id: Uuid,
    /// Batch the remittance was received for
    pub batch_id: Uuid,
    /// 1-based schedule month the remittance covers
    pub month_for: u32,
    /// Sum of member EMIs at the time of the remittance
    pub expected_amount: BigDecimal,
    /// Amount actually remitted
    pub actual_amount: BigDecimal,
    /// Remittance reference (RRR) shared by the member transactions
    pub remittance_reference: String,
    /// Date the remittance was made
    pub payment_date: NaiveDate,
    /// Notes, including whether pro-rata distribution occurred
    pub notes: Option<String>,
    /// When the record was created
    pub created_at: NaiveDateTime,
}

/// Errors that can occur in the servicing engine
#[derive(Debug, thiserror::Error)]
pub enum ServicingError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Loan not found: {0}")]
    LoanNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Duplicate remittance reference: {0}")]
    DuplicateReference(String),
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),
}

/// Result type for servicing operations
pub type ServicingResult<T> = Result<T, ServicingError>;
