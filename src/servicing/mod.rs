//! Loan servicing facade that coordinates the engines over one storage
//! backend

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arrears::{self, ArrearsStatus, PortfolioSummary};
use crate::reconciliation::{self, ColumnBinding, ReconciliationReport};
use crate::repayment::allocator::{self, CommitOutcome};
use crate::repayment::matcher::{self, UploadSnapshot};
use crate::repayment::upload::{self, UploadColumns};
use crate::schedule;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Report for one bulk upload submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReport {
    /// Commit result for the rows that matched
    pub outcome: CommitOutcome,
    /// Rows excluded from commit, with every error collected for operator
    /// review
    pub rejected_rows: Vec<RejectedRow>,
}

/// A row excluded from commit and retained for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based data row index
    pub row_index: usize,
    /// All validation and match errors found on the row
    pub errors: Vec<String>,
}

/// Main servicing system orchestrating schedules, arrears, uploads, and
/// reconciliation over a storage backend
pub struct LoanServicing<S: ServicingStorage> {
    storage: S,
    validator: Box<dyn RepaymentValidator>,
}

impl<S: ServicingStorage> LoanServicing<S> {
    /// Create a new servicing system with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultRepaymentValidator),
        }
    }

    /// Create a new servicing system with a custom repayment validator
    pub fn with_validator(storage: S, validator: Box<dyn RepaymentValidator>) -> Self {
        Self { storage, validator }
    }

    /// Borrow the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably borrow the underlying storage, for seeding reference data
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // Loan lifecycle

    /// Disburse a loan: validate terms, derive the schedule figures, persist
    pub async fn disburse_loan(
        &mut self,
        beneficiary_id: Uuid,
        terms: LoanTerms,
    ) -> ServicingResult<Loan> {
        terms.validate()?;

        if self.storage.get_beneficiary(beneficiary_id).await?.is_none() {
            return Err(ServicingError::Validation(format!(
                "Beneficiary '{}' does not exist",
                beneficiary_id
            )));
        }

        let monthly_emi = schedule::annuity::monthly_emi(&terms)?;
        let commencement_date = schedule::commencement_date(&terms)?;
        let termination_date = schedule::add_months(commencement_date, terms.tenor_months)?;
        let outstanding_balance = schedule::total_expected(&terms)?;
        let now = chrono::Utc::now().naive_utc();

        let loan = Loan {
            id: Uuid::new_v4(),
            beneficiary_id,
            terms,
            commencement_date,
            termination_date,
            monthly_emi,
            total_paid: BigDecimal::from(0),
            outstanding_balance,
            status: LoanStatus::Active,
            created_at: now,
            updated_at: now,
        };

        self.storage.save_loan(&loan).await?;
        Ok(loan)
    }

    /// Get a loan by ID, returning an error if not found
    pub async fn get_loan_required(&self, loan_id: Uuid) -> ServicingResult<Loan> {
        self.storage
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| ServicingError::LoanNotFound(loan_id.to_string()))
    }

    /// Amortization schedule for a loan (annuity variant)
    pub async fn loan_schedule(&self, loan_id: Uuid) -> ServicingResult<Vec<ScheduleEntry>> {
        let loan = self.get_loan_required(loan_id).await?;
        schedule::annuity::generate(&loan.terms)
    }

    /// Mark a loan defaulted
    pub async fn mark_defaulted(&mut self, loan_id: Uuid) -> ServicingResult<Loan> {
        let mut loan = self.get_loan_required(loan_id).await?;
        loan.status = LoanStatus::Defaulted;
        loan.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_loan(&loan).await?;
        Ok(loan)
    }

    // Repayments

    /// Record a manually entered repayment
    ///
    /// The duplicate-reference guard runs before the write; the loan's cached
    /// aggregates are recomputed from the ledger afterwards.
    pub async fn record_repayment(
        &mut self,
        loan_id: Uuid,
        amount: BigDecimal,
        remittance_reference: String,
        date_paid: NaiveDate,
        month_for: u32,
        notes: Option<String>,
    ) -> ServicingResult<Transaction> {
        let loan = self.get_loan_required(loan_id).await?;

        let transaction = Transaction::new(
            loan.beneficiary_id,
            amount,
            remittance_reference,
            date_paid,
            month_for,
            notes,
        );
        self.validator.validate_transaction(&transaction)?;

        if self
            .storage
            .remittance_reference_exists(&transaction.remittance_reference)
            .await?
        {
            return Err(ServicingError::DuplicateReference(
                transaction.remittance_reference.clone(),
            ));
        }

        self.storage.save_transaction(&transaction).await?;
        self.recompute_aggregates(loan.id).await?;
        Ok(transaction)
    }

    /// Reverse a repayment: the only path that removes a transaction
    pub async fn reverse_repayment(&mut self, transaction_id: Uuid) -> ServicingResult<()> {
        let transaction = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| ServicingError::TransactionNotFound(transaction_id.to_string()))?;

        self.storage.delete_transactions(&[transaction.id]).await?;

        if let Some(loan) = self
            .storage
            .get_loan_by_beneficiary(transaction.beneficiary_id)
            .await?
        {
            self.recompute_aggregates(loan.id).await?;
        }
        Ok(())
    }

    /// Recompute a loan's cached aggregates wholesale from the ledger
    ///
    /// outstanding = total expected over the tenor - total paid; the status
    /// flips to Completed once the ledger covers the expected total.
    pub async fn recompute_aggregates(&mut self, loan_id: Uuid) -> ServicingResult<Loan> {
        let mut loan = self.get_loan_required(loan_id).await?;

        let transactions = self
            .storage
            .get_beneficiary_transactions(loan.beneficiary_id)
            .await?;
        let mut total_paid = BigDecimal::from(0);
        for transaction in &transactions {
            total_paid += &transaction.amount;
        }

        let expected_total = schedule::total_expected(&loan.terms)?;
        let outstanding = money::round2(&(&expected_total - &total_paid));

        loan.total_paid = money::round2(&total_paid);
        loan.outstanding_balance = if outstanding > BigDecimal::from(0) {
            outstanding.clone()
        } else {
            BigDecimal::from(0)
        };
        if outstanding <= BigDecimal::from(0) {
            loan.status = LoanStatus::Completed;
        } else if loan.status == LoanStatus::Completed {
            // A reversal can re-open a loan that looked finished
            loan.status = LoanStatus::Active;
        }
        loan.updated_at = chrono::Utc::now().naive_utc();

        self.storage.update_loan(&loan).await?;
        Ok(loan)
    }

    // Arrears

    /// Evaluate a loan's arrears state as of a date
    pub async fn evaluate_arrears(
        &self,
        loan_id: Uuid,
        as_of_date: NaiveDate,
    ) -> ServicingResult<ArrearsStatus> {
        let loan = self.get_loan_required(loan_id).await?;
        let transactions = self
            .storage
            .get_beneficiary_transactions(loan.beneficiary_id)
            .await?;
        arrears::evaluate(&loan, &transactions, as_of_date)
    }

    /// Portfolio-at-risk summary across every loan in storage
    pub async fn portfolio_summary(
        &self,
        as_of_date: NaiveDate,
    ) -> ServicingResult<PortfolioSummary> {
        let loans = self.storage.list_loans().await?;
        let mut entries = Vec::with_capacity(loans.len());
        for loan in loans {
            let transactions = self
                .storage
                .get_beneficiary_transactions(loan.beneficiary_id)
                .await?;
            entries.push((loan, transactions));
        }
        arrears::portfolio_summary(&entries, as_of_date)
    }

    // Bulk upload

    /// Process one uploaded repayment file as a single awaitable operation
    ///
    /// Binds headers, extracts rows, builds the per-submission snapshot,
    /// matches every row independently, and commits the matched rows group by
    /// group. Rows that fail validation or matching are reported, never
    /// fatal. Loans touched by committed transactions get their aggregates
    /// recomputed.
    pub async fn process_upload(
        &mut self,
        headers: &[String],
        rows: &[Vec<String>],
        default_batch: Option<&str>,
    ) -> ServicingResult<UploadReport> {
        let columns = UploadColumns::bind(headers)?;
        let raw_rows = upload::extract_rows(&columns, rows, default_batch);

        let batches = self.storage.list_loan_batches().await?;
        let beneficiaries = self.storage.list_beneficiaries(None).await?;
        let snapshot = UploadSnapshot::new(batches, beneficiaries);

        let mut matched = Vec::new();
        let mut rejected_rows = Vec::new();
        for raw in &raw_rows {
            match matcher::match_row(raw, &snapshot) {
                Ok(row) => matched.push(row),
                Err(errors) => rejected_rows.push(RejectedRow {
                    row_index: raw.row_index,
                    errors,
                }),
            }
        }

        let touched: Vec<Uuid> = matched.iter().map(|row| row.beneficiary_id).collect();
        let outcome = allocator::commit(matched, &snapshot, &mut self.storage).await?;

        for beneficiary_id in touched {
            if let Some(loan) = self.storage.get_loan_by_beneficiary(beneficiary_id).await? {
                self.recompute_aggregates(loan.id).await?;
            }
        }

        Ok(UploadReport {
            outcome,
            rejected_rows,
        })
    }

    // Reconciliation

    /// Reconcile an external statement against both ledgers
    ///
    /// The binding is auto-detected from the header row unless an operator
    /// override is supplied.
    pub async fn reconcile_statement(
        &self,
        headers: &[String],
        rows: &[Vec<String>],
        override_binding: Option<ColumnBinding>,
    ) -> ServicingResult<ReconciliationReport> {
        let binding = match override_binding {
            Some(binding) => binding,
            None => ColumnBinding::detect(headers)?,
        };

        let individual = self.storage.list_transactions().await?;
        let batch = self.storage.list_batch_repayments(None).await?;
        reconciliation::reconcile(rows, &binding, &individual, &batch)
    }
}
