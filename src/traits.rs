//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::*;
use crate::utils::validation;

/// Storage abstraction for the servicing engine
///
/// This trait allows the engine to work with any storage backend (PostgreSQL,
/// MySQL, SQLite, in-memory, etc.) by implementing these methods. The engine
/// assumes no cross-table transactional atomicity from the backend; it
/// achieves consistency through per-group failure isolation. Hard uniqueness
/// of remittance references must ultimately be enforced by the backend's own
/// constraint, since the engine's check-then-insert is advisory.
#[async_trait]
pub trait ServicingStorage: Send + Sync {
    /// Save a loan to storage
    async fn save_loan(&mut self, loan: &Loan) -> ServicingResult<()>;

    /// Get a loan by ID
    async fn get_loan(&self, loan_id: Uuid) -> ServicingResult<Option<Loan>>;

    /// Get the loan disbursed to a beneficiary
    async fn get_loan_by_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> ServicingResult<Option<Loan>>;

    /// List all loans
    async fn list_loans(&self) -> ServicingResult<Vec<Loan>>;

    /// Update a loan
    async fn update_loan(&mut self, loan: &Loan) -> ServicingResult<()>;

    /// Save a beneficiary to storage
    async fn save_beneficiary(&mut self, beneficiary: &Beneficiary) -> ServicingResult<()>;

    /// Get a beneficiary by ID
    async fn get_beneficiary(&self, beneficiary_id: Uuid)
        -> ServicingResult<Option<Beneficiary>>;

    /// List beneficiaries, optionally filtered by batch
    async fn list_beneficiaries(
        &self,
        batch_id: Option<Uuid>,
    ) -> ServicingResult<Vec<Beneficiary>>;

    /// Save a loan batch to storage
    async fn save_loan_batch(&mut self, batch: &LoanBatch) -> ServicingResult<()>;

    /// List all loan batches
    async fn list_loan_batches(&self) -> ServicingResult<Vec<LoanBatch>>;

    /// Save a transaction to storage
    async fn save_transaction(&mut self, transaction: &Transaction) -> ServicingResult<()>;

    /// Get a transaction by ID
    async fn get_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ServicingResult<Option<Transaction>>;

    /// List transactions recorded for a beneficiary
    async fn get_beneficiary_transactions(
        &self,
        beneficiary_id: Uuid,
    ) -> ServicingResult<Vec<Transaction>>;

    /// List all transactions
    async fn list_transactions(&self) -> ServicingResult<Vec<Transaction>>;

    /// Delete transactions by ID list (the reversal path)
    async fn delete_transactions(&mut self, transaction_ids: &[Uuid]) -> ServicingResult<()>;

    /// Save a batch repayment record to storage
    async fn save_batch_repayment(&mut self, repayment: &BatchRepayment) -> ServicingResult<()>;

    /// List batch repayment records, optionally filtered by batch
    async fn list_batch_repayments(
        &self,
        batch_id: Option<Uuid>,
    ) -> ServicingResult<Vec<BatchRepayment>>;

    /// Delete batch repayment records by ID list
    async fn delete_batch_repayments(&mut self, repayment_ids: &[Uuid]) -> ServicingResult<()>;

    /// Whether a remittance reference already exists across transactions and
    /// batch repayments, compared case-insensitively
    async fn remittance_reference_exists(&self, reference: &str) -> ServicingResult<bool>;
}

/// Trait for implementing custom repayment validation rules
pub trait RepaymentValidator: Send + Sync {
    /// Validate a transaction before saving
    fn validate_transaction(&self, transaction: &Transaction) -> ServicingResult<()>;
}

/// Default repayment validator with the engine's basic rules
pub struct DefaultRepaymentValidator;

impl RepaymentValidator for DefaultRepaymentValidator {
    fn validate_transaction(&self, transaction: &Transaction) -> ServicingResult<()> {
        validation::validate_positive_amount(&transaction.amount)?;
        validation::validate_remittance_reference(&transaction.remittance_reference)?;
        validation::validate_month_for(transaction.month_for)?;
        Ok(())
    }
}
