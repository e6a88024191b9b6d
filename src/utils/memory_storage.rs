//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    loans: Arc<RwLock<HashMap<Uuid, Loan>>>,
    beneficiaries: Arc<RwLock<HashMap<Uuid, Beneficiary>>>,
    batches: Arc<RwLock<HashMap<Uuid, LoanBatch>>>,
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
    batch_repayments: Arc<RwLock<HashMap<Uuid, BatchRepayment>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.loans.write().unwrap().clear();
        self.beneficiaries.write().unwrap().clear();
        self.batches.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
        self.batch_repayments.write().unwrap().clear();
    }
}

#[async_trait]
impl ServicingStorage for MemoryStorage {
    async fn save_loan(&mut self, loan: &Loan) -> ServicingResult<()> {
        self.loans.write().unwrap().insert(loan.id, loan.clone());
        Ok(())
    }

    async fn get_loan(&self, loan_id: Uuid) -> ServicingResult<Option<Loan>> {
        Ok(self.loans.read().unwrap().get(&loan_id).cloned())
    }

    async fn get_loan_by_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> ServicingResult<Option<Loan>> {
        Ok(self
            .loans
            .read()
            .unwrap()
            .values()
            .find(|loan| loan.beneficiary_id == beneficiary_id)
            .cloned())
    }

    async fn list_loans(&self) -> ServicingResult<Vec<Loan>> {
        Ok(self.loans.read().unwrap().values().cloned().collect())
    }

    async fn update_loan(&mut self, loan: &Loan) -> ServicingResult<()> {
        if self.loans.read().unwrap().contains_key(&loan.id) {
            self.loans.write().unwrap().insert(loan.id, loan.clone());
            Ok(())
        } else {
            Err(ServicingError::LoanNotFound(loan.id.to_string()))
        }
    }

    async fn save_beneficiary(&mut self, beneficiary: &Beneficiary) -> ServicingResult<()> {
        self.beneficiaries
            .write()
            .unwrap()
            .insert(beneficiary.id, beneficiary.clone());
        Ok(())
    }

    async fn get_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> ServicingResult<Option<Beneficiary>> {
        Ok(self
            .beneficiaries
            .read()
            .unwrap()
            .get(&beneficiary_id)
            .cloned())
    }

    async fn list_beneficiaries(
        &self,
        batch_id: Option<Uuid>,
    ) -> ServicingResult<Vec<Beneficiary>> {
        let beneficiaries = self.beneficiaries.read().unwrap();
        let filtered: Vec<Beneficiary> = beneficiaries
            .values()
            .filter(|b| batch_id.is_none_or(|id| b.batch_id == id))
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn save_loan_batch(&mut self, batch: &LoanBatch) -> ServicingResult<()> {
        self.batches.write().unwrap().insert(batch.id, batch.clone());
        Ok(())
    }

    async fn list_loan_batches(&self) -> ServicingResult<Vec<LoanBatch>> {
        Ok(self.batches.read().unwrap().values().cloned().collect())
    }

    async fn save_transaction(&mut self, transaction: &Transaction) -> ServicingResult<()> {
        self.transactions
            .write()
            .unwrap()
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ServicingResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .get(&transaction_id)
            .cloned())
    }

    async fn get_beneficiary_transactions(
        &self,
        beneficiary_id: Uuid,
    ) -> ServicingResult<Vec<Transaction>> {
        let mut filtered: Vec<Transaction> = self
            .transactions
            .read()
            .unwrap()
            .values()
            .filter(|txn| txn.beneficiary_id == beneficiary_id)
            .cloned()
            .collect();
        filtered.sort_by_key(|txn| (txn.month_for, txn.date_paid));
        Ok(filtered)
    }

    async fn list_transactions(&self) -> ServicingResult<Vec<Transaction>> {
        Ok(self.transactions.read().unwrap().values().cloned().collect())
    }

    async fn delete_transactions(&mut self, transaction_ids: &[Uuid]) -> ServicingResult<()> {
        let mut transactions = self.transactions.write().unwrap();
        for id in transaction_ids {
            if transactions.remove(id).is_none() {
                return Err(ServicingError::TransactionNotFound(id.to_string()));
            }
        }
        Ok(())
    }

    async fn save_batch_repayment(&mut self, repayment: &BatchRepayment) -> ServicingResult<()> {
        self.batch_repayments
            .write()
            .unwrap()
            .insert(repayment.id, repayment.clone());
        Ok(())
    }

    async fn list_batch_repayments(
        &self,
        batch_id: Option<Uuid>,
    ) -> ServicingResult<Vec<BatchRepayment>> {
        let repayments = self.batch_repayments.read().unwrap();
        let filtered: Vec<BatchRepayment> = repayments
            .values()
            .filter(|r| batch_id.is_none_or(|id| r.batch_id == id))
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn delete_batch_repayments(&mut self, repayment_ids: &[Uuid]) -> ServicingResult<()> {
        let mut repayments = self.batch_repayments.write().unwrap();
        for id in repayment_ids {
            repayments.remove(id);
        }
        Ok(())
    }

    async fn remittance_reference_exists(&self, reference: &str) -> ServicingResult<bool> {
        let needle = reference.trim().to_lowercase();

        let in_transactions = self
            .transactions
            .read()
            .unwrap()
            .values()
            .any(|txn| txn.remittance_reference.trim().to_lowercase() == needle);
        if in_transactions {
            return Ok(true);
        }

        let in_batch_repayments = self
            .batch_repayments
            .read()
            .unwrap()
            .values()
            .any(|r| r.remittance_reference.trim().to_lowercase() == needle);
        Ok(in_batch_repayments)
    }
}
