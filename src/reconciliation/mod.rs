//! Reconciliation of external bank statements against the payment ledger
//!
//! Statement rows are matched by remittance reference against the individual
//! transaction ledger first, then the batch remittance ledger. An unreadable
//! statement or one with zero data rows aborts the run before any row is
//! classified; no partial reconciliation state is produced.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;
use crate::utils::money;
use crate::utils::validation::{normalize_compact, parse_amount};

/// Column indexes bound to the external statement's layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    /// Remittance reference column
    pub reference: usize,
    /// Amount column
    pub amount: usize,
    /// Receipt/proof URL column, when present
    pub receipt: Option<usize>,
}

const REFERENCE_SYNONYMS: &[&str] = &[
    "reference",
    "remittancereference",
    "rrr",
    "retrievalreference",
    "retrievalreferencenumber",
    "ref",
];
const AMOUNT_SYNONYMS: &[&str] = &["amount", "sum", "value", "paid", "amountpaid", "credit"];
const RECEIPT_SYNONYMS: &[&str] = &["receipt", "receipturl", "url", "proof", "proofofpayment"];

fn scan(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = normalize_compact(header);
        synonyms.contains(&normalized.as_str())
    })
}

impl ColumnBinding {
    /// Auto-detect the binding by scanning header text against the known
    /// synonym families
    pub fn detect(headers: &[String]) -> ServicingResult<Self> {
        let reference = scan(headers, REFERENCE_SYNONYMS).ok_or_else(|| {
            ServicingError::Reconciliation(
                "Could not detect a reference column in the statement".to_string(),
            )
        })?;
        let amount = scan(headers, AMOUNT_SYNONYMS).ok_or_else(|| {
            ServicingError::Reconciliation(
                "Could not detect an amount column in the statement".to_string(),
            )
        })?;

        Ok(Self {
            reference,
            amount,
            receipt: scan(headers, RECEIPT_SYNONYMS),
        })
    }

    /// Operator override of any binding; rows are re-extracted with the
    /// result
    pub fn with_overrides(
        self,
        reference: Option<usize>,
        amount: Option<usize>,
        receipt: Option<Option<usize>>,
    ) -> Self {
        Self {
            reference: reference.unwrap_or(self.reference),
            amount: amount.unwrap_or(self.amount),
            receipt: receipt.unwrap_or(self.receipt),
        }
    }
}

/// Classification of one statement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchClass {
    /// Reference found and amounts agree within a cent
    Exact,
    /// Reference found but amounts differ
    AmountMismatch,
    /// Reference absent from both ledgers
    Unmatched,
}

/// Which ledger a reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerSource {
    Individual,
    Batch,
}

/// One classified statement row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    /// 1-based data row index in the statement
    pub row_index: usize,
    /// Reference as it appeared on the statement
    pub reference: String,
    /// Amount on the statement
    pub external_amount: BigDecimal,
    /// Amount on the matching ledger record, when found
    pub ledger_amount: Option<BigDecimal>,
    /// external - ledger, signed, when a ledger record was found
    pub variance: Option<BigDecimal>,
    /// Ledger the reference matched in
    pub source: Option<LedgerSource>,
    /// Receipt/proof cell, when bound
    pub receipt: Option<String>,
    /// Row classification
    pub classification: MatchClass,
}

/// Classified rows plus aggregate statistics for one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub rows: Vec<ReconciledRow>,
    pub exact_count: usize,
    pub mismatch_count: usize,
    pub unmatched_count: usize,
    /// Statement value of exactly matched rows
    pub exact_value: BigDecimal,
    /// Statement value of amount-mismatched rows
    pub mismatch_value: BigDecimal,
    /// Statement value of unmatched rows
    pub unmatched_value: BigDecimal,
    /// Statement value of rows found in either ledger
    pub matched_value: BigDecimal,
    /// Total statement value
    pub total_value: BigDecimal,
}

/// Reconcile external statement rows against both ledgers
pub fn reconcile(
    statement_rows: &[Vec<String>],
    binding: &ColumnBinding,
    individual_ledger: &[Transaction],
    batch_ledger: &[BatchRepayment],
) -> ServicingResult<ReconciliationReport> {
    let individual: HashMap<String, &BigDecimal> = individual_ledger
        .iter()
        .map(|txn| (txn.remittance_reference.trim().to_lowercase(), &txn.amount))
        .collect();
    let batch: HashMap<String, &BigDecimal> = batch_ledger
        .iter()
        .map(|r| (r.remittance_reference.trim().to_lowercase(), &r.actual_amount))
        .collect();

    let mut rows = Vec::new();

    for (index, cells) in statement_rows.iter().enumerate() {
        let reference = cells
            .get(binding.reference)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        if reference.is_empty() {
            continue;
        }

        let external_amount = cells
            .get(binding.amount)
            .and_then(|value| parse_amount(value))
            .unwrap_or_else(|| BigDecimal::from(0));
        let receipt = binding.receipt.and_then(|i| {
            cells
                .get(i)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });

        let key = reference.to_lowercase();
        let (ledger_amount, source) = match individual.get(&key) {
            Some(amount) => (Some((*amount).clone()), Some(LedgerSource::Individual)),
            None => match batch.get(&key) {
                Some(amount) => (Some((*amount).clone()), Some(LedgerSource::Batch)),
                None => (None, None),
            },
        };

        let (classification, variance) = match &ledger_amount {
            Some(amount) if money::within_cent(&external_amount, amount) => {
                (MatchClass::Exact, Some(&external_amount - amount))
            }
            Some(amount) => (MatchClass::AmountMismatch, Some(&external_amount - amount)),
            None => (MatchClass::Unmatched, None),
        };

        rows.push(ReconciledRow {
            row_index: index + 1,
            reference,
            external_amount,
            ledger_amount,
            variance,
            source,
            receipt,
            classification,
        });
    }

    if rows.is_empty() {
        return Err(ServicingError::Reconciliation(
            "Statement contains no data rows".to_string(),
        ));
    }

    let mut report = ReconciliationReport {
        rows: Vec::new(),
        exact_count: 0,
        mismatch_count: 0,
        unmatched_count: 0,
        exact_value: BigDecimal::from(0),
        mismatch_value: BigDecimal::from(0),
        unmatched_value: BigDecimal::from(0),
        matched_value: BigDecimal::from(0),
        total_value: BigDecimal::from(0),
    };

    for row in &rows {
        report.total_value += &row.external_amount;
        match row.classification {
            MatchClass::Exact => {
                report.exact_count += 1;
                report.exact_value += &row.external_amount;
                report.matched_value += &row.external_amount;
            }
            MatchClass::AmountMismatch => {
                report.mismatch_count += 1;
                report.mismatch_value += &row.external_amount;
                report.matched_value += &row.external_amount;
            }
            MatchClass::Unmatched => {
                report.unmatched_count += 1;
                report.unmatched_value += &row.external_amount;
            }
        }
    }
    report.rows = rows;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn transaction(reference: &str, amount: &str) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            dec(amount),
            reference.to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            1,
            None,
        )
    }

    fn batch_repayment(reference: &str, amount: &str) -> BatchRepayment {
        BatchRepayment {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            month_for: 1,
            expected_amount: dec(amount),
            actual_amount: dec(amount),
            remittance_reference: reference.to_string(),
            payment_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            notes: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_binding_from_synonyms() {
        let headers = cells(&["S/N", "RRR", "Amount Paid", "Receipt URL"]);
        let binding = ColumnBinding::detect(&headers).unwrap();
        assert_eq!(binding.reference, 1);
        assert_eq!(binding.amount, 2);
        assert_eq!(binding.receipt, Some(3));
    }

    #[test]
    fn test_detect_fails_without_reference_column() {
        let headers = cells(&["S/N", "Narrative", "Amount"]);
        assert!(matches!(
            ColumnBinding::detect(&headers),
            Err(ServicingError::Reconciliation(_))
        ));
    }

    #[test]
    fn test_operator_override_rebinds() {
        let headers = cells(&["Reference", "Amount", "Value"]);
        let binding = ColumnBinding::detect(&headers)
            .unwrap()
            .with_overrides(None, Some(2), None);
        assert_eq!(binding.reference, 0);
        assert_eq!(binding.amount, 2);
    }

    #[test]
    fn test_three_way_classification() {
        let binding = ColumnBinding {
            reference: 0,
            amount: 1,
            receipt: None,
        };
        let individual = vec![transaction("REF-A", "5000.00")];
        let batch = vec![batch_repayment("REF-B", "12000.00")];

        let statement = vec![
            cells(&["ref-a", "5000.00"]),       // individual ledger, exact
            cells(&["REF-B", "11500.00"]),      // batch ledger, mismatch
            cells(&["REF-MISSING", "700.00"]), // neither
        ];

        let report = reconcile(&statement, &binding, &individual, &batch).unwrap();
        assert_eq!(report.exact_count, 1);
        assert_eq!(report.mismatch_count, 1);
        assert_eq!(report.unmatched_count, 1);

        assert_eq!(report.rows[0].classification, MatchClass::Exact);
        assert_eq!(report.rows[0].source, Some(LedgerSource::Individual));

        assert_eq!(report.rows[1].classification, MatchClass::AmountMismatch);
        assert_eq!(report.rows[1].source, Some(LedgerSource::Batch));
        // Signed variance: statement short by 500
        assert_eq!(report.rows[1].variance, Some(dec("-500.00")));

        assert_eq!(report.rows[2].classification, MatchClass::Unmatched);
        assert_eq!(report.rows[2].ledger_amount, None);

        assert_eq!(report.total_value, dec("17200.00"));
        assert_eq!(report.matched_value, dec("16500.00"));
        assert_eq!(report.unmatched_value, dec("700.00"));
    }

    #[test]
    fn test_individual_ledger_checked_before_batch() {
        let binding = ColumnBinding {
            reference: 0,
            amount: 1,
            receipt: None,
        };
        let individual = vec![transaction("REF-X", "100.00")];
        let batch = vec![batch_repayment("REF-X", "999.00")];

        let statement = vec![cells(&["REF-X", "100.00"])];
        let report = reconcile(&statement, &binding, &individual, &batch).unwrap();
        assert_eq!(report.rows[0].source, Some(LedgerSource::Individual));
        assert_eq!(report.rows[0].classification, MatchClass::Exact);
    }

    #[test]
    fn test_sub_cent_difference_is_exact() {
        let binding = ColumnBinding {
            reference: 0,
            amount: 1,
            receipt: None,
        };
        let individual = vec![transaction("REF-Y", "100.004")];

        let statement = vec![cells(&["REF-Y", "100.00"])];
        let report = reconcile(&statement, &binding, &individual, &[]).unwrap();
        assert_eq!(report.rows[0].classification, MatchClass::Exact);
    }

    #[test]
    fn test_zero_data_rows_aborts_run() {
        let binding = ColumnBinding {
            reference: 0,
            amount: 1,
            receipt: None,
        };

        let err = reconcile(&[], &binding, &[], &[]);
        assert!(matches!(err, Err(ServicingError::Reconciliation(_))));

        // Rows with no reference cell are not data rows
        let blank = vec![cells(&["", "100.00"])];
        let err = reconcile(&blank, &binding, &[], &[]);
        assert!(matches!(err, Err(ServicingError::Reconciliation(_))));
    }
}
