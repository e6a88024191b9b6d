//! Grouped commit of matched repayment rows
//!
//! Rows are grouped by (batch, remittance reference) and groups are committed
//! strictly sequentially, so a later group's duplicate-reference check
//! observes any earlier group already committed within the same submission.
//! The storage backend is assumed to offer no cross-table atomicity;
//! consistency comes from the per-group failure isolation rules here.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::repayment::matcher::{MatchedRepayment, UploadSnapshot};
use crate::traits::ServicingStorage;
use crate::types::*;
use crate::utils::money;

/// Outcome of committing one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommitOutcome {
    /// Member transactions written
    pub success_count: usize,
    /// Rows that failed (duplicate group, record write failure, or
    /// individual transaction failure)
    pub error_count: usize,
    /// References skipped by the duplicate-submission guard, reported
    /// distinctly so an operator investigates rather than re-uploads
    pub duplicate_references: Vec<String>,
    /// Row-level failure messages
    pub row_errors: Vec<String>,
    /// Remittance records written
    pub remittance_ids: Vec<Uuid>,
}

/// One remittance event: every row sharing a (batch, reference) pair
struct RemittanceGroup {
    batch_id: Uuid,
    reference: String,
    rows: Vec<MatchedRepayment>,
}

fn group_rows(rows: Vec<MatchedRepayment>) -> Vec<RemittanceGroup> {
    let mut groups: Vec<RemittanceGroup> = Vec::new();
    let mut index: HashMap<(Uuid, String), usize> = HashMap::new();

    for row in rows {
        let key = (row.batch_id, row.remittance_reference.to_lowercase());
        match index.get(&key) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(RemittanceGroup {
                    batch_id: row.batch_id,
                    reference: row.remittance_reference.clone(),
                    rows: vec![row],
                });
            }
        }
    }

    groups
}

/// Pro-rata share of a group surplus: EMI + round2(variance * EMI / expected)
///
/// Each member's share is rounded independently, so the sum may drift from the
/// actual total by a few hundredths. That drift is a documented tolerance.
fn allocated_amount(
    emi: &BigDecimal,
    variance: &BigDecimal,
    expected_total: &BigDecimal,
) -> BigDecimal {
    let share = money::round2(&(variance * emi / expected_total));
    money::round2(&(emi + share))
}

/// Commit matched rows as remittance records plus member transactions
pub async fn commit<S: ServicingStorage>(
    rows: Vec<MatchedRepayment>,
    snapshot: &UploadSnapshot,
    storage: &mut S,
) -> ServicingResult<CommitOutcome> {
    let mut outcome = CommitOutcome::default();

    for group in group_rows(rows) {
        // Primary duplicate-submission guard
        if storage
            .remittance_reference_exists(&group.reference)
            .await?
        {
            outcome.error_count += group.rows.len();
            outcome.duplicate_references.push(group.reference.clone());
            continue;
        }

        let mut member_emis: Vec<Option<BigDecimal>> = Vec::with_capacity(group.rows.len());
        let mut expected_total = BigDecimal::from(0);
        let mut actual_total = BigDecimal::from(0);
        for row in &group.rows {
            let emi = snapshot
                .find_member(group.batch_id, row.beneficiary_id)
                .map(|member| member.monthly_emi.clone());
            if let Some(emi) = &emi {
                expected_total += emi;
            }
            actual_total += &row.amount;
            member_emis.push(emi);
        }

        let variance = &actual_total - &expected_total;
        let is_overpayment =
            variance > money::cent() && expected_total > BigDecimal::from(0);

        let first = &group.rows[0];
        let notes = if is_overpayment {
            format!(
                "Overpayment of {} distributed pro rata across {} members",
                money::round2(&variance),
                group.rows.len()
            )
        } else {
            "Amounts applied as submitted".to_string()
        };

        let remittance = BatchRepayment {
            id: Uuid::new_v4(),
            batch_id: group.batch_id,
            month_for: first.month_for,
            expected_amount: money::round2(&expected_total),
            actual_amount: money::round2(&actual_total),
            remittance_reference: group.reference.clone(),
            payment_date: first.payment_date,
            notes: Some(notes),
            created_at: chrono::Utc::now().naive_utc(),
        };

        // A failed remittance-record write fails the whole group: no member
        // transactions are attempted
        if let Err(err) = storage.save_batch_repayment(&remittance).await {
            outcome.error_count += group.rows.len();
            outcome.row_errors.push(format!(
                "Remittance {} could not be recorded: {}",
                group.reference, err
            ));
            continue;
        }
        outcome.remittance_ids.push(remittance.id);

        for (row, emi) in group.rows.iter().zip(&member_emis) {
            let amount = match (is_overpayment, emi) {
                (true, Some(emi)) => allocated_amount(emi, &variance, &expected_total),
                _ => row.amount.clone(),
            };

            let transaction = Transaction::new(
                row.beneficiary_id,
                amount,
                group.reference.clone(),
                row.payment_date,
                row.month_for,
                None,
            );

            // Individual failures count only that member; siblings proceed
            match storage.save_transaction(&transaction).await {
                Ok(()) => outcome.success_count += 1,
                Err(err) => {
                    outcome.error_count += 1;
                    outcome.row_errors.push(format!(
                        "Row {}: transaction could not be recorded: {}",
                        row.row_index, err
                    ));
                }
            }
        }
    }

    Ok(outcome)
}
