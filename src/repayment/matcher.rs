//! Identity matching for uploaded repayment rows
//!
//! Matching runs against an explicit immutable snapshot of batches and
//! beneficiaries built once per submission, so it stays referentially
//! transparent and testable without a live store. Every row is treated
//! independently; two valid rows may resolve to the same beneficiary.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::repayment::upload::RawRepaymentRow;
use crate::types::*;
use crate::utils::validation::{normalize_compact, normalize_field, parse_amount, parse_payment_date};

/// Immutable lookup snapshot for one submission
#[derive(Debug, Clone)]
pub struct UploadSnapshot {
    batch_by_code: HashMap<String, Uuid>,
    batch_by_name: HashMap<String, Uuid>,
    members_by_batch: HashMap<Uuid, Vec<Beneficiary>>,
}

impl UploadSnapshot {
    /// Build the per-submission indexes
    pub fn new(batches: Vec<LoanBatch>, beneficiaries: Vec<Beneficiary>) -> Self {
        let mut batch_by_code = HashMap::new();
        let mut batch_by_name = HashMap::new();
        for batch in &batches {
            batch_by_code.insert(normalize_field(&batch.code), batch.id);
            batch_by_name.insert(normalize_field(&batch.name), batch.id);
        }

        let mut members_by_batch: HashMap<Uuid, Vec<Beneficiary>> = HashMap::new();
        for beneficiary in beneficiaries {
            members_by_batch
                .entry(beneficiary.batch_id)
                .or_default()
                .push(beneficiary);
        }

        Self {
            batch_by_code,
            batch_by_name,
            members_by_batch,
        }
    }

    /// Resolve a batch by code, falling back to display name
    pub fn resolve_batch(&self, organisation: &str) -> Option<Uuid> {
        let key = normalize_field(organisation);
        self.batch_by_code
            .get(&key)
            .or_else(|| self.batch_by_name.get(&key))
            .copied()
    }

    /// Members of a resolved batch
    pub fn members(&self, batch_id: Uuid) -> &[Beneficiary] {
        self.members_by_batch
            .get(&batch_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Member lookup used when allocating committed rows
    pub fn find_member(&self, batch_id: Uuid, beneficiary_id: Uuid) -> Option<&Beneficiary> {
        self.members(batch_id)
            .iter()
            .find(|b| b.id == beneficiary_id)
    }
}

/// A row successfully resolved to a beneficiary, ready for allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRepayment {
    /// 1-based index of the source data row
    pub row_index: usize,
    /// Resolved beneficiary
    pub beneficiary_id: Uuid,
    /// Resolved batch
    pub batch_id: Uuid,
    /// Submitted amount
    pub amount: BigDecimal,
    /// Remittance reference shared by the row's group
    pub remittance_reference: String,
    /// Parsed payment date
    pub payment_date: NaiveDate,
    /// 1-based schedule month the payment satisfies
    pub month_for: u32,
}

fn matches_opt(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .map(|value| !value.trim().is_empty() && normalize_field(value) == normalize_field(needle))
        .unwrap_or(false)
}

/// Resolve a beneficiary within a batch's membership, first rule wins
///
/// Rule order: loan reference or staff id, then NHF number, then the full
/// concatenated name, then surname and first name as two separate fields.
fn resolve_beneficiary<'a>(
    row: &RawRepaymentRow,
    members: &'a [Beneficiary],
) -> Option<&'a Beneficiary> {
    if !row.loan_reference.trim().is_empty() {
        let by_reference = members.iter().find(|b| {
            matches_opt(&b.loan_reference_number, &row.loan_reference)
                || matches_opt(&b.staff_id, &row.loan_reference)
        });
        if by_reference.is_some() {
            return by_reference;
        }
    }

    if !row.nhf_number.trim().is_empty() {
        let by_nhf = members
            .iter()
            .find(|b| matches_opt(&b.nhf_number, &row.nhf_number));
        if by_nhf.is_some() {
            return by_nhf;
        }
    }

    let row_full = normalize_compact(&format!(
        "{} {} {}",
        row.surname, row.first_name, row.other_name
    ));
    if !row_full.is_empty() {
        let by_full_name = members
            .iter()
            .find(|b| normalize_compact(&b.full_name()) == row_full);
        if by_full_name.is_some() {
            return by_full_name;
        }
    }

    // Tolerates name-order/whitespace variance the concatenated form misses,
    // including the two names swapped across columns
    if !row.surname.trim().is_empty() && !row.first_name.trim().is_empty() {
        let row_surname = normalize_field(&row.surname);
        let row_first = normalize_field(&row.first_name);
        return members.iter().find(|b| {
            let surname = normalize_field(&b.surname);
            let first = normalize_field(&b.first_name);
            (surname == row_surname && first == row_first)
                || (surname == row_first && first == row_surname)
        });
    }

    None
}

/// Match one uploaded row against the snapshot
///
/// All problems on the row are collected rather than short-circuited; a row
/// that fails is excluded from commit but retained for operator review.
pub fn match_row(
    row: &RawRepaymentRow,
    snapshot: &UploadSnapshot,
) -> Result<MatchedRepayment, Vec<String>> {
    let mut errors = Vec::new();

    if row.surname.trim().is_empty() && row.first_name.trim().is_empty() {
        errors.push("Name is missing".to_string());
    }

    if row.organisation.trim().is_empty() {
        errors.push("Organisation/batch is missing".to_string());
    }

    if row.remittance_reference.trim().is_empty() {
        errors.push("Remittance reference is missing".to_string());
    }

    let payment_date = parse_payment_date(&row.date_on_receipt);
    if payment_date.is_none() {
        errors.push(format!(
            "Date on receipt '{}' is not a recognisable date",
            row.date_on_receipt
        ));
    }

    let amount = parse_amount(&row.amount);
    match &amount {
        Some(value) if *value > BigDecimal::from(0) => {}
        Some(_) => errors.push("Amount must be greater than zero".to_string()),
        None => errors.push(format!("Amount '{}' is not a number", row.amount)),
    }

    let month_for = row.month_of_payment.trim().parse::<u32>().ok();
    match month_for {
        Some(m) if m >= 1 => {}
        Some(_) => errors.push("Month of payment must be at least 1".to_string()),
        None => errors.push(format!(
            "Month of payment '{}' is not a number",
            row.month_of_payment
        )),
    }

    // Identity resolution still runs so the operator sees every problem at once
    let mut resolved: Option<(Uuid, Uuid)> = None;
    if !row.organisation.trim().is_empty() {
        match snapshot.resolve_batch(&row.organisation) {
            Some(batch_id) => match resolve_beneficiary(row, snapshot.members(batch_id)) {
                Some(beneficiary) => resolved = Some((batch_id, beneficiary.id)),
                None => errors.push(format!(
                    "No beneficiary in batch '{}' matches this row",
                    row.organisation
                )),
            },
            None => errors.push(format!(
                "No batch matches organisation '{}'",
                row.organisation
            )),
        }
    }

    match (errors.is_empty(), resolved, amount, payment_date, month_for) {
        (true, Some((batch_id, beneficiary_id)), Some(amount), Some(payment_date), Some(month_for)) => {
            Ok(MatchedRepayment {
                row_index: row.row_index,
                beneficiary_id,
                batch_id,
                amount,
                remittance_reference: row.remittance_reference.trim().to_string(),
                payment_date,
                month_for,
            })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn batch(code: &str, name: &str) -> LoanBatch {
        LoanBatch {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            state_branch: "Lagos".to_string(),
            status: BatchStatus::Active,
        }
    }

    fn member(batch_id: Uuid, surname: &str, first: &str) -> Beneficiary {
        Beneficiary {
            id: Uuid::new_v4(),
            title: None,
            surname: surname.to_string(),
            first_name: first.to_string(),
            other_name: None,
            batch_id,
            nhf_number: None,
            loan_reference_number: None,
            staff_id: None,
            monthly_emi: dec("5000"),
        }
    }

    fn valid_row(organisation: &str) -> RawRepaymentRow {
        RawRepaymentRow {
            row_index: 1,
            surname: "Okafor".to_string(),
            first_name: "Chinedu".to_string(),
            organisation: organisation.to_string(),
            remittance_reference: "RRR-1001".to_string(),
            date_on_receipt: "2024-03-15".to_string(),
            amount: "5000".to_string(),
            month_of_payment: "1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_code_then_name_fallback() {
        let b = batch("FMW-01", "Federal Ministry of Works");
        let beneficiary = member(b.id, "Okafor", "Chinedu");
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        assert!(snapshot.resolve_batch("fmw-01").is_some());
        assert!(snapshot.resolve_batch("FEDERAL ministry of works").is_some());
        assert!(snapshot.resolve_batch("unknown").is_none());
    }

    #[test]
    fn test_loan_reference_outranks_name_match() {
        let b = batch("B1", "Batch One");
        // Decoy: name matches the row but carries a different reference
        let mut decoy = member(b.id, "Adeyemi", "Bola");
        decoy.loan_reference_number = Some("LRN-999".to_string());
        // Target: row's loan reference belongs to this beneficiary
        let mut target = member(b.id, "Okonkwo", "Ngozi");
        target.loan_reference_number = Some("LRN-123".to_string());
        let target_id = target.id;

        let snapshot = UploadSnapshot::new(vec![b], vec![decoy, target]);

        let mut row = valid_row("B1");
        row.surname = "Adeyemi".to_string();
        row.first_name = "Bola".to_string();
        row.loan_reference = "lrn-123".to_string();

        let matched = match_row(&row, &snapshot).unwrap();
        assert_eq!(matched.beneficiary_id, target_id);
    }

    #[test]
    fn test_staff_id_satisfies_reference_rule() {
        let b = batch("B1", "Batch One");
        let mut beneficiary = member(b.id, "Balogun", "Tunde");
        beneficiary.staff_id = Some("EMP-42".to_string());
        let id = beneficiary.id;
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        let mut row = valid_row("B1");
        row.surname = "Wrong".to_string();
        row.first_name = "Name".to_string();
        row.loan_reference = "emp-42".to_string();

        assert_eq!(match_row(&row, &snapshot).unwrap().beneficiary_id, id);
    }

    #[test]
    fn test_nhf_number_rule() {
        let b = batch("B1", "Batch One");
        let mut beneficiary = member(b.id, "Eze", "Amara");
        beneficiary.nhf_number = Some("NHF-7788".to_string());
        let id = beneficiary.id;
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        let mut row = valid_row("B1");
        row.surname = "Misspelt".to_string();
        row.first_name = "Entirely".to_string();
        row.nhf_number = "nhf-7788".to_string();

        assert_eq!(match_row(&row, &snapshot).unwrap().beneficiary_id, id);
    }

    #[test]
    fn test_split_name_rule_tolerates_spacing() {
        let b = batch("B1", "Batch One");
        let mut beneficiary = member(b.id, "Mohammed", "Aisha");
        beneficiary.other_name = Some("Bint".to_string());
        let id = beneficiary.id;
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        // Other name omitted, so the concatenated rule misses; the split
        // surname + first name rule still lands
        let mut row = valid_row("B1");
        row.surname = "  MOHAMMED ".to_string();
        row.first_name = "aisha".to_string();

        assert_eq!(match_row(&row, &snapshot).unwrap().beneficiary_id, id);
    }

    #[test]
    fn test_split_name_rule_tolerates_swapped_columns() {
        let b = batch("B1", "Batch One");
        let beneficiary = member(b.id, "Danjuma", "Hauwa");
        let id = beneficiary.id;
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        // First name entered under Surname and vice versa
        let mut row = valid_row("B1");
        row.surname = "Hauwa".to_string();
        row.first_name = "Danjuma".to_string();

        assert_eq!(match_row(&row, &snapshot).unwrap().beneficiary_id, id);
    }

    #[test]
    fn test_all_field_errors_collected() {
        let snapshot = UploadSnapshot::new(vec![], vec![]);
        let row = RawRepaymentRow {
            row_index: 3,
            date_on_receipt: "yesterday".to_string(),
            amount: "-10".to_string(),
            month_of_payment: "zero".to_string(),
            ..Default::default()
        };

        let errors = match_row(&row, &snapshot).unwrap_err();
        // Name, organisation, reference, date, amount, month
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_unknown_batch_is_row_error_not_abort() {
        let snapshot = UploadSnapshot::new(vec![], vec![]);
        let row = valid_row("GHOST");

        let errors = match_row(&row, &snapshot).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("GHOST"));
    }

    #[test]
    fn test_rows_resolve_independently() {
        let b = batch("B1", "Batch One");
        let beneficiary = member(b.id, "Okafor", "Chinedu");
        let id = beneficiary.id;
        let snapshot = UploadSnapshot::new(vec![b], vec![beneficiary]);

        let first = match_row(&valid_row("B1"), &snapshot).unwrap();
        let mut second_row = valid_row("B1");
        second_row.row_index = 2;
        second_row.month_of_payment = "2".to_string();
        let second = match_row(&second_row, &snapshot).unwrap();

        // Same beneficiary twice is not a conflict
        assert_eq!(first.beneficiary_id, id);
        assert_eq!(second.beneficiary_id, id);
    }
}
