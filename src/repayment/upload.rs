//! Spreadsheet header binding and raw row extraction
//!
//! Uploads arrive in two shapes: multi-batch files carrying an
//! Organisation/Batch column per row, and single-batch files where the batch
//! code is supplied for the whole file. Header matching tolerates the case
//! and spacing variants of a small known-synonym list.

use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::normalize_compact;

/// One data row of an upload, untyped
///
/// Fields hold the trimmed cell text; parsing and validation happen in the
/// matcher so that every problem on a row can be reported together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawRepaymentRow {
    /// 1-based data row index, for error reporting
    pub row_index: usize,
    pub title: String,
    pub surname: String,
    pub first_name: String,
    pub other_name: String,
    pub organisation: String,
    pub nhf_number: String,
    pub loan_reference: String,
    pub remittance_reference: String,
    pub date_on_receipt: String,
    pub amount: String,
    pub month_of_payment: String,
}

/// Column indexes resolved from an upload's header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadColumns {
    pub title: Option<usize>,
    pub surname: Option<usize>,
    pub first_name: Option<usize>,
    pub other_name: Option<usize>,
    pub organisation: Option<usize>,
    pub nhf_number: Option<usize>,
    pub loan_reference: Option<usize>,
    pub remittance_reference: Option<usize>,
    pub date_on_receipt: Option<usize>,
    pub amount: Option<usize>,
    pub month_of_payment: Option<usize>,
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = normalize_compact(header);
        synonyms.contains(&normalized.as_str())
    })
}

impl UploadColumns {
    /// Resolve column indexes from the header row
    ///
    /// Only structural columns are required at this stage: the remittance
    /// reference and the amount. Everything else is reported per row by the
    /// matcher so one malformed header does not hide all other problems.
    pub fn bind(headers: &[String]) -> ServicingResult<Self> {
        let columns = Self {
            title: find_column(headers, &["title"]),
            surname: find_column(headers, &["surname", "lastname"]),
            first_name: find_column(headers, &["firstname"]),
            other_name: find_column(headers, &["othername", "othernames", "middlename"]),
            organisation: find_column(
                headers,
                &["organisation", "organization", "batch", "organisationbatch"],
            ),
            nhf_number: find_column(headers, &["nhfnumber", "nhfno", "nhf"]),
            loan_reference: find_column(
                headers,
                &["loanreferencenumber", "loanreference", "loanrefno", "staffid"],
            ),
            remittance_reference: find_column(
                headers,
                &["remittancereference", "rrr", "remittanceref"],
            ),
            date_on_receipt: find_column(
                headers,
                &["dateonreceipt", "datepaid", "paymentdate", "date"],
            ),
            amount: find_column(headers, &["amount", "amountpaid"]),
            month_of_payment: find_column(
                headers,
                &["monthofpayment", "monthfor", "month", "paymentmonth"],
            ),
        };

        if columns.remittance_reference.is_none() {
            return Err(ServicingError::Validation(
                "Upload is missing a remittance reference column".to_string(),
            ));
        }
        if columns.amount.is_none() {
            return Err(ServicingError::Validation(
                "Upload is missing an amount column".to_string(),
            ));
        }

        Ok(columns)
    }
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Extract raw rows using bound columns
///
/// `default_batch` fills the organisation field for single-batch uploads that
/// carry no Organisation column. Fully blank rows are dropped.
pub fn extract_rows(
    columns: &UploadColumns,
    rows: &[Vec<String>],
    default_batch: Option<&str>,
) -> Vec<RawRepaymentRow> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|value| !value.trim().is_empty()))
        .map(|(index, row)| {
            let mut organisation = cell(row, columns.organisation);
            if organisation.is_empty() {
                if let Some(batch) = default_batch {
                    organisation = batch.trim().to_string();
                }
            }

            RawRepaymentRow {
                row_index: index + 1,
                title: cell(row, columns.title),
                surname: cell(row, columns.surname),
                first_name: cell(row, columns.first_name),
                other_name: cell(row, columns.other_name),
                organisation,
                nhf_number: cell(row, columns.nhf_number),
                loan_reference: cell(row, columns.loan_reference),
                remittance_reference: cell(row, columns.remittance_reference),
                date_on_receipt: cell(row, columns.date_on_receipt),
                amount: cell(row, columns.amount),
                month_of_payment: cell(row, columns.month_of_payment),
            }
        })
        .collect()
}
