//! Loan lifecycle example
//!
//! Walks one loan from disbursement through a bulk upload, an arrears check,
//! and a bank statement reconciliation.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use uuid::Uuid;

use loan_servicing_core::{
    BatchStatus, Beneficiary, LoanBatch, LoanServicing, LoanTerms, MemoryStorage, ServicingStorage,
};

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Loan Servicing Core - Lifecycle Example\n");

    let mut servicing = LoanServicing::new(MemoryStorage::new());

    // 1. Reference data: one employer batch with one member
    println!("📋 Setting up batch and beneficiary...");
    let batch = LoanBatch {
        id: Uuid::new_v4(),
        code: "FMW-01".to_string(),
        name: "Federal Ministry of Works".to_string(),
        state_branch: "Abuja".to_string(),
        status: BatchStatus::Active,
    };
    servicing.storage_mut().save_loan_batch(&batch).await?;

    let mut member = Beneficiary {
        id: Uuid::new_v4(),
        title: Some("Mr".to_string()),
        surname: "Okafor".to_string(),
        first_name: "Chinedu".to_string(),
        other_name: None,
        batch_id: batch.id,
        nhf_number: Some("NHF-10042".to_string()),
        loan_reference_number: Some("LRN-2024-001".to_string()),
        staff_id: None,
        monthly_emi: BigDecimal::from(0),
    };
    servicing.storage_mut().save_beneficiary(&member).await?;
    println!("  ✓ Batch {} with member {}\n", batch.code, member.full_name());

    // 2. Disburse 2.5m at 6% over 36 months with a one-month moratorium
    println!("💸 Disbursing loan...");
    let terms = LoanTerms {
        principal: dec("2500000"),
        annual_rate: dec("6"),
        tenor_months: 36,
        moratorium_months: 1,
        disbursement_date: date(2024, 1, 15),
    };
    let loan = servicing.disburse_loan(member.id, terms).await?;
    println!("  ✓ Monthly EMI:     {}", loan.monthly_emi);
    println!("  ✓ First due date:  {}", loan.commencement_date);
    println!("  ✓ Final due date:  {}", loan.termination_date);
    println!("  ✓ Expected total:  {}\n", loan.outstanding_balance);

    member.monthly_emi = loan.monthly_emi.clone();
    servicing.storage_mut().save_beneficiary(&member).await?;

    println!("📅 First three schedule rows:");
    let schedule = servicing.loan_schedule(loan.id).await?;
    for entry in schedule.iter().take(3) {
        println!(
            "  month {:>2}  due {}  interest {:>10}  principal {:>10}  closing {:>12}",
            entry.month, entry.due_date, entry.interest, entry.principal, entry.closing_balance
        );
    }
    println!();

    // 3. A remittance arrives as a bulk upload
    println!("📤 Processing bulk upload...");
    let headers = strings(&[
        "Surname",
        "First Name",
        "Organisation",
        "Loan Reference Number",
        "RRR",
        "Date on Receipt",
        "Amount",
        "Month of Payment",
    ]);
    let emi_text = loan.monthly_emi.to_string();
    let rows = vec![strings(&[
        "Okafor",
        "Chinedu",
        "FMW-01",
        "LRN-2024-001",
        "REM-2024-0315",
        "2024-03-18",
        &emi_text,
        "1",
    ])];
    let report = servicing.process_upload(&headers, &rows, None).await?;
    println!(
        "  ✓ {} committed, {} rejected\n",
        report.outcome.success_count,
        report.rejected_rows.len()
    );

    // 4. Where does the loan stand mid-year?
    println!("⏰ Arrears as of 2024-06-30:");
    let status = servicing.evaluate_arrears(loan.id, date(2024, 6, 30)).await?;
    println!("  Days overdue:      {}", status.days_overdue);
    println!("  Months in arrears: {}", status.months_in_arrears);
    println!("  Arrears amount:    {}", status.arrears_amount);
    println!("  Classification:    {:?}\n", status.classification);

    // 5. Reconcile a bank statement fragment against the ledger
    println!("🔍 Reconciling bank statement...");
    let statement_headers = strings(&["Reference", "Amount"]);
    let statement_rows = vec![
        strings(&["REM-2024-0315", &emi_text]),
        strings(&["REM-2024-9999", "50000.00"]),
    ];
    let reconciliation = servicing
        .reconcile_statement(&statement_headers, &statement_rows, None)
        .await?;
    for row in &reconciliation.rows {
        println!(
            "  {} -> {:?} (statement {})",
            row.reference, row.classification, row.external_amount
        );
    }
    println!(
        "  ✓ {} exact, {} mismatched, {} unmatched\n",
        reconciliation.exact_count, reconciliation.mismatch_count, reconciliation.unmatched_count
    );

    // 6. Portfolio view
    println!("📊 Portfolio as of 2024-06-30:");
    let summary = servicing.portfolio_summary(date(2024, 6, 30)).await?;
    println!("  Loans:           {}", summary.total_loans);
    println!("  Outstanding:     {}", summary.total_outstanding);
    println!("  PAR 30 balance:  {}", summary.par30_balance);
    println!("  NPL balance:     {}\n", summary.npl_balance);

    // 7. Resubmitting the same file is inert
    let resubmitted = servicing.process_upload(&headers, &rows, None).await?;
    if !resubmitted.outcome.duplicate_references.is_empty() {
        println!(
            "🛡️  Resubmission skipped duplicate reference(s): {:?}",
            resubmitted.outcome.duplicate_references
        );
    }

    println!("\n✅ Done");
    Ok(())
}
