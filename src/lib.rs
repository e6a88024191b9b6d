//! # Loan Servicing Core
//!
//! A loan servicing library for long-tenor installment portfolios: schedule
//! generation, arrears classification, bulk repayment uploads, and bank
//! statement reconciliation.
//!
//! ## Features
//!
//! - **Schedule generation**: Annuity amortization plus an actual/365 daily
//!   accrual variant with moratorium interest capitalization
//! - **Arrears classification**: Days-past-due risk buckets with NPL flagging
//!   and portfolio-at-risk summaries
//! - **Bulk repayment uploads**: Header binding, row matching by reference,
//!   NHF number or name, and grouped remittance commit with pro-rata
//!   overpayment allocation
//! - **Reconciliation**: Bank statement matching against individual and batch
//!   ledgers with a per-row variance report
//! - **Storage abstraction**: Database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use loan_servicing_core::{LoanServicing, LoanTerms, MemoryStorage};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! // This example shows basic usage - any ServicingStorage backend works
//! // let storage = MemoryStorage::new();
//! // let mut servicing = LoanServicing::new(storage);
//! ```

pub mod arrears;
pub mod reconciliation;
pub mod repayment;
pub mod schedule;
pub mod servicing;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use arrears::{ArrearsStatus, PortfolioSummary, RiskClass};
pub use reconciliation::{ColumnBinding, MatchClass, ReconciliationReport};
pub use repayment::allocator::CommitOutcome;
pub use repayment::upload::UploadColumns;
pub use servicing::{LoanServicing, UploadReport};
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
