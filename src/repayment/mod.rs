//! Bulk repayment ingestion: spreadsheet binding, identity matching, and
//! grouped allocation

pub mod allocator;
pub mod matcher;
pub mod upload;

pub use allocator::*;
pub use matcher::*;
pub use upload::*;
