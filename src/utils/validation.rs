//! Validation and parsing utilities shared by manual entry and bulk upload

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> ServicingResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(ServicingError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a remittance reference is usable as a ledger key
pub fn validate_remittance_reference(reference: &str) -> ServicingResult<()> {
    if reference.trim().is_empty() {
        return Err(ServicingError::Validation(
            "Remittance reference cannot be empty".to_string(),
        ));
    }

    if reference.len() > 64 {
        return Err(ServicingError::Validation(
            "Remittance reference cannot exceed 64 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a month-of-payment index
pub fn validate_month_for(month_for: u32) -> ServicingResult<()> {
    if month_for < 1 {
        return Err(ServicingError::Validation(
            "Month of payment must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Parse a payment date from the formats uploads arrive in
pub fn parse_payment_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Parse a decimal amount, tolerating currency commas
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// Lower-case and collapse internal whitespace, for case-insensitive field
/// comparison
pub fn normalize_field(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lower-case and strip everything but letters and digits, for header and
/// full-name comparison where spacing is unreliable
pub fn normalize_compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&BigDecimal::from(100)).is_ok());
        assert!(validate_positive_amount(&BigDecimal::from(0)).is_err());
        assert!(validate_positive_amount(&BigDecimal::from(-5)).is_err());
    }

    #[test]
    fn test_remittance_reference() {
        assert!(validate_remittance_reference("RRR-2024-0001").is_ok());
        assert!(validate_remittance_reference("   ").is_err());
        assert!(validate_remittance_reference(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_parse_payment_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_payment_date("2024-03-15"), Some(expected));
        assert_eq!(parse_payment_date("15/03/2024"), Some(expected));
        assert_eq!(parse_payment_date("15-03-2024"), Some(expected));
        assert_eq!(parse_payment_date("not a date"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,250,000.50"), parse_amount("1250000.50"));
        assert!(parse_amount("").is_none());
        assert!(parse_amount("abc").is_none());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_field("  ADEyemi   Bola "), "adeyemi bola");
        assert_eq!(normalize_compact("First  Name"), "firstname");
        assert_eq!(normalize_compact("NHF Number:"), "nhfnumber");
    }
}
