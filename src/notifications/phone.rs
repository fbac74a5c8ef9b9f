// ABOUTME: Phone number normalization to E.164 form
// ABOUTME: Used for profile keys, session lookup and message delivery
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::errors::{AppError, AppResult};

/// Normalize a phone number to `+<digits>`
///
/// Spaces, dashes, dots and parentheses are removed. A leading `+` is kept,
/// a leading `00` becomes `+`, and any other number has its leading zeros
/// stripped and `default_country_code` prefixed.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty number or one with non-digit content.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> AppResult<String> {
    let compact: String = raw
        .trim()
        .trim_start_matches("whatsapp:")
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if compact.is_empty() {
        return Err(AppError::invalid_input("Phone number is empty"));
    }

    let (has_plus, digits) = compact
        .strip_prefix('+')
        .map_or((false, compact.as_str()), |rest| (true, rest));

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid_input(format!(
            "Phone number '{raw}' contains non-digit characters"
        )));
    }

    if has_plus {
        return Ok(format!("+{digits}"));
    }
    if let Some(international) = digits.strip_prefix("00") {
        if international.is_empty() {
            return Err(AppError::invalid_input(format!("Phone number '{raw}' has no digits")));
        }
        return Ok(format!("+{international}"));
    }

    let local = digits.trim_start_matches('0');
    if local.is_empty() {
        return Err(AppError::invalid_input(format!("Phone number '{raw}' has no digits")));
    }
    let country = default_country_code.trim_start_matches('+');
    Ok(format!("+{country}{local}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_gets_country_code() {
        assert_eq!(normalize_phone("098765 43210", "+91").ok().as_deref(), Some("+919876543210"));
        assert_eq!(normalize_phone("(987) 654-3210", "+91").ok().as_deref(), Some("+919876543210"));
    }

    #[test]
    fn test_international_forms_kept() {
        assert_eq!(normalize_phone("+44 20 7946 0958", "+91").ok().as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone("0044 20 7946 0958", "+91").ok().as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone("whatsapp:+15551234", "+91").ok().as_deref(), Some("+15551234"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(normalize_phone("", "+91").is_err());
        assert!(normalize_phone("   ", "+91").is_err());
        assert!(normalize_phone("call me", "+91").is_err());
        assert!(normalize_phone("+", "+91").is_err());
        assert!(normalize_phone("000", "+91").is_err());
    }
}
