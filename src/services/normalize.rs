//! Single-field cleanup rules.

use crate::error::RecordError;

/// A phone number in `+<digits>` form with the country code it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPhone {
    pub full_phone: String,
    pub country_code: String,
}

fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes a legacy phone number.
///
/// All non-digits are stripped, then:
/// - 10 digits: domestic number, `country_code` is prepended
/// - 11 digits starting with `1`: already prefixed, country code `1`
/// - more than 11 digits: every digit before the last 10 is the country code
///
/// Anything else is rejected. This is a length heuristic, not an E.164
/// validator.
pub fn normalize_phone(
    raw: Option<&str>,
    country_code: Option<&str>,
    default_country_code: &str,
) -> Result<NormalizedPhone, RecordError> {
    let raw = raw.unwrap_or_default();
    let cleaned = digits(raw);

    match cleaned.len() {
        10 => {
            let cc = country_code
                .map(digits)
                .filter(|cc| !cc.is_empty())
                .unwrap_or_else(|| default_country_code.to_string());
            Ok(NormalizedPhone {
                full_phone: format!("+{cc}{cleaned}"),
                country_code: cc,
            })
        }
        11 if cleaned.starts_with('1') => Ok(NormalizedPhone {
            full_phone: format!("+{cleaned}"),
            country_code: "1".to_string(),
        }),
        n if n > 11 => Ok(NormalizedPhone {
            country_code: cleaned[..n - 10].to_string(),
            full_phone: format!("+{cleaned}"),
        }),
        _ => Err(RecordError::InvalidPhoneFormat(raw.to_string())),
    }
}

/// Splits a display name into first name and the remaining words.
pub fn split_name(name: Option<&str>) -> (String, String) {
    let mut words = name.unwrap_or_default().split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let rest = words.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Keeps an email only when it looks like one.
pub fn accept_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| e.contains('@'))
        .map(str::to_string)
}
