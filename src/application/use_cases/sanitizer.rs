// ============================================================
// PRODUCT ROW SANITIZER
// ============================================================
// Normalizes the three raw CSV fields and decides whether a row
// can be persisted. Cleaning never fails on malformed input; it
// degrades to an empty name, a zero price or no date.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::domain::error::{AppError, Result};
use crate::domain::product::{RawRow, MAX_NAME_LENGTH, MAX_PRICE};

/// Token substituted for path-traversal and SQL fragments.
pub const REMOVED_PLACEHOLDER: &str = "[removed]";

static NON_TEXT_ELEMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<(?:script|style|textarea|option)\b[^>]*>.*?</(?:script|style|textarea|option)\s*>|<(?:script|style|textarea|option)\b[^>]*>.*$",
    )
    .unwrap()
});

static MARKUP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<![^>]*>|</?[A-Za-z][^>]*>").unwrap());

static EMOJI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{1F300}-\x{1F6FF}\x{1F900}-\x{1F9FF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}]")
        .unwrap()
});

static PARENTHESIZED_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());

static PATH_TRAVERSAL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\./+").unwrap());

static SYSTEM_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/etc/[\w.-]+").unwrap());

static SQL_KEYWORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)DROP TABLE|SELECT|INSERT|DELETE|UPDATE|CREATE|EXEC").unwrap()
});

static DISALLOWED_CHAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^A-Za-z0-9 .,!?'"()/_-]"#).unwrap());

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NON_PRICE_CHAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").unwrap());

static LEADING_DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d*\.?\d*").unwrap());

static EXPIRATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

/// Fields of a row that passed validation, before rates are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub name: String,
    pub price: f64,
    pub expiration: NaiveDate,
}

/// Outcome of checking one decoded row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowVerdict {
    Valid(ValidatedRow),
    /// The row is dropped; the string is the diagnostic for the uploader.
    Omit(String),
}

/// Removes HTML comments and tags. Elements whose content is never
/// rendered as text lose their content too.
pub fn strip_markup(raw: &str) -> String {
    let without_blocks = NON_TEXT_ELEMENT_PATTERN.replace_all(raw, "");
    MARKUP_PATTERN.replace_all(&without_blocks, "").into_owned()
}

pub fn clean_product_name(raw_name: &str) -> String {
    let stripped = strip_markup(raw_name);
    let normalized: String = stripped.nfc().collect();

    let cleaned = EMOJI_PATTERN.replace_all(&normalized, "");
    let cleaned = PARENTHESIZED_PATTERN.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();

    let cleaned = PATH_TRAVERSAL_PATTERN.replace_all(cleaned, REMOVED_PLACEHOLDER);
    let cleaned = SYSTEM_PATH_PATTERN.replace_all(&cleaned, REMOVED_PLACEHOLDER);
    let cleaned = SQL_KEYWORD_PATTERN.replace_all(&cleaned, REMOVED_PLACEHOLDER);

    // The placeholder's brackets are outside the allow-list; filter around it.
    let filtered = cleaned
        .split(REMOVED_PLACEHOLDER)
        .map(|part| DISALLOWED_CHAR_PATTERN.replace_all(part, "").into_owned())
        .collect::<Vec<_>>()
        .join(REMOVED_PLACEHOLDER);

    WHITESPACE_PATTERN
        .replace_all(&filtered, " ")
        .trim()
        .to_string()
}

/// Returns the price as a non-negative number, or 0 when nothing usable
/// is found.
pub fn clean_product_price(raw_price: &str) -> f64 {
    let digits = NON_PRICE_CHAR_PATTERN.replace_all(raw_price, "");
    let literal = LEADING_DECIMAL_PATTERN
        .find(&digits)
        .map(|m| m.as_str())
        .unwrap_or("");

    if !literal.bytes().any(|b| b.is_ascii_digit()) {
        return 0.0;
    }

    match literal.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => price,
        _ => 0.0,
    }
}

/// Parses `M/D/YYYY`; `None` for anything else, including dates that do
/// not exist on the calendar.
pub fn clean_product_expiration(raw_expiration: &str) -> Option<NaiveDate> {
    let sanitized = strip_markup(raw_expiration);
    let captures = EXPIRATION_PATTERN.captures(sanitized.trim())?;

    let month: u32 = captures[1].parse().ok()?;
    let day: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Sanitizes a decoded row and classifies it.
///
/// An `Err` means the row could be cleaned but cannot be stored (name or
/// price out of the column's range); callers count it as omitted.
pub fn check_row(raw: &RawRow) -> Result<RowVerdict> {
    let name = clean_product_name(&raw.name);
    let price = clean_product_price(&raw.price);
    let expiration = clean_product_expiration(&raw.expiration);

    // A zero price is indistinguishable from a missing one.
    let expiration = match expiration {
        Some(date) if !name.is_empty() && price > 0.0 => date,
        _ => {
            return Ok(RowVerdict::Omit(format!(
                "Missing required fields: {}",
                raw.to_json()
            )))
        }
    };

    let name_length = name.chars().count();
    if name_length > MAX_NAME_LENGTH {
        return Err(AppError::ValidationError(format!(
            "name is {} characters long, the limit is {}",
            name_length, MAX_NAME_LENGTH
        )));
    }
    if price > MAX_PRICE {
        return Err(AppError::ValidationError(format!(
            "price {} exceeds the maximum of {}",
            price, MAX_PRICE
        )));
    }

    Ok(RowVerdict::Valid(ValidatedRow {
        name,
        price,
        expiration,
    }))
}
