//! Parent phone-number normalization.
//!
//! Backend records carry the parent's mobile number in whatever shape the
//! Excel sheet had it: with `+20`/`0020` country prefixes, without the
//! leading zero, with spaces or dashes. Everything that keys on a parent
//! goes through [`normalize`] first.

/// Canonicalize a raw phone-like string into an Egyptian local mobile number
/// (`01XXXXXXXXX`) when possible, otherwise return the bare digits.
///
/// Never fails; empty input yields an empty string. The result is a fixed
/// point: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let digits = ascii_digits(raw);
    let mut cleaned = digits.as_str();
    while let Some(rest) = cleaned.strip_prefix("00") {
        cleaned = rest;
    }

    if cleaned.starts_with("20") && cleaned.len() >= 11 {
        let candidate = format!("0{}", &cleaned[2..]);
        if is_local_mobile(&candidate) {
            return candidate;
        }
    }

    if is_local_mobile(cleaned) {
        return cleaned.to_string();
    }

    if cleaned.len() == 10 && cleaned.starts_with('1') {
        return format!("0{cleaned}");
    }

    if cleaned.len() > 11 {
        let last10 = &cleaned[cleaned.len() - 10..];
        if last10.starts_with('1') {
            return format!("0{last10}");
        }
    }

    cleaned.to_string()
}

/// True for a canonical 11-digit local mobile number starting with `01`.
pub fn is_local_mobile(s: &str) -> bool {
    s.len() == 11 && s.starts_with("01") && s.bytes().all(|b| b.is_ascii_digit())
}

/// Keep only digits, folding Arabic-Indic digits into ASCII.
fn ascii_digits(raw: &str) -> String {
    raw.chars()
        .filter_map(|ch| match ch {
            '0'..='9' => Some(ch),
            '\u{0660}'..='\u{0669}' => char::from_digit(ch as u32 - 0x0660, 10),
            '\u{06F0}'..='\u{06F9}' => char::from_digit(ch as u32 - 0x06F0, 10),
            _ => None,
        })
        .collect()
}
