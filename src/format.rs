//! Display and normalization helpers for company identifiers.

/// Number of digits in a CNPJ.
pub const CNPJ_DIGITS: usize = 14;

/// Keep only ASCII digits.
pub fn normalize_cnpj(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a CNPJ as `XX.XXX.XXX/XXXX-XX`.
///
/// Partial input is formatted progressively, so the function can be applied
/// while the value is being typed. Digits beyond the fourteenth are dropped.
pub fn format_cnpj(input: &str) -> String {
    let digits: Vec<char> = normalize_cnpj(input).chars().take(CNPJ_DIGITS).collect();
    let mut out = String::with_capacity(18);
    for (i, d) in digits.iter().enumerate() {
        match i {
            2 | 5 => out.push('.'),
            8 => out.push('/'),
            12 => out.push('-'),
            _ => {}
        }
        out.push(*d);
    }
    out
}

/// The 8-digit root of a CNPJ, identifying the company across branches.
pub fn cnpj_base(cnpj: &str) -> String {
    normalize_cnpj(cnpj).chars().take(8).collect()
}

/// Truncate to `max` characters, appending `...` when shortened.
pub fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
