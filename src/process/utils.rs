use once_cell::sync::Lazy;
use regex::Regex;

/// Leading 6-digit municipality code followed by the name, as TabNet prints row labels.
static MUNICIPALITY_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{6})\s*(.*)$").expect("municipality label regex"));

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Collapse every run of whitespace (including `&nbsp;`) into one space.
pub fn normalize_ws(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode bytes as UTF-8 when valid, otherwise as latin-1 (every byte is one code point).
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse a pt-BR formatted number: `.` groups thousands, `,` separates decimals.
/// TabNet prints `-` for zero.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }
    if s == "-" {
        return Some(0.0);
    }
    let normalized: String = s
        .chars()
        .filter(|&c| c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_locale_number`] but only accepts non-negative whole numbers.
pub fn parse_locale_count(raw: &str) -> Option<u64> {
    parse_locale_number(raw)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u64)
}

/// Decimal in either notation: a comma means pt-BR, otherwise plain `f64` syntax.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = clean_str(raw);
    if s.contains(',') {
        parse_locale_number(&s)
    } else {
        s.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Parse a bare municipality code. Seven-digit IBGE codes carry a trailing
/// check digit, which is dropped.
pub fn parse_mun_code(raw: &str) -> Option<u32> {
    let s = clean_str(raw);
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match s.len() {
        6 => s.parse().ok(),
        7 => s[..6].parse().ok(),
        _ => None,
    }
}

/// Split a TabNet row label like `"355030 SAO PAULO"` into code and name.
pub fn split_municipality_label(label: &str) -> Option<(u32, String)> {
    let cleaned = normalize_ws(label);
    let caps = MUNICIPALITY_LABEL.captures(&cleaned)?;
    let code = caps[1].parse().ok()?;
    Some((code, caps[2].to_string()))
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_numbers() {
        assert_eq!(parse_locale_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_locale_number(" 12.345 "), Some(12345.0));
        assert_eq!(parse_locale_number("0,5"), Some(0.5));
        assert_eq!(parse_locale_number("-"), Some(0.0));
        assert_eq!(parse_locale_number(""), None);
        assert_eq!(parse_locale_number("abc"), None);
    }

    #[test]
    fn locale_counts_reject_fractions() {
        assert_eq!(parse_locale_count("3.021"), Some(3021));
        assert_eq!(parse_locale_count("2,5"), None);
        assert_eq!(parse_locale_count("-"), Some(0));
    }

    #[test]
    fn decimals_in_both_notations() {
        assert_eq!(parse_decimal("0.62"), Some(0.62));
        assert_eq!(parse_decimal("0,62"), Some(0.62));
        assert_eq!(parse_decimal("-0.21"), Some(-0.21));
    }

    #[test]
    fn municipality_codes() {
        assert_eq!(parse_mun_code("355030"), Some(355030));
        assert_eq!(parse_mun_code("3550308"), Some(355030));
        assert_eq!(parse_mun_code("35503"), None);
        assert_eq!(parse_mun_code("Total"), None);
        assert_eq!(
            split_municipality_label("110001 Alta Floresta D'Oeste"),
            Some((110001, "Alta Floresta D'Oeste".to_string()))
        );
        assert_eq!(split_municipality_label("Total"), None);
        assert_eq!(split_municipality_label("11000 Truncated"), None);
    }

    #[test]
    fn latin1_fallback() {
        let bytes = b"Munic\xedpio";
        assert_eq!(decode_text(bytes), "Município");
        assert_eq!(decode_text("São".as_bytes()), "São");
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(50.0, 2), 50.0);
        assert_eq!(round_to(1.0 / 1.05, 4), 0.9524);
        assert_eq!(round_to(33.33333, 2), 33.33);
    }
}
