/// Format an amount with thousands separators and the given currency symbol: €1,234.56
pub fn money_in(val: f64, symbol: &str) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{dec_part}")
}

/// Debit/credit column cell: blank for zero so ledgers read like a paper journal.
pub fn side(val: f64, symbol: &str) -> String {
    if val.abs() < 0.005 {
        String::new()
    } else {
        money_in(val, symbol)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money_in(1234.56, "$"), "$1,234.56");
        assert_eq!(money_in(-500.00, "$"), "-$500.00");
        assert_eq!(money_in(0.0, "$"), "$0.00");
        assert_eq!(money_in(1000000.99, "$"), "$1,000,000.99");
        assert_eq!(money_in(100.0, "$"), "$100.00");
    }

    #[test]
    fn test_money_in_other_currency() {
        assert_eq!(money_in(12345.5, "€"), "€12,345.50");
    }

    #[test]
    fn test_negative_rounding_to_zero_has_no_sign() {
        assert_eq!(money_in(-0.001, "$"), "$0.00");
    }

    #[test]
    fn test_side_blanks_zero() {
        assert_eq!(side(0.0, "$"), "");
        assert_eq!(side(42.1, "$"), "$42.10");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
