//! Locale-invariant numeric grammar shared by data lines and metadata values.
//!
//! Accepted: optional sign, decimal digits with at most one `.` (at least one
//! digit in total), optional exponent `e`/`E` with optional sign and at least
//! one digit. `1.23E-05`, `-.5`, `3.` and `+7e2` parse; `1,5`, `1_000`,
//! `inf` and `NaN` do not. Tokens that match but overflow `f64` (`1e400`)
//! are rejected as well.

/// Parse `token` with the MDM numeric grammar.
pub fn parse_number(token: &str) -> Option<f64> {
    if is_number(token) {
        token.parse::<f64>().ok().filter(|v| v.is_finite())
    } else {
        None
    }
}

/// Whether `token` matches the numeric grammar.
pub fn is_number(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let mut digits = 0;
    let mut seen_dot = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.5E-3", 0.0015)]
    #[case("1.23E-05", 1.23e-5)]
    #[case("-0.25", -0.25)]
    #[case("+7e2", 700.0)]
    #[case(".5", 0.5)]
    #[case("3.", 3.0)]
    #[case("42", 42.0)]
    #[case("1e-400", 0.0)]
    fn accepts_decimal_and_scientific(#[case] token: &str, #[case] expected: f64) {
        assert_eq!(parse_number(token), Some(expected));
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("-")]
    #[case(".")]
    #[case("1e")]
    #[case("1e+")]
    #[case("1.2.3")]
    #[case("1,5")]
    #[case("1_000")]
    #[case("inf")]
    #[case("NaN")]
    #[case("0x10")]
    #[case("1e400")]
    #[case("-1e309")]
    fn rejects_everything_else(#[case] token: &str) {
        assert_eq!(parse_number(token), None);
    }
}
