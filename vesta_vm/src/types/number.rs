// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Number-to-string and string-to-number conversions, following the
//! language's rules: printing uses the shortest decimal digit sequence that
//! round-trips (at most 17 digits), reading accepts decimal, hex and
//! `Infinity` forms.

/// Formats a number the way the language prints it.
pub fn to_string(m: f64) -> String {
    if m.is_nan() {
        return "NaN".to_string();
    }
    if m == 0.0 {
        return "0".to_string();
    }
    if m < 0.0 {
        return format!("-{}", to_string(-m));
    }
    if m.is_infinite() {
        return "Infinity".to_string();
    }
    let (digits, n) = shortest_digits(m);
    format_digits(&digits, n)
}

/// The shortest digit string `d1..dk` (no trailing zeros) and decimal
/// exponent `n` with `m = 0.d1..dk * 10^n`.
fn shortest_digits(m: f64) -> (String, i32) {
    debug_assert!(m.is_finite() && m > 0.0);
    for k in 1..=17 {
        let formatted = format!("{:.*e}", k - 1, m);
        let round_trip: f64 = formatted.parse().expect("shortest form re-parses");
        if round_trip == m {
            let (mantissa, exponent) = formatted
                .split_once('e')
                .expect("exponential form contains an e");
            let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
            let exponent: i32 = exponent.parse().expect("exponent is an integer");
            return (digits, exponent + 1);
        }
    }
    unreachable!("17 significant digits always round-trip a finite double")
}

fn format_digits(digits: &str, n: i32) -> String {
    let k = digits.len() as i32;
    if k <= n && n <= 21 {
        // Integer with k significant digits: pad with zeros.
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        // Decimal point inside the digit sequence.
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        // Small magnitude: leading zeros after the point.
        format!("0.{}{}", "0".repeat(-n as usize), digits)
    } else if k == 1 {
        format!("{}e{}{}", digits, exponent_sign(n), (n - 1).abs())
    } else {
        format!(
            "{}.{}e{}{}",
            &digits[..1],
            &digits[1..],
            exponent_sign(n),
            (n - 1).abs()
        )
    }
}

fn exponent_sign(n: i32) -> char {
    if n - 1 >= 0 {
        '+'
    } else {
        '-'
    }
}

/// Reads a number from a string per the language's ToNumber rules: optional
/// whitespace, optional sign, then a decimal literal, a hex literal or
/// `Infinity`. Anything else is NaN; an empty or all-whitespace string is
/// zero.
pub fn to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(char::is_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return parse_hex(hex);
    }
    let (sign, rest) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if rest == "Infinity" {
        return sign * f64::INFINITY;
    }
    // A literal starts with a digit or a point, and may only contain
    // digits, a point and an exponent; this also rejects a second sign and
    // the `inf`/`NaN` spellings Rust's own parser would accept.
    let decimal_shaped = rest
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.')
        && rest
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_shaped {
        return f64::NAN;
    }
    match rest.parse::<f64>() {
        Ok(value) => sign * value,
        Err(_) => f64::NAN,
    }
}

fn parse_hex(digits: &str) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    for b in digits.bytes() {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return f64::NAN,
        };
        value = value * 16.0 + digit as f64;
    }
    value
}
