use serde_json::Value;

const MAGNITUDE_WORDS: [&str; 8] =
    ["k", "thousand", "lakh", "lakhs", "lac", "crore", "crores", "million"];

/// Normalizes a currency amount such as `"50,000 INR"`, `"₹ 1,20,000"` or
/// `"Rs.85000/-"` into a whole number.
///
/// Commas are dropped, the first whitespace-delimited token holding a digit is
/// taken, and a currency prefix or a separate unit word around it is ignored.
/// Negative amounts and amounts with a non-zero fractional part are rejected,
/// as are magnitude shorthands (`"50k"`, `"2 lakh"`) and digit groups split by
/// spaces (`"50 000"`), since truncating those would change the amount.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let without_separators = raw.replace(',', "");
    let mut tokens = without_separators.split_whitespace();
    let token = tokens.find(|token| token.bytes().any(|b| b.is_ascii_digit()))?;
    if tokens.next().is_some_and(scales_or_continues_amount) {
        return None;
    }

    let digits_start = token.find(|ch: char| ch.is_ascii_digit())?;
    if token[..digits_start].ends_with('-') {
        return None;
    }

    let rest = &token[digits_start..];
    let digits_end = rest.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(rest.len());
    let (digits, mut tail) = rest.split_at(digits_end);

    if let Some(fraction) = tail.strip_prefix('.') {
        let fraction_end = fraction.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(fraction.len());
        let (fraction_digits, after) = fraction.split_at(fraction_end);
        if fraction_digits.bytes().any(|b| b != b'0') {
            return None;
        }
        tail = after;
    }
    if tail.starts_with(char::is_alphabetic) {
        return None;
    }

    digits.parse::<u64>().ok()
}

fn scales_or_continues_amount(next: &str) -> bool {
    let word = next.trim_end_matches(|ch: char| !ch.is_alphanumeric()).to_ascii_lowercase();
    next.starts_with(|ch: char| ch.is_ascii_digit()) || MAGNITUDE_WORDS.contains(&word.as_str())
}

/// Same normalization for values that may already be numeric, as catalog
/// prices often are.
pub fn parse_amount_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number.as_f64().filter(|amount| *amount >= 0.0 && amount.fract() == 0.0).and_then(
                |amount| (amount <= u64::MAX as f64).then_some(amount as u64),
            )
        }),
        Value::String(text) => parse_amount(text),
        _ => None,
    }
}
