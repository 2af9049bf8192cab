/// Mobile prefixes accepted for shipping contact numbers.
const VALID_PREFIXES: [&str; 5] = ["03", "05", "07", "08", "09"];

/// Check a shipping phone number: exactly 10 ASCII digits, starting with
/// one of the valid mobile prefixes.
pub fn is_valid_mobile(raw: &str) -> bool {
    let digits = raw.trim();

    digits.len() == 10
        && digits.bytes().all(|b| b.is_ascii_digit())
        && VALID_PREFIXES.iter().any(|p| digits.starts_with(p))
}
