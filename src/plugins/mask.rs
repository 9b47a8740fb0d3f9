const SHORT_MASK: &str = "****";

/// Display-safe form of a sensitive value. Values of eight characters or
/// fewer collapse to a fixed mask; longer ones keep only their first and
/// last four characters.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return SHORT_MASK.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
