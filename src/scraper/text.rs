// text.rs
use regex::Regex;
use std::sync::OnceLock;

/// Punctuation kept by `normalize_text`. Letters, digits and whitespace are always kept.
const ALLOWED_PUNCT: &[char] = &[
    '.', ',', ';', ':', '!', '?', '-', '–', '(', ')', '/', '"', '\'', '%', '+', '№', '€', '$',
    '²', '&', '#', '@', '*',
];

/// Drop characters outside the whitelist and collapse whitespace runs.
pub fn normalize_text(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || ALLOWED_PUNCT.contains(&c) {
                c
            } else {
                // Everything else, whitespace included, becomes a separator.
                ' '
            }
        })
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize_text`, but `None` when nothing is left.
pub fn non_empty(raw: &str) -> Option<String> {
    let text = normalize_text(raw);
    (!text.is_empty()).then_some(text)
}

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Digit runs joined by single spaces or nbsp; grouping is decided in `first_integer`.
    RE.get_or_init(|| Regex::new(r"\d+(?:[ \u{a0}]\d+)*").expect("valid regex"))
}

/// First integer group in `raw`, with group separators removed.
///
/// "85 000" and "85 000лв." read as 85000. A lead run longer than three digits
/// or a following run that is not exactly three digits ends the number.
pub fn first_integer(raw: &str) -> Option<String> {
    let m = digit_runs().find(raw)?;
    let mut runs = m.as_str().split([' ', '\u{a0}']);
    let mut digits = runs.next()?.to_string();
    if digits.len() <= 3 {
        for run in runs {
            if run.len() != 3 {
                break;
            }
            digits.push_str(run);
        }
    }

    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}

/// Cut `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
