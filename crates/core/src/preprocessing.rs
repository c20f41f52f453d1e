use regex::Regex;
use std::sync::OnceLock;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"http\S+|www\S+").expect("url pattern is valid"))
}

/// Collapses every whitespace run to a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes raw extracted text before chunking.
///
/// Lowercases, drops URL-like tokens, replaces anything that is not an ASCII
/// letter, digit or whitespace with a space, then collapses whitespace runs.
/// URLs must go before the character filter, otherwise they survive as noise
/// tokens like `https example com`.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_urls = url_re().replace_all(&lowered, "");
    let alphanumeric: String = without_urls
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    normalize_whitespace(&alphanumeric)
}
