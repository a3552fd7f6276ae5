use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("URL pattern must compile."));

/// Characters commonly glued onto the end of a pasted link by prose.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ')', ']', '>', '"', '\'', ';', ':'];

/// Returns every URL embedded in `text`, in order of appearance. Each call
/// rescans from scratch; callers that need dedup do it themselves.
pub fn extract_urls(text: &str) -> Vec<String> {
	URL_RE.find_iter(text).map(|m| trim_url(m.as_str())).collect()
}

/// First URL in `text`, if any.
pub fn extract_url(text: &str) -> Option<String> {
	URL_RE.find(text).map(|m| trim_url(m.as_str()))
}

fn trim_url(raw: &str) -> String {
	raw.trim_end_matches(TRAILING_PUNCTUATION).to_string()
}
