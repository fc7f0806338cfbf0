//! Unified-diff extraction from free-form text.
//!
//! Pure text in, optional diff out. The extractor knows nothing about
//! where the text came from; it only recognizes the `---`/`+++`/`@@`
//! shape of a unified diff.

use regex::Regex;
use std::sync::OnceLock;

/// Extracts a unified diff from free-form text.
///
/// Strict match first: the earliest `---` header line immediately
/// followed by a `+++` line and at least one `@@` hunk, consuming from
/// there to the end of the text. Weak fallback: the first bare header
/// pair even without a hunk. `None` when neither shape exists.
pub fn extract_unified_diff(text: &str) -> Option<String> {
    static STRICT: OnceLock<Regex> = OnceLock::new();
    static WEAK: OnceLock<Regex> = OnceLock::new();
    let strict = STRICT.get_or_init(|| {
        Regex::new(r"(?ms)^--- [^\n]+\n\+\+\+ [^\n]+\n(?:@@.*\n.*)+").unwrap()
    });
    let weak = WEAK.get_or_init(|| Regex::new(r"(?m)^--- [^\n]+\n\+\+\+ [^\n]+\n").unwrap());

    if let Some(m) = strict.find(text) {
        return Some(text[m.start()..].trim().to_string());
    }
    if let Some(m) = weak.find(text) {
        return Some(text[m.start()..].trim().to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-old\n+new\n";

    #[test]
    fn well_formed_diff_is_returned_verbatim() {
        let input = format!("Sure, here is the fix:\n\n{WELL_FORMED}");
        assert_eq!(extract_unified_diff(&input), Some(WELL_FORMED.trim().to_string()));
    }

    #[test]
    fn extraction_consumes_to_end_of_text() {
        let input = format!(
            "prose\n{WELL_FORMED}--- a/g\n+++ b/g\n@@ -2 +2 @@\n-x\n+y\n"
        );
        let diff = extract_unified_diff(&input).unwrap();
        assert!(diff.starts_with("--- a/f"));
        assert!(diff.contains("+++ b/g"));
    }

    #[test]
    fn headers_without_hunk_fall_back_to_weak_match() {
        let input = "notes\n--- a/f\n+++ b/f\ntrailing explanation\n";
        let diff = extract_unified_diff(input).unwrap();
        assert!(diff.starts_with("--- a/f"));
        assert!(diff.contains("trailing explanation"));
    }

    #[test]
    fn strict_match_requires_adjacent_headers() {
        // A lone "---" horizontal rule followed by prose is not a diff.
        let input = "---\nsome markdown section\n";
        assert_eq!(extract_unified_diff(input), None);
    }

    #[test]
    fn no_header_pair_means_no_diff() {
        assert_eq!(extract_unified_diff("I could not find a fix."), None);
        assert_eq!(extract_unified_diff(""), None);
    }

    #[test]
    fn hunk_must_follow_plus_header_for_strict_match() {
        // Headers separated from the hunk by prose only satisfy the weak matcher,
        // which still returns from the header onward.
        let input = "--- a/f\n+++ b/f\nexplanation\n@@ -1 +1 @@\n-a\n+b\n";
        let diff = extract_unified_diff(input).unwrap();
        assert!(diff.starts_with("--- a/f"));
    }

    #[test]
    fn leading_chatter_is_stripped() {
        let input = format!("The build fails because of X.\n\n{WELL_FORMED}\nHope this helps!");
        let diff = extract_unified_diff(&input).unwrap();
        assert!(diff.starts_with("--- a/f"));
        assert!(!diff.contains("because of X"));
    }
}
