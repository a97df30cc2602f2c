use std::sync::LazyLock;

use regex::Regex;

// Anchored at line start: "Foo VS invocations: 10" is not a metric line.
static INVOCATIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^VS invocations:[ \t]*([0-9]+)[ \t]*$").expect("invocations pattern is valid")
});

/// Parse a `VS invocations: <integer>` line.
///
/// Trailing line terminators and whitespace are ignored. Anything else before
/// the label or after the digits, or a count that does not fit in a `u64`,
/// is not a match.
pub fn parse_invocations(line: &str) -> Option<u64> {
    let line = line.trim_end_matches(['\r', '\n']);
    let caps = INVOCATIONS_RE.captures(line)?;
    caps.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_metric_line() {
        assert_eq!(parse_invocations("VS invocations: 4096"), Some(4096));
    }

    #[test]
    fn line_terminators_ignored() {
        assert_eq!(parse_invocations("VS invocations: 12\n"), Some(12));
        assert_eq!(parse_invocations("VS invocations: 12\r\n"), Some(12));
        assert_eq!(parse_invocations("VS invocations: 12   "), Some(12));
    }

    #[test]
    fn no_space_after_label() {
        assert_eq!(parse_invocations("VS invocations:7"), Some(7));
    }

    #[test]
    fn missing_digits_is_no_match() {
        assert_eq!(parse_invocations("VS invocations: "), None);
        assert_eq!(parse_invocations("VS invocations:"), None);
    }

    #[test]
    fn leading_text_is_no_match() {
        assert_eq!(parse_invocations("Foo VS invocations: 10"), None);
        assert_eq!(parse_invocations(" VS invocations: 10"), None);
    }

    #[test]
    fn malformed_numbers_are_no_match() {
        assert_eq!(parse_invocations("VS invocations: 12abc"), None);
        assert_eq!(parse_invocations("VS invocations: -12"), None);
        assert_eq!(parse_invocations("VS invocations: 1.5"), None);
        assert_eq!(parse_invocations("VS invocations: 99999999999999999999999"), None);
    }

    #[test]
    fn label_is_case_sensitive() {
        assert_eq!(parse_invocations("vs invocations: 10"), None);
    }

    #[test]
    fn unrelated_output_is_no_match() {
        assert_eq!(parse_invocations("Selected physical device: Intel(R) Graphics"), None);
        assert_eq!(parse_invocations(""), None);
    }
}
