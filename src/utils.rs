/// Splits a multi-valued attribute on any of comma, semicolon or whitespace,
/// dropping empty segments. Used for alias lists and `depends-on`.
pub fn tokenize_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', ' ', '\t', '\n', '\r'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a comma-delimited list, trimming each segment. Used for the
/// autowire-candidate name patterns.
pub fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Simple glob matching: `*` matches any run of characters, everything else
/// matches literally.
pub fn simple_match(pattern: &str, text: &str) -> bool {
    match pattern.find('*') {
        None => pattern == text,
        Some(star) => {
            let (head, rest) = (&pattern[..star], &pattern[star + 1..]);
            if !text.starts_with(head) {
                return false;
            }
            if rest.is_empty() {
                return true;
            }
            let tail = &text[head.len()..];
            (0..=tail.len())
                .filter(|&i| tail.is_char_boundary(i))
                .any(|i| simple_match(rest, &tail[i..]))
        }
    }
}

pub fn any_pattern_matches(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| simple_match(p, text))
}
