//! SQL LIKE patterns as regular expressions

/// Anchored regex source for a LIKE pattern: `%` is any run of characters,
/// `_` is one character, and `escape` makes the next character literal.
pub fn like_to_regex(pattern: &str, escape: Option<char>) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            let escaped = chars
                .next()
                .ok_or_else(|| format!("LIKE pattern ends with escape character: {pattern}"))?;
            out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            continue;
        }
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn like(value: &str, pattern: &str, escape: Option<char>) -> bool {
        Regex::new(&like_to_regex(pattern, escape).unwrap())
            .unwrap()
            .is_match(value)
    }

    #[test]
    fn test_wildcards() {
        assert!(like("https://a.b", "http%", None));
        assert!(like("cat", "c_t", None));
        assert!(!like("coat", "c_t", None));
        assert!(like("a.b", "a.b", None));
        assert!(!like("axb", "a.b", None));
    }

    #[test]
    fn test_escape() {
        assert!(like("100%", "100!%", Some('!')));
        assert!(!like("1000", "100!%", Some('!')));
        assert!(like("a_b", "a\\_b", Some('\\')));
        assert!(like_to_regex("abc!", Some('!')).is_err());
    }
}
