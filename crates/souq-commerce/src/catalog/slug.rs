//! URL slugs.

/// Convert a display name to a URL-friendly slug.
///
/// Lowercases, drops everything outside `[a-z0-9]`, whitespace and `-`,
/// turns whitespace runs into `-`, collapses dashes and trims them.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_cases() {
        let cases = [
            ("Hello World", "hello-world"),
            ("  Leading and Trailing  ", "leading-and-trailing"),
            ("UPPERCASE STRING", "uppercase-string"),
            ("special!@#$%chars", "specialchars"),
            ("multiple   spaces", "multiple-spaces"),
            ("already-slugified", "already-slugified"),
            ("Mixed CASE with-Dashes", "mixed-case-with-dashes"),
            ("", ""),
            ("   ", ""),
            ("Product Name (v2)", "product-name-v2"),
            ("café-latte", "caf-latte"),
            ("one--two---three", "one-two-three"),
            ("--edge--", "edge"),
        ];
        for (input, expected) in cases {
            assert_eq!(slugify(input), expected, "slugify({:?})", input);
        }
    }

    #[test]
    fn test_slugify_arabic_only_is_empty() {
        assert_eq!(slugify("قميص"), "");
    }
}
