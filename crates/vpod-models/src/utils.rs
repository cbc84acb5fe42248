//! Small string utilities shared across the workspace.

/// Collapse runs of whitespace and trim the ends.
pub fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip HTML tags and collapse whitespace.
pub fn strip_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    normalize_spaces(&out)
}

/// Lowercase slug safe for file and release-asset names.
pub fn safe_slug(s: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let out = out.trim_matches('-').to_string();
    let out = if out.is_empty() { "item".to_string() } else { out };
    out.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spaces() {
        assert_eq!(normalize_spaces("  a   b \t c  "), "a b c");
        assert_eq!(normalize_spaces(""), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain text"), "plain text");
    }

    #[test]
    fn test_safe_slug() {
        assert_eq!(safe_slug("Hello, World!", 60), "hello-world");
        assert_eq!(safe_slug("  --  ", 60), "item");
        assert_eq!(safe_slug("abcdef", 3), "abc");
    }
}
