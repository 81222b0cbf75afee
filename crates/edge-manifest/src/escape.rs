//! Escape serialized JSON for embedding inside an HTML `<script>`.

/// Replace `&`, `>`, `<`, U+2028 and U+2029 with `\uXXXX` escapes.
///
/// Keeps a JSON string literal from closing the surrounding tag early or
/// breaking on line separators. Everything else passes through. Apply
/// exactly once, where the JSON is embedded.
pub fn html_escape_json_string(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '&' => out.push_str("\\u0026"),
            '>' => out.push_str("\\u003e"),
            '<' => out.push_str("\\u003c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_script_tags() {
        assert_eq!(
            html_escape_json_string("<script>&</script>"),
            r"\u003cscript\u003e\u0026\u003c/script\u003e"
        );
    }

    #[test]
    fn test_escapes_line_separators() {
        assert_eq!(
            html_escape_json_string("a\u{2028}b\u{2029}c"),
            r"a\u2028b\u2029c"
        );
    }

    #[test]
    fn test_passthrough() {
        let input = r#"{"title":"café \"quoted\" \\ 你好","n":1}"#;
        assert_eq!(html_escape_json_string(input), input);
        assert_eq!(html_escape_json_string(""), "");
    }

    #[test]
    fn test_output_has_no_special_characters() {
        let out = html_escape_json_string("<a href=\"x&y\">\u{2028}</a>");
        assert!(!out.contains(['&', '<', '>', '\u{2028}', '\u{2029}']));
    }

    #[test]
    fn test_embedded_json_still_parses() {
        let json = serde_json::json!({"html": "</script><script>alert(1)</script>"}).to_string();
        let escaped = html_escape_json_string(&json);

        assert!(!escaped.contains("</script>"));
        let parsed: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(parsed["html"], "</script><script>alert(1)</script>");
    }
}
