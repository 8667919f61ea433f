use ammonia::Builder;
use std::collections::HashSet;

// entity-encoded markup needs one pass per encoding layer
const MAX_PASSES: usize = 8;

/// Strips every HTML tag from user-supplied text (captions, bios).
///
/// Captions are displayed as plain text, so no tag survives; the text content
/// of harmless tags is kept while `<script>`/`<style>` bodies are dropped.
/// Cleaning repeats until decoding the output yields no further markup, so
/// entity-encoded tags are stripped too and the result is a fixed point.
pub fn clean_text(input: &str) -> String {
    let mut builder = Builder::default();
    builder.tags(HashSet::new());

    let mut current = input.to_string();
    for _ in 0..MAX_PASSES {
        let decoded = unescape_basic(&builder.clean(&current).to_string());
        if decoded == current {
            return decoded;
        }
        current = decoded;
    }

    // still unstable: keep it escaped rather than decoded
    builder.clean(&current).to_string()
}

// ammonia escapes text nodes; the UI does its own escaping
fn unescape_basic(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Truncates on a char boundary.
pub fn truncate_chars(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_removed() {
        assert_eq!(clean_text("Allo<script>alert(1)</script> gang"), "Allo gang");
    }

    #[test]
    fn test_plain_tags_keep_text() {
        assert_eq!(clean_text("<b>Tiguidou</b> & co"), "Tiguidou & co");
    }

    #[test]
    fn test_entity_encoded_markup_is_stripped() {
        assert_eq!(clean_text("&lt;script&gt;alert(1)&lt;/script&gt;"), "");
        assert_eq!(clean_text("&lt;b&gt;x&lt;/b&gt;"), "x");
        assert_eq!(clean_text("&amp;lt;b&amp;gt;y&amp;lt;/b&amp;gt;"), "y");
        assert_eq!(clean_text("&#60;img src=x onerror=alert(1)&#62;salut"), "salut");
    }

    #[test]
    fn test_clean_is_idempotent() {
        for input in [
            "&lt;b&gt;x&lt;/b&gt;",
            "<i>Belle</i> journée & poutine",
            "a < b > c",
            "Fan de poutine<script>alert(1)</script>",
        ] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "input: {}", input);
            assert!(!once.contains("<script"), "input: {}", input);
        }
    }

    #[test]
    fn test_literal_comparison_survives() {
        assert_eq!(clean_text("a < b > c"), "a < b > c");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("Québec", 3), "Qué");
    }
}
