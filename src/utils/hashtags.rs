use std::sync::LazyLock;

use regex::Regex;

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    // letters (accented included), digits and underscore after a '#'
    Regex::new(r"#([\p{L}\p{N}_]+)").unwrap()
});

/// Extracts hashtags from a caption, lowercased, without '#', first occurrence wins.
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for capture in HASHTAG.captures_iter(caption) {
        let tag = capture[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_accented_tags() {
        let tags = extract_hashtags("Poutine time #Québec #MTL #québec #514_vibes");
        assert_eq!(tags, vec!["québec", "mtl", "514_vibes"]);
    }

    #[test]
    fn test_no_tags() {
        assert!(extract_hashtags("pas de tag # ici").is_empty());
    }
}
