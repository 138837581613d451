//! Helpers for turning rendered CMS markup into plain text.

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid pattern")
});
static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid pattern"));
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(address|article|aside|blockquote|br|caption|dd|div|dl|dt|figcaption|figure|footer|h[1-6]|header|hr|img|li|main|nav|ol|p|pre|section|table|tbody|td|tfoot|th|thead|tr|ul)\b[^>]*>",
    )
    .expect("valid pattern")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid pattern"));
static SHORTCODES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[/?[A-Za-z][\w-]*(\s[^\]]*)?\]").expect("valid pattern"));
static NUMERIC_ENTITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x|X)?([0-9A-Fa-f]+);").expect("valid pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Strip markup, shortcodes, and entities, returning whitespace-normalized plain text.
///
/// Block-level tags separate words; inline tags vanish so punctuation stays attached.
pub fn to_plain_text(markup: &str) -> String {
    let text = SCRIPT_BLOCKS.replace_all(markup, " ");
    let text = COMMENTS.replace_all(&text, " ");
    let text = BLOCK_TAGS.replace_all(&text, " ");
    let text = TAGS.replace_all(&text, "");
    let text = SHORTCODES.replace_all(&text, " ");
    let text = decode_entities(&text);
    normalize_whitespace(&text)
}

/// Collapse whitespace runs into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Return at most `max_words` words, appending an ellipsis when text was cut.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max_words).collect();
    let mut truncated = kept.join(" ");
    if words.next().is_some() {
        truncated.push('…');
    }
    truncated
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITIES.replace_all(text, |caps: &regex::Captures<'_>| {
        let radix = if caps.get(1).is_some() { 16 } else { 10 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&hellip;", "…")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_scripts_and_shortcodes() {
        let markup = r#"<p>Hello <strong>world</strong>.</p>
<script>alert("x")</script>
[caption id="1"]<img src="a.png">Photo[/caption]
<!-- wp:paragraph --><p>Second&nbsp;line</p><!-- /wp:paragraph -->"#;
        assert_eq!(to_plain_text(markup), "Hello world. Photo Second line");
    }

    #[test]
    fn inline_tags_do_not_split_words_or_punctuation() {
        assert_eq!(
            to_plain_text(r#"<p>Read <a href="/x">the <em>docs</em></a>, then <span>re</span>try.</p>"#),
            "Read the docs, then retry."
        );
        assert_eq!(to_plain_text("<li>One</li><li>Two</li>"), "One Two");
        assert_eq!(to_plain_text("Line one<br/>Line two"), "Line one Line two");
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            to_plain_text("Tom &amp; Jerry&#8217;s &#x201C;show&#x201D; &lt;3"),
            "Tom & Jerry’s “show” <3"
        );
    }

    #[test]
    fn keeps_bracketed_numbers() {
        assert_eq!(to_plain_text("See note [1] below"), "See note [1] below");
    }

    #[test]
    fn truncate_words_marks_cut_text() {
        assert_eq!(truncate_words("one two three", 2), "one two…");
        assert_eq!(truncate_words("one two", 2), "one two");
    }
}
