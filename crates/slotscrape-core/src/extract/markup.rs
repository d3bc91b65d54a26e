//! Pattern helpers over raw markup text. There is no DOM here: tags are
//! located with regexes and attributes are read from the tag text.

use std::sync::LazyLock;

use regex::Regex;

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<([a-z][a-z0-9]*)\b([^>]*)>").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});

static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static INVISIBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<!--.*?-->")
        .unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// An opening tag: its lowercase name and raw attribute text.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub name: &'a str,
    attrs: &'a str,
}

impl<'a> Tag<'a> {
    /// Value of attribute `key` (case-insensitive), entity-decoded.
    pub fn attr(&self, key: &str) -> Option<String> {
        ATTR_RE.captures_iter(self.attrs).find_map(|caps| {
            let name = caps.get(1)?.as_str();
            if !name.eq_ignore_ascii_case(key) {
                return None;
            }
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some(html_escape::decode_html_entities(raw).trim().to_string())
        })
    }

    /// Raw attribute text, for hint matching across all attributes at once.
    pub fn attrs(&self) -> &'a str {
        self.attrs
    }
}

/// Opening tags named `name`, in document order.
pub fn tags<'a>(html: &'a str, name: &'a str) -> impl Iterator<Item = Tag<'a>> + 'a {
    OPEN_TAG_RE.captures_iter(html).filter_map(move |caps| {
        let tag_name = caps.get(1)?.as_str();
        tag_name.eq_ignore_ascii_case(name).then(|| Tag {
            name: tag_name,
            attrs: caps.get(2).map_or("", |m| m.as_str()),
        })
    })
}

/// Parse a single opening tag's attribute text (e.g. a regex capture).
pub fn tag_from_attrs<'a>(name: &'a str, attrs: &'a str) -> Tag<'a> {
    Tag { name, attrs }
}

/// Replace tags with spaces, decode entities, collapse whitespace.
pub fn strip_tags(fragment: &str) -> String {
    let without_tags = ANY_TAG_RE.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

/// Human-visible text of a page: scripts, styles and comments removed.
pub fn visible_text(html: &str) -> String {
    strip_tags(&INVISIBLE_RE.replace_all(html, " "))
}

pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Decode a JSON string literal body (`\/`, `é`, ...). Falls back to the input.
pub fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}
