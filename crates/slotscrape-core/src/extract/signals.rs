//! Name detection signals. Each signal only proposes raw candidates; the
//! engine cleans and validates them.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{enrich, markup};
use crate::models::GameSource;

/// A page under extraction.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub html: &'a str,
    pub url: Option<&'a Url>,
}

/// A raw name proposed by a signal, plus a provider when the signal carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub raw_name: String,
    pub provider: Option<String>,
}

impl Candidate {
    pub fn named(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            provider: None,
        }
    }
}

/// One way of detecting a game name.
pub trait Signal: Send + Sync {
    fn source(&self) -> GameSource;

    /// Candidates in the order they should be tried.
    fn candidates(&self, page: &Page<'_>) -> Vec<Candidate>;

    /// Listing signals collect several distinct names instead of stopping at the first.
    fn is_listing(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// URL path
// ---------------------------------------------------------------------------

/// Path segments that never name a game on their own.
const GENERIC_SEGMENTS: &[&str] = &[
    "game", "games", "slot", "slots", "play", "demo", "free", "online", "casino", "en", "us",
    "uk", "de", "review", "reviews", "provider", "providers", "category",
];

/// Last meaningful path segment, hyphens/underscores to spaces, title-cased.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlPathSignal;

impl Signal for UrlPathSignal {
    fn source(&self) -> GameSource {
        GameSource::UrlPath
    }

    fn candidates(&self, page: &Page<'_>) -> Vec<Candidate> {
        let Some(segments) = page.url.and_then(Url::path_segments) else {
            return vec![];
        };

        segments
            .rev()
            .find(|segment| {
                !segment.is_empty()
                    && !segment.contains('.')
                    && segment.chars().any(|c| c.is_ascii_alphabetic())
                    && !GENERIC_SEGMENTS.contains(&segment.to_lowercase().as_str())
            })
            .map(|segment| {
                let spaced = segment
                    .replace("%20", " ")
                    .replace(['-', '_', '+'], " ");
                vec![Candidate::named(crate::util::title_case(&spaced))]
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Title / heading
// ---------------------------------------------------------------------------

static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").unwrap());

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());

static SUBHEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(h[23])\b([^>]*)>(.*?)</h[23]>").unwrap());

static GAME_CLASS_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)game|slot|title").unwrap());

/// Primary heading, then `<title>`, then an h2/h3 with a game/slot/title class.
#[derive(Debug, Default, Clone, Copy)]
pub struct TitleSignal;

impl Signal for TitleSignal {
    fn source(&self) -> GameSource {
        GameSource::Title
    }

    fn candidates(&self, page: &Page<'_>) -> Vec<Candidate> {
        let mut out = Vec::new();

        if let Some(caps) = H1_RE.captures(page.html) {
            out.push(Candidate::named(&caps[1]));
        }
        if let Some(caps) = TITLE_RE.captures(page.html) {
            out.push(Candidate::named(&caps[1]));
        }

        let hinted = SUBHEADING_RE.captures_iter(page.html).find(|caps| {
            markup::tag_from_attrs(&caps[1], &caps[2])
                .attr("class")
                .is_some_and(|class| GAME_CLASS_HINT_RE.is_match(&class))
        });
        if let Some(caps) = hinted {
            out.push(Candidate::named(&caps[3]));
        }

        out
    }
}

// ---------------------------------------------------------------------------
// Structured data
// ---------------------------------------------------------------------------

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .unwrap()
});

/// Meta keys carrying a title, in priority order.
const META_TITLE_KEYS: &[&str] = &["og:title", "title", "game:name", "twitter:title"];

/// JSON-LD `name`/`title` fields, then title-equivalent meta tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDataSignal;

impl Signal for StructuredDataSignal {
    fn source(&self) -> GameSource {
        GameSource::StructuredData
    }

    fn candidates(&self, page: &Page<'_>) -> Vec<Candidate> {
        let mut out = Vec::new();

        for caps in JSON_LD_RE.captures_iter(page.html) {
            match serde_json::from_str::<serde_json::Value>(caps[1].trim()) {
                Ok(value) => collect_json_ld(&value, &mut out),
                Err(e) => tracing::debug!(error = %e, "Skipping unparsable JSON-LD block"),
            }
        }

        let metas: Vec<markup::Tag<'_>> = markup::tags(page.html, "meta").collect();
        for key in META_TITLE_KEYS {
            let content = metas.iter().find_map(|meta| {
                let name = meta.attr("property").or_else(|| meta.attr("name"))?;
                if name.eq_ignore_ascii_case(key) {
                    meta.attr("content")
                } else {
                    None
                }
            });
            if let Some(content) = content {
                out.push(Candidate::named(content));
            }
        }

        out
    }
}

fn collect_json_ld(value: &serde_json::Value, out: &mut Vec<Candidate>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_ld(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            let name = ["name", "title", "headline"]
                .iter()
                .find_map(|key| map.get(*key).and_then(|v| v.as_str()));
            if let Some(name) = name {
                let provider = ["author", "brand", "publisher", "creator"]
                    .iter()
                    .find_map(|key| {
                        json_ld_name(map.get(*key)?).and_then(|p| enrich::clean_provider(&p))
                    });
                out.push(Candidate {
                    raw_name: name.to_string(),
                    provider,
                });
            }
            if let Some(graph) = map.get("@graph") {
                collect_json_ld(graph, out);
            }
        }
        _ => {}
    }
}

/// `"X"` or `{"name": "X"}` or `[{"name": "X"}, ...]`.
fn json_ld_name(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Object(map) => map.get("name")?.as_str().map(|s| s.trim().to_string()),
        serde_json::Value::Array(items) => items.iter().find_map(json_ld_name),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Container scan
// ---------------------------------------------------------------------------

static CONTAINER_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(div|article|li)\b([^>]*\bclass\s*=\s*["'][^"']*(?:game|slot)[^"']*["'][^>]*)>"#,
    )
    .unwrap()
});

static CONTAINER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(div|article|li)\b[^>]*>").unwrap());

static INNER_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[2-6]\b[^>]*>(.*?)</h[2-6]>").unwrap());

/// Content of the element whose opening `<tag>` ends at `from`, up to its
/// matching close tag. Nested elements of the same name are skipped; an
/// unclosed element runs to the end of the document.
fn element_body<'a>(html: &'a str, tag: &str, from: usize) -> &'a str {
    let rest = &html[from..];
    let mut depth = 1usize;
    for caps in CONTAINER_TAG_RE.captures_iter(rest) {
        if !caps[2].eq_ignore_ascii_case(tag) {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                let end = caps.get(0).map_or(rest.len(), |m| m.start());
                return &rest[..end];
            }
        }
    }
    rest
}

/// Card/list elements with a game/slot class hint. Used for listing pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerSignal;

impl Signal for ContainerSignal {
    fn source(&self) -> GameSource {
        GameSource::Container
    }

    fn is_listing(&self) -> bool {
        true
    }

    fn candidates(&self, page: &Page<'_>) -> Vec<Candidate> {
        CONTAINER_OPEN_RE
            .captures_iter(page.html)
            .filter_map(|caps| {
                let open = caps.get(0)?;
                let container = markup::tag_from_attrs(&caps[1], &caps[2]);
                let inner = element_body(page.html, &caps[1], open.end());

                let name = INNER_HEADING_RE
                    .captures(inner)
                    .map(|h| h[1].to_string())
                    .or_else(|| container.attr("data-game-name"))
                    .or_else(|| container.attr("data-name"))
                    .or_else(|| container.attr("title"))
                    .or_else(|| {
                        markup::tags(inner, "img").find_map(|img| img.attr("alt"))
                    })
                    .or_else(|| Some(markup::strip_tags(inner)))?;

                (!name.trim().is_empty()).then(|| Candidate::named(name))
            })
            .collect()
    }
}

/// The built-in signals in precedence order.
pub fn default_signals() -> Vec<Box<dyn Signal>> {
    vec![
        Box::new(UrlPathSignal),
        Box::new(TitleSignal),
        Box::new(StructuredDataSignal),
        Box::new(ContainerSignal),
    ]
}
