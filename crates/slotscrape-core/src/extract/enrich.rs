//! Enrichment fields. Each field takes the first pattern that matches and
//! never looks further.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::markup;
use crate::models::{ExtractedGame, Volatility};
use crate::util::resolve_against_origin;

// RTP ---------------------------------------------------------------------

static RTP_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:rtp|return\s+to\s+player|return)\b[^0-9%]{0,30}?([0-9]{2,3}(?:[.,][0-9]{1,2})?)\s*%")
        .unwrap()
});

static RTP_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"rtp"\s*:\s*"?([0-9]{2,3}(?:\.[0-9]{1,2})?)"#).unwrap()
});

static BARE_PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{2,3}[.,][0-9]{1,2})\s*%").unwrap());

// Provider ----------------------------------------------------------------

static PROVIDER_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:provider|developer|software)\b\s*[:\-–]?\s*([A-Z0-9][\w'&.!]*(?:[ \-][A-Z0-9][\w'&.!]*){0,3})")
        .unwrap()
});

static PROVIDER_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[Bb]y\s+([A-Z][\w'&.!]*(?:[ \-][A-Z0-9][\w'&.!]*){0,3})").unwrap()
});

static PROVIDER_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"(?:provider|developer)"\s*:\s*"([^"]{2,60})""#).unwrap());

// Volatility --------------------------------------------------------------

static VOLATILITY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:volatility|variance)\b[^a-z0-9]{0,20}\b(high|medium|med|low)\b").unwrap()
});

static VOLATILITY_ADJ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(high|medium|low)[\s-]+(?:volatility|variance)\b").unwrap()
});

// Max win -----------------------------------------------------------------

static MAX_WIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:max(?:imum)?\.?\s*(?:win|payout|exposure|multiplier)|maximum)\b[^0-9]{0,30}?([0-9][0-9,.\s]*?[0-9]|[0-9])\s*[x×]")
        .unwrap()
});

// Demo URL ----------------------------------------------------------------

static DEMO_HREF_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)play|demo|opengame|launch").unwrap());

static DEMO_IFRAME_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)game|demo|opengame|launch|play").unwrap());

static DEMO_DATA_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdata-(?:game|demo)-url\s*=\s*["']([^"']+)["']"#).unwrap()
});

static DEMO_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:gameUrl|demoUrl|game_url|demo_url)"\s*:\s*"([^"]+)""#).unwrap());

// Image -------------------------------------------------------------------

static IMAGE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)slot|game|demo|thumb|preview|cover").unwrap());

static IMAGE_EXCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)icon|logo|favicon|sprite|avatar|badge|flag").unwrap());

static IMAGE_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:image|thumbnail|thumbnailUrl|cover)"\s*:\s*"([^"]+)""#).unwrap()
});

/// Fill every enrichment field that is still empty on `game`.
pub fn enrich(game: &mut ExtractedGame, html: &str, base: Option<&Url>) {
    let text = markup::visible_text(html);

    if game.rtp.is_none() {
        game.rtp = rtp(html, &text);
    }
    if game.provider.is_none() {
        game.provider = provider(html, &text);
    }
    if game.volatility.is_none() {
        game.volatility = volatility(&text);
    }
    if game.max_win.is_none() {
        game.max_win = max_win(&text);
    }
    if game.demo_url.is_none() {
        game.demo_url = demo_url(html, base);
    }
    if game.image.is_none() {
        game.image = image(html, base);
    }
}

/// `"96.51%"`. Values outside (0, 100] are ignored.
pub fn rtp(html: &str, text: &str) -> Option<String> {
    let raw = RTP_LABEL_RE
        .captures(text)
        .or_else(|| RTP_JSON_RE.captures(html))
        .or_else(|| BARE_PERCENT_RE.captures(text))
        .map(|caps| caps[1].replace(',', "."))?;

    let value: f64 = raw.parse().ok()?;
    (value > 0.0 && value <= 100.0).then(|| format!("{raw}%"))
}

/// Words that end a provider name captured from running text, e.g. the next
/// cell of a stats table ("Provider Pragmatic Play RTP 96.5%").
const PROVIDER_STOP_WORDS: &[&str] = &[
    "rtp", "volatility", "variance", "max", "maximum", "release", "released", "reels",
    "paylines", "theme", "min", "bet", "return", "type",
];

pub fn provider(html: &str, text: &str) -> Option<String> {
    [&PROVIDER_LABEL_RE, &PROVIDER_BY_RE]
        .iter()
        .find_map(|re| re.captures(text).map(|caps| cut_at_stop_word(&caps[1])))
        .filter(|p| !p.is_empty())
        .or_else(|| {
            PROVIDER_JSON_RE
                .captures(html)
                .map(|caps| markup::unescape_json_str(&caps[1]))
        })
        .and_then(|p| clean_provider(&p))
}

/// Longest provider name kept; anything longer is page text, not a name.
pub const PROVIDER_MAX_CHARS: usize = 50;

/// Trim punctuation and reject provider values outside 3..=`PROVIDER_MAX_CHARS` chars.
pub fn clean_provider(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || ".,;:!-".contains(c));
    (3..=PROVIDER_MAX_CHARS)
        .contains(&trimmed.chars().count())
        .then(|| trimmed.to_string())
}

pub fn volatility(text: &str) -> Option<Volatility> {
    VOLATILITY_LABEL_RE
        .captures(text)
        .or_else(|| VOLATILITY_ADJ_RE.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

/// `"5,000x"`: digits regrouped with thousands separators.
pub fn max_win(text: &str) -> Option<String> {
    let caps = MAX_WIN_RE.captures(text)?;
    let integer_part = caps[1].split('.').next().unwrap_or_default();
    let digits: String = integer_part.chars().filter(char::is_ascii_digit).collect();
    let value: u64 = digits.parse().ok()?;
    (value > 0).then(|| format!("{}x", group_thousands(value)))
}

pub fn demo_url(html: &str, base: Option<&Url>) -> Option<String> {
    let from_anchor = markup::tags(html, "a").find_map(|a| {
        let href = a.attr("href")?;
        if href.starts_with('#') || !DEMO_HREF_HINT_RE.is_match(&href) {
            return None;
        }
        absolutize(&href, base)
    });

    from_anchor
        .or_else(|| {
            markup::tags(html, "iframe").find_map(|iframe| {
                let src = iframe.attr("src").or_else(|| iframe.attr("data-src"))?;
                DEMO_IFRAME_HINT_RE
                    .is_match(&src)
                    .then(|| absolutize(&src, base))
                    .flatten()
            })
        })
        .or_else(|| {
            DEMO_DATA_ATTR_RE
                .captures_iter(html)
                .find_map(|caps| absolutize(&html_escape::decode_html_entities(&caps[1]), base))
        })
        .or_else(|| {
            DEMO_JSON_RE
                .captures_iter(html)
                .find_map(|caps| absolutize(&markup::unescape_json_str(&caps[1]), base))
        })
}

pub fn image(html: &str, base: Option<&Url>) -> Option<String> {
    let from_img = markup::tags(html, "img").find_map(|img| {
        let src = img.attr("src").or_else(|| img.attr("data-src"))?;
        if src.starts_with("data:") {
            return None;
        }
        let class = img.attr("class").unwrap_or_default();
        if IMAGE_EXCLUDE_RE.is_match(&src) || IMAGE_EXCLUDE_RE.is_match(&class) {
            return None;
        }
        let alt = img.attr("alt").unwrap_or_default();
        let hinted = IMAGE_HINT_RE.is_match(&src)
            || IMAGE_HINT_RE.is_match(&class)
            || IMAGE_HINT_RE.is_match(&alt);
        hinted.then(|| absolutize(&src, base)).flatten()
    });

    from_img
        .or_else(|| {
            markup::tags(html, "meta").find_map(|meta| {
                let key = meta.attr("property").or_else(|| meta.attr("name"))?;
                if key.eq_ignore_ascii_case("og:image") {
                    absolutize(&meta.attr("content")?, base)
                } else {
                    None
                }
            })
        })
        .or_else(|| {
            IMAGE_JSON_RE.captures_iter(html).find_map(|caps| {
                let src = markup::unescape_json_str(&caps[1]);
                if IMAGE_EXCLUDE_RE.is_match(&src) {
                    None
                } else {
                    absolutize(&src, base)
                }
            })
        })
}

fn cut_at_stop_word(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .take_while(|word| !PROVIDER_STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolutize(href: &str, base: Option<&Url>) -> Option<String> {
    match base {
        Some(base) => resolve_against_origin(base, href),
        None => Url::parse(href)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(|u| u.to_string()),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
