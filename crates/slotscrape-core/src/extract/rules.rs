//! Name cleaning and validation rules.
//!
//! The word lists are plain data; extend them with the builder methods
//! instead of adding checks to the signals.

use std::sync::LazyLock;

use regex::Regex;

use super::markup;
use crate::models::game_slug;

/// Names that are rejected when they are the whole (cleaned) candidate.
const EXACT_DENYLIST: &[&str] = &[
    "home", "homepage", "login", "log in", "register", "casino", "casinos", "slots", "games",
    "play", "free", "demo", "online", "welcome", "bonus", "bonuses", "contact", "contact us",
    "about", "about us", "terms", "privacy", "privacy policy", "support", "help", "faq", "news",
    "blog", "promotions", "promo", "logo", "sign up", "sign in", "menu", "search", "launch",
    "spin", "lobby", "jackpot", "jackpots", "live casino", "sports", "sportsbook", "poker",
    "account", "my account", "cashier", "deposit", "withdraw", "vip", "rewards", "tournaments",
    "new", "popular", "all", "top", "best", "error", "loading", "providers", "reviews",
];

/// Words or phrases that reject a candidate wherever they appear as whole words.
/// Collected from pages that produced bad names: site chrome, brand names of
/// the casinos themselves, anti-bot interstitials.
const PHRASE_DENYLIST: &[&str] = &[
    "joey", "phoebe", "rachel", "ross", "monica", "chandler",
    "bovada", "betus", "vegas", "jackpot capital", "grande", "paradise", "aces", "basketball",
    "just a moment", "access denied", "attention required", "cloudflare", "captcha",
    "verify you are human", "are you a robot", "enable javascript", "forbidden",
    "not found", "404", "403", "cookie", "cookies", "maintenance", "coming soon",
    "terms and conditions", "responsible gambling", "log in", "sign up", "sign in",
];

/// Filler words stripped from names ("Sweet Bonanza Demo" → "Sweet Bonanza").
const FILLER_WORDS: &[&str] = &["demo", "slot", "slots", "game", "games", "free", "play"];

static PIPE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[|»].*$").unwrap());

static DASH_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-–—]\s+.*$").unwrap());

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:\([^)]*\)|\[[^\]]*\])").unwrap());

#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_len: usize,
    pub max_len: usize,
    filler_words: Vec<String>,
    exact_denylist: Vec<String>,
    phrase_denylist: Vec<String>,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 60,
            filler_words: FILLER_WORDS.iter().map(|s| s.to_string()).collect(),
            exact_denylist: EXACT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            phrase_denylist: PHRASE_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NameRules {
    pub fn with_length_bounds(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn deny_exact<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exact_denylist
            .extend(names.into_iter().map(|s| normalize_words(s.as_ref())));
        self
    }

    pub fn deny_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.phrase_denylist
            .extend(phrases.into_iter().map(|s| normalize_words(s.as_ref())));
        self
    }

    /// Clean a raw candidate: strip markup, site suffixes, parentheticals
    /// and filler words, then collapse whitespace.
    pub fn clean(&self, raw: &str) -> String {
        let text = markup::strip_tags(raw);
        let text = PIPE_SUFFIX_RE.replace(&text, "");
        let text = DASH_SUFFIX_RE.replace(&text, "");
        let text = PARENTHETICAL_RE.replace_all(&text, "");

        let kept: Vec<&str> = text
            .split_whitespace()
            .filter(|word| {
                let bare = word
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                !self.filler_words.contains(&bare)
            })
            .collect();

        kept.join(" ")
            .trim_matches(|c: char| c.is_whitespace() || "-–—|:;,·•/".contains(c))
            .to_string()
    }

    /// Whether a cleaned name is acceptable as a game name.
    pub fn is_valid(&self, name: &str) -> bool {
        let len = name.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if !name.chars().any(char::is_alphabetic) || game_slug(name).is_empty() {
            return false;
        }

        let normalized = normalize_words(name);
        if self.exact_denylist.iter().any(|d| *d == normalized) {
            return false;
        }

        let padded = format!(" {normalized} ");
        !self
            .phrase_denylist
            .iter()
            .any(|phrase| padded.contains(&format!(" {phrase} ")))
    }

    /// Clean then validate. `None` means the candidate is discarded.
    pub fn accept(&self, raw: &str) -> Option<String> {
        let cleaned = self.clean(raw);
        self.is_valid(&cleaned).then_some(cleaned)
    }
}

/// Lowercase words separated by single spaces, punctuation dropped.
/// Example: `"Just a Moment..."` → `"just a moment"`
fn normalize_words(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
