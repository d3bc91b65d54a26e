//! Extraction engine: one canonical game per page from raw markup.
//!
//! Signals are tried in fixed precedence (URL path, title/heading,
//! structured data, container scan). The first signal that yields a valid
//! name decides the game; enrichment fields are then filled independently,
//! each from its first matching pattern.

pub mod enrich;
pub mod markup;
pub mod rules;
pub mod signals;

use std::sync::LazyLock;

use url::Url;

use crate::models::{ExtractedGame, Extraction};

pub use rules::NameRules;
pub use signals::{Candidate, Page, Signal, default_signals};

/// Distinct names collected from a listing page.
pub const LISTING_CAP: usize = 5;

static DEFAULT_ENGINE: LazyLock<ExtractionEngine> = LazyLock::new(ExtractionEngine::default);

/// Extract with the built-in signals and rules.
pub fn extract(html: &str, url: &str) -> Option<Extraction> {
    DEFAULT_ENGINE.extract(html, url)
}

pub struct ExtractionEngine {
    signals: Vec<Box<dyn Signal>>,
    rules: NameRules,
    listing_cap: usize,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(default_signals(), NameRules::default())
    }
}

impl ExtractionEngine {
    pub fn new(signals: Vec<Box<dyn Signal>>, rules: NameRules) -> Self {
        Self {
            signals,
            rules,
            listing_cap: LISTING_CAP,
        }
    }

    pub fn with_listing_cap(mut self, cap: usize) -> Self {
        self.listing_cap = cap.max(1);
        self
    }

    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    /// `None` when no signal produces a valid name. That is a normal
    /// outcome for pages without a game, not an error.
    pub fn extract(&self, html: &str, url: &str) -> Option<Extraction> {
        let base = Url::parse(url).ok();
        let page = Page {
            html,
            url: base.as_ref(),
        };

        let (mut game, listed_names) = self.detect(&page)?;
        enrich::enrich(&mut game, html, base.as_ref());

        tracing::debug!(
            name = %game.name,
            source = %game.source,
            listed = listed_names.len(),
            "Extracted game"
        );

        Some(Extraction { game, listed_names })
    }

    fn detect(&self, page: &Page<'_>) -> Option<(ExtractedGame, Vec<String>)> {
        for signal in &self.signals {
            let candidates = signal.candidates(page);

            if signal.is_listing() {
                let mut first: Option<Candidate> = None;
                let mut names: Vec<String> = Vec::new();
                for candidate in candidates {
                    let Some(name) = self.rules.accept(&candidate.raw_name) else {
                        continue;
                    };
                    if names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                        continue;
                    }
                    if first.is_none() {
                        first = Some(candidate);
                    }
                    names.push(name);
                    if names.len() >= self.listing_cap {
                        break;
                    }
                }

                if let (Some(candidate), Some(name)) = (first, names.first().cloned()) {
                    let mut game = ExtractedGame::new(name, signal.source());
                    game.provider = candidate.provider;
                    return Some((game, names));
                }
                continue;
            }

            for candidate in candidates {
                if let Some(name) = self.rules.accept(&candidate.raw_name) {
                    let mut game = ExtractedGame::new(name, signal.source());
                    game.provider = candidate.provider;
                    return Some((game, Vec::new()));
                }
                tracing::trace!(raw = %candidate.raw_name, source = %signal.source(), "Rejected candidate");
            }
        }
        None
    }
}
