use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which detection signal produced a game name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameSource {
    UrlPath,
    Title,
    StructuredData,
    Container,
}

impl GameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameSource::UrlPath => "url-path",
            GameSource::Title => "title",
            GameSource::StructuredData => "structured-data",
            GameSource::Container => "container",
        }
    }
}

impl fmt::Display for GameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Medium,
    High,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Volatility::Low => "low",
            Volatility::Medium => "medium",
            Volatility::High => "high",
        }
    }
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Volatility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Volatility::Low),
            "medium" | "med" => Ok(Volatility::Medium),
            "high" => Ok(Volatility::High),
            _ => Err(format!("Unknown volatility: {}", s)),
        }
    }
}

/// A single game record extracted from a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedGame {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Percentage string, e.g. `"96.51%"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Volatility>,
    /// Multiplier string, e.g. `"5,000x"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_win: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    pub source: GameSource,
}

impl ExtractedGame {
    pub fn new(name: impl Into<String>, source: GameSource) -> Self {
        Self {
            name: name.into(),
            provider: None,
            rtp: None,
            volatility: None,
            max_win: None,
            image: None,
            demo_url: None,
            source,
        }
    }

    /// Normalized identity used by the game store to detect duplicates.
    pub fn slug(&self) -> String {
        game_slug(&self.name)
    }
}

/// Output of the extraction engine for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub game: ExtractedGame,
    /// Other distinct names seen on a listing page (container scan only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listed_names: Vec<String>,
}

/// Result of saving an extracted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub id: Uuid,
    pub slug: String,
    /// False when a record with the same slug already existed.
    pub created: bool,
}

/// Derive the storage identity of a game name.
///
/// Lowercases, keeps alphanumerics (any script), turns whitespace and dash
/// runs into a single `-` and drops everything else.
/// Example: `"Gates of Olympus 1000!"` → `"gates-of-olympus-1000"`, `"Año Nuevo"` → `"año-nuevo"`
pub fn game_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}
