use url::Url;

use crate::error::AppError;

/// Parse and validate a user-submitted target URL.
///
/// Accepts only absolute `http`/`https` URLs with a host.
/// Example: `"https://example.com/games/x"` → `Ok(Url)`, `"ftp://x"` → `Err(InvalidUrl)`
pub fn validate_target_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUrl("URL is required".into()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| AppError::InvalidUrl(format!("'{trimmed}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::InvalidUrl(format!(
                "unsupported scheme '{other}' (only http and https)"
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidUrl(format!("'{trimmed}' has no host")));
    }

    Ok(url)
}

/// `scheme://host[:port]` of a URL, e.g. `"https://example.com"`.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolve `href` (absolute, protocol-relative, or relative) against the
/// origin of `base`. Returns `None` unless the result is http(s).
pub fn resolve_against_origin(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
        return None;
    }

    let root = Url::parse(&format!("{}/", origin_of(base))).ok()?;
    let resolved = if href.starts_with('/') || href.contains("://") {
        root.join(href).ok()?
    } else {
        root.join(&format!("/{href}")).ok()?
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Title-case each whitespace-separated word, keeping the rest of the word as-is.
/// Example: `"gates of olympus"` → `"Gates Of Olympus"`
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max` characters, appending `…` when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
