use std::net::IpAddr;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION, REFERER, USER_AGENT};
use reqwest::{Client, Url};
use slotscrape_core::config::env_flag;
use slotscrape_core::error::AppError;
use slotscrape_core::strategy::Strategy;
use slotscrape_core::traits::PageFetcher;
use slotscrape_core::util::{origin_of, validate_target_url};

/// Upper bound on redirects followed per request. Each hop is checked like
/// the original URL.
const MAX_REDIRECTS: usize = 5;

/// HTTP page fetcher using reqwest.
///
/// Headers, User-Agent and timeout come from the strategy of each call; the
/// underlying client (connection pool, cookie-less) is shared. SSRF protection
/// is **enabled** by default and applies to every redirect hop; see
/// [`allow_private_urls`](Self::allow_private_urls).
#[derive(Clone)]
pub struct ReqwestPageFetcher {
    client: Client,
    ssrf_protection: bool,
}

impl ReqwestPageFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            ssrf_protection: true,
        })
    }

    /// Build a fetcher honoring `SLOTSCRAPE_ALLOW_PRIVATE_URLS`.
    pub fn from_env() -> Result<Self, AppError> {
        let fetcher = Self::new()?;
        if env_flag("SLOTSCRAPE_ALLOW_PRIVATE_URLS") {
            tracing::warn!("SSRF protection disabled (SLOTSCRAPE_ALLOW_PRIVATE_URLS)");
            return Ok(fetcher.allow_private_urls());
        }
        Ok(fetcher)
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only for local testing or CLI usage where the user controls the machine.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }
}

/// Request headers for one strategy against `url`.
fn strategy_headers(url: &str, strategy: &Strategy) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::with_capacity(strategy.headers.len() + 2);

    let user_agent = HeaderValue::from_str(&strategy.user_agent)
        .map_err(|e| AppError::ConfigError(format!("Invalid User-Agent in {}: {e}", strategy.name)))?;
    headers.insert(USER_AGENT, user_agent);

    for (name, value) in &strategy.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("Invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::ConfigError(format!("Invalid header value for '{name}': {e}")))?;
        headers.insert(name, value);
    }

    if strategy.referer_origin {
        let origin = origin_of(&validate_target_url(url)?);
        if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
            headers.insert(REFERER, value);
        }
    }

    Ok(headers)
}

impl PageFetcher for ReqwestPageFetcher {
    async fn fetch(&self, url: &str, strategy: &Strategy) -> Result<String, AppError> {
        let mut current = validate_target_url(url)?;
        if self.ssrf_protection {
            validate_url(current.as_str()).await?;
        }

        let headers = strategy_headers(url, strategy)?;
        let timeout_secs = strategy.timeout.as_secs();
        let mut redirects = 0;
        let response = loop {
            let response = self
                .client
                .get(current.clone())
                .headers(headers.clone())
                .timeout(strategy.timeout)
                .send()
                .await
                .map_err(|e| send_error(e, timeout_secs))?;

            if !response.status().is_redirection() {
                break response;
            }
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(AppError::HttpError(format!("Too many redirects for {url}")));
            }
            current = next_hop(&current, response.headers(), self.ssrf_protection).await?;
            tracing::debug!(%url, to = %current, "Following redirect");
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })?;

        tracing::debug!(strategy = %strategy.name, %url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

fn send_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

/// Resolve a redirect's `Location` against the current URL and check the
/// target before it is requested.
async fn next_hop(current: &Url, headers: &HeaderMap, ssrf_protection: bool) -> Result<Url, AppError> {
    let location = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::HttpError(format!("Redirect from {current} without a Location header")))?;
    let next = current
        .join(location)
        .map_err(|e| AppError::InvalidUrl(format!("Bad redirect target '{location}': {e}")))?;

    if ssrf_protection {
        validate_url(next.as_str()).await?;
    } else {
        validate_target_url(next.as_str())?;
    }
    Ok(next)
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// Only `http`/`https` are allowed, and every address the host resolves to
/// must be public. Blocked targets are `InvalidUrl`, so no strategy retries them.
async fn validate_url(url: &str) -> Result<(), AppError> {
    let parsed = validate_target_url(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::InvalidUrl("URL has no host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    // IP literal: no DNS needed
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::InvalidUrl(format!(
                "SSRF blocked: {host} is a private/reserved address"
            )));
        }
        return Ok(());
    }

    let port = parsed.port().unwrap_or(match parsed.scheme() {
        "https" => 443,
        _ => 80,
    });
    let addr = format!("{host}:{port}");
    let addrs: Vec<_> = tokio::net::lookup_host(&addr)
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        if is_private_ip(socket_addr.ip()) {
            return Err(AppError::InvalidUrl(format!(
                "SSRF blocked: {host} resolves to private/reserved IP {}",
                socket_addr.ip()
            )));
        }
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()           // 127.0.0.0/8
                || v4.is_private()     // 10/8, 172.16/12, 192.168/16
                || v4.is_link_local()  // 169.254.0.0/16 (cloud metadata!)
                || v4.is_unspecified() // 0.0.0.0
                || v4.is_broadcast()   // 255.255.255.255
                || v4.is_documentation() // 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10 (CGN)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()       // ::1
                || v6.is_unspecified() // ::
                // fe80::/10 (link-local)
                || (v6.segments()[0] & 0xFFC0) == 0xFE80
                // fc00::/7 (unique local)
                || (v6.segments()[0] & 0xFE00) == 0xFC00
                // IPv4-mapped IPv6 (::ffff:x.x.x.x): check the embedded v4
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}
