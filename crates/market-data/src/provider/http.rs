//! Shared HTTP plumbing for the scraping providers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::MarketDataError;

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headers that make a JSON request look like it came from the site itself.
pub(crate) fn browser_headers(referer: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static(referer));
    headers
}

/// Build a client with default headers and a per-call timeout.
pub(crate) fn build_client(headers: HeaderMap, timeout: Duration, cookies: bool) -> Client {
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .cookie_store(cookies)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and map transport and status failures onto [`MarketDataError`].
///
/// | Outcome | Error |
/// |---------|-------|
/// | client timeout | `Timeout` |
/// | 429 | `RateLimited` |
/// | 404 | `SymbolNotFound(subject)` |
/// | other non-2xx | `ProviderError("HTTP <status>")` |
pub(crate) async fn send(
    provider: &str,
    subject: &str,
    request: RequestBuilder,
) -> Result<Response, MarketDataError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::ProviderError {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited {
            provider: provider.to_string(),
        });
    }
    if status == StatusCode::NOT_FOUND {
        return Err(MarketDataError::SymbolNotFound(subject.to_string()));
    }
    if !status.is_success() {
        return Err(MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("HTTP {}", status),
        });
    }
    Ok(response)
}

/// Read the body and decode it as JSON.
///
/// The body is read as text first so a decode failure reports as `Parse`
/// rather than as a transport error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, MarketDataError> {
    let text = response.text().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::ProviderError {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;
    parse_json(provider, &text)
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &str,
    text: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(text).map_err(|e| MarketDataError::Parse {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Numeric value from a JSON number or a formatted numeric string.
///
/// Upstream payloads mix `1400.5`, `"1400.50"`, `"1,400.50"`, `"3.2%"` and
/// placeholders like `"-"` or `"None"`; placeholders yield `None`.
pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | ' '))
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("none") {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Serde adapter for [`value_to_f64`]: `#[serde(default, deserialize_with = "lenient_f64")]`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}
