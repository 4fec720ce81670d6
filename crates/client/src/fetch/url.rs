//! URL resolution for requests handed to the agent.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target against the application origin.
///
/// Absolute URLs are kept as they are (any scheme); relative ones are joined
/// onto `origin`. The fragment is dropped: it never reaches the network and
/// never distinguishes cache entries.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Only http(s) requests are ever intercepted.
pub fn is_interceptable(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
