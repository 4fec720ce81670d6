//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Method;

/// The URL as it is keyed and stored: fragment removed.
///
/// Host lowercasing and path normalization already happen in `Url::parse`.
pub fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Compute the cache key for a request within a generation.
pub fn compute_cache_key(method: Method, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url(url).as_bytes());
    hex::encode(hasher.finalize())
}
