//! URL canonicalization.
//!
//! `canonicalize_url(canonicalize_url(x)) == canonicalize_url(x)` for every
//! `x` that parses at all — canonicalization never introduces new
//! non-canonical structure.

use thiserror::Error;
use url::Url;

/// Tracking query parameter prefixes/names stripped during canonicalization.
const TRACKING_PREFIXES: &[&str] = &["utm_"];
const TRACKING_EXACT: &[&str] = &["gclid", "fbclid", "ref"];

/// Failure to canonicalize a URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UrlNormalizeError {
    /// The input did not parse as a URL at all.
    #[error("could not parse '{0}' as a URL")]
    Unparseable(String),
}

fn is_tracking_key(key: &str) -> bool {
    TRACKING_PREFIXES.iter().any(|p| key.starts_with(p)) || TRACKING_EXACT.contains(&key)
}

/// Canonicalize a URL per the pipeline's dedupe rules: lowercase
/// scheme+host, strip fragment, strip the default port for the scheme,
/// remove tracking query keys, alphabetize remaining query keys, and drop a
/// trailing slash except on the bare root path.
pub fn canonicalize_url(input: &str) -> Result<String, UrlNormalizeError> {
    let mut url = Url::parse(input).map_err(|_| UrlNormalizeError::Unparseable(input.to_string()))?;

    url.set_fragment(None);

    if let Some(default_port) = default_port_for_scheme(url.scheme()) {
        if url.port() == Some(default_port) {
            let _ = url.set_port(None);
        }
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        url.set_query(Some(&serializer.finish()));
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

fn default_port_for_scheme(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        let canon = canonicalize_url("HTTPS://Example.COM/Path").unwrap();
        assert!(canon.starts_with("https://example.com"));
    }

    #[test]
    fn strips_fragment_and_default_port() {
        let canon = canonicalize_url("https://example.com:443/page#section").unwrap();
        assert_eq!(canon, "https://example.com/page");
    }

    #[test]
    fn removes_tracking_params_and_sorts_the_rest() {
        let canon = canonicalize_url("https://example.com/page?utm_source=x&b=2&gclid=y&a=1&fbclid=z&ref=w").unwrap();
        assert_eq!(canon, "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn drops_trailing_slash_except_root() {
        assert_eq!(canonicalize_url("https://example.com/page/").unwrap(), "https://example.com/page");
        assert_eq!(canonicalize_url("https://example.com/").unwrap(), "https://example.com/");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = canonicalize_url("HTTPS://Example.com:443/Page/?utm_source=a&z=1&a=2#frag").unwrap();
        let twice = canonicalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_unparseable_input() {
        assert!(canonicalize_url("not a url").is_err());
    }
}
