//! Request URL decomposition.
//!
//! Splits a request URL into pathname and query, separates the signed
//! payload from the trailing signature, and percent-decodes the pathname
//! for the rest of the pipeline. Decoding is this module's job: step
//! parsing and asset-path extraction never see encoded text.

use std::collections::HashMap;

use crate::config::Options;

/// Structured request URL.
#[derive(Debug, Clone, Default)]
pub struct UrlParts {
    /// Raw, still-encoded pathname before the first signature delimiter.
    pub to_sign: String,
    /// Text immediately after the first signature delimiter, if any.
    /// Content after a second occurrence is discarded.
    pub signature: Option<String>,
    /// Percent-decoded pathname with the signature suffix removed.
    pub path: String,
    /// Query mapping; repeated keys keep the last occurrence.
    pub query: HashMap<String, String>,
}

/// Extract the application name: the first path segment, decoded.
///
/// Used only for option resolution, so this runs before the effective
/// options (and their delimiters) exist.
pub fn app_name(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or("");
    let segment = path.trim_start_matches('/').split('/').next().unwrap_or("");
    if segment.is_empty() {
        return None;
    }
    Some(decode_lossy(segment))
}

/// Decompose a request URL using the effective options.
///
/// The signature split happens on the raw pathname before percent-decoding
/// so the signed payload matches what the signer saw. When the configured
/// path delimiter is `?` (colliding with query syntax), the raw query
/// string is appended back onto the pathname so step parsing still sees
/// one token stream.
pub fn decompose(url: &str, options: &Options) -> UrlParts {
    let (raw_path, raw_query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let query = raw_query.map(parse_query).unwrap_or_default();

    let mut pathname = raw_path.to_string();
    if options.path_delimiter == "?" {
        if let Some(raw_query) = raw_query {
            if !raw_query.is_empty() {
                pathname.push('?');
                pathname.push_str(raw_query);
            }
        }
    }

    let mut parts = pathname.splitn(3, options.signature_delimiter.as_str());
    let to_sign = parts.next().unwrap_or("").to_string();
    let signature = parts
        .next()
        .filter(|sig| !sig.is_empty())
        .map(str::to_string);

    let path = decode_lossy(&to_sign);

    UrlParts {
        to_sign,
        signature,
        path,
        query,
    }
}

/// Parse a raw query string into a key → value map.
///
/// Values are URL-decoded; repeated keys keep the last occurrence. A bare
/// key (no `=`) maps to the empty string so presence checks still work.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => {
                params.insert(
                    key.to_string(),
                    urlencoding::decode(value).unwrap_or_default().to_string(),
                );
            }
            None => {
                params.insert(pair.to_string(), String::new());
            }
        }
    }
    params
}

fn decode_lossy(text: &str) -> String {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| text.to_string())
}
