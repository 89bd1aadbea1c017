//! Default output format selection.
//!
//! When a request carries no explicit `format` step, the output format is
//! chosen by a priority-ordered decision list over request intent, client
//! capability (the accept header), and deployment capability flags:
//!
//! 1. download or progressive intent forces the fallback format, ignoring
//!    client capabilities
//! 2. AVIF when enabled and advertised by the client
//! 3. WebP when enabled (and not forced off by the platform) and advertised
//! 4. the fallback format: `png` when the pipeline carries a lossless
//!    step, `jpeg` otherwise

use crate::constants::{LOSSLESS_FALLBACK_FORMAT, LOSSY_FALLBACK_FORMAT};

/// Inputs to the format decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negotiation<'a> {
    /// The request's accept-style capability header, if any.
    pub accept: Option<&'a str>,
    /// The request asked for a file download.
    pub download: bool,
    /// An existing step requests progressive encoding.
    pub progressive: bool,
    /// An existing step indicates a lossless pipeline.
    pub lossless: bool,
    pub support_webp: bool,
    pub support_avif: bool,
}

/// Parsed accept header entry.
#[derive(Debug, Clone)]
struct AcceptEntry {
    media_type: String,
    quality: f32,
}

/// Parse an accept header into media type preferences with q-values.
fn parse_accept(accept: &str) -> Vec<AcceptEntry> {
    let mut entries = Vec::new();

    for part in accept.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (media_type, quality) = if let Some((mt, params)) = part.split_once(';') {
            (mt.trim(), parse_quality(params))
        } else {
            (part, 1.0)
        };

        entries.push(AcceptEntry {
            media_type: media_type.to_ascii_lowercase(),
            quality,
        });
    }

    entries
}

/// Parse a q-value from media type parameters (e.g. `q=0.8`).
fn parse_quality(params: &str) -> f32 {
    for param in params.split(';') {
        let param = param.trim();
        if let Some(q) = param.strip_prefix("q=") {
            if let Ok(quality) = q.parse::<f32>() {
                return quality.clamp(0.0, 1.0);
            }
        }
    }
    1.0
}

/// Whether the client advertises support for a media type.
///
/// An absent header advertises nothing. A wildcard `image/*` (or `*/*`)
/// with a non-zero q-value accepts any image type.
pub fn accepts(accept: Option<&str>, media_type: &str) -> bool {
    let accept = match accept {
        Some(header) => header,
        None => return false,
    };

    parse_accept(accept).iter().any(|entry| {
        entry.quality > 0.0
            && (entry.media_type == media_type
                || entry.media_type == "image/*"
                || entry.media_type == "*/*")
    })
}

fn fallback(n: &Negotiation) -> &'static str {
    if n.lossless {
        LOSSLESS_FALLBACK_FORMAT
    } else {
        LOSSY_FALLBACK_FORMAT
    }
}

fn rule_forced_fallback(n: &Negotiation) -> Option<&'static str> {
    (n.download || n.progressive).then(|| fallback(n))
}

fn rule_avif(n: &Negotiation) -> Option<&'static str> {
    (n.support_avif && accepts(n.accept, "image/avif")).then_some("avif")
}

fn rule_webp(n: &Negotiation) -> Option<&'static str> {
    (n.support_webp && accepts(n.accept, "image/webp")).then_some("webp")
}

fn rule_fallback(n: &Negotiation) -> Option<&'static str> {
    Some(fallback(n))
}

/// Pick the default output format for a pipeline without a `format` step.
pub fn select_format(n: &Negotiation) -> &'static str {
    const RULES: &[fn(&Negotiation) -> Option<&'static str>] =
        &[rule_forced_fallback, rule_avif, rule_webp, rule_fallback];

    RULES
        .iter()
        .find_map(|rule| rule(n))
        .unwrap_or(LOSSY_FALLBACK_FORMAT)
}
