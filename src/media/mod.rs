//! Media type inference for the content-type short-circuit.
//!
//! When a request carries no steps, the asset's extension decides whether
//! the transformation pipeline applies at all. Non-image assets and SVG
//! (which the raster pipeline cannot process) are routed straight through;
//! unknown extensions are treated as images by default so step-less image
//! requests still get the pipeline defaults.

/// Look up the MIME type for an asset path by extension.
///
/// Returns `None` when the extension is unknown.
pub fn content_type(path: &str) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Whether an inferred content type bypasses the transformation pipeline.
///
/// Passthrough means: not an image, or specifically SVG. The generic
/// binary type (`application/octet-stream`) is excluded: it usually means
/// a stored asset with an unhelpful extension, which still defaults to
/// image handling.
pub fn is_passthrough(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ct == "application/octet-stream" {
        return false;
    }
    !ct.starts_with("image/") || ct == "image/svg+xml"
}
