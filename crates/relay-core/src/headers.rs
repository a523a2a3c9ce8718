//! Projection of sender request headers onto receiver responses.

use http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_DISPOSITION,
    CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};

/// Application header relayed from sender to receivers with all values in
/// their original order.
pub const X_PIPING: &str = "x-piping";

const X_ROBOTS_TAG: &str = "x-robots-tag";

/// Computes the receiver-visible response headers from the sender's
/// headers (or, for a multipart upload, from the first part's headers).
pub fn project(source: &HeaderMap) -> HeaderMap {
    let mut projected = HeaderMap::new();
    if let Some(content_type) = source.get(CONTENT_TYPE) {
        projected.insert(CONTENT_TYPE, rewrite_html(content_type));
    }
    if let Some(length) = source.get(CONTENT_LENGTH) {
        projected.insert(CONTENT_LENGTH, length.clone());
    }
    if let Some(disposition) = source.get(CONTENT_DISPOSITION) {
        projected.insert(CONTENT_DISPOSITION, disposition.clone());
    }

    let x_piping = HeaderName::from_static(X_PIPING);
    let mut relayed_any = false;
    for value in source.get_all(&x_piping) {
        projected.append(x_piping.clone(), value.clone());
        relayed_any = true;
    }

    projected.insert(
        HeaderName::from_static(X_ROBOTS_TAG),
        HeaderValue::from_static("none"),
    );
    projected.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    if relayed_any {
        projected.insert(
            ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("X-Piping"),
        );
    }
    projected
}

/// Rewrites a `text/html` media type to `text/plain`, keeping the media
/// type parameters.
fn rewrite_html(value: &HeaderValue) -> HeaderValue {
    let Ok(text) = value.to_str() else {
        return value.clone();
    };
    let media_end = text.find(';').unwrap_or(text.len());
    if !text[..media_end].trim().eq_ignore_ascii_case("text/html") {
        return value.clone();
    }
    HeaderValue::from_str(&format!("text/plain{}", &text[media_end..]))
        .unwrap_or_else(|_| value.clone())
}
