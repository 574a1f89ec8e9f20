use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Restricts CORS to the Mini-App's origin when one is configured.
pub fn webapp_cors(webapp_url: Option<&str>) -> CorsLayer {
    let Some(origin) = webapp_url.and_then(origin_of) else {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(origin)
}

fn origin_of(webapp_url: &str) -> Option<HeaderValue> {
    let url = url::Url::parse(webapp_url).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        tracing::warn!("WEBAPP_URL has no usable origin, falling back to permissive CORS");
        return None;
    }
    HeaderValue::from_str(&origin.ascii_serialization()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_path_and_query() {
        let origin = origin_of("https://app.example.com/miniapp?x=1").unwrap();
        assert_eq!(origin, "https://app.example.com");
    }

    #[test]
    fn unparsable_url_has_no_origin() {
        assert!(origin_of("not a url").is_none());
    }
}
