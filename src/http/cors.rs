//! CORS policy for the broker's HTTP surface.
//!
//! Browsers talk to the broker directly, so the policy is permissive by
//! default. `CORS_ALLOW_ORIGIN` narrows it to a single origin.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::PATCH,
    Method::POST,
    Method::DELETE,
];

/// Build the CORS layer from server configuration.
///
/// `*` (or an empty value) allows any origin; anything else must be a
/// single valid origin header value.
pub fn build_cors(config: &Config) -> Result<CorsLayer> {
    let origin = config.cors_allow_origin.trim();

    let allow_origin = if origin.is_empty() || origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| Error::Config(format!("invalid CORS origin {origin:?}: {e}")))?;
        debug!(origin, "CORS: allowed origin");
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(AllowHeaders::mirror_request()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origin(origin: &str) -> Config {
        let origin = origin.to_string();
        Config::from_lookup(move |name| (name == "CORS_ALLOW_ORIGIN").then(|| origin.clone()))
            .unwrap()
    }

    #[test]
    fn wildcard_and_exact_origins_build() {
        assert!(build_cors(&config_with_origin("*")).is_ok());
        assert!(build_cors(&config_with_origin("https://app.test")).is_ok());
    }

    #[test]
    fn invalid_origin_is_a_config_error() {
        let result = build_cors(&config_with_origin("bad\norigin"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
