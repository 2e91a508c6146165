//! CORS layer built from configuration.
//!
//! Preflight requests are answered here and never reach the dispatcher.

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// `None` when CORS is disabled.
pub fn build_cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let max_age = Duration::from_secs(config.max_age_secs);
    if config.allowed_origins.is_empty() {
        return Some(CorsLayer::very_permissive().max_age(max_age));
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .max_age(max_age),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_builds_nothing() {
        let config = CorsConfig {
            enabled: false,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&config).is_none());
    }

    #[test]
    fn test_enabled_builds_layer() {
        assert!(build_cors_layer(&CorsConfig::default()).is_some());

        let config = CorsConfig {
            allowed_origins: vec!["https://console.example.com".into()],
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&config).is_some());
    }
}
