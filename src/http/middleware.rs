//! Request middleware: CORS policy and authentication enforcement.
//!
//! # Data Flow
//! ```text
//! caller-supplied Router
//!     → TimeoutLayer (optional per-request bound)
//!     → enforce_auth (403 short-circuit, router never invoked)
//!     → CorsLayer (headers on every response, including preflight and 403)
//!     → TraceLayer
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::config::CorsConfig;
use crate::error::ServerError;

/// Wrap the caller's router with the full middleware chain.
pub(crate) fn compose(
    router: Router,
    authenticator: Arc<dyn Authenticator>,
    cors: &CorsConfig,
    request_timeout: Option<Duration>,
) -> Router {
    let mut router = router;
    if let Some(timeout) = request_timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }
    router = router.layer(axum::middleware::from_fn_with_state(
        authenticator,
        enforce_auth,
    ));
    if cors.enabled {
        router = router.layer(cors_layer(cors));
    }
    router.layer(TraceLayer::new_for_http())
}

/// Per-request authentication gate. On rejection the router is never invoked.
pub(crate) async fn enforce_auth(
    State(authenticator): State<Arc<dyn Authenticator>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match authenticator.authorize(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::debug!(error = %err, path = %req.uri().path(), "request rejected");
            let body = Json(json!({ "error": ServerError::Unauthorized.to_string() }));
            (StatusCode::FORBIDDEN, body).into_response()
        }
    }
}

/// Build the CORS layer from the configured policy.
///
/// tower-http forbids combining wildcard values with credentials; when both
/// are configured the layer mirrors the request instead.
pub(crate) fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    if cfg.allowed_origins.iter().any(|o| o == "*") {
        layer = layer.allow_origin(if cfg.allow_credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        });
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    if cfg.allowed_methods.iter().any(|m| m == "*") {
        layer = layer.allow_methods(if cfg.allow_credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        });
    } else {
        let methods: Vec<Method> = cfg
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        layer = layer.allow_methods(AllowMethods::list(methods));
    }

    if cfg.allowed_headers.iter().any(|h| h == "*") {
        layer = layer.allow_headers(if cfg.allow_credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        });
    } else {
        let headers: Vec<HeaderName> = cfg
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(AllowHeaders::list(headers));
    }

    layer
        .allow_credentials(cfg.allow_credentials)
        .max_age(Duration::from_secs(cfg.max_age_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::routing::get;
    use std::collections::HashMap;
    use tower::ServiceExt;

    use crate::auth::AuthRegistry;

    async fn hello() -> Json<serde_json::Value> {
        Json(json!({"hello": "world"}))
    }

    fn allow_all() -> Arc<dyn Authenticator> {
        AuthRegistry::empty().resolve("", &HashMap::new()).unwrap()
    }

    fn deny_all() -> Arc<dyn Authenticator> {
        #[derive(Debug)]
        struct DenyAll;
        impl Authenticator for DenyAll {
            fn authorize(
                &self,
                _headers: &axum::http::HeaderMap,
            ) -> Result<(), ServerError> {
                Err(ServerError::Unauthorized)
            }
        }
        Arc::new(DenyAll)
    }

    #[tokio::test]
    async fn authorized_request_reaches_router() {
        let app = compose(
            Router::new().route("/test", get(hello)),
            allow_all(),
            &CorsConfig::default(),
            None,
        );
        let req = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn rejected_request_is_403_with_coded_body() {
        let app = compose(
            Router::new().route("/test", get(hello)),
            deny_all(),
            &CorsConfig::default(),
            None,
        );
        let req = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "PTC0107: Unauthorized");
    }

    #[tokio::test]
    async fn preflight_carries_cors_headers() {
        let app = compose(
            Router::new().route("/test", get(hello)),
            deny_all(),
            &CorsConfig::default(),
            None,
        );
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/test")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://example.com"
        );
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn explicit_origin_list_is_enforced() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://one.example".to_string()],
            allow_credentials: false,
            ..CorsConfig::default()
        };
        let app = compose(
            Router::new().route("/test", get(hello)),
            allow_all(),
            &cors,
            None,
        );
        let req = Request::builder()
            .uri("/test")
            .header(header::ORIGIN, "https://one.example")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://one.example"
        );
    }
}
