use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use color_eyre::eyre::{Context, eyre};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::http_server::routes;
use crate::http_server::state::AppState;

fn cors_layer(config: &Config) -> CorsLayer {
    if cfg!(debug_assertions) || config.is_development() || config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes::system::router())
        .merge(routes::auth::router())
        .merge(routes::admin::router())
        .merge(routes::lookups::router())
        .merge(routes::music_releases::router())
        .merge(routes::groups::router())
        .merge(routes::now_playing::router())
        .merge(routes::profile::router())
        .merge(routes::images::router())
        .merge(routes::discogs::router())
        .merge(routes::query::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

pub async fn start(port: u16, state: Arc<AppState>) -> color_eyre::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    tracing::info!("Listening on port {port}");
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::http_server::state::Ports;
    use crate::ports::discogs::MockDiscogsClient;
    use crate::ports::google::{GoogleIdentity, MockGoogleTokenVerifier};
    use crate::ports::query_translator::MockQueryTranslator;
    use crate::services::auth::TokenService;
    use crate::test_utils::{insert_user, test_db};

    const SECRET: &str = "test-secret";

    struct TestApp {
        app: Router,
        state: Arc<AppState>,
        _images: TempDir,
    }

    async fn test_app(google: MockGoogleTokenVerifier) -> TestApp {
        let images = TempDir::new().unwrap();
        let config: Config =
            toml::from_str(&format!("images_path = {:?}", images.path().display().to_string()))
                .unwrap();
        let ports = Ports {
            google: Arc::new(google),
            discogs: Arc::new(MockDiscogsClient::new()),
            query_translator: Arc::new(MockQueryTranslator::new()),
        };
        let state = Arc::new(AppState::new(
            test_db().await,
            config,
            TokenService::new(SECRET, 1),
            ports,
        ));
        TestApp {
            app: router(state.clone()),
            state,
            _images: images,
        }
    }

    async fn token_for(state: &AppState, email: &str, is_admin: bool) -> String {
        let user = insert_user(&state.db, email, is_admin).await;
        TokenService::new(SECRET, 1).issue(&user).unwrap()
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let (status, body) = send(&test.app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], true);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;

        let (status, body) = send(&test.app, "GET", "/api/artists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errorType"], "AuthorizationError");

        let (status, _) = send(&test.app, "GET", "/api/artists", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_lookup_crud_and_duplicate() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let token = token_for(&test.state, "a@example.com", false).await;

        let (status, created) = send(
            &test.app,
            "POST",
            "/api/artists",
            Some(&token),
            Some(json!({ "name": "Radiohead" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Radiohead");

        let (status, body) = send(
            &test.app,
            "POST",
            "/api/artists",
            Some(&token),
            Some(json!({ "name": "Radiohead" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorType"], "DuplicateError");

        let (status, page) =
            send(&test.app, "GET", "/api/artists?search=radio", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalCount"], 1);

        let uri = format!("/api/artists/{}", created["id"]);
        let (status, _) = send(&test.app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&test.app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_release_errors_map_to_statuses() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let token = token_for(&test.state, "a@example.com", false).await;

        let (status, body) =
            send(&test.app, "GET", "/api/musicreleases/999", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorType"], "NotFound");

        let (status, body) = send(
            &test.app,
            "POST",
            "/api/musicreleases",
            Some(&token),
            Some(json!({ "title": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "ValidationError");
    }

    #[tokio::test]
    async fn test_malformed_requests_render_validation_errors() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let token = token_for(&test.state, "a@example.com", false).await;

        let (status, body) = send(
            &test.app,
            "POST",
            "/api/musicreleases",
            Some(&token),
            Some(json!({ "title": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "ValidationError");
        assert!(body["error"].as_str().unwrap().contains("title"));

        let (status, body) = send(
            &test.app,
            "GET",
            "/api/musicreleases?yearFrom=abc",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "ValidationError");

        let (status, body) =
            send(&test.app, "GET", "/api/musicreleases/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "ValidationError");
    }

    #[tokio::test]
    async fn test_huge_page_numbers_return_empty_pages() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let token = token_for(&test.state, "a@example.com", false).await;

        let (status, page) = send(
            &test.app,
            "GET",
            "/api/musicreleases?page=9223372036854775807&pageSize=3",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"], json!([]));
        assert_eq!(page["pageSize"], 3);

        let (status, page) = send(
            &test.app,
            "GET",
            "/api/artists?page=9223372036854775807&pageSize=9223372036854775807",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["pageSize"], 100);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_regular_users() {
        let test = test_app(MockGoogleTokenVerifier::new()).await;
        let admin = token_for(&test.state, "admin@example.com", true).await;
        let user = token_for(&test.state, "user@example.com", false).await;

        let (status, _) = send(&test.app, "GET", "/api/admin/users", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, users) = send(&test.app, "GET", "/api/admin/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_google_login_returns_usable_token() {
        let mut google = MockGoogleTokenVerifier::new();
        google.expect_verify().returning(|_| {
            Ok(GoogleIdentity {
                subject: "google-1".to_string(),
                email: "first@example.com".to_string(),
                name: Some("First".to_string()),
            })
        });
        let test = test_app(google).await;

        let (status, login) = send(
            &test.app,
            "POST",
            "/api/auth/google/login",
            None,
            Some(json!({ "idToken": "google-token" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["user"]["isAdmin"], true);

        let token = login["token"].as_str().unwrap();
        let (status, me) = send(&test.app, "GET", "/api/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "first@example.com");
    }
}
