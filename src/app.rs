use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, profiles};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "API Running" }))
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(profiles::router()),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::jwt::TOKEN_HEADER;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(TOKEN_HEADER, token);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "name": "Ada", "email": email, "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    #[tokio::test]
    async fn root_reports_running() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"API Running");
    }

    #[tokio::test]
    async fn register_then_create_profile() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = register(&app, "ada@example.com").await;
        let user_id = state.jwt.verify(&token).unwrap();

        let (status, me) = call(&app, Method::GET, "/api/auth", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], json!(user_id));
        assert!(me.get("password_hash").is_none());

        let (status, profile) = call(
            &app,
            Method::POST,
            "/api/profile",
            Some(&token),
            Some(json!({ "status": "Developer", "skills": "go,rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["skills"], json!(["go", "rust"]));
        assert_eq!(profile["user"], json!(user_id));

        let (status, mine) = call(&app, Method::GET, "/api/profile/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine["user"]["id"], json!(user_id));
        assert_eq!(mine["user"]["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = build_app(AppState::fake());
        register(&app, "ada@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "name": "Other", "email": "ada@example.com", "password": "secret2" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], json!("User already exists"));
    }

    #[tokio::test]
    async fn login_returns_token_and_rejects_bad_password() {
        let app = build_app(AppState::fake());
        register(&app, "ada@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth",
            None,
            Some(json!({ "email": "ada@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["msg"], json!("Invalid Credentials"));
    }

    #[tokio::test]
    async fn gate_rejects_missing_and_malformed_tokens() {
        let app = build_app(AppState::fake());

        let (status, body) = call(&app, Method::GET, "/api/profile/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], json!("No token, authorization denied"));

        let (status, body) =
            call(&app, Method::GET, "/api/profile/me", Some("not-a-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], json!("Token is not valid"));
    }

    #[tokio::test]
    async fn gate_runs_before_body_validation() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::POST, "/api/profile", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], json!("No token, authorization denied"));
    }

    #[tokio::test]
    async fn profile_validation_lists_each_field() {
        let app = build_app(AppState::fake());
        let token = register(&app, "ada@example.com").await;

        let (status, body) =
            call(&app, Method::POST, "/api/profile", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"],
            json!([
                { "param": "skills", "msg": "Skills is required" },
                { "param": "status", "msg": "Status is required" },
            ])
        );
    }

    #[tokio::test]
    async fn wrongly_typed_field_is_a_validation_error() {
        let app = build_app(AppState::fake());
        let token = register(&app, "ada@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/profile",
            Some(&token),
            Some(json!({ "status": "Dev", "skills": ["go"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"],
            json!([{ "param": "skills", "msg": "skills is invalid" }])
        );
    }

    #[tokio::test]
    async fn blank_name_cannot_register() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "name": "   ", "email": "ada@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], json!([{ "param": "name", "msg": "Name is required" }]));
    }

    #[tokio::test]
    async fn deleted_account_token_cannot_recreate_profile() {
        let app = build_app(AppState::fake());
        let token = register(&app, "ada@example.com").await;
        let (status, _) = call(&app, Method::DELETE, "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/profile",
            Some(&token),
            Some(json!({ "status": "Developer", "skills": "rust" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], json!("User not found"));

        let (status, all) = call(&app, Method::GET, "/api/profile", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all, json!([]));
    }

    #[tokio::test]
    async fn experience_lifecycle() {
        let app = build_app(AppState::fake());
        let token = register(&app, "ada@example.com").await;

        let exp = json!({ "title": "Engineer", "company": "Acme", "from": "2019-01-01" });
        let (status, body) =
            call(&app, Method::PUT, "/api/profile/experience", Some(&token), Some(exp.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], json!("There is no profile for this user"));

        call(
            &app,
            Method::POST,
            "/api/profile",
            Some(&token),
            Some(json!({ "status": "Developer", "skills": "rust" })),
        )
        .await;

        let (status, profile) =
            call(&app, Method::PUT, "/api/profile/experience", Some(&token), Some(exp)).await;
        assert_eq!(status, StatusCode::OK);
        let exp_id = profile["experience"][0]["id"].as_str().unwrap().to_string();

        let bad_dates = json!({ "title": "T", "company": "C", "from": "2020-01-01", "to": "2019-01-01" });
        let (status, body) =
            call(&app, Method::PUT, "/api/profile/experience", Some(&token), Some(bad_dates)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["param"], json!("from"));

        let (status, profile) = call(
            &app,
            Method::DELETE,
            "/api/profile/experience/does-not-exist",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["experience"].as_array().unwrap().len(), 1);

        let (status, profile) = call(
            &app,
            Method::DELETE,
            &format!("/api/profile/experience/{exp_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["experience"], json!([]));
    }

    #[tokio::test]
    async fn public_reads_and_account_deletion() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = register(&app, "ada@example.com").await;
        let user_id = state.jwt.verify(&token).unwrap();
        call(
            &app,
            Method::POST,
            "/api/profile",
            Some(&token),
            Some(json!({ "status": "Developer", "skills": "rust" })),
        )
        .await;

        let (status, all) = call(&app, Method::GET, "/api/profile", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 1);

        let uri = format!("/api/profile/user/{user_id}");
        let (status, one) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["user"]["name"], json!("Ada"));

        let (status, body) = call(&app, Method::GET, "/api/profile/user/42", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], json!("There is no profile"));

        let (status, body) = call(&app, Method::DELETE, "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["msg"], json!("User deleted"));

        let (_, all) = call(&app, Method::GET, "/api/profile", None, None).await;
        assert_eq!(all, json!([]));
        let (status, _) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn github_repos_are_relayed() {
        let app = build_app(AppState::fake());

        let (status, repos) =
            call(&app, Method::GET, "/api/profile/github/octocat", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(repos[0]["name"], json!("hello-world"));

        let (status, body) =
            call(&app, Method::GET, "/api/profile/github/nobody", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["msg"], json!("No Github profile found"));
    }
}
