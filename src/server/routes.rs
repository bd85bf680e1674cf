//! Settings web UI routes.
//!
//! A login page, a settings editor, and a small JSON API behind a
//! session cookie. Saving a config validates it, persists it to disk,
//! and pushes a rebuild event to the tile grid.

use std::time::Duration;

use axum::Router;
use axum::extract::{Form, Json, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::config::{self, LightEntry};
use crate::server::appstate::AppState;
use crate::ui::UiEvent;

const SESSION_COOKIE: &str = "lightdeck_session";

const LOGIN_HTML: &str = include_str!("html/login.html");
const SETTINGS_HTML: &str = include_str!("html/settings.html");

/// Error wrapper so handlers can use `?`; everything unexpected
/// becomes a JSON error response.
struct WebError {
    status: StatusCode,
    message: String,
}

type WebResult<T> = Result<T, WebError>;

impl WebError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    const fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: String::new(),
        }
    }
}

impl From<crate::error::ApiError> for WebError {
    fn from(err: crate::error::ApiError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::UNAUTHORIZED {
            return (self.status, axum::Json(json!({"error": "Unauthorized"}))).into_response();
        }
        error!("Settings request failed: {}", self.message);
        (self.status, axum::Json(json!({"error": self.message}))).into_response()
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_COOKIE)?
            .strip_prefix('=')
    })
}

async fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    match session_token(headers) {
        Some(token) => state.session_valid(token).await,
        None => false,
    }
}

fn render_login(error: Option<&str>) -> Html<String> {
    let notice = error.map_or(String::new(), |msg| {
        format!(r#"<p class="error">{msg}</p>"#)
    });
    Html(LOGIN_HTML.replace("<!--ERROR-->", &notice))
}

async fn get_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if authorized(&state, &headers).await {
        return Redirect::to("/settings").into_response();
    }
    render_login(None).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    password: String,
}

async fn post_login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let expected = state.config().lock().await.web.password.clone();

    if !form.password.is_empty() && form.password == expected {
        let token = state.open_session().await;
        let cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax");
        return (
            [(header::SET_COOKIE, cookie)],
            Redirect::to("/settings"),
        )
            .into_response();
    }

    // Slow down brute-force attempts.
    warn!("Failed settings login");
    tokio::time::sleep(Duration::from_secs(1)).await;
    render_login(Some("Incorrect password.")).into_response()
}

async fn post_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.close_session(token).await;
    }
    axum::Json(json!({"ok": true})).into_response()
}

async fn get_settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers).await {
        return Redirect::to("/").into_response();
    }
    Html(SETTINGS_HTML).into_response()
}

async fn get_api_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> WebResult<Json<serde_json::Value>> {
    if !authorized(&state, &headers).await {
        return Err(WebError::unauthorized());
    }

    let config = state.config();
    let config = config.lock().await;
    Ok(Json(json!({
        "ha_url": config.hass.url,
        "ha_token": config.hass.token,
        "lights": config.lights,
    })))
}

#[derive(Debug, Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    ha_url: String,
    #[serde(default)]
    ha_token: String,
    #[serde(default)]
    lights: Vec<LightEntry>,
}

async fn post_api_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ConfigUpdate>,
) -> WebResult<Json<serde_json::Value>> {
    if !authorized(&state, &headers).await {
        return Err(WebError::unauthorized());
    }

    let shared = state.config();
    let mut config = shared.lock().await;

    let mut candidate = config.clone();
    candidate.hass.url = update.ha_url;
    candidate.hass.token = update.ha_token;
    candidate.lights = update.lights;

    config::validate(&candidate).map_err(|err| WebError::bad_request(err.to_string()))?;
    config::save(state.config_path(), &candidate)?;

    let lights_changed = candidate.lights != config.lights;
    *config = candidate;

    if lights_changed {
        let _ = state.ui().send(UiEvent::Rebuild(config.lights.clone()));
    }

    info!(
        "Configuration saved ({} lights{})",
        config.lights.len(),
        if lights_changed { ", grid rebuilt" } else { "" }
    );
    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Deserialize)]
struct TestConnection {
    #[serde(default)]
    ha_url: String,
    #[serde(default)]
    ha_token: String,
}

async fn post_test_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(probe): Json<TestConnection>,
) -> WebResult<Json<serde_json::Value>> {
    if !authorized(&state, &headers).await {
        return Err(WebError::unauthorized());
    }

    let (ok, message) = state
        .client()
        .test_connection(&probe.ha_url, &probe.ha_token)
        .await;
    Ok(Json(json!({"ok": ok, "message": message})))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_index))
        .route("/login", post(post_login))
        .route("/logout", post(post_logout))
        .route("/settings", get(get_settings))
        .route("/api/config", get(get_api_config).post(post_api_config))
        .route("/api/test-connection", post(post_test_connection))
}
