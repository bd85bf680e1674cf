//! Home Assistant REST client.
//!
//! Credentials live in the shared config, so a save from the web
//! editor takes effect on the next request without rebuilding the
//! client. Everything the UI consumes goes through [`HassClient::fetch_state`]
//! and [`HassClient::poll_all`], which never fail: any transport or
//! HTTP error is logged and collapsed into [`LightState::Unknown`].

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::SharedConfig;
use crate::error::{ApiError, ApiResult};
use crate::ui::state::LightState;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct HassState {
    pub entity_id: String,
    pub state: String,
}

/// Map a Home Assistant state string onto the tri-state the UI knows.
/// Anything that is not plainly on/off (`"unavailable"`, `"unknown"`,
/// ...) is Unknown.
fn parse_state(state: &str) -> LightState {
    match state {
        "on" => LightState::On,
        "off" => LightState::Off,
        _ => LightState::Unknown,
    }
}

/// Service to call for a toggle, given the visible state at tap time.
/// Unknown is treated as off, so it turns on.
fn toggle_service(previous: LightState) -> &'static str {
    match previous {
        LightState::On => "turn_off",
        LightState::Off | LightState::Unknown => "turn_on",
    }
}

#[derive(Clone)]
pub struct HassClient {
    http: reqwest::Client,
    config: SharedConfig,
}

impl HassClient {
    pub fn new(config: SharedConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http, config })
    }

    /// Snapshot the current credentials, or `None` when the panel has
    /// not been configured yet.
    async fn credentials(&self) -> Option<(Url, String)> {
        let config = self.config.lock().await;
        if !config.has_credentials() {
            return None;
        }
        let url = Url::parse(config.hass.url.trim()).ok()?;
        Some((url, config.hass.token.trim().to_string()))
    }

    fn endpoint_url(base: &Url, endpoint: &str) -> ApiResult<Url> {
        let base = if base.path().ends_with('/') {
            base.clone()
        } else {
            Url::parse(&format!("{base}/"))?
        };
        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }

    async fn get_state(&self, base: &Url, token: &str, entity_id: &str) -> ApiResult<HassState> {
        let url = Self::endpoint_url(base, &format!("/api/states/{entity_id}"))?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::service_error(format!(
                "GET /api/states/{entity_id}: {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Fetch one entity's state. Unreachable host, HTTP error or
    /// missing credentials all come back as Unknown, never as an
    /// error.
    pub async fn fetch_state(&self, entity_id: &str) -> LightState {
        let Some((base, token)) = self.credentials().await else {
            return LightState::Unknown;
        };

        match self.get_state(&base, &token, entity_id).await {
            Ok(state) => parse_state(&state.state),
            Err(err) => {
                warn!("Polling {entity_id} failed: {err}");
                LightState::Unknown
            }
        }
    }

    /// Fetch every given entity, one batch per poll cycle.
    pub async fn poll_all(&self, entity_ids: &[String]) -> HashMap<String, LightState> {
        let mut states = HashMap::with_capacity(entity_ids.len());
        for entity_id in entity_ids {
            let state = self.fetch_state(entity_id).await;
            states.insert(entity_id.clone(), state);
        }
        states
    }

    /// Request a toggle for `entity_id`, choosing `turn_on`/`turn_off`
    /// from the state visible when the user tapped. Failures are
    /// logged only; the next poll corrects the display either way.
    pub async fn request_toggle(&self, entity_id: &str, previous: LightState) -> bool {
        let Some((base, token)) = self.credentials().await else {
            warn!("Toggle for {entity_id} dropped: Home Assistant not configured");
            return false;
        };

        let service = toggle_service(previous);
        let domain = entity_id.split_once('.').map_or("light", |(d, _)| d);

        let result = async {
            let url = Self::endpoint_url(&base, &format!("/api/services/{domain}/{service}"))?;
            let response = self
                .http
                .post(url)
                .bearer_auth(&token)
                .json(&json!({ "entity_id": entity_id }))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::service_error(format!(
                    "POST /api/services/{domain}/{service}: {}",
                    response.status()
                )));
            }
            Ok::<(), ApiError>(())
        }
        .await;

        match result {
            Ok(()) => {
                debug!("Toggled {entity_id} via {domain}.{service}");
                true
            }
            Err(err) => {
                warn!("Toggle for {entity_id} failed: {err}");
                false
            }
        }
    }

    /// Probe a URL/token pair for the settings page's "Test
    /// Connection" button. Returns `(ok, message)`.
    pub async fn test_connection(&self, url: &str, token: &str) -> (bool, String) {
        let base = match Url::parse(url.trim()) {
            Ok(base) => base,
            Err(err) => return (false, format!("Invalid URL: {err}")),
        };

        let result = async {
            let url = Self::endpoint_url(&base, "/api/")?;
            let response = self
                .http
                .get(url)
                .bearer_auth(token.trim())
                .send()
                .await?;
            Ok::<reqwest::StatusCode, ApiError>(response.status())
        }
        .await;

        match result {
            Ok(status) if status.is_success() => (true, "Connected to Home Assistant".to_string()),
            Ok(status) if status == reqwest::StatusCode::UNAUTHORIZED => {
                (false, "Unauthorized: check the access token".to_string())
            }
            Ok(status) => (false, format!("Home Assistant returned {status}")),
            Err(err) => (false, format!("Connection failed: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_strings() {
        assert_eq!(parse_state("on"), LightState::On);
        assert_eq!(parse_state("off"), LightState::Off);
        assert_eq!(parse_state("unavailable"), LightState::Unknown);
        assert_eq!(parse_state("unknown"), LightState::Unknown);
        assert_eq!(parse_state(""), LightState::Unknown);
    }

    #[test]
    fn toggle_direction() {
        assert_eq!(toggle_service(LightState::On), "turn_off");
        assert_eq!(toggle_service(LightState::Off), "turn_on");
        assert_eq!(toggle_service(LightState::Unknown), "turn_on");
    }

    #[test]
    fn endpoint_urls_join_cleanly() {
        let base = Url::parse("http://hass.local:8123").unwrap();
        let url = HassClient::endpoint_url(&base, "/api/states/light.kitchen").unwrap();
        assert_eq!(
            url.as_str(),
            "http://hass.local:8123/api/states/light.kitchen"
        );

        let base = Url::parse("http://hass.local:8123/prefix/").unwrap();
        let url = HassClient::endpoint_url(&base, "/api/").unwrap();
        assert_eq!(url.as_str(), "http://hass.local:8123/prefix/api/");
    }
}
