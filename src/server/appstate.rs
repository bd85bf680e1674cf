use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

use crate::config::SharedConfig;
use crate::hass::client::HassClient;
use crate::ui::UiSender;

/// Sessions expire after an hour without activity.
const SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Shared state for the settings web server: the live config, the
/// config file path for saves, the session table, a UI channel for
/// rebuild notifications and a client for connection tests.
#[derive(Clone)]
pub struct AppState {
    conf: SharedConfig,
    config_path: Arc<PathBuf>,
    sessions: Arc<Mutex<HashMap<String, Instant>>>,
    ui: UiSender,
    client: HassClient,
}

impl AppState {
    #[must_use]
    pub fn new(conf: SharedConfig, config_path: PathBuf, ui: UiSender, client: HassClient) -> Self {
        Self {
            conf,
            config_path: Arc::new(config_path),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ui,
            client,
        }
    }

    #[must_use]
    pub fn config(&self) -> SharedConfig {
        self.conf.clone()
    }

    #[must_use]
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    #[must_use]
    pub fn ui(&self) -> UiSender {
        self.ui.clone()
    }

    #[must_use]
    pub fn client(&self) -> HassClient {
        self.client.clone()
    }

    pub async fn open_session(&self) -> String {
        let token = format!("{:032x}", rand::rng().random::<u128>());
        self.sessions
            .lock()
            .await
            .insert(token.clone(), Instant::now());
        token
    }

    /// Check a session token and refresh its activity timestamp.
    /// Expired tokens are dropped on the way.
    pub async fn session_valid(&self, token: &str) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, last_active| now.duration_since(*last_active) < SESSION_TIMEOUT);

        match sessions.get_mut(token) {
            Some(last_active) => {
                *last_active = now;
                true
            }
            None => false,
        }
    }

    pub async fn close_session(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }
}
