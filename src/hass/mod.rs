pub mod client;

use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::SharedConfig;
use crate::hass::client::HassClient;
use crate::ui::{ToggleIntent, UiEvent, UiSender};

/// Periodically poll every configured light and hand the batch to the
/// UI task. Runs until the UI channel closes.
///
/// The interval is re-read from the shared config each cycle, so a
/// settings save takes effect on the next tick. A cycle that takes
/// longer than the interval simply delays the next one; ticks are
/// never stacked.
pub async fn run_poller(client: HassClient, config: SharedConfig, ui: UiSender) {
    let mut poll_interval_ms = config.lock().await.hass.poll_interval_ms;
    info!("Poller started ({poll_interval_ms} ms interval)");

    loop {
        let mut ticker = interval(Duration::from_millis(poll_interval_ms.max(250)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a fresh interval fires immediately.
        ticker.tick().await;

        loop {
            let (entity_ids, configured, current_interval) = {
                let config = config.lock().await;
                (
                    config.entity_ids(),
                    config.has_credentials(),
                    config.hass.poll_interval_ms,
                )
            };

            if current_interval != poll_interval_ms {
                poll_interval_ms = current_interval;
                debug!("Poll interval changed to {poll_interval_ms} ms");
                break;
            }

            if configured && !entity_ids.is_empty() {
                let states = client.poll_all(&entity_ids).await;
                if ui.send(UiEvent::Confirmed(states)).is_err() {
                    info!("UI gone, stopping poller");
                    return;
                }
            }

            ticker.tick().await;
        }
    }
}

/// Consume toggle intents from the tile grid and issue the service
/// calls. The grid never waits for these; a failed call is only
/// logged, and the display is corrected by the next poll.
pub async fn run_toggle_worker(client: HassClient, mut intents: UnboundedReceiver<ToggleIntent>) {
    while let Some(intent) = intents.recv().await {
        client
            .request_toggle(&intent.entity_id, intent.previous)
            .await;
    }
    info!("Toggle channel closed, stopping worker");
}
