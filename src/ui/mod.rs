pub mod grid;
pub mod layout;
pub mod state;
pub mod style;

use std::collections::HashMap;

use log::info;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::config::LightEntry;
use crate::ui::grid::{TileGrid, TileSurface};
use crate::ui::state::LightState;

/// Everything that may mutate the tile grid arrives here. The grid is
/// owned by a single task, so touch input, poll results and config
/// changes are marshaled through this channel instead of locking.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Press { x: i32, y: i32 },
    Release { x: i32, y: i32 },
    /// One poll cycle's confirmed states.
    Confirmed(HashMap<String, LightState>),
    /// The configured light list changed; rebuild from scratch.
    Rebuild(Vec<LightEntry>),
}

/// A user-requested toggle, carrying the visible state at the moment of
/// the tap so the client knows which direction to request.
#[derive(Clone, Debug)]
pub struct ToggleIntent {
    pub entity_id: String,
    pub previous: LightState,
}

pub type UiSender = UnboundedSender<UiEvent>;

/// Drive the tile grid until the event channel closes.
///
/// This is the only place the grid is mutated; everything upstream of
/// the channel is free to run on other tasks.
pub async fn run<S: TileSurface>(
    mut grid: TileGrid<S>,
    mut events: UnboundedReceiver<UiEvent>,
    toggles: UnboundedSender<ToggleIntent>,
) {
    grid.set_toggle_callback(Box::new(move |entity_id, previous| {
        // Fire-and-forget: the send only fails during shutdown.
        let _ = toggles.send(ToggleIntent {
            entity_id: entity_id.to_string(),
            previous,
        });
    }));

    while let Some(event) = events.recv().await {
        match event {
            UiEvent::Press { x, y } => grid.on_press(x, y),
            UiEvent::Release { x, y } => grid.on_release(x, y),
            UiEvent::Confirmed(states) => grid.apply_confirmed_batch(&states),
            UiEvent::Rebuild(lights) => grid.rebuild(lights),
        }
    }

    info!("UI event channel closed, stopping tile grid");
}
