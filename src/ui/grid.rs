//! The tile grid state machine.
//!
//! `TileGrid` owns the light list, the paging geometry and the state
//! store, and turns input events into optimistic state changes, page
//! moves and redraws. It is either Empty (no lights configured, setup
//! prompt shown) or Ready; the only transition between the two is
//! [`TileGrid::rebuild`].
//!
//! Rendering goes through the [`TileSurface`] trait so the grid logic
//! is independent of the framebuffer backend, and taps become
//! fire-and-forget toggle intents delivered to a registered callback:
//! the grid never waits for Home Assistant, it just assumes the toggle
//! worked and lets the next poll correct it.

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::{LightEntry, MAX_LIGHTS};
use crate::ui::layout::{PageLayout, Rect};
use crate::ui::state::{LightState, StateStore};
use crate::ui::style::{TileStyle, tile_style};

/// Minimum horizontal travel (in display units) for a press/release
/// pair to count as a swipe rather than a tap.
pub const SWIPE_THRESHOLD: i32 = 50;

/// Rendering backend contract. Styles are applied verbatim and
/// idempotently: drawing the same tile with the same style twice must
/// yield the same pixels.
pub trait TileSurface {
    /// Fill the screen with the background tone.
    fn clear(&mut self);
    /// Screen shown when no lights are configured.
    fn draw_setup_prompt(&mut self);
    fn draw_tile(&mut self, rect: Rect, entry: &LightEntry, style: TileStyle);
    fn draw_page_dots(&mut self, page_count: usize, current_page: usize);
    /// Flush any buffered drawing to the panel.
    fn present(&mut self);
}

/// Invoked with `(entity_id, previous_visible_state)` when the user
/// taps a tile. Must not block.
pub type ToggleCallback = Box<dyn FnMut(&str, LightState) + Send>;

pub struct TileGrid<S> {
    surface: S,
    layout: PageLayout,
    lights: Vec<LightEntry>,
    store: StateStore,
    current_page: usize,
    press_origin: Option<(i32, i32)>,
    toggle_cb: Option<ToggleCallback>,
}

impl<S: TileSurface> TileGrid<S> {
    #[must_use]
    pub fn new(surface: S, layout: PageLayout) -> Self {
        Self {
            surface,
            layout,
            lights: Vec::new(),
            store: StateStore::default(),
            current_page: 0,
            press_origin: None,
            toggle_cb: None,
        }
    }

    pub fn set_toggle_callback(&mut self, cb: ToggleCallback) {
        self.toggle_cb = Some(cb);
    }

    /// Replace the light list wholesale: full state reset, page back to
    /// zero, everything redrawn. Safe to call at any time, including
    /// between a press and its release.
    pub fn rebuild(&mut self, mut lights: Vec<LightEntry>) {
        if lights.len() > MAX_LIGHTS {
            warn!(
                "Light list truncated from {} to {MAX_LIGHTS} entries",
                lights.len()
            );
            lights.truncate(MAX_LIGHTS);
        }

        self.store
            .initialize(lights.iter().map(|l| l.entity_id.clone()));
        self.lights = lights;
        self.current_page = 0;
        self.press_origin = None;

        debug!(
            "Tile grid rebuilt: {} lights, {} pages",
            self.lights.len(),
            self.page_count()
        );
        self.redraw_all();
    }

    /// A tap on the tile for `entity_id`: flip the displayed state
    /// immediately and hand the intent to the toggle callback. Ids not
    /// in the current light list are ignored.
    pub fn on_tap(&mut self, entity_id: &str) {
        let Some(index) = self.index_of(entity_id) else {
            return;
        };

        let previous = self.store.visible_state(entity_id);
        let next = self.store.toggled_state(entity_id);
        self.store.apply_optimistic(entity_id, next);
        self.redraw_tile(index);

        debug!("Tap on {entity_id}: {previous:?} -> {next:?} (optimistic)");
        if let Some(cb) = &mut self.toggle_cb {
            cb(entity_id, previous);
        }
    }

    /// A completed horizontal swipe of `delta_x` display units.
    /// Negative deltas advance one page, positive deltas retreat one;
    /// travel below [`SWIPE_THRESHOLD`] and swipes past either end do
    /// nothing.
    pub fn on_swipe(&mut self, delta_x: i32) {
        if delta_x.abs() < SWIPE_THRESHOLD {
            return;
        }

        if delta_x < 0 && self.current_page + 1 < self.page_count() {
            self.current_page += 1;
        } else if delta_x > 0 && self.current_page > 0 {
            self.current_page -= 1;
        } else {
            return;
        }

        debug!("Swipe to page {}", self.current_page);
        self.redraw_all();
    }

    pub fn on_press(&mut self, x: i32, y: i32) {
        self.press_origin = Some((x, y));
    }

    /// Disambiguate a press/release pair: enough horizontal travel is a
    /// swipe, anything shorter is a tap at the release point.
    pub fn on_release(&mut self, x: i32, y: i32) {
        let Some((origin_x, _)) = self.press_origin.take() else {
            return;
        };

        let delta_x = x - origin_x;
        if delta_x.abs() >= SWIPE_THRESHOLD {
            self.on_swipe(delta_x);
            return;
        }

        if let Some(index) = self
            .layout
            .hit_test(x, y, self.current_page, self.lights.len())
        {
            let entity_id = self.lights[index].entity_id.clone();
            self.on_tap(&entity_id);
        }
    }

    /// A server-confirmed state from the poller. Overwrites any
    /// optimistic guess; ids dropped by a rebuild that raced the poll
    /// are silently ignored.
    pub fn on_confirmed_state(&mut self, entity_id: &str, state: LightState) {
        if !self.store.apply_confirmed(entity_id, state) {
            return;
        }
        if let Some(index) = self.index_of(entity_id) {
            self.redraw_tile(index);
        }
    }

    /// One poll cycle's worth of confirmed states.
    pub fn apply_confirmed_batch(&mut self, states: &HashMap<String, LightState>) {
        for (entity_id, state) in states {
            self.on_confirmed_state(entity_id, *state);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.layout.page_count(self.lights.len())
    }

    #[must_use]
    pub fn visible_state(&self, entity_id: &str) -> LightState {
        self.store.visible_state(entity_id)
    }

    #[cfg(test)]
    pub(crate) fn state_store(&self) -> &StateStore {
        &self.store
    }

    fn index_of(&self, entity_id: &str) -> Option<usize> {
        self.lights.iter().position(|l| l.entity_id == entity_id)
    }

    /// Redraw the whole screen for the current page.
    fn redraw_all(&mut self) {
        self.surface.clear();

        if self.lights.is_empty() {
            self.surface.draw_setup_prompt();
            self.surface.present();
            return;
        }

        for index in 0..self.lights.len() {
            if let Some(rect) = self.layout.tile_rect_on_screen(index, self.current_page) {
                self.draw_tile_at(index, rect);
            }
        }
        self.surface
            .draw_page_dots(self.page_count(), self.current_page);
        self.surface.present();
    }

    /// Redraw a single tile if it is on the current page.
    fn redraw_tile(&mut self, index: usize) {
        if let Some(rect) = self.layout.tile_rect_on_screen(index, self.current_page) {
            self.draw_tile_at(index, rect);
            self.surface.present();
        }
    }

    fn draw_tile_at(&mut self, index: usize, rect: Rect) {
        let entry = &self.lights[index];
        let style = tile_style(self.store.visible_state(&entry.entity_id));
        self.surface.draw_tile(rect, entry, style);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Surface that records calls instead of drawing.
    #[derive(Default)]
    struct RecordingSurface {
        cleared: usize,
        setup_prompts: usize,
        tiles: Vec<(String, TileStyle)>,
        presents: usize,
    }

    impl TileSurface for RecordingSurface {
        fn clear(&mut self) {
            self.cleared += 1;
        }

        fn draw_setup_prompt(&mut self) {
            self.setup_prompts += 1;
        }

        fn draw_tile(&mut self, _rect: Rect, entry: &LightEntry, style: TileStyle) {
            self.tiles.push((entry.entity_id.clone(), style));
        }

        fn draw_page_dots(&mut self, _page_count: usize, _current_page: usize) {}

        fn present(&mut self) {
            self.presents += 1;
        }
    }

    type ToggleLog = Arc<Mutex<Vec<(String, LightState)>>>;

    fn lights(n: usize) -> Vec<LightEntry> {
        (0..n)
            .map(|i| LightEntry {
                entity_id: format!("light.l{i}"),
                label: format!("Light {i}"),
                icon: "bulb".to_string(),
            })
            .collect()
    }

    fn grid(n: usize) -> (TileGrid<RecordingSurface>, ToggleLog) {
        let layout = PageLayout::new(480, 320, 2, 2);
        let mut grid = TileGrid::new(RecordingSurface::default(), layout);
        let log: ToggleLog = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        grid.set_toggle_callback(Box::new(move |id, prev| {
            sink.lock().unwrap().push((id.to_string(), prev));
        }));
        grid.rebuild(lights(n));
        (grid, log)
    }

    #[test]
    fn empty_rebuild_shows_setup_prompt() {
        let (mut grid, log) = grid(0);
        assert!(grid.is_empty());
        assert_eq!(grid.page_count(), 1);
        assert_eq!(grid.surface.setup_prompts, 1);

        // No tile taps are accepted in the Empty state.
        grid.on_tap("light.l0");
        grid.on_release(100, 100);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn five_lights_make_two_pages() {
        let (grid, _) = grid(5);
        assert_eq!(grid.page_count(), 2);
        assert_eq!(grid.current_page(), 0);
        // Only page 0's four tiles were drawn.
        assert_eq!(grid.surface.tiles.len(), 4);
    }

    #[test]
    fn tap_is_optimistic_and_fires_once() {
        let (mut grid, log) = grid(1);
        grid.on_confirmed_state("light.l0", LightState::Off);

        grid.on_tap("light.l0");
        assert_eq!(grid.visible_state("light.l0"), LightState::On);

        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), &[("light.l0".to_string(), LightState::Off)]);
    }

    #[test]
    fn tap_redraws_only_that_tile() {
        let (mut grid, _) = grid(4);
        grid.surface.tiles.clear();

        grid.on_tap("light.l2");
        assert_eq!(grid.surface.tiles.len(), 1);
        let (id, style) = &grid.surface.tiles[0];
        assert_eq!(id, "light.l2");
        assert_eq!(*style, tile_style(LightState::On));
    }

    #[test]
    fn confirmed_overwrites_unresolved_optimistic() {
        let (mut grid, _) = grid(1);
        grid.on_confirmed_state("light.l0", LightState::On);

        // Tap to Off; the toggle request is still "in flight" when the
        // next poll reports On.
        grid.on_tap("light.l0");
        assert_eq!(grid.visible_state("light.l0"), LightState::Off);

        grid.on_confirmed_state("light.l0", LightState::On);
        assert_eq!(grid.visible_state("light.l0"), LightState::On);
    }

    #[test]
    fn confirmed_state_for_dropped_id_is_a_noop() {
        let (mut grid, _) = grid(2);
        grid.rebuild(lights(1));
        grid.surface.tiles.clear();

        // light.l1 was removed by the rebuild; a late poll result for
        // it must neither redraw nor create state.
        grid.on_confirmed_state("light.l1", LightState::On);
        assert!(grid.surface.tiles.is_empty());
        assert_eq!(grid.visible_state("light.l1"), LightState::Unknown);
    }

    #[test]
    fn swipe_paging_with_bounds() {
        // 9 lights on a 2x2 grid: 3 pages.
        let (mut grid, _) = grid(9);
        assert_eq!(grid.page_count(), 3);

        grid.on_swipe(-60);
        assert_eq!(grid.current_page(), 1);
        grid.on_swipe(-60);
        assert_eq!(grid.current_page(), 2);

        // Last page: no wraparound.
        grid.on_swipe(-60);
        assert_eq!(grid.current_page(), 2);

        // Below threshold: never changes page.
        grid.on_swipe(40);
        grid.on_swipe(-40);
        assert_eq!(grid.current_page(), 2);

        grid.on_swipe(60);
        assert_eq!(grid.current_page(), 1);
        grid.on_swipe(60);
        grid.on_swipe(60);
        assert_eq!(grid.current_page(), 0);
    }

    #[test]
    fn release_dispatches_tap_or_swipe() {
        let (mut grid, log) = grid(5);

        // Short travel: tap on the tile under the release point.
        grid.on_press(20, 20);
        grid.on_release(25, 22);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(grid.current_page(), 0);

        // Long travel: page change, no tap.
        grid.on_press(400, 100);
        grid.on_release(100, 100);
        assert_eq!(grid.current_page(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);

        // Release without a press is ignored.
        grid.on_release(20, 20);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn rebuild_resets_page_and_press_tracking() {
        let (mut grid, log) = grid(9);
        grid.on_swipe(-60);
        assert_eq!(grid.current_page(), 1);

        grid.on_press(400, 100);
        grid.rebuild(lights(9));
        assert_eq!(grid.current_page(), 0);

        // The stale press must not pair with a release after rebuild.
        grid.on_release(100, 100);
        assert_eq!(grid.current_page(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn rebuild_is_a_full_reset_not_a_merge() {
        let (mut grid, _) = grid(2);
        grid.on_confirmed_state("light.l0", LightState::On);
        grid.on_tap("light.l1");

        grid.rebuild(lights(2));

        let mut fresh = StateStore::default();
        fresh.initialize(["light.l0".to_string(), "light.l1".to_string()]);
        assert_eq!(grid.state_store(), &fresh);
    }

    #[test]
    fn batch_applies_every_entry() {
        let (mut grid, _) = grid(2);
        let states = HashMap::from([
            ("light.l0".to_string(), LightState::On),
            ("light.l1".to_string(), LightState::Off),
            ("light.stale".to_string(), LightState::On),
        ]);
        grid.apply_confirmed_batch(&states);
        assert_eq!(grid.visible_state("light.l0"), LightState::On);
        assert_eq!(grid.visible_state("light.l1"), LightState::Off);
        assert_eq!(grid.visible_state("light.stale"), LightState::Unknown);
    }

    #[test]
    fn oversized_light_list_is_truncated() {
        let (mut grid, _) = grid(0);
        grid.rebuild(lights(MAX_LIGHTS + 4));
        assert_eq!(grid.page_count(), MAX_LIGHTS / 4);
        assert_eq!(
            grid.visible_state(&format!("light.l{MAX_LIGHTS}")),
            LightState::Unknown
        );
    }
}
