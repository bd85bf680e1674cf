//! Per-light state bookkeeping.
//!
//! Every configured light carries two state slots: `confirmed` is the
//! last value reported by Home Assistant, `optimistic` is the last
//! value implied by a local tap. Tiles always display the optimistic
//! value; a confirmed value overwrites both slots when it arrives, so
//! server truth wins over any stale local guess.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LightState {
    On,
    Off,
    #[default]
    Unknown,
}

impl LightState {
    /// Opposite state for a toggle. Unknown is treated as "currently
    /// off", so an unknown light toggles to On.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off | Self::Unknown => Self::On,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StateStore {
    confirmed: HashMap<String, LightState>,
    optimistic: HashMap<String, LightState>,
}

impl StateStore {
    /// Replace both maps entirely: every given id starts Unknown.
    ///
    /// The key sets of both maps are exactly the configured ids from
    /// here until the next `initialize`; unknown ids are ignored by
    /// every other operation.
    pub fn initialize<I, S>(&mut self, entity_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.confirmed = entity_ids
            .into_iter()
            .map(|id| (id.into(), LightState::Unknown))
            .collect();
        self.optimistic = self.confirmed.clone();
    }

    /// Apply a server-reported state. Overwrites the optimistic slot
    /// too, discarding any unresolved local guess. Returns whether the
    /// id is known (removed lights are a silent no-op).
    pub fn apply_confirmed(&mut self, entity_id: &str, state: LightState) -> bool {
        let Some(slot) = self.confirmed.get_mut(entity_id) else {
            return false;
        };
        *slot = state;
        self.optimistic.insert(entity_id.to_string(), state);
        true
    }

    /// Apply a locally assumed state after a tap; the confirmed slot is
    /// left untouched. Returns whether the id is known.
    pub fn apply_optimistic(&mut self, entity_id: &str, state: LightState) -> bool {
        let Some(slot) = self.optimistic.get_mut(entity_id) else {
            return false;
        };
        *slot = state;
        true
    }

    /// The state a tile should display right now.
    #[must_use]
    pub fn visible_state(&self, entity_id: &str) -> LightState {
        self.optimistic
            .get(entity_id)
            .copied()
            .unwrap_or(LightState::Unknown)
    }

    /// The state a tap on this light should request.
    #[must_use]
    pub fn toggled_state(&self, entity_id: &str) -> LightState {
        self.visible_state(entity_id).toggled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ids: &[&str]) -> StateStore {
        let mut store = StateStore::default();
        store.initialize(ids.iter().copied());
        store
    }

    #[test]
    fn initialize_resets_everything_to_unknown() {
        let fresh = store(&["light.a", "light.b"]);
        let mut store = store(&["light.a", "light.b"]);
        store.apply_confirmed("light.a", LightState::On);

        store.initialize(["light.a", "light.b"]);
        assert_eq!(store.visible_state("light.a"), LightState::Unknown);
        assert_eq!(store, fresh);
    }

    #[test]
    fn confirmed_overwrites_optimistic() {
        let mut store = store(&["light.a"]);

        // User taps; server later reports the opposite.
        store.apply_optimistic("light.a", LightState::Off);
        assert_eq!(store.visible_state("light.a"), LightState::Off);

        store.apply_confirmed("light.a", LightState::On);
        assert_eq!(store.visible_state("light.a"), LightState::On);
    }

    #[test]
    fn optimistic_leaves_confirmed_untouched() {
        let mut store = store(&["light.a"]);
        store.apply_confirmed("light.a", LightState::Off);
        store.apply_optimistic("light.a", LightState::On);

        // Next confirmed value still wins.
        store.apply_confirmed("light.a", LightState::Off);
        assert_eq!(store.visible_state("light.a"), LightState::Off);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut store = store(&["light.a"]);
        assert!(!store.apply_confirmed("light.gone", LightState::On));
        assert!(!store.apply_optimistic("light.gone", LightState::On));
        assert_eq!(store.visible_state("light.gone"), LightState::Unknown);

        // No entry was created as a side effect.
        assert_eq!(store, store2_with_a());
    }

    fn store2_with_a() -> StateStore {
        let mut s = StateStore::default();
        s.initialize(["light.a"]);
        s
    }

    #[test]
    fn toggle_tie_break() {
        assert_eq!(LightState::On.toggled(), LightState::Off);
        assert_eq!(LightState::Off.toggled(), LightState::On);
        assert_eq!(LightState::Unknown.toggled(), LightState::On);

        let store = store(&["light.a"]);
        assert_eq!(store.toggled_state("light.a"), LightState::On);
    }
}
