//! Tile colour schemes.
//!
//! A tile's appearance is a pure function of its visible state; the
//! renderer applies the returned style verbatim and never computes
//! colours on its own.

use crate::ui::state::LightState;

/// Colour tones as `0xRRGGBB`. The renderer converts to its native
/// pixel format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TileStyle {
    pub background: u32,
    pub foreground: u32,
    pub icon: u32,
}

/// Screen background behind the tiles.
pub const SCREEN_BACKGROUND: u32 = 0x1A1A2E;

/// On: warm amber.
const STYLE_ON: TileStyle = TileStyle {
    background: 0xFFC864,
    foreground: 0x1A1A2E,
    icon: 0x1A1A2E,
};

/// Off: dark grey.
const STYLE_OFF: TileStyle = TileStyle {
    background: 0x2A2A3E,
    foreground: 0x888899,
    icon: 0x555566,
};

/// Unknown: muted blue-grey.
const STYLE_UNKNOWN: TileStyle = TileStyle {
    background: 0x3A3A5C,
    foreground: 0x7777AA,
    icon: 0x6666AA,
};

#[must_use]
pub const fn tile_style(state: LightState) -> TileStyle {
    match state {
        LightState::On => STYLE_ON,
        LightState::Off => STYLE_OFF,
        LightState::Unknown => STYLE_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_state_has_a_distinct_background() {
        let on = tile_style(LightState::On);
        let off = tile_style(LightState::Off);
        let unknown = tile_style(LightState::Unknown);
        assert_ne!(on.background, off.background);
        assert_ne!(off.background, unknown.background);
        assert_ne!(on.background, unknown.background);
    }
}
