//! Touchscreen input reader.
//!
//! Reads raw evdev `input_event` frames from the configured device,
//! tracks the latest absolute position and contact state, and emits a
//! press or release into the UI channel whenever the contact state
//! flips at a sync report.

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use log::{debug, error};

use crate::config::DisplayConfig;
use crate::ui::{UiEvent, UiSender};

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_ABS: u16 = 0x03;
const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const BTN_TOUCH: u16 = 0x14a;

// struct input_event carries two c_long timestamp fields, so its size
// follows the pointer width.
#[cfg(target_pointer_width = "64")]
const TIME_SIZE: usize = 16;
#[cfg(target_pointer_width = "32")]
const TIME_SIZE: usize = 8;

const EVENT_SIZE: usize = TIME_SIZE + 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct InputEvent {
    kind: u16,
    code: u16,
    value: i32,
}

fn parse_event(raw: &[u8; EVENT_SIZE]) -> InputEvent {
    InputEvent {
        kind: u16::from_ne_bytes([raw[TIME_SIZE], raw[TIME_SIZE + 1]]),
        code: u16::from_ne_bytes([raw[TIME_SIZE + 2], raw[TIME_SIZE + 3]]),
        value: i32::from_ne_bytes([
            raw[TIME_SIZE + 4],
            raw[TIME_SIZE + 5],
            raw[TIME_SIZE + 6],
            raw[TIME_SIZE + 7],
        ]),
    }
}

/// Maps a raw axis value onto screen pixels.
fn scale(raw: i32, raw_max: u32, screen: u32) -> i32 {
    let raw = raw.clamp(0, raw_max as i32) as i64;
    let scaled = raw * i64::from(screen) / i64::from(raw_max + 1);
    scaled as i32
}

#[derive(Default)]
struct TouchTracker {
    x: i32,
    y: i32,
    touching: bool,
    reported: bool,
}

impl TouchTracker {
    /// Feeds one event, returning an UI event when a sync report
    /// flips the contact state.
    fn feed(&mut self, event: InputEvent, config: &DisplayConfig) -> Option<UiEvent> {
        match (event.kind, event.code) {
            (EV_ABS, ABS_X) => {
                self.x = scale(event.value, config.touch_raw_max, config.width);
            }
            (EV_ABS, ABS_Y) => {
                self.y = scale(event.value, config.touch_raw_max, config.height);
            }
            (EV_KEY, BTN_TOUCH) => {
                self.touching = event.value != 0;
            }
            (EV_SYN, _) => {
                if self.touching != self.reported {
                    self.reported = self.touching;
                    let event = if self.touching {
                        UiEvent::Press {
                            x: self.x,
                            y: self.y,
                        }
                    } else {
                        UiEvent::Release {
                            x: self.x,
                            y: self.y,
                        }
                    };
                    return Some(event);
                }
            }
            _ => {}
        }
        None
    }
}

/// Runs until the device or the UI channel goes away.
pub async fn run(config: DisplayConfig, ui: UiSender) {
    let mut device = match File::open(&config.touch_device).await {
        Ok(device) => device,
        Err(err) => {
            error!("Cannot open touch device {}: {err}", config.touch_device);
            return;
        }
    };

    debug!("Reading touch events from {}", config.touch_device);

    let mut tracker = TouchTracker::default();
    let mut raw = [0u8; EVENT_SIZE];

    loop {
        if let Err(err) = device.read_exact(&mut raw).await {
            error!("Touch device read failed: {err}");
            return;
        }

        if let Some(event) = tracker.feed(parse_event(&raw), &config) {
            if ui.send(event).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: u16, code: u16, value: i32) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        buf[TIME_SIZE..TIME_SIZE + 2].copy_from_slice(&kind.to_ne_bytes());
        buf[TIME_SIZE + 2..TIME_SIZE + 4].copy_from_slice(&code.to_ne_bytes());
        buf[TIME_SIZE + 4..].copy_from_slice(&value.to_ne_bytes());
        buf
    }

    fn config() -> DisplayConfig {
        DisplayConfig::default()
    }

    #[test]
    fn parses_type_code_value() {
        let event = parse_event(&raw(EV_ABS, ABS_Y, 2048));
        assert_eq!(
            event,
            InputEvent {
                kind: EV_ABS,
                code: ABS_Y,
                value: 2048
            }
        );
    }

    #[test]
    fn scales_raw_axis_to_screen() {
        assert_eq!(scale(0, 4095, 480), 0);
        assert_eq!(scale(4095, 4095, 480), 479);
        assert_eq!(scale(2048, 4095, 480), 240);
        // Out-of-range readings clamp instead of wrapping.
        assert_eq!(scale(-5, 4095, 480), 0);
        assert_eq!(scale(9999, 4095, 480), 479);
    }

    #[test]
    fn press_and_release_fire_on_sync() {
        let config = config();
        let mut tracker = TouchTracker::default();

        assert_eq!(tracker.feed(parse_event(&raw(EV_ABS, ABS_X, 2048)), &config), None);
        assert_eq!(tracker.feed(parse_event(&raw(EV_ABS, ABS_Y, 1024)), &config), None);
        assert_eq!(tracker.feed(parse_event(&raw(EV_KEY, BTN_TOUCH, 1)), &config), None);

        let press = tracker.feed(parse_event(&raw(EV_SYN, 0, 0)), &config);
        assert_eq!(press, Some(UiEvent::Press { x: 240, y: 80 }));

        // A second sync without a state change stays quiet.
        assert_eq!(tracker.feed(parse_event(&raw(EV_SYN, 0, 0)), &config), None);

        assert_eq!(tracker.feed(parse_event(&raw(EV_ABS, ABS_X, 2248)), &config), None);
        assert_eq!(tracker.feed(parse_event(&raw(EV_KEY, BTN_TOUCH, 0)), &config), None);
        let release = tracker.feed(parse_event(&raw(EV_SYN, 0, 0)), &config);
        assert_eq!(release, Some(UiEvent::Release { x: 263, y: 80 }));
    }

    #[test]
    fn ignores_unrelated_events() {
        let config = config();
        let mut tracker = TouchTracker::default();
        assert_eq!(tracker.feed(parse_event(&raw(0x04, 0x05, 7)), &config), None);
        assert_eq!(tracker.feed(parse_event(&raw(EV_SYN, 0, 0)), &config), None);
    }
}
