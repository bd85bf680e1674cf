//! Framebuffer rendering backend.
//!
//! Draws with `embedded-graphics` into an RGB565 buffer and flushes it
//! to a Linux framebuffer device on present. The SPI TFT panels this
//! targets (fbtft) expose a 16 bpp RGB565 framebuffer.

use std::convert::Infallible;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;

use embedded_graphics::Drawable;
use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Point, Size};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle, RoundedRectangle};
use embedded_graphics::text::{Alignment, Text};

use log::error;

use crate::config::{DisplayConfig, LightEntry};
use crate::error::{ApiError, ApiResult};
use crate::ui::grid::TileSurface;
use crate::ui::layout::Rect;
use crate::ui::style::{SCREEN_BACKGROUND, TileStyle};

const TILE_RADIUS: u32 = 12;
const ICON_DIAMETER: u32 = 28;
const DOT_SIZE: u32 = 8;
const DOT_SPACING: i32 = 16;
const DOT_Y_OFFSET: i32 = 20;

fn color(rgb: u32) -> Rgb565 {
    let [_, r, g, b] = rgb.to_be_bytes();
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// In-memory RGB565 frame. Separate from the device so rendering can
/// be exercised without hardware.
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 2) as usize],
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn fill(&mut self, rgb: u32) {
        let raw: u16 = color(rgb).into_storage();
        for chunk in self.pixels.chunks_exact_mut(2) {
            chunk.copy_from_slice(&raw.to_le_bytes());
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> u16 {
        let offset = ((y * self.width + x) * 2) as usize;
        u16::from_le_bytes([self.pixels[offset], self.pixels[offset + 1]])
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0
                || point.y < 0
                || point.x >= self.width as i32
                || point.y >= self.height as i32
            {
                continue;
            }
            let offset = ((point.y as u32 * self.width + point.x as u32) * 2) as usize;
            self.pixels[offset..offset + 2].copy_from_slice(&color.into_storage().to_le_bytes());
        }
        Ok(())
    }
}

impl Frame {
    /// Tile background, icon disc and truncated label, per the given
    /// style. Idempotent: same rect + style always paints the same
    /// pixels.
    pub fn draw_tile(&mut self, rect: Rect, entry: &LightEntry, style: TileStyle) {
        let area = Rectangle::new(
            Point::new(rect.x, rect.y),
            Size::new(rect.width, rect.height),
        );
        let _ = RoundedRectangle::with_equal_corners(area, Size::new(TILE_RADIUS, TILE_RADIUS))
            .into_styled(PrimitiveStyle::with_fill(color(style.background)))
            .draw(self);

        let center_x = rect.x + rect.width as i32 / 2;
        let icon_top = rect.y + rect.height as i32 / 4 - ICON_DIAMETER as i32 / 2;
        let _ = Circle::new(
            Point::new(center_x - ICON_DIAMETER as i32 / 2, icon_top),
            ICON_DIAMETER,
        )
        .into_styled(PrimitiveStyle::with_fill(color(style.icon)))
        .draw(self);

        let font = &FONT_10X20;
        let max_chars = ((rect.width.saturating_sub(20)) / font.character_size.width) as usize;
        let label: String = entry.label.chars().take(max_chars.max(1)).collect();
        let _ = Text::with_alignment(
            &label,
            Point::new(center_x, rect.y + rect.height as i32 * 3 / 4),
            MonoTextStyle::new(font, color(style.foreground)),
            Alignment::Center,
        )
        .draw(self);
    }

    /// One dot per page, the current page's dot drawn bright.
    pub fn draw_page_dots(&mut self, page_count: usize, current_page: usize) {
        if page_count <= 1 {
            return;
        }

        let total_width =
            page_count as i32 * DOT_SIZE as i32 + (page_count as i32 - 1) * (DOT_SPACING - DOT_SIZE as i32);
        let start_x = (self.width as i32 - total_width) / 2;
        let y = self.height as i32 - DOT_Y_OFFSET;

        for page in 0..page_count {
            let tone = if page == current_page {
                0xFFFFFF
            } else {
                0x555566
            };
            let _ = Circle::new(Point::new(start_x + page as i32 * DOT_SPACING, y), DOT_SIZE)
                .into_styled(PrimitiveStyle::with_fill(color(tone)))
                .draw(self);
        }
    }

    pub fn draw_setup_prompt(&mut self, hint: &str) {
        let center_x = self.width as i32 / 2;
        let center_y = self.height as i32 / 2;

        let _ = Text::with_alignment(
            "Setup Required",
            Point::new(center_x, center_y - 20),
            MonoTextStyle::new(&FONT_10X20, color(0xFFC864)),
            Alignment::Center,
        )
        .draw(self);

        let _ = Text::with_alignment(
            "Open the web config to continue:",
            Point::new(center_x, center_y + 10),
            MonoTextStyle::new(&FONT_6X10, color(0x888899)),
            Alignment::Center,
        )
        .draw(self);

        let _ = Text::with_alignment(
            hint,
            Point::new(center_x, center_y + 26),
            MonoTextStyle::new(&FONT_6X10, color(0x888899)),
            Alignment::Center,
        )
        .draw(self);
    }
}

/// The real panel: a [`Frame`] plus the framebuffer device it is
/// flushed to.
pub struct FbSurface {
    frame: Frame,
    device: File,
    setup_hint: String,
}

impl FbSurface {
    pub fn open(config: &DisplayConfig, setup_hint: String) -> ApiResult<Self> {
        let device = OpenOptions::new()
            .write(true)
            .open(&config.fb_device)
            .map_err(|err| {
                ApiError::display_error(format!(
                    "Cannot open framebuffer {}: {err}",
                    config.fb_device
                ))
            })?;

        Ok(Self {
            frame: Frame::new(config.width, config.height),
            device,
            setup_hint,
        })
    }
}

impl TileSurface for FbSurface {
    fn clear(&mut self) {
        self.frame.fill(SCREEN_BACKGROUND);
    }

    fn draw_setup_prompt(&mut self) {
        let hint = self.setup_hint.clone();
        self.frame.draw_setup_prompt(&hint);
    }

    fn draw_tile(&mut self, rect: Rect, entry: &LightEntry, style: TileStyle) {
        self.frame.draw_tile(rect, entry, style);
    }

    fn draw_page_dots(&mut self, page_count: usize, current_page: usize) {
        self.frame.draw_page_dots(page_count, current_page);
    }

    fn present(&mut self) {
        if let Err(err) = self.device.write_all_at(self.frame.bytes(), 0) {
            error!("Failed to write framebuffer: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::LightState;
    use crate::ui::style::tile_style;

    fn entry() -> LightEntry {
        LightEntry {
            entity_id: "light.kitchen".to_string(),
            label: "Kitchen".to_string(),
            icon: "bulb".to_string(),
        }
    }

    #[test]
    fn fill_sets_every_pixel() {
        let mut frame = Frame::new(16, 16);
        frame.fill(SCREEN_BACKGROUND);
        let expected = color(SCREEN_BACKGROUND).into_storage();
        assert_eq!(frame.pixel(0, 0), expected);
        assert_eq!(frame.pixel(15, 15), expected);
    }

    #[test]
    fn tile_paints_background_inside_rect() {
        let mut frame = Frame::new(480, 320);
        frame.fill(SCREEN_BACKGROUND);
        let style = tile_style(LightState::On);
        let rect = Rect {
            x: 10,
            y: 10,
            width: 225,
            height: 140,
        };
        frame.draw_tile(rect, &entry(), style);

        // Centre of the tile carries the style background.
        assert_eq!(
            frame.pixel(10 + 225 / 2, 10 + 140 / 2 - 20),
            color(style.background).into_storage()
        );
        // Pixels outside the tile keep the screen background.
        assert_eq!(
            frame.pixel(470, 310),
            color(SCREEN_BACKGROUND).into_storage()
        );
    }

    #[test]
    fn drawing_is_idempotent() {
        let mut a = Frame::new(64, 64);
        let mut b = Frame::new(64, 64);
        let style = tile_style(LightState::Off);
        let rect = Rect {
            x: 4,
            y: 4,
            width: 56,
            height: 40,
        };

        a.fill(SCREEN_BACKGROUND);
        a.draw_tile(rect, &entry(), style);

        b.fill(SCREEN_BACKGROUND);
        b.draw_tile(rect, &entry(), style);
        b.draw_tile(rect, &entry(), style);

        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn out_of_bounds_pixels_are_clipped() {
        let mut frame = Frame::new(32, 32);
        frame.draw_setup_prompt("http://panel:8080");
        let _ = frame.draw_iter([Pixel(Point::new(-1, -1), Rgb565::new(31, 0, 0))]);
        // No panic is the assertion.
    }
}
