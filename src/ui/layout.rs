//! Page and tile geometry.
//!
//! Pure math: no rendering, no state. Lights are assigned sequential
//! indices in configuration order and mapped onto fixed-capacity pages
//! of `columns * rows` tiles. Pixel positions and hit testing are
//! derived from the same numbers so the renderer and the touch handler
//! can never disagree about where a tile is.

/// Gap between tiles, in pixels.
const TILE_GAP: i32 = 10;

/// Padding around the grid edges, in pixels.
const OUTER_PAD: i32 = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TilePos {
    pub page: usize,
    pub col: usize,
    pub row: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PageLayout {
    width: u32,
    height: u32,
    columns: usize,
    rows: usize,
}

impl PageLayout {
    /// `columns` and `rows` must both be at least 1; this is enforced
    /// at the configuration boundary.
    #[must_use]
    pub const fn new(width: u32, height: u32, columns: usize, rows: usize) -> Self {
        Self {
            width,
            height,
            columns,
            rows,
        }
    }

    /// Tiles per page.
    #[must_use]
    pub const fn per_page(&self) -> usize {
        self.columns * self.rows
    }

    /// Width of one page, equal to the display width.
    #[must_use]
    pub const fn page_width(&self) -> i32 {
        self.width as i32
    }

    /// `max(1, ceil(count / per_page))` — an empty light list still
    /// occupies one (empty) page.
    #[must_use]
    pub const fn page_count(&self, count: usize) -> usize {
        let pages = count.div_ceil(self.per_page());
        if pages == 0 { 1 } else { pages }
    }

    /// Map a light index to its page and in-page grid cell.
    #[must_use]
    pub const fn position(&self, index: usize) -> TilePos {
        let slot = index % self.per_page();
        TilePos {
            page: index / self.per_page(),
            col: slot % self.columns,
            row: slot / self.columns,
        }
    }

    /// Tile size derived from the display geometry and grid shape.
    #[must_use]
    pub fn tile_size(&self) -> (u32, u32) {
        let cols = self.columns as i32;
        let rows = self.rows as i32;
        let w = (self.width as i32 - 2 * OUTER_PAD - (cols - 1) * TILE_GAP) / cols;
        let h = (self.height as i32 - 2 * OUTER_PAD - (rows - 1) * TILE_GAP) / rows;
        (w.max(1) as u32, h.max(1) as u32)
    }

    /// Pixel rectangle of a tile, relative to its own page.
    #[must_use]
    pub fn tile_rect(&self, index: usize) -> Rect {
        let pos = self.position(index);
        let (tile_w, tile_h) = self.tile_size();
        Rect {
            x: OUTER_PAD + pos.col as i32 * (tile_w as i32 + TILE_GAP),
            y: OUTER_PAD + pos.row as i32 * (tile_h as i32 + TILE_GAP),
            width: tile_w,
            height: tile_h,
        }
    }

    /// On-screen rectangle of a tile while `current_page` is shown.
    ///
    /// All pages share one horizontal offset of
    /// `-current_page * page_width`; tiles not on the current page fall
    /// outside the viewport and return `None`.
    #[must_use]
    pub fn tile_rect_on_screen(&self, index: usize, current_page: usize) -> Option<Rect> {
        let pos = self.position(index);
        if pos.page != current_page {
            return None;
        }
        let mut rect = self.tile_rect(index);
        rect.x += pos.page as i32 * self.page_width() - current_page as i32 * self.page_width();
        Some(rect)
    }

    /// Which of the first `count` tiles, if any, contains the given
    /// screen point while `current_page` is shown.
    #[must_use]
    pub fn hit_test(&self, x: i32, y: i32, current_page: usize, count: usize) -> Option<usize> {
        let first = current_page * self.per_page();
        let last = (first + self.per_page()).min(count);
        (first..last).find(|&index| {
            self.tile_rect_on_screen(index, current_page)
                .is_some_and(|rect| rect.contains(x, y))
        })
    }
}
