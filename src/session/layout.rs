//! Montage grid geometry: screen fitting, paging and click hit-testing

use crate::io::configuration::{CurationConfig, SCREEN_MARGIN_HEIGHT, SCREEN_MARGIN_WIDTH};
use crate::io::error::{Result, invalid_parameter};
use std::ops::Range;

/// Geometry of a montage page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    columns: u32,
    rows: u32,
    cell: u32,
    border: u32,
}

impl GridLayout {
    /// Layout for the thumbnail size, grid limits and screen in `config`
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if not even one thumbnail fits on
    /// the screen
    pub fn new(config: &CurationConfig) -> Result<Self> {
        Self::fit(
            u32::try_from(config.columns).unwrap_or(u32::MAX),
            u32::try_from(config.max_rows).unwrap_or(u32::MAX),
            config.roi_size.saturating_mul(config.scale),
            config.border_width,
            (config.screen_width, config.screen_height),
        )
    }

    /// Largest grid up to `columns` x `max_rows` that fits on `screen`
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the cell is empty or no cell
    /// fits on the screen
    pub fn fit(
        columns: u32,
        max_rows: u32,
        cell: u32,
        border: u32,
        screen: (u32, u32),
    ) -> Result<Self> {
        if cell == 0 {
            return Err(invalid_parameter("roi_size", &cell, &"thumbnails need a size"));
        }
        let pitch = cell + border;
        let screen_columns = screen.0.saturating_sub(SCREEN_MARGIN_WIDTH) / pitch;
        let screen_rows = screen.1.saturating_sub(SCREEN_MARGIN_HEIGHT) / pitch;

        let columns = columns.min(screen_columns);
        let rows = max_rows.min(screen_rows);
        if columns == 0 || rows == 0 {
            return Err(invalid_parameter(
                "screen",
                &format!("{}x{}", screen.0, screen.1),
                &format!("no room for a {pitch} pixel thumbnail"),
            ));
        }

        tracing::debug!(columns, rows, cell, "grid layout");
        Ok(Self {
            columns,
            rows,
            cell,
            border,
        })
    }

    /// Thumbnails per row
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Rows per page
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of one thumbnail in montage pixels
    pub const fn cell_size(&self) -> u32 {
        self.cell
    }

    /// Grid line width
    pub const fn border(&self) -> u32 {
        self.border
    }

    /// Distance between the origins of neighbouring cells
    pub const fn pitch(&self) -> u32 {
        self.cell + self.border
    }

    /// Thumbnails per page
    pub const fn per_page(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Number of pages needed for `total` thumbnails
    pub const fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page())
    }

    /// Display positions shown on page `page` (0-based)
    pub fn page(&self, total: usize, page: usize) -> Option<Range<usize>> {
        let start = page.checked_mul(self.per_page())?;
        (start < total).then(|| start..total.min(start + self.per_page()))
    }

    /// Pixel size of a montage holding `count` thumbnails
    pub fn canvas_size(&self, count: usize) -> (u32, u32) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let used_columns = count.clamp(1, self.columns);
        let used_rows = count.div_ceil(self.columns).max(1);
        (
            used_columns * self.pitch() + self.border,
            used_rows * self.pitch() + self.border,
        )
    }

    /// Top-left pixel of thumbnail `index` on a page
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        let column = index % self.columns;
        let row = index / self.columns;
        (
            self.border + column * self.pitch(),
            self.border + row * self.pitch(),
        )
    }

    /// Thumbnail index under the pixel `(x, y)` of a page holding `count`
    /// thumbnails
    pub fn cell_at(&self, x: u32, y: u32, count: usize) -> Option<usize> {
        let column = x / self.pitch();
        let row = y / self.pitch();
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let index = row as usize * self.columns as usize + column as usize;
        (index < count).then_some(index)
    }
}
