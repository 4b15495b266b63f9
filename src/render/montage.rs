//! Montage composition and PNG export for a page of thumbnails

use crate::io::error::{CurationError, Result, fs_error};
use crate::session::host::GridPage;
use image::{Rgb, RgbImage};
use std::path::Path;

const GRID_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);
const PLACEHOLDER_COLOUR: Rgb<u8> = Rgb([48, 48, 48]);
const MARK_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_COLOUR: Rgb<u8> = Rgb([255, 255, 0]);

/// Pixel size of one glyph dot
const GLYPH_SCALE: u32 = 2;
/// Thickness of the cross drawn over marked cells
const MARK_THICKNESS: u32 = 2;

// 3x5 digit glyphs, one row per entry, high bit on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

fn put(canvas: &mut RgbImage, x: u32, y: u32, colour: Rgb<u8>) {
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, colour);
    }
}

fn fill(canvas: &mut RgbImage, origin: (u32, u32), size: (u32, u32), colour: Rgb<u8>) {
    for y in origin.1..origin.1.saturating_add(size.1) {
        for x in origin.0..origin.0.saturating_add(size.0) {
            put(canvas, x, y, colour);
        }
    }
}

fn draw_label(canvas: &mut RgbImage, origin: (u32, u32), label: &str) {
    let advance = 4 * GLYPH_SCALE;
    let mut x = origin.0 + GLYPH_SCALE;
    for digit in label.chars().filter_map(|c| c.to_digit(10)) {
        let Some(glyph) = DIGITS.get(digit as usize) else {
            continue;
        };
        for (row, bits) in (0_u32..).zip(glyph) {
            for column in 0..3_u32 {
                if bits & (0b100 >> column) != 0 {
                    fill(
                        canvas,
                        (
                            x + column * GLYPH_SCALE,
                            origin.1 + GLYPH_SCALE + row * GLYPH_SCALE,
                        ),
                        (GLYPH_SCALE, GLYPH_SCALE),
                        LABEL_COLOUR,
                    );
                }
            }
        }
        x += advance;
    }
}

fn draw_cross(canvas: &mut RgbImage, origin: (u32, u32), size: u32) {
    for offset in 0..size {
        for thickness in 0..MARK_THICKNESS {
            let along = offset.saturating_add(thickness).min(size - 1);
            put(canvas, origin.0 + along, origin.1 + offset, MARK_COLOUR);
            put(canvas, origin.0 + size - 1 - along, origin.1 + offset, MARK_COLOUR);
        }
    }
}

/// Compose the thumbnails of `page` into one image
///
/// Cells are separated by grid lines, numbered in their top-left corner and
/// crossed out when marked. Cells without a crop show a grey placeholder.
pub fn compose(page: &GridPage) -> RgbImage {
    let layout = page.layout;
    let (width, height) = layout.canvas_size(page.len());
    let mut canvas = RgbImage::from_pixel(width, height, GRID_COLOUR);
    let cell = layout.cell_size();

    for (index, thumbnail) in page.thumbnails.iter().enumerate() {
        let origin = layout.cell_origin(index);
        match &thumbnail.image {
            Some(image) => {
                for (x, y, pixel) in image.enumerate_pixels() {
                    if x < cell && y < cell {
                        put(&mut canvas, origin.0 + x, origin.1 + y, *pixel);
                    }
                }
            }
            None => fill(&mut canvas, origin, (cell, cell), PLACEHOLDER_COLOUR),
        }
        if thumbnail.marked {
            draw_cross(&mut canvas, origin, cell);
        }
        draw_label(&mut canvas, origin, &thumbnail.label);
    }
    canvas
}

/// Compose `page` and save it as a PNG at `output_path`
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The image cannot be encoded or written
pub fn export_page_png(page: &GridPage, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(fs_error(parent, "create directory"))?;
    }
    compose(page)
        .save(output_path)
        .map_err(|source| CurationError::ImageExport {
            path: output_path.to_path_buf(),
            source,
        })
}
