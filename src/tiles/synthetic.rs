//! Placeholder tiles drawn locally
//!
//! Each tile is a light grey square with a thin border and its `z/x/y`
//! address printed in the middle, so a map running without a real source
//! still shows where every tile landed.

use image::{Rgba, RgbaImage};

use super::image::TileImage;
use super::provider::TileProvider;
use crate::core::constants::TILE_SIZE;
use crate::core::geo::TileCoord;
use crate::Result;

const BACKGROUND: Rgba<u8> = Rgba([240, 240, 240, 255]);
const BORDER: Rgba<u8> = Rgba([200, 200, 200, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;
const MAX_SCALE: u32 = 4;

/// 3×5 bitmap glyphs, one row per entry, most significant bit on the left
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        _ => [0; 5],
    }
}

/// Generates labelled placeholder tiles; never fails for a valid coordinate
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    /// Draw the placeholder for `coord` without validating it
    pub fn render(&self, coord: TileCoord) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, BACKGROUND);

        let last = TILE_SIZE - 1;
        for i in 0..TILE_SIZE {
            image.put_pixel(i, 0, BORDER);
            image.put_pixel(i, last, BORDER);
            image.put_pixel(0, i, BORDER);
            image.put_pixel(last, i, BORDER);
        }

        draw_label(&mut image, &coord.to_string());
        image
    }
}

/// Draw `text` centered, at the largest scale that fits the tile
fn draw_label(image: &mut RgbaImage, text: &str) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return;
    }
    let advance = GLYPH_WIDTH + 1;
    let usable = TILE_SIZE - 16;
    let scale = (1..=MAX_SCALE)
        .rev()
        .find(|s| (chars * advance - 1) * s <= usable)
        .unwrap_or(1);

    let text_width = (chars * advance - 1) * scale;
    let text_height = GLYPH_HEIGHT * scale;
    let left = TILE_SIZE.saturating_sub(text_width) / 2;
    let top = (TILE_SIZE - text_height) / 2;

    for (i, c) in text.chars().enumerate() {
        let origin_x = left + i as u32 * advance * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin_x + col * scale + dx;
                        let y = top + row as u32 * scale + dy;
                        if x < TILE_SIZE && y < TILE_SIZE {
                            image.put_pixel(x, y, INK);
                        }
                    }
                }
            }
        }
    }
}

impl TileProvider for SyntheticProvider {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        coord.validate()?;
        TileImage::new(self.render(coord))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
