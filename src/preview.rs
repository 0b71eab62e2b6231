//! PNG export of a rendered grid.
//!
//! Each cell becomes a `cell_size` square with `gap` pixels of background
//! around it, so the image reads like the physical face.

use crate::grid::Grid;
use crate::mode::GRID_WIDTH;
use crate::{Color, Error, PreviewConfig};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
/// Unlit LEDs are dim gray so the layout stays visible.
const UNLIT: Rgb<u8> = Rgb([40, 40, 40]);

fn pixel(color: Color) -> Rgb<u8> {
    Rgb([color.r, color.g, color.b])
}

/// Paint `grid` into a new image; lit cells are scaled by the grid's
/// brightness.
pub fn grid_to_image(grid: &Grid, config: PreviewConfig) -> RgbImage {
    let width = config.extent(GRID_WIDTH as u32);
    let height = config.extent(grid.rows.len() as u32);
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    for (y, row) in grid.rows.iter().enumerate() {
        for (x, cell) in row.cells.iter().enumerate() {
            let fill = match cell.color {
                Some(color) => pixel(color.apply_brightness(grid.brightness)),
                None => UNLIT,
            };
            let left = config.offset(x as u32);
            let top = config.offset(y as u32);
            for py in top..top + config.cell_size {
                for px in left..left + config.cell_size {
                    img.put_pixel(px, py, fill);
                }
            }
        }
    }

    img
}

/// Render `grid` and write it to `path` as PNG.
pub fn save_png(grid: &Grid, config: PreviewConfig, path: &Path) -> Result<(), Error> {
    let img = grid_to_image(grid, config);
    img.save_with_format(path, ImageFormat::Png)?;
    tracing::info!(
        "Wrote {}x{} preview to {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}
