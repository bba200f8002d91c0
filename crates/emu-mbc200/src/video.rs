//! Bitmap display.
//!
//! The HD46505 hands over one raster row at a time. Each character cell is
//! a byte of video RAM, 8 pixels wide, and the four raster lines of a
//! character row are interleaved: cell `i` of raster `ra` lives at
//! `(ma + i) * 4 + ra`.

use motorola_6845::RasterRow;

pub const SCREEN_WIDTH: u32 = 640;
pub const SCREEN_HEIGHT: u32 = 400;

/// Monochrome palette (ARGB32): background, foreground.
pub const PALETTE: [u32; 2] = [0xFF00_0000, 0xFFFF_FFFF];

/// Expand one raster row of video RAM into `scanline`.
///
/// Emits `x_count * 8` pixels, MSB of each byte first, clipped to the
/// length of `scanline`. Addresses wrap at 32K.
pub fn render_row(
    vram: &[u8],
    ma: u16,
    ra: u8,
    x_count: u8,
    palette: &[u32; 2],
    scanline: &mut [u32],
) {
    for (cell, pixels) in scanline
        .chunks_mut(8)
        .take(x_count as usize)
        .enumerate()
    {
        let addr = ((ma as usize + cell) * 4 + ra as usize) & 0x7FFF;
        let byte = vram.get(addr).copied().unwrap_or(0);
        for (bit, pixel) in pixels.iter_mut().enumerate() {
            *pixel = palette[usize::from((byte >> (7 - bit)) & 1)];
        }
    }
}

/// The 640x400 frame the CRTC's rows are drawn into.
pub struct Display {
    framebuffer: Vec<u32>,
}

impl Display {
    #[must_use]
    pub fn new() -> Self {
        Self {
            framebuffer: vec![PALETTE[0]; (SCREEN_WIDTH * SCREEN_HEIGHT) as usize],
        }
    }

    /// Draw a row the CRTC published. Rows below the screen are dropped.
    pub fn draw(&mut self, row: RasterRow, vram: &[u8]) {
        if u32::from(row.y) >= SCREEN_HEIGHT {
            return;
        }
        let start = row.y as usize * SCREEN_WIDTH as usize;
        let scanline = &mut self.framebuffer[start..start + SCREEN_WIDTH as usize];
        render_row(vram, row.ma, row.ra, row.x_count, &PALETTE, scanline);
    }

    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
