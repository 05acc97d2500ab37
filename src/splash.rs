//! One-shot startup image shown between window creation and the first
//! rendered frame.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ConnectionExt, Gcontext, ImageFormat, Window};
use x11rb::rust_connection::RustConnection;

use crate::config::SplashConfig;
use crate::shared::WindowSize;

/// Everything needed to paint the splash into the freshly mapped window.
pub(crate) struct SplashScreen<'a> {
    pub conn: &'a RustConnection,
    pub window: Window,
    pub gc: Gcontext,
    pub depth: u8,
    pub window_size: WindowSize,
}

impl SplashScreen<'_> {
    /// Present the configured splash image and block until it has been
    /// painted once. Missing configuration or a bad asset skips the splash;
    /// the window stays mapped either way.
    pub(crate) fn present(&self, config: &SplashConfig) {
        let Some(path) = config.resolve_path() else {
            debug!("No splash image configured, skipping");
            return;
        };
        if let Err(e) = self.paint(&path) {
            warn!("Splash screen skipped: {:#}", e);
        }
    }

    fn paint(&self, path: &Path) -> Result<()> {
        let (width, height, pixels) = load_splash_pixels(path)?;

        let pixmap = self
            .conn
            .generate_id()
            .context("Failed to allocate pixmap id")?;
        self.conn
            .create_pixmap(self.depth, pixmap, self.window, width as u16, height as u16)
            .context("Failed to issue pixmap creation")?
            .check()
            .context("Failed to create splash pixmap")?;

        // TODO: handle 30-bit visuals; a 24-bit z-pixmap layout is assumed.
        self.conn
            .put_image(
                ImageFormat::Z_PIXMAP,
                pixmap,
                self.gc,
                width as u16,
                height as u16,
                0,
                0,
                0,
                self.depth,
                &pixels,
            )
            .context("Failed to upload splash image")?;
        self.conn.flush().context("Failed to flush splash upload")?;

        let (dst_x, dst_y) = centered_origin(self.window_size, width, height);

        // Block until the first expose arrives; every other event is
        // discarded. No timeout: this runs once, before steady-state
        // dispatch begins.
        loop {
            let event = self
                .conn
                .wait_for_event()
                .context("Connection lost while waiting for expose")?;
            if let Event::Expose(expose) = event {
                self.conn
                    .copy_area(
                        pixmap,
                        self.window,
                        self.gc,
                        expose.x as i16,
                        expose.y as i16,
                        dst_x,
                        dst_y,
                        expose.width,
                        expose.height,
                    )
                    .context("Failed to copy splash pixmap")?;
                self.conn.flush().context("Failed to flush splash blit")?;
                break;
            }
        }

        self.conn
            .free_pixmap(pixmap)
            .context("Failed to free splash pixmap")?;
        Ok(())
    }
}

/// Decode the image and reorder it into the z-pixmap byte order X expects.
fn load_splash_pixels(path: &Path) -> Result<(u32, u32, Vec<u8>)> {
    let decoded = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, zpixmap_bytes(rgba.as_raw())))
}

/// Swap RGBA pixels into little-endian z-pixmap bytes (blue first). The
/// unused high byte is zeroed.
fn zpixmap_bytes(rgba: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; rgba.len()];
    for (dst, src) in out.chunks_exact_mut(4).zip(rgba.chunks_exact(4)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
    }
    out
}

/// Top-left origin that centers the image in the window. Images larger than
/// the window land at a negative origin and are clipped by the server.
fn centered_origin(window: WindowSize, image_width: u32, image_height: u32) -> (i16, i16) {
    let x = (window.width as i64 - image_width as i64) / 2;
    let y = (window.height as i64 - image_height as i64) / 2;
    (x as i16, y as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zpixmap_bytes_swaps_red_and_blue() {
        // Two RGBA pixels: red and blue.
        let rgba = [255, 0, 0, 255, 0, 0, 255, 255];
        let out = zpixmap_bytes(&rgba);
        assert_eq!(out, [0, 0, 255, 0, 255, 0, 0, 0]);
    }

    #[test]
    fn zpixmap_bytes_zeroes_the_alpha_slot() {
        let rgba = [1, 2, 3, 4];
        assert_eq!(zpixmap_bytes(&rgba), [3, 2, 1, 0]);
    }

    #[test]
    fn image_centers_inside_larger_window() {
        let origin = centered_origin(WindowSize::new(800, 600), 200, 100);
        assert_eq!(origin, (300, 250));
    }

    #[test]
    fn oversized_image_gets_negative_origin() {
        let origin = centered_origin(WindowSize::new(100, 100), 300, 400);
        assert_eq!(origin, (-100, -150));
    }
}
