use crate::grid::{GridMap, Pos};
use crate::palette;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};
use log::debug;
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no frames captured")]
    NoFrames,
    #[error("fps must be positive")]
    InvalidFps,
    #[error("failed to create {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gif encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Captures the grid as RGBA frames and turns them into an animated GIF.
///
/// Frames are rasterized from the logical cell state (same colors and
/// geometry the window shows), so capture works identically headless. An
/// optional `max_frames` bound keeps long sessions from growing without
/// limit: frames past the bound are dropped and counted.
pub struct FrameRecorder {
    frames: Vec<RgbaImage>,
    max_frames: Option<usize>,
    dropped: usize,
}

impl FrameRecorder {
    pub fn new(max_frames: Option<usize>) -> Self {
        FrameRecorder {
            frames: Vec::new(),
            max_frames,
            dropped: 0,
        }
    }

    /// Rasterize the grid's current display state into a new frame.
    pub fn capture(&mut self, grid: &GridMap) {
        if let Some(max) = self.max_frames {
            if self.frames.len() >= max {
                self.dropped += 1;
                return;
            }
        }

        let cell_px = grid.cell_px() as u32;
        let width = grid.width_px() as u32;
        let height = grid.height_px() as u32;
        let mut image = RgbaImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let color = if x % cell_px == 0 || y % cell_px == 0 {
                    palette::GRID_LINE
                } else {
                    let pos = Pos::new((y / cell_px) as i32, (x / cell_px) as i32);
                    grid.cell(pos).display_color()
                };
                image.put_pixel(x, y, Rgba([color.r, color.g, color.b, 255]));
            }
        }
        self.frames.push(image);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames refused because of the capacity bound.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.dropped = 0;
    }

    /// Encode the captured frames as a looping GIF.
    ///
    /// `fps` sets the playback rate; `end_hold_secs` is how long the last
    /// frame stays on screen before the loop restarts, folded into that
    /// frame's delay. An empty session is a reported error, not a panic.
    pub fn export_gif(&self, path: &str, fps: u32, end_hold_secs: f32) -> Result<(), ExportError> {
        if self.frames.is_empty() {
            return Err(ExportError::NoFrames);
        }
        if fps == 0 {
            return Err(ExportError::InvalidFps);
        }

        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite)?;

        let hold_ms = (end_hold_secs.max(0.0) * 1000.0).round() as u32;
        for (index, image) in self.frames.iter().enumerate() {
            let last = index + 1 == self.frames.len();
            // Per-frame delay is 1000/fps ms; the final frame carries the
            // extra hold on top.
            let delay = if last {
                Delay::from_numer_denom_ms(1000 + hold_ms.saturating_mul(fps), fps)
            } else {
                Delay::from_numer_denom_ms(1000, fps)
            };
            encoder.encode_frame(Frame::from_parts(image.clone(), 0, 0, delay))?;
        }
        debug!(
            "encoded {} frames to {} ({} dropped)",
            self.frames.len(),
            path,
            self.dropped
        );
        Ok(())
    }
}
