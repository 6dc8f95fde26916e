/*
 *  demo.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Renders a fixed track to an animated GIF, handy for eyeballing the layout
 *  without a panel attached
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use embedded_graphics::pixelcolor::BinaryColor;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame as GifFrame, ImageError, Rgba, RgbaImage};
use log::info;
use thiserror::Error;

use crate::display::components::track::{TrackComposer, TrackView};
use crate::display::error::RenderError;
use crate::display::Frame;

pub const DEMO_TITLE: &str = "Could You Be Loved";
pub const DEMO_ARTIST: &str = "Bob Marley & The Wailers";
pub const DEMO_LENGTH_SECS: u64 = 42;
pub const DEMO_FPS: u64 = 10;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("demo output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("gif encoding failed: {0}")]
    Encode(#[from] ImageError),
}

/// Track state at frame `tick`, position advances a second per `DEMO_FPS` frames
pub fn demo_view(tick: u64) -> TrackView<'static> {
    TrackView {
        title: Some(DEMO_TITLE),
        artist: Some(DEMO_ARTIST),
        position_seconds: (tick / DEMO_FPS) as f64,
        duration_seconds: DEMO_LENGTH_SECS as f64,
    }
}

pub fn demo_frame_count() -> u64 {
    DEMO_LENGTH_SECS * DEMO_FPS
}

/// White on black, as the panel shows it
fn frame_to_rgba(frame: &Frame) -> RgbaImage {
    let (w, h) = frame.dimensions();
    RgbaImage::from_fn(w, h, |x, y| match frame.mono_pixel(x, y) {
        Some(BinaryColor::On) => Rgba([255, 255, 255, 255]),
        _ => Rgba([0, 0, 0, 255]),
    })
}

/// Writes every demo frame into one looping GIF at `path`
pub fn write_demo(path: &Path, composer: &TrackComposer) -> Result<u64, DemoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    let frames = demo_frame_count();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = Delay::from_numer_denom_ms(1000, DEMO_FPS as u32);
        for tick in 0..frames {
            let frame = composer.compose(&demo_view(tick), tick)?;
            encoder.encode_frame(GifFrame::from_parts(frame_to_rgba(&frame), 0, 0, delay))?;
        }
        // the trailer is written when the encoder drops
    }
    out.flush()?;
    info!("Wrote {} demo frames to {}", frames, path.display());
    Ok(frames)
}
