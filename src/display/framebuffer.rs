/*
 *  display/framebuffer.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime sized framebuffer and the Frame handed to sinks
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

use core::convert::Infallible;

use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{BinaryColor, PixelColor, Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Luma at or above this lights a pixel when converting to 1-bit.
pub const MONO_THRESHOLD: u8 = 128;

/// A runtime-sized framebuffer for embedded-graphics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    /// Wraps row-major pixels; `None` when the length disagrees with the size.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<C>) -> Option<Self> {
        let (w, h) = (width as usize, height as usize);
        (pixels.len() == w * h).then_some(Self { buf: pixels, w, h })
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn get(&self, x: u32, y: u32) -> Option<C> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // marquee text hangs off the left edge, so clip per pixel rather
        // than clamping the origin
        let mut it = colors.into_iter();
        for p in area.points() {
            let Some(c) = it.next() else { break };
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }
}

/// One fully composed image for a surface.
///
/// Track frames are drawn straight to 1-bit. Icons keep their RGB form
/// until the sink converts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Monochrome frame (1-bit per pixel)
    Mono(VarFrameBuf<BinaryColor>),

    /// 24-bit RGB frame
    Rgb(VarFrameBuf<Rgb888>),
}

fn rgb_to_binary(c: Rgb888) -> BinaryColor {
    let luma = (u32::from(c.r()) * 299 + u32::from(c.g()) * 587 + u32::from(c.b()) * 114) / 1000;
    if luma >= u32::from(MONO_THRESHOLD) {
        BinaryColor::On
    } else {
        BinaryColor::Off
    }
}

impl Frame {
    /// Blank monochrome frame
    pub fn blank(width: u32, height: u32) -> Self {
        Frame::Mono(VarFrameBuf::new(width, height, BinaryColor::Off))
    }

    /// Get dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Mono(fb) => (fb.width() as u32, fb.height() as u32),
            Frame::Rgb(fb) => (fb.width() as u32, fb.height() as u32),
        }
    }

    /// Converts to 1-bit by luma threshold, monochrome frames are cloned.
    pub fn to_mono(&self) -> VarFrameBuf<BinaryColor> {
        match self {
            Frame::Mono(fb) => fb.clone(),
            Frame::Rgb(fb) => {
                let pixels = fb.as_slice().iter().map(|&c| rgb_to_binary(c)).collect();
                VarFrameBuf {
                    buf: pixels,
                    w: fb.width(),
                    h: fb.height(),
                }
            }
        }
    }

    /// Pixel after 1-bit conversion
    pub fn mono_pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        match self {
            Frame::Mono(fb) => fb.get(x, y),
            Frame::Rgb(fb) => fb.get(x, y).map(rgb_to_binary),
        }
    }

    pub fn count_on_pixels(&self) -> usize {
        match self {
            Frame::Mono(fb) => fb.as_slice().iter().filter(|p| p.is_on()).count(),
            Frame::Rgb(fb) => fb
                .as_slice()
                .iter()
                .filter(|&&c| rgb_to_binary(c).is_on())
                .count(),
        }
    }

    /// Packs the 1-bit image 8 pixels per byte, LSB first, row major.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mono = self.to_mono();
        let pixels = mono.as_slice();
        let mut bytes = vec![0u8; pixels.len().div_ceil(8)];

        for (i, pixel) in pixels.iter().enumerate() {
            if pixel.is_on() {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }

        bytes
    }
}
