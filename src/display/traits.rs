/*
 *  display/traits.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink abstraction
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

use embedded_graphics::geometry::Size;

use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;

/// Color depth the panel accepts after conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// Monochrome displays (1-bit per pixel)
    /// Used by: SSD1306, SSD1309
    Monochrome,
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Color depth after the sink's own conversion
    pub color_depth: ColorDepth,

    /// Human readable controller name for logs
    pub name: &'static str,
}

impl DisplayCapabilities {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// One physical surface a controller pushes frames to.
///
/// `show` and `hide` toggle panel power and must be idempotent. `display`
/// takes a fully composed frame; any final pixel format conversion (RGB to
/// 1-bit) is the sink's job.
pub trait DisplaySink: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Power the panel on
    fn show(&mut self) -> Result<(), DisplayError>;

    /// Power the panel off, blanking it
    fn hide(&mut self) -> Result<(), DisplayError>;

    /// Push a rendered frame to the panel
    fn display(&mut self, frame: &Frame) -> Result<(), DisplayError>;
}

/// Boxed sink, chosen at runtime from configuration
pub type BoxedSink = Box<dyn DisplaySink>;
