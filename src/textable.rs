/*
 *  textable.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Marquee scrolling and text measurement
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

use embedded_graphics::{
    mono_font::{
        ascii::FONT_5X8,
        iso_8859_1::{FONT_7X13, FONT_7X13_BOLD, FONT_9X15_BOLD},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{renderer::TextRenderer, Baseline},
};

/// Frames spent resting at each end of the marquee cycle.
pub const DEFAULT_PAUSE_TICKS: u64 = 50;

pub const TITLE_FONT: &MonoFont<'static> = &FONT_7X13_BOLD;
pub const ARTIST_FONT: &MonoFont<'static> = &FONT_7X13;
pub const TIME_FONT: &MonoFont<'static> = &FONT_5X8;
pub const LABEL_FONT: &MonoFont<'static> = &FONT_9X15_BOLD;

/// Advance width in pixels of `text` drawn with `font`.
pub fn text_width(text: &str, font: &MonoFont<'_>) -> u32 {
    let style = MonoTextStyle::new(font, BinaryColor::On);
    let metrics = style.measure_string(text, Point::zero(), Baseline::Top);
    metrics.next_position.x.max(0) as u32
}

/// Leftward pixel shift for text that may overflow its viewport.
///
/// The cycle is rest at the left edge, scroll left one pixel per tick,
/// rest at the right edge, scroll back, and repeat. It is a pure function
/// of `tick` so the animation needs no stored position.
pub fn marquee_offset(text_width_px: u32, viewport_width_px: u32, tick: u64, pause_ticks: u64) -> u32 {
    if text_width_px <= viewport_width_px {
        return 0;
    }

    let overflow = u64::from(text_width_px - viewport_width_px);
    let cycle_length = 2 * overflow + 2 * pause_ticks;
    let phase = tick % cycle_length;

    let offset = if phase < pause_ticks {
        0
    } else if phase < pause_ticks + overflow {
        phase - pause_ticks
    } else if phase < 2 * pause_ticks + overflow {
        overflow
    } else {
        2 * overflow - (phase - 2 * pause_ticks)
    };

    offset as u32
}

/// Marquee geometry for one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marquee {
    pub viewport_width: u32,
    pub pause_ticks: u64,
}

impl Marquee {
    pub fn new(viewport_width: u32, pause_ticks: u64) -> Self {
        Self { viewport_width, pause_ticks }
    }

    /// Ticks in one full rest-scroll-rest-scroll loop, zero when static.
    pub fn cycle_length(&self, text_width_px: u32) -> u64 {
        if text_width_px <= self.viewport_width {
            return 0;
        }
        2 * u64::from(text_width_px - self.viewport_width) + 2 * self.pause_ticks
    }

    pub fn offset(&self, text_width_px: u32, tick: u64) -> u32 {
        marquee_offset(text_width_px, self.viewport_width, tick, self.pause_ticks)
    }

    /// Draw position x for the text, the viewport is a window over it.
    pub fn x_position(&self, text_width_px: u32, tick: u64) -> i32 {
        -(self.offset(text_width_px, tick) as i32)
    }
}
