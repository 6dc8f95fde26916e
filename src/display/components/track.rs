/*
 *  display/components/track.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Now playing frame: scrolling title and artist over a progress bar
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
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::deutils::{clamp_seconds, duration_label};
use crate::display::error::RenderError;
use crate::display::framebuffer::{Frame, VarFrameBuf};
use crate::textable::{text_width, Marquee, ARTIST_FONT, TIME_FONT, TITLE_FONT};

/// Shown in place of a missing title or artist
pub const PLACEHOLDER: &str = "-";

pub const TITLE_Y: i32 = 0;
pub const ARTIST_Y: i32 = 20;
/// Progress band sits this far above the bottom edge
const BAR_FROM_BOTTOM: i32 = 15;
const BAR_HEIGHT: u32 = 5;
const BAR_RADIUS: u32 = 2;

/// What the track panel needs from a metadata snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackView<'a> {
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

impl<'a> TrackView<'a> {
    pub fn title(&self) -> &'a str {
        self.title.unwrap_or(PLACEHOLDER)
    }

    pub fn artist(&self) -> &'a str {
        self.artist.unwrap_or(PLACEHOLDER)
    }
}

/// Filled width of the progress bar.
///
/// An unknown (zero) duration reads as empty, a position past the end
/// reads as full.
pub fn progress_fill_width(position: f64, total: f64, bar_width: u32) -> u32 {
    if !(total.is_finite() && total > 0.0) || !position.is_finite() {
        return 0;
    }
    let ratio = (position / total).clamp(0.0, 1.0);
    ((ratio * f64::from(bar_width)).round() as u32).min(bar_width)
}

/// Composes now playing frames for one panel size
#[derive(Debug, Clone)]
pub struct TrackComposer {
    size: Size,
    marquee: Marquee,
}

impl TrackComposer {
    pub fn new(size: Size, pause_ticks: u64) -> Self {
        Self {
            size,
            marquee: Marquee::new(size.width, pause_ticks),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn marquee(&self) -> &Marquee {
        &self.marquee
    }

    /// Leftward shift of the title line at `tick`
    pub fn title_offset(&self, view: &TrackView<'_>, tick: u64) -> u32 {
        self.marquee.offset(text_width(view.title(), TITLE_FONT), tick)
    }

    /// Leftward shift of the artist line at `tick`
    pub fn artist_offset(&self, view: &TrackView<'_>, tick: u64) -> u32 {
        self.marquee.offset(text_width(view.artist(), ARTIST_FONT), tick)
    }

    pub fn compose(&self, view: &TrackView<'_>, tick: u64) -> Result<Frame, RenderError> {
        let mut fb = VarFrameBuf::new(self.size.width, self.size.height, BinaryColor::Off);

        self.draw_marquee(&mut fb, view.title(), TITLE_FONT, TITLE_Y, tick)?;
        self.draw_marquee(&mut fb, view.artist(), ARTIST_FONT, ARTIST_Y, tick)?;
        self.draw_progress(&mut fb, view.position_seconds, view.duration_seconds)?;

        Ok(Frame::Mono(fb))
    }

    fn draw_marquee(
        &self,
        fb: &mut VarFrameBuf<BinaryColor>,
        text: &str,
        font: &MonoFont<'_>,
        y: i32,
        tick: u64,
    ) -> Result<(), RenderError> {
        let x = self.marquee.x_position(text_width(text, font), tick);
        let style = MonoTextStyle::new(font, BinaryColor::On);
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(fb)?;
        Ok(())
    }

    fn draw_progress(
        &self,
        fb: &mut VarFrameBuf<BinaryColor>,
        position: f64,
        total: f64,
    ) -> Result<(), RenderError> {
        let width = self.size.width;
        let bottom = self.size.height as i32 - 1;
        let bar_y = self.size.height as i32 - BAR_FROM_BOTTOM;

        let outline = PrimitiveStyleBuilder::new()
            .stroke_color(BinaryColor::On)
            .stroke_width(1)
            .fill_color(BinaryColor::Off)
            .build();
        RoundedRectangle::with_equal_corners(
            Rectangle::new(Point::new(0, bar_y), Size::new(width, BAR_HEIGHT)),
            Size::new(BAR_RADIUS, BAR_RADIUS),
        )
        .into_styled(outline)
        .draw(fb)?;

        // fill sits inside the outline, one pixel in on every side
        let fill = progress_fill_width(position, total, width.saturating_sub(2));
        if fill > 0 {
            Rectangle::new(Point::new(1, bar_y + 1), Size::new(fill, BAR_HEIGHT - 2))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(fb)?;
        }

        let current = duration_label(clamp_seconds(position));
        let total = duration_label(clamp_seconds(total));
        let style = MonoTextStyle::new(TIME_FONT, BinaryColor::On);

        let left = TextStyleBuilder::new().alignment(Alignment::Left).baseline(Baseline::Bottom).build();
        Text::with_text_style(&current, Point::new(0, bottom), style, left).draw(fb)?;

        let right = TextStyleBuilder::new().alignment(Alignment::Right).baseline(Baseline::Bottom).build();
        Text::with_text_style(&total, Point::new(width as i32 - 1, bottom), style, right).draw(fb)?;

        Ok(())
    }
}
