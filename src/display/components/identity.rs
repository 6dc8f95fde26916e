/*
 *  display/components/identity.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Player identity frame, icon or centred label
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

use std::collections::HashMap;
use std::sync::Arc;

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::Rectangle,
};
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use embedded_text::{style::TextBoxStyleBuilder, TextBox};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::{asset_for, AssetKey, AssetLoader};
use crate::display::error::RenderError;
use crate::display::framebuffer::{Frame, VarFrameBuf};
use crate::metadata::TrackMetadata;
use crate::textable::LABEL_FONT;

/// How the identity panel shows the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    Icon,
    Text,
}

/// Label for text mode.
///
/// Known players get their brand name, anything else shows what the
/// player called itself.
pub fn label_for(player_name: &str, key: AssetKey) -> String {
    if key == AssetKey::HiFiBerry && !player_name.trim().is_empty() {
        player_name.trim().to_string()
    } else {
        key.name().to_string()
    }
}

/// Draws `label` centred on a blank panel
pub fn compose_label(size: Size, label: &str) -> Result<Frame, RenderError> {
    let mut fb = VarFrameBuf::new(size.width, size.height, BinaryColor::Off);
    let bounds = Rectangle::new(Point::zero(), size);
    let character_style = MonoTextStyle::new(LABEL_FONT, BinaryColor::On);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    TextBox::with_textbox_style(label, bounds, character_style, textbox_style).draw(&mut fb)?;
    Ok(Frame::Mono(fb))
}

/// Composes identity frames, caching decoded icons per key
pub struct IdentityComposer {
    size: Size,
    mode: IdentityMode,
    loader: Option<Arc<dyn AssetLoader>>,
    // None marks a key whose icon failed to load, already reported
    icons: HashMap<AssetKey, Option<Frame>>,
}

impl IdentityComposer {
    pub fn new(size: Size, mode: IdentityMode, loader: Option<Arc<dyn AssetLoader>>) -> Self {
        if mode == IdentityMode::Icon && loader.is_none() {
            info!("No icon loader configured, identity panel falls back to labels");
        }
        Self { size, mode, loader, icons: HashMap::new() }
    }

    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    pub fn compose(&mut self, meta: &TrackMetadata) -> Result<Frame, RenderError> {
        let key = asset_for(&meta.player_name, meta.stream_url.as_deref());
        if self.mode == IdentityMode::Icon {
            if let Some(frame) = self.icon(key) {
                return Ok(frame);
            }
        }
        compose_label(self.size, &label_for(&meta.player_name, key))
    }

    fn icon(&mut self, key: AssetKey) -> Option<Frame> {
        let loader = self.loader.as_ref()?;
        let size = self.size;
        self.icons
            .entry(key)
            .or_insert_with(|| match loader.load_icon(key, size) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("Icon {} unavailable, showing label instead: {}", key, e);
                    None
                }
            })
            .clone()
    }
}
