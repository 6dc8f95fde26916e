/*
 *  assets.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Player identity icons, lookup and loading
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

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::Rgb888;
use log::debug;
use resvg::{
    render,
    usvg::{Options as UsvgOptions, Transform, Tree},
};
use tiny_skia::Pixmap;

use crate::display::error::AssetError;
use crate::display::framebuffer::{Frame, VarFrameBuf};

/// Icon keys, one per known player plus the house default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    HiFiBerry,
    Bluetooth,
    Dlna,
    Radio,
    Music,
    OpenHome,
    Roon,
    AirPlay,
    Snapcast,
    Spotify,
    Squeezelite,
}

impl AssetKey {
    /// File stem on disk, doubles as the text label
    pub fn name(&self) -> &'static str {
        match self {
            AssetKey::HiFiBerry => "HiFiBerry",
            AssetKey::Bluetooth => "Bluetooth",
            AssetKey::Dlna => "DLNA",
            AssetKey::Radio => "Radio",
            AssetKey::Music => "Music",
            AssetKey::OpenHome => "OpenHome",
            AssetKey::Roon => "Roon",
            AssetKey::AirPlay => "AirPlay",
            AssetKey::Snapcast => "Snapcast",
            AssetKey::Spotify => "Spotify",
            AssetKey::Squeezelite => "Squeezelite",
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Player name as reported by the bridge, exact match
const PLAYER_ASSETS: &[(&str, AssetKey)] = &[
    ("bluetooth", AssetKey::Bluetooth),
    ("upnp", AssetKey::Dlna),
    ("upmpdcli", AssetKey::OpenHome),
    ("raat", AssetKey::Roon),
    ("ShairportSync", AssetKey::AirPlay),
    ("snapcast", AssetKey::Snapcast),
    ("spotify", AssetKey::Spotify),
    ("lms", AssetKey::Squeezelite),
];

/// Pick the icon for a player.
///
/// mpd is the odd one out: it plays both local files and internet radio,
/// told apart by the stream url.
pub fn asset_for(player_name: &str, stream_url: Option<&str>) -> AssetKey {
    if player_name == "mpd" {
        return match stream_url {
            Some(url) if url.starts_with("http") => AssetKey::Radio,
            _ => AssetKey::Music,
        };
    }
    PLAYER_ASSETS
        .iter()
        .find(|(name, _)| *name == player_name)
        .map(|(_, key)| *key)
        .unwrap_or(AssetKey::HiFiBerry)
}

/// Source of identity icons
pub trait AssetLoader: Send + Sync {
    /// Icon for `key` fitted to a panel of `size`
    fn load_icon(&self, key: AssetKey, size: Size) -> Result<Frame, AssetError>;
}

/// Loads `<Key>.svg` or `<Key>.png` from a directory
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    dir: PathBuf,
}

impl FileAssetLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_svg(&self, path: &Path, size: Size) -> Result<Pixmap, AssetError> {
        let data = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = Tree::from_str(&data, &UsvgOptions::default()).map_err(|e| AssetError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut pixmap = Pixmap::new(size.width, size.height)
            .ok_or_else(|| AssetError::Render(format!("cannot allocate {}x{} pixmap", size.width, size.height)))?;

        // fit inside the panel keeping aspect, centred
        let svg_size = tree.size();
        let scale = (size.width as f32 / svg_size.width()).min(size.height as f32 / svg_size.height());
        let dx = (size.width as f32 - svg_size.width() * scale) / 2.0;
        let dy = (size.height as f32 - svg_size.height() * scale) / 2.0;
        let transform = Transform::from_scale(scale, scale).post_translate(dx, dy);

        render(&tree, transform, &mut pixmap.as_mut());
        Ok(pixmap)
    }

    fn load_png(&self, path: &Path) -> Result<Pixmap, AssetError> {
        Pixmap::load_png(path).map_err(|e| AssetError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Copies a pixmap onto a black panel, centred and cropped.
///
/// tiny-skia stores premultiplied pixels, which is already the colour
/// composited over black.
fn pixmap_to_frame(pixmap: &Pixmap, size: Size) -> Frame {
    let (w, h) = (size.width as i64, size.height as i64);
    let ox = (i64::from(pixmap.width()) - w) / 2;
    let oy = (i64::from(pixmap.height()) - h) / 2;

    let mut pixels = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let (sx, sy) = (x + ox, y + oy);
            // pixel() only bounds checks the flat index, so a short row wraps
            let inside = sx >= 0 && sy >= 0 && sx < i64::from(pixmap.width()) && sy < i64::from(pixmap.height());
            let c = if inside {
                pixmap.pixel(sx as u32, sy as u32)
            } else {
                None
            };
            pixels.push(c.map_or(Rgb888::new(0, 0, 0), |p| Rgb888::new(p.red(), p.green(), p.blue())));
        }
    }

    match VarFrameBuf::from_pixels(size.width, size.height, pixels) {
        Some(fb) => Frame::Rgb(fb),
        None => Frame::blank(size.width, size.height),
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_icon(&self, key: AssetKey, size: Size) -> Result<Frame, AssetError> {
        let svg = self.dir.join(format!("{}.svg", key.name()));
        if svg.is_file() {
            debug!("Loading icon {}", svg.display());
            let pixmap = self.load_svg(&svg, size)?;
            return Ok(pixmap_to_frame(&pixmap, size));
        }

        let png = self.dir.join(format!("{}.png", key.name()));
        if png.is_file() {
            debug!("Loading icon {}", png.display());
            let pixmap = self.load_png(&png)?;
            return Ok(pixmap_to_frame(&pixmap, size));
        }

        Err(AssetError::Missing {
            key: key.name().to_string(),
            dir: self.dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use tiny_skia::Color;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hifioled-assets-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_player_lookup() {
        assert_eq!(asset_for("mpd", Some("http://radio.example/stream")), AssetKey::Radio);
        assert_eq!(asset_for("mpd", Some("")), AssetKey::Music);
        assert_eq!(asset_for("mpd", None), AssetKey::Music);
        assert_eq!(asset_for("mpd", Some("/music/album/01.flac")), AssetKey::Music);
        assert_eq!(asset_for("spotify", None), AssetKey::Spotify);
        assert_eq!(asset_for("ShairportSync", None), AssetKey::AirPlay);
        assert_eq!(asset_for("upnp", None), AssetKey::Dlna);
        assert_eq!(asset_for("lms", None), AssetKey::Squeezelite);
        assert_eq!(asset_for("unknown-xyz", None), AssetKey::HiFiBerry);
        assert_eq!(asset_for("", None), AssetKey::HiFiBerry);
        // stream url only matters for mpd
        assert_eq!(asset_for("raat", Some("http://x")), AssetKey::Roon);
        // names are case sensitive
        assert_eq!(asset_for("Spotify", None), AssetKey::HiFiBerry);
    }

    #[test]
    fn test_png_is_centred_and_cropped() {
        let dir = scratch_dir("png");
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        pixmap.fill(Color::WHITE);
        pixmap.save_png(dir.join("Spotify.png")).unwrap();

        let loader = FileAssetLoader::new(&dir);
        let frame = loader.load_icon(AssetKey::Spotify, Size::new(8, 8)).unwrap();
        assert_eq!(frame.dimensions(), (8, 8));
        assert_eq!(frame.count_on_pixels(), 16);
        assert_eq!(frame.mono_pixel(2, 2), Some(BinaryColor::On));
        assert_eq!(frame.mono_pixel(1, 1), Some(BinaryColor::Off));
        assert_eq!(frame.mono_pixel(5, 5), Some(BinaryColor::On));
        assert_eq!(frame.mono_pixel(6, 6), Some(BinaryColor::Off));

        // larger than the panel gets cropped, not scaled
        let small = loader.load_icon(AssetKey::Spotify, Size::new(2, 2)).unwrap();
        assert_eq!(small.count_on_pixels(), 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_narrow_png_leaves_sides_dark() {
        let dir = scratch_dir("narrow");
        let mut pixmap = Pixmap::new(100, 20).unwrap();
        pixmap.fill(Color::WHITE);
        pixmap.save_png(dir.join("Roon.png")).unwrap();

        let frame = FileAssetLoader::new(&dir).load_icon(AssetKey::Roon, Size::new(128, 32)).unwrap();
        assert_eq!(frame.count_on_pixels(), 2000);
        // icon spans x 14..114, y 6..26
        assert_eq!(frame.mono_pixel(14, 6), Some(BinaryColor::On));
        assert_eq!(frame.mono_pixel(113, 25), Some(BinaryColor::On));
        assert_eq!(frame.mono_pixel(120, 10), Some(BinaryColor::Off));
        assert_eq!(frame.mono_pixel(5, 10), Some(BinaryColor::Off));
        assert_eq!(frame.mono_pixel(60, 28), Some(BinaryColor::Off));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_svg_is_scaled_to_fit() {
        let dir = scratch_dir("svg");
        fs::write(
            dir.join("Roon.svg"),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="white"/></svg>"#,
        )
        .unwrap();

        let frame = FileAssetLoader::new(&dir).load_icon(AssetKey::Roon, Size::new(40, 20)).unwrap();
        assert_eq!(frame.dimensions(), (40, 20));
        // 20x20 square in the middle of a 40x20 panel
        assert_eq!(frame.mono_pixel(20, 10), Some(BinaryColor::On));
        assert_eq!(frame.mono_pixel(2, 10), Some(BinaryColor::Off));
        assert_eq!(frame.mono_pixel(37, 10), Some(BinaryColor::Off));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_and_corrupt_icons() {
        let dir = scratch_dir("broken");
        let loader = FileAssetLoader::new(&dir);
        assert!(matches!(
            loader.load_icon(AssetKey::Bluetooth, Size::new(128, 32)),
            Err(AssetError::Missing { .. })
        ));

        fs::write(dir.join("Bluetooth.png"), b"definitely not a png").unwrap();
        assert!(matches!(
            loader.load_icon(AssetKey::Bluetooth, Size::new(128, 32)),
            Err(AssetError::Decode { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
