/*
 *  display/drivers/ssd1306.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306/SSD1309 OLED display sink over I2C
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

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x32, DisplaySize128x64},
    I2CDisplayInterface,
    Ssd1306,
};

// the config type below shadows the prelude trait that provides init()
use ssd1306::mode::DisplayConfig as _;

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplaySink};

use log::{debug, info};

/// Enum to handle different SSD1306 display sizes
enum Ssd1306Variants<I2C> {
    Size128x64(Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>),
    Size128x32(Ssd1306<I2CInterface<I2C>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>),
}

/// SSD1306 family sink
///
/// The SSD1309 shares the SSD1306 command set, so both controllers are
/// driven from here; only the reported name differs.
pub struct Ssd1306Sink<I2C> {
    display: Ssd1306Variants<I2C>,
    capabilities: DisplayCapabilities,
    powered: Option<bool>,
}

fn brightness_for(value: u8) -> Brightness {
    match value {
        0..=63 => Brightness::DIMMEST,
        64..=127 => Brightness::DIM,
        128..=191 => Brightness::NORMAL,
        _ => Brightness::BRIGHTEST,
    }
}

impl Ssd1306Sink<I2cdev> {
    /// Open the I2C bus and build the sink
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-1")
    /// * `address` - I2C address (typically 0x3C or 0x3D)
    /// * `name` - Controller name reported in logs ("SSD1306" or "SSD1309")
    /// * `config` - Display configuration
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        name: &'static str,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Opening {} on {} at address 0x{:02X}", name, i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", i2c_bus_path, e)))?;

        Self::new(i2c, address, name, config)
    }
}

impl<I2C> Ssd1306Sink<I2C>
where
    I2C: I2c,
{
    /// Wrap an already opened bus
    pub fn new(i2c: I2C, address: u8, name: &'static str, config: &DisplayConfig) -> Result<Self, DisplayError> {
        let width = config.width.unwrap_or(128);
        let height = config.height.unwrap_or(64);
        let rotation = match config.rotate_deg.unwrap_or(0) {
            0 => DisplayRotation::Rotate0,
            180 => DisplayRotation::Rotate180,
            other => {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "{} rotation must be 0 or 180, got {}",
                    name, other
                )));
            }
        };

        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let display = match (width, height) {
            (128, 64) => Ssd1306Variants::Size128x64(
                Ssd1306::new(interface, DisplaySize128x64, rotation).into_buffered_graphics_mode(),
            ),
            (128, 32) => Ssd1306Variants::Size128x32(
                Ssd1306::new(interface, DisplaySize128x32, rotation).into_buffered_graphics_mode(),
            ),
            _ => {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "Unsupported {} size: {}x{}",
                    name, width, height
                )));
            }
        };

        Ok(Self {
            display,
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: ColorDepth::Monochrome,
                name,
            },
            powered: None,
        })
    }

    pub fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = brightness_for(value);
        match &mut self.display {
            Ssd1306Variants::Size128x64(d) => d.set_brightness(brightness)?,
            Ssd1306Variants::Size128x32(d) => d.set_brightness(brightness)?,
        }
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        if self.powered == Some(on) {
            return Ok(());
        }
        match &mut self.display {
            Ssd1306Variants::Size128x64(d) => d.set_display_on(on)?,
            Ssd1306Variants::Size128x32(d) => d.set_display_on(on)?,
        }
        debug!("{} power {}", self.capabilities.name, if on { "on" } else { "off" });
        self.powered = Some(on);
        Ok(())
    }
}

impl<I2C> DisplaySink for Ssd1306Sink<I2C>
where
    I2C: I2c + Send,
{
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        match &mut self.display {
            Ssd1306Variants::Size128x64(d) => d.init()?,
            Ssd1306Variants::Size128x32(d) => d.init()?,
        }
        // init leaves the panel on
        self.powered = Some(true);
        info!("{} initialized ({}x{})", self.capabilities.name, self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        self.set_power(true)
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        self.set_power(false)
    }

    fn display(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let expected = self.dimensions();
        let actual = frame.dimensions();
        if expected != actual {
            return Err(DisplayError::FrameSizeMismatch { expected, actual });
        }

        let mono = frame.to_mono();
        let width = self.capabilities.width as usize;

        match &mut self.display {
            Ssd1306Variants::Size128x64(d) => {
                d.clear_buffer();
                for (i, pixel) in mono.as_slice().iter().enumerate() {
                    d.set_pixel((i % width) as u32, (i / width) as u32, pixel.is_on());
                }
                d.flush()?;
            }
            Ssd1306Variants::Size128x32(d) => {
                d.clear_buffer();
                for (i, pixel) in mono.as_slice().iter().enumerate() {
                    d.set_pixel((i % width) as u32, (i / width) as u32, pixel.is_on());
                }
                d.flush()?;
            }
        }
        Ok(())
    }
}
