/*
 *  display/factory.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds display sinks from configuration
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

use crate::config::{BusConfig, DisplayConfig, DriverKind};
use crate::display::drivers::memory::MemorySink;
use crate::display::drivers::ssd1306::Ssd1306Sink;
use crate::display::error::DisplayError;
use crate::display::traits::BoxedSink;
use log::{debug, info, warn};

/// Factory for display sinks
pub struct DisplaySinkFactory;

impl DisplaySinkFactory {
    /// Create a display sink from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Display configuration containing driver and bus settings
    ///
    /// # Returns
    ///
    /// A boxed sink, or an error if the bus cannot be opened or the
    /// driver/geometry combination is unsupported.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     driver: Some(DriverKind::Ssd1306),
    ///     width: Some(128),
    ///     height: Some(32),
    ///     bus: Some(BusConfig::I2c {
    ///         bus: "/dev/i2c-1".to_string(),
    ///         address: 0x3C,
    ///     }),
    ///     ..Default::default()
    /// };
    ///
    /// let sink = DisplaySinkFactory::create_from_config(&config)?;
    /// ```
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedSink, DisplayError> {
        let driver_kind = config.driver
            .ok_or_else(|| DisplayError::InvalidConfiguration("No display driver specified".to_string()))?;
        let width = config.width.unwrap_or(128);
        let height = config.height.unwrap_or(64);

        if driver_kind == DriverKind::Memory {
            info!("Using in-memory display {}x{}", width, height);
            return Ok(Box::new(MemorySink::new(width, height)));
        }

        let bus_config = config.bus.as_ref()
            .ok_or_else(|| DisplayError::InvalidConfiguration("No bus configuration".to_string()))?;

        let name = match driver_kind {
            DriverKind::Ssd1306 => "SSD1306",
            DriverKind::Ssd1309 => "SSD1309",
            DriverKind::Memory => "memory",
        };

        match bus_config {
            BusConfig::I2c { bus, address } => {
                debug!("Creating {} on {} at 0x{:02X}", name, bus, address);
                let mut sink = Ssd1306Sink::new_i2c(bus, *address, name, config)?;
                if let Some(level) = config.brightness {
                    // not every clone honours contrast, keep going
                    if let Err(e) = sink.set_brightness(level) {
                        warn!("{} brightness not applied: {}", name, e);
                    }
                }
                Ok(Box::new(sink))
            }
        }
    }
}
