/*
 *  display/error.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for sinks, rendering and icon assets
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

use std::path::PathBuf;
use thiserror::Error;

/// Transport and hardware errors raised by a display sink
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Hardware initialization failed
    #[error("Display initialization failed: {0}")]
    InitializationFailed(String),

    /// I2C communication error
    #[error("I2C communication error: {0}")]
    I2cError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Frame does not match the panel geometry
    #[error("Frame size mismatch: panel is {expected:?}, frame is {actual:?}")]
    FrameSizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// Drawing operation failed
    #[error("Drawing error: {0}")]
    DrawingError(String),

    /// Display interface error
    // display_interface::DisplayError doesn't implement std::error::Error
    #[error("Display interface error: {0:?}")]
    InterfaceError(display_interface::DisplayError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::InterfaceError(err)
    }
}

impl From<linux_embedded_hal::I2CError> for DisplayError {
    fn from(err: linux_embedded_hal::I2CError) -> Self {
        DisplayError::I2cError(format!("{:?}", err))
    }
}

/// Icon asset loading errors
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no icon for {key} in {dir}")]
    Missing { key: String, dir: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("failed to render icon: {0}")]
    Render(String),
}

/// Errors raised while composing a frame
#[derive(Debug, Error)]
pub enum RenderError {
    /// Duration input outside the formatter's domain
    #[error("invalid duration: {0} (must be finite and >= 0)")]
    InvalidDuration(f64),

    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}

// drawing into an in-memory framebuffer cannot fail
impl From<core::convert::Infallible> for RenderError {
    fn from(never: core::convert::Infallible) -> Self {
        match never {}
    }
}
