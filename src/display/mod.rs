/*
 *  display/mod.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - sinks, composers and the per-surface loop
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod factory;

// Display sinks
pub mod drivers;

// Frame composers
pub mod components;

// Render loop, one per physical display
pub mod surface;

// Re-exports for convenience
pub use traits::{BoxedSink, ColorDepth, DisplayCapabilities, DisplaySink};
pub use error::{AssetError, DisplayError, RenderError};
pub use framebuffer::{Frame, VarFrameBuf};
pub use factory::DisplaySinkFactory;
pub use surface::{ChangePolicy, Panel, PanelKind, SurfaceController, SurfaceHandle, SurfaceState, Timing};
