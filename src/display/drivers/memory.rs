/*
 *  display/drivers/memory.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory display sink for tests and headless runs
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplaySink};

/// Calls a controller made against the sink, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Init,
    Show,
    Hide,
    Display,
}

/// Shared state for the memory sink (cloned handle for inspection)
#[derive(Debug, Default)]
pub struct MemorySinkState {
    /// Every call in arrival order
    pub calls: Vec<SinkCall>,

    /// Whether the panel is currently powered
    pub visible: bool,

    /// Last frame pushed through `display`, after 1-bit conversion
    pub last_frame: Option<Frame>,

    /// Number of frames accepted
    pub frames_shown: usize,

    /// Simulate transport failures (for error testing)
    pub simulate_display_failure: bool,
    pub simulate_power_failure: bool,
}

impl MemorySinkState {
    pub fn count(&self, call: SinkCall) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }
}

/// Display sink that keeps everything in memory
///
/// Records every call and the last frame so tests can assert on what a
/// controller did. Also backs `--headless` runs on machines without a
/// panel attached.
#[derive(Debug, Clone)]
pub struct MemorySink {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: ColorDepth::Monochrome,
                name: "memory",
            },
            state: Arc::new(Mutex::new(MemorySinkState::default())),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MemorySinkState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        // a panicking test thread must not hide the recorded calls
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for MemorySink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.lock().calls.push(SinkCall::Init);
        Ok(())
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Show);
        if state.simulate_power_failure {
            return Err(DisplayError::Other("Simulated power failure".to_string()));
        }
        state.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Hide);
        if state.simulate_power_failure {
            return Err(DisplayError::Other("Simulated power failure".to_string()));
        }
        state.visible = false;
        Ok(())
    }

    fn display(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let expected = self.dimensions();
        let actual = frame.dimensions();
        if expected != actual {
            return Err(DisplayError::FrameSizeMismatch { expected, actual });
        }

        let mut state = self.lock();
        state.calls.push(SinkCall::Display);
        if state.simulate_display_failure {
            return Err(DisplayError::Other("Simulated display failure".to_string()));
        }
        state.last_frame = Some(Frame::Mono(frame.to_mono()));
        state.frames_shown += 1;
        Ok(())
    }
}
