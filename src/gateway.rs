/*
 *  gateway.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Player notifications in, surface updates out
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

use std::time::Instant;

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::deutils::{clamp_seconds, format_duration};
use crate::display::surface::SurfaceHandle;
use crate::metadata::{InboundMessage, TrackMetadata};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("metadata source I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Fans player notifications out to every surface
#[derive(Debug, Clone, Default)]
pub struct UpdateGateway {
    surfaces: Vec<SurfaceHandle>,
}

impl UpdateGateway {
    pub fn new(surfaces: Vec<SurfaceHandle>) -> Self {
        Self { surfaces }
    }

    pub fn add_surface(&mut self, handle: SurfaceHandle) {
        self.surfaces.push(handle);
    }

    pub fn surfaces(&self) -> &[SurfaceHandle] {
        &self.surfaces
    }

    pub fn on_metadata(&self, meta: TrackMetadata) {
        // tokio's clock so paused-time tests see the same instant as the loops
        self.on_metadata_at(meta, tokio::time::Instant::now().into_std());
    }

    /// Each surface gets its own copy and applies its own change policy
    pub fn on_metadata_at(&self, mut meta: TrackMetadata, now: Instant) {
        meta.observed_at.get_or_insert_with(Utc::now);

        info!(
            "{} : {} - {}",
            meta.player_name,
            meta.title.as_deref().unwrap_or(""),
            meta.artist.as_deref().unwrap_or("")
        );
        info!(
            "{} / {}",
            format_duration(clamp_seconds(meta.position_seconds)),
            format_duration(clamp_seconds(meta.duration_seconds))
        );

        for surface in &self.surfaces {
            surface.on_metadata(meta.clone(), now);
        }
    }

    pub fn on_volume_changed(&self, percent: u8) {
        info!("Volume changed to {}%", percent);
    }

    pub fn dispatch(&self, message: InboundMessage) {
        match message {
            InboundMessage::Metadata(meta) => self.on_metadata(meta),
            InboundMessage::Volume { percent } => self.on_volume_changed(percent),
        }
    }
}

pub fn parse_line(line: &str, line_no: usize) -> Result<InboundMessage, SourceError> {
    InboundMessage::parse(line).map_err(|source| SourceError::Json { line: line_no, source })
}

/// Stdin for "-", otherwise a file or FIFO
pub async fn open_source(input: &str) -> Result<Box<dyn AsyncBufRead + Send + Unpin>, SourceError> {
    if input == "-" {
        info!("Reading metadata from stdin");
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        info!("Reading metadata from {}", input);
        let file = File::open(input).await?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Feeds JSON lines into the gateway until EOF or `stop`.
///
/// Bad lines, including ones that are not UTF-8, are logged and skipped.
/// Returns the number of messages dispatched.
pub async fn run_source<R>(
    mut reader: R,
    gateway: &UpdateGateway,
    mut stop: watch::Receiver<bool>,
) -> Result<usize, SourceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no = 0;
    let mut dispatched = 0;

    loop {
        if *stop.borrow() {
            break;
        }
        // a cancelled read_until leaves its partial line in buf
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read?,
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        if read == 0 && buf.is_empty() {
            debug!("Metadata source closed after {} lines", line_no);
            break;
        }
        line_no += 1;

        match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match parse_line(line.trim(), line_no) {
                Ok(message) => {
                    gateway.dispatch(message);
                    dispatched += 1;
                }
                Err(e) => warn!("Skipping metadata {}", e),
            },
            Err(e) => warn!("Skipping metadata line {}: {}", line_no, e),
        }
        buf.clear();
    }
    Ok(dispatched)
}
