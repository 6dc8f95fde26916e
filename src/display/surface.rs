/*
 *  display/surface.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  One physical display and its render loop
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
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::display::components::identity::IdentityComposer;
use crate::display::components::track::{TrackComposer, TrackView};
use crate::display::error::RenderError;
use crate::display::framebuffer::Frame;
use crate::display::traits::BoxedSink;
use crate::metadata::TrackMetadata;

/// Which content a surface renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Track,
    Identity,
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelKind::Track => write!(f, "track"),
            PanelKind::Identity => write!(f, "identity"),
        }
    }
}

/// When a notification counts as a meaningful change for the idle timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Different title, artist or player, or the first snapshot
    Content,
    /// Any notification at all
    EveryUpdate,
}

impl ChangePolicy {
    pub fn is_change(&self, previous: Option<&TrackMetadata>, next: &TrackMetadata) -> bool {
        match self {
            ChangePolicy::EveryUpdate => true,
            ChangePolicy::Content => previous.is_none_or(|prev| !prev.same_content(next)),
        }
    }
}

/// Shared between the update path and the render loop
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub current_metadata: Option<TrackMetadata>,
    /// arrival of `current_metadata`, for position interpolation
    pub received_at: Option<Instant>,
    /// last meaningful change per the panel's policy
    pub last_change_at: Option<Instant>,
    /// frames rendered since start, never reset
    pub tick_counter: u64,
}

impl RenderState {
    /// Replace the snapshot, bumping `last_change_at` when the policy says so
    pub fn apply(&mut self, meta: TrackMetadata, now: Instant, policy: ChangePolicy) {
        if policy.is_change(self.current_metadata.as_ref(), &meta) {
            self.last_change_at = Some(now);
        }
        self.current_metadata = Some(meta);
        self.received_at = Some(now);
    }

    pub fn is_stale(&self, kind: PanelKind, now: Instant, idle_timeout: Duration) -> bool {
        let Some(meta) = self.current_metadata.as_ref() else {
            return true;
        };
        if kind == PanelKind::Track && meta.is_blank() {
            return true;
        }
        match self.last_change_at {
            Some(at) => now.saturating_duration_since(at) > idle_timeout,
            None => true,
        }
    }
}

/// Cloneable writer side of a surface, held by the update gateway
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    kind: PanelKind,
    policy: ChangePolicy,
    state: Arc<Mutex<RenderState>>,
}

impl SurfaceHandle {
    pub fn new(kind: PanelKind, policy: ChangePolicy) -> Self {
        Self {
            kind,
            policy,
            state: Arc::new(Mutex::new(RenderState::default())),
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn policy(&self) -> ChangePolicy {
        self.policy
    }

    /// Snapshot and timestamp are swapped under one lock
    pub fn on_metadata(&self, meta: TrackMetadata, now: Instant) {
        self.lock().apply(meta, now, self.policy);
    }

    pub fn snapshot(&self) -> RenderState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RenderState> {
        // state is plain data, a panic elsewhere leaves it usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The closed set of panel renderers
pub enum Panel {
    Track(TrackComposer),
    Identity(IdentityComposer),
}

impl Panel {
    pub fn kind(&self) -> PanelKind {
        match self {
            Panel::Track(_) => PanelKind::Track,
            Panel::Identity(_) => PanelKind::Identity,
        }
    }

    pub fn compose(&mut self, meta: &TrackMetadata, since_update: Duration, tick: u64) -> Result<Frame, RenderError> {
        match self {
            Panel::Track(composer) => {
                let view = TrackView {
                    title: meta.title.as_deref(),
                    artist: meta.artist.as_deref(),
                    position_seconds: meta.position_at(since_update),
                    duration_seconds: meta.duration_seconds,
                };
                composer.compose(&view, tick)
            }
            Panel::Identity(composer) => composer.compose(meta),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Idle,
    Active,
}

/// Loop cadence and staleness window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub idle_timeout: Duration,
    pub active_interval: Duration,
    pub idle_interval: Duration,
}

impl Timing {
    pub fn for_panel(kind: PanelKind) -> Self {
        Self {
            idle_timeout: Duration::from_secs(60 * 60),
            active_interval: match kind {
                PanelKind::Track => Duration::from_millis(100),
                PanelKind::Identity => Duration::from_secs(1),
            },
            idle_interval: Duration::from_secs(5),
        }
    }
}

/// Owns one sink and decides, once per iteration, whether to blank it or
/// push a fresh frame
pub struct SurfaceController {
    sink: BoxedSink,
    panel: Panel,
    handle: SurfaceHandle,
    timing: Timing,
    state: Option<SurfaceState>,
    failing: bool,
}

impl SurfaceController {
    pub fn new(sink: BoxedSink, panel: Panel, policy: ChangePolicy, timing: Timing) -> Self {
        let handle = SurfaceHandle::new(panel.kind(), policy);
        Self {
            sink,
            panel,
            handle,
            timing,
            state: None,
            failing: false,
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.panel.kind()
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> Option<SurfaceState> {
        self.state
    }

    /// One loop iteration at `now`, returns how long to sleep before the next.
    ///
    /// Nothing in here is fatal; sink and render failures are logged and the
    /// next iteration simply tries again.
    pub fn step(&mut self, now: Instant) -> Duration {
        let work = {
            let mut state = self.handle.lock();
            if state.is_stale(self.kind(), now, self.timing.idle_timeout) {
                None
            } else {
                state.tick_counter += 1;
                let since = state.received_at.map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
                state.current_metadata.clone().map(|meta| (meta, since, state.tick_counter))
            }
        };

        match work {
            None => {
                self.transition(SurfaceState::Idle);
                let result = self.sink.hide();
                self.report(result.map_err(RenderError::from), "hide");
                self.timing.idle_interval
            }
            Some((meta, since, tick)) => {
                self.transition(SurfaceState::Active);
                let result = self.sink.show().map_err(RenderError::from).and_then(|_| {
                    let frame = self.panel.compose(&meta, since, tick)?;
                    self.sink.display(&frame)?;
                    Ok(())
                });
                self.report(result, "render");
                self.timing.active_interval
            }
        }
    }

    fn transition(&mut self, next: SurfaceState) {
        if self.state != Some(next) {
            let label = match next {
                SurfaceState::Idle => "idle",
                SurfaceState::Active => "active",
            };
            info!("{} panel ({}) {}", self.kind(), self.sink.capabilities().name, label);
            self.state = Some(next);
        }
    }

    // first failure of a streak is an error, repeats drop to debug
    fn report(&mut self, result: Result<(), RenderError>, what: &str) {
        match result {
            Ok(()) => {
                if self.failing {
                    info!("{} panel recovered", self.kind());
                    self.failing = false;
                }
            }
            Err(e) if !self.failing => {
                error!("{} panel {} failed: {}", self.kind(), what, e);
                self.failing = true;
            }
            Err(e) => debug!("{} panel {} still failing: {}", self.kind(), what, e),
        }
    }

    /// Runs until `stop` turns true or its sender goes away, then blanks
    /// the panel.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        if let Err(e) = self.sink.init() {
            error!("{} panel init failed: {}", self.kind(), e);
        }

        loop {
            if *stop.borrow() {
                break;
            }
            let delay = self.step(tokio::time::Instant::now().into_std());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.sink.hide() {
            error!("{} panel hide on shutdown failed: {}", self.kind(), e);
        }
        info!("{} panel stopped", self.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::components::identity::IdentityMode;
    use crate::display::drivers::memory::{MemorySink, MemorySinkState, SinkCall};
    use crate::textable::DEFAULT_PAUSE_TICKS;
    use embedded_graphics::geometry::Size;

    fn track_controller(policy: ChangePolicy) -> (SurfaceController, Arc<Mutex<MemorySinkState>>) {
        let sink = MemorySink::new(128, 64);
        let state = sink.state();
        let panel = Panel::Track(TrackComposer::new(Size::new(128, 64), DEFAULT_PAUSE_TICKS));
        (SurfaceController::new(Box::new(sink), panel, policy, Timing::for_panel(PanelKind::Track)), state)
    }

    fn song(title: &str, position: f64) -> TrackMetadata {
        TrackMetadata::new("spotify", title, "Band", position, 200.0)
    }

    #[test]
    fn test_content_policy_ignores_position() {
        let handle = SurfaceHandle::new(PanelKind::Track, ChangePolicy::Content);
        let t0 = Instant::now();

        handle.on_metadata(song("One", 1.0), t0);
        assert_eq!(handle.snapshot().last_change_at, Some(t0));

        let t1 = t0 + Duration::from_secs(1);
        handle.on_metadata(song("One", 2.0), t1);
        let snap = handle.snapshot();
        assert_eq!(snap.last_change_at, Some(t0));
        assert_eq!(snap.received_at, Some(t1));
        assert_eq!(snap.current_metadata.unwrap().position_seconds, 2.0);

        let t2 = t0 + Duration::from_secs(2);
        handle.on_metadata(song("Two", 0.0), t2);
        assert_eq!(handle.snapshot().last_change_at, Some(t2));
    }

    #[test]
    fn test_every_update_policy() {
        let handle = SurfaceHandle::new(PanelKind::Identity, ChangePolicy::EveryUpdate);
        let t0 = Instant::now();
        handle.on_metadata(song("One", 1.0), t0);
        let t1 = t0 + Duration::from_secs(30);
        handle.on_metadata(song("One", 1.0), t1);
        assert_eq!(handle.snapshot().last_change_at, Some(t1));
    }

    #[test]
    fn test_staleness_rules() {
        let t0 = Instant::now();
        let hour = Duration::from_secs(3600);
        let mut state = RenderState::default();
        assert!(state.is_stale(PanelKind::Track, t0, hour));
        assert!(state.is_stale(PanelKind::Identity, t0, hour));

        state.apply(TrackMetadata::new("bluetooth", "", "", 0.0, 0.0), t0, ChangePolicy::EveryUpdate);
        // no title or artist only idles the track panel
        assert!(state.is_stale(PanelKind::Track, t0, hour));
        assert!(!state.is_stale(PanelKind::Identity, t0, hour));

        state.apply(song("One", 0.0), t0, ChangePolicy::Content);
        assert!(!state.is_stale(PanelKind::Track, t0 + hour, hour));
        assert!(state.is_stale(PanelKind::Track, t0 + hour + Duration::from_secs(1), hour));
    }

    #[test]
    fn test_idle_without_metadata() {
        let (mut controller, sink) = track_controller(ChangePolicy::Content);
        let delay = controller.step(Instant::now());

        assert_eq!(delay, Duration::from_secs(5));
        assert_eq!(controller.state(), Some(SurfaceState::Idle));
        let s = sink.lock().unwrap();
        assert_eq!(s.calls, vec![SinkCall::Hide]);
        assert_eq!(controller.handle.snapshot().tick_counter, 0);
    }

    #[test]
    fn test_active_then_idle_after_timeout() {
        let (mut controller, sink) = track_controller(ChangePolicy::Content);
        let t0 = Instant::now();
        controller.handle().on_metadata(song("One", 0.0), t0);

        let delay = controller.step(t0 + Duration::from_secs(10));
        assert_eq!(delay, Duration::from_millis(100));
        assert_eq!(controller.state(), Some(SurfaceState::Active));
        assert_eq!(sink.lock().unwrap().calls, vec![SinkCall::Show, SinkCall::Display]);

        // position updates alone do not keep the panel awake
        controller.handle().on_metadata(song("One", 3000.0), t0 + Duration::from_secs(3000));
        controller.step(t0 + Duration::from_secs(3601));
        assert_eq!(controller.state(), Some(SurfaceState::Idle));
        let s = sink.lock().unwrap();
        assert_eq!(s.calls.last(), Some(&SinkCall::Hide));
        assert!(!s.visible);
    }

    #[test]
    fn test_tick_advances_once_per_render() {
        let (mut controller, _sink) = track_controller(ChangePolicy::Content);
        let t0 = Instant::now();
        controller.handle().on_metadata(song("One", 0.0), t0);
        for i in 0..5 {
            controller.step(t0 + Duration::from_millis(100 * i));
        }
        // a new song does not reset the animation phase
        controller.handle().on_metadata(song("Two", 0.0), t0);
        controller.step(t0);
        assert_eq!(controller.handle.snapshot().tick_counter, 6);
    }

    #[test]
    fn test_sink_failure_does_not_stop_the_loop() {
        let (mut controller, sink) = track_controller(ChangePolicy::Content);
        let t0 = Instant::now();
        controller.handle().on_metadata(song("One", 0.0), t0);

        sink.lock().unwrap().simulate_display_failure = true;
        assert_eq!(controller.step(t0), Duration::from_millis(100));
        assert_eq!(controller.step(t0), Duration::from_millis(100));
        assert_eq!(sink.lock().unwrap().frames_shown, 0);

        sink.lock().unwrap().simulate_display_failure = false;
        controller.step(t0);
        assert_eq!(sink.lock().unwrap().frames_shown, 1);
        assert!(!controller.failing);
    }

    #[test]
    fn test_power_failure_skips_frame() {
        let (mut controller, sink) = track_controller(ChangePolicy::Content);
        let t0 = Instant::now();
        controller.handle().on_metadata(song("One", 0.0), t0);
        sink.lock().unwrap().simulate_power_failure = true;
        controller.step(t0);
        assert_eq!(sink.lock().unwrap().count(SinkCall::Display), 0);
    }

    #[test]
    fn test_identity_panel_shows_label() {
        let sink = MemorySink::new(128, 32);
        let state = sink.state();
        let panel = Panel::Identity(IdentityComposer::new(Size::new(128, 32), IdentityMode::Text, None));
        let mut controller = SurfaceController::new(
            Box::new(sink),
            panel,
            ChangePolicy::EveryUpdate,
            Timing::for_panel(PanelKind::Identity),
        );
        let t0 = Instant::now();
        controller.handle().on_metadata(TrackMetadata::new("raat", "", "", 0.0, 0.0), t0);

        assert_eq!(controller.step(t0), Duration::from_secs(1));
        let s = state.lock().unwrap();
        assert!(s.visible);
        assert!(s.last_frame.as_ref().is_some_and(|f| f.count_on_pixels() > 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_signal() {
        let (controller, sink) = track_controller(ChangePolicy::Content);
        let handle = controller.handle();
        let (stop_tx, stop_rx) = watch::channel(false);

        handle.on_metadata(song("One", 0.0), tokio::time::Instant::now().into_std());
        let task = tokio::spawn(controller.run(stop_rx));

        tokio::time::sleep(Duration::from_millis(1050)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap();

        let s = sink.lock().unwrap();
        assert_eq!(s.calls.first(), Some(&SinkCall::Init));
        assert_eq!(s.calls.last(), Some(&SinkCall::Hide));
        // ten or eleven frames depending on where the stop lands
        assert!((10..=11).contains(&s.frames_shown), "frames {}", s.frames_shown);
        assert_eq!(handle.snapshot().tick_counter, s.frames_shown as u64);
    }
}
