/*
 *  tests/surface_integration.rs
 *
 *  Integration tests for the render loop, gateway and panels
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 */

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use tokio::sync::watch;

use hifioled::assets::{asset_for, AssetKey};
use hifioled::config::parse_yaml;
use hifioled::display::components::identity::{compose_label, IdentityComposer, IdentityMode};
use hifioled::display::components::track::{TrackComposer, ARTIST_Y, TITLE_Y};
use hifioled::display::drivers::memory::{MemorySink, MemorySinkState, SinkCall};
use hifioled::display::{ChangePolicy, Frame, Panel, PanelKind, SurfaceController, SurfaceState, Timing, VarFrameBuf};
use hifioled::gateway::{run_source, UpdateGateway};
use hifioled::metadata::TrackMetadata;
use hifioled::textable::{marquee_offset, text_width, ARTIST_FONT, TITLE_FONT};

const TITLE: &str = "Could You Be Loved";
const ARTIST: &str = "Bob Marley & The Wailers";

fn track_surface() -> (SurfaceController, Arc<Mutex<MemorySinkState>>) {
    let sink = MemorySink::new(128, 64);
    let state = sink.state();
    let panel = Panel::Track(TrackComposer::new(Size::new(128, 64), 50));
    let controller = SurfaceController::new(
        Box::new(sink),
        panel,
        ChangePolicy::Content,
        Timing::for_panel(PanelKind::Track),
    );
    (controller, state)
}

/// One text line drawn on its own at the scroller's offset
fn expected_strip(text: &str, font: &MonoFont<'_>, tick: u64) -> VarFrameBuf<BinaryColor> {
    let height = font.character_size.height;
    let mut fb = VarFrameBuf::new(128, height, BinaryColor::Off);
    let x = -(marquee_offset(text_width(text, font), 128, tick, 50) as i32);
    Text::with_baseline(text, Point::new(x, 0), MonoTextStyle::new(font, BinaryColor::On), Baseline::Top)
        .draw(&mut fb)
        .unwrap();
    fb
}

fn assert_strip(frame: &Frame, strip: &VarFrameBuf<BinaryColor>, top: i32, tick: u64) {
    for y in 0..strip.height() as u32 {
        for x in 0..128u32 {
            assert_eq!(
                frame.mono_pixel(x, y + top as u32),
                strip.get(x, y),
                "tick {} pixel ({}, {})",
                tick,
                x,
                y + top as u32
            );
        }
    }
}

#[test]
fn test_reference_track_scrolls_per_formula() {
    let (mut controller, sink) = track_surface();
    let gateway = UpdateGateway::new(vec![controller.handle()]);
    let t0 = Instant::now();

    let mut meta = TrackMetadata::new("spotify", TITLE, ARTIST, 0.0, 42.0);
    meta.observed_at = Some(chrono::Utc::now());
    gateway.on_metadata_at(meta, t0);

    let title_width = text_width(TITLE, TITLE_FONT);
    let artist_width = text_width(ARTIST, ARTIST_FONT);
    let mut title_offsets = Vec::new();
    let mut artist_offsets = Vec::new();

    for i in 0..420u64 {
        let now = t0 + Duration::from_millis(100 * i);
        assert_eq!(controller.step(now), Duration::from_millis(100));

        // the controller hands the composer the already incremented tick
        let tick = i + 1;
        let frame = sink.lock().unwrap().last_frame.clone().unwrap();
        assert_strip(&frame, &expected_strip(TITLE, TITLE_FONT, tick), TITLE_Y, tick);
        assert_strip(&frame, &expected_strip(ARTIST, ARTIST_FONT, tick), ARTIST_Y, tick);

        title_offsets.push(marquee_offset(title_width, 128, tick, 50));
        artist_offsets.push(marquee_offset(artist_width, 128, tick, 50));
    }

    assert_eq!(controller.state(), Some(SurfaceState::Active));
    assert_eq!(sink.lock().unwrap().frames_shown, 420);
    // the title is 126px in the bold 7x13 font so it never scrolls here,
    // the artist overflows by 40px and carries the marquee checks
    // through several full cycles
    assert!(title_offsets.iter().all(|&o| o == 0));
    assert_eq!(artist_offsets.iter().copied().max(), Some(40));
    assert_eq!(artist_offsets[179], 0);
    assert_eq!(artist_offsets[180 + 59], 10);
}

#[test]
fn test_idle_after_an_hour_without_change() {
    let (mut controller, sink) = track_surface();
    let t0 = Instant::now();
    controller.handle().on_metadata(TrackMetadata::new("raat", "Song", "Band", 0.0, 300.0), t0);

    controller.step(t0 + Duration::from_secs(3599));
    assert_eq!(controller.state(), Some(SurfaceState::Active));
    {
        let s = sink.lock().unwrap();
        assert_eq!(s.calls, vec![SinkCall::Show, SinkCall::Display]);
    }

    assert_eq!(controller.step(t0 + Duration::from_secs(3601)), Duration::from_secs(5));
    assert_eq!(controller.state(), Some(SurfaceState::Idle));
    assert_eq!(sink.lock().unwrap().calls.last(), Some(&SinkCall::Hide));

    // a new song wakes it again
    let t1 = t0 + Duration::from_secs(3602);
    controller.handle().on_metadata(TrackMetadata::new("raat", "Next", "Band", 0.0, 300.0), t1);
    controller.step(t1);
    assert_eq!(controller.state(), Some(SurfaceState::Active));
}

#[test]
fn test_identity_lookups_end_to_end() {
    let cases = [
        ("mpd", Some("http://radio.example/stream"), AssetKey::Radio),
        ("mpd", Some(""), AssetKey::Music),
        ("spotify", None, AssetKey::Spotify),
        ("unknown-xyz", None, AssetKey::HiFiBerry),
    ];

    for (player, url, key) in cases {
        assert_eq!(asset_for(player, url), key);

        let sink = MemorySink::new(128, 32);
        let state = sink.state();
        // no icon directory, so icon mode shows the label
        let panel = Panel::Identity(IdentityComposer::new(Size::new(128, 32), IdentityMode::Icon, None));
        let mut controller = SurfaceController::new(
            Box::new(sink),
            panel,
            ChangePolicy::EveryUpdate,
            Timing::for_panel(PanelKind::Identity),
        );
        let meta = TrackMetadata {
            player_name: player.to_string(),
            stream_url: url.filter(|u| !u.is_empty()).map(str::to_string),
            ..Default::default()
        };
        let t0 = Instant::now();
        controller.handle().on_metadata(meta, t0);
        controller.step(t0);

        let label = if key == AssetKey::HiFiBerry { player } else { key.name() };
        let expected = compose_label(Size::new(128, 32), label).unwrap();
        assert_eq!(state.lock().unwrap().last_frame.as_ref(), Some(&expected), "{}", player);
    }
}

#[test]
fn test_panels_keep_separate_idle_clocks() {
    let (mut track, track_sink) = track_surface();
    let sink = MemorySink::new(128, 32);
    let identity_sink = sink.state();
    let mut identity = SurfaceController::new(
        Box::new(sink),
        Panel::Identity(IdentityComposer::new(Size::new(128, 32), IdentityMode::Text, None)),
        ChangePolicy::EveryUpdate,
        Timing::for_panel(PanelKind::Identity),
    );
    let gateway = UpdateGateway::new(vec![track.handle(), identity.handle()]);

    let t0 = Instant::now();
    let song = |pos: f64| TrackMetadata::new("spotify", "Same", "Song", pos, 7200.0);
    gateway.on_metadata_at(song(0.0), t0);
    // position only ticks, for two hours
    gateway.on_metadata_at(song(3000.0), t0 + Duration::from_secs(3000));
    gateway.on_metadata_at(song(6000.0), t0 + Duration::from_secs(6000));

    let now = t0 + Duration::from_secs(6001);
    track.step(now);
    identity.step(now);

    assert_eq!(track.state(), Some(SurfaceState::Idle));
    assert_eq!(identity.state(), Some(SurfaceState::Active));
    assert!(!track_sink.lock().unwrap().visible);
    assert!(identity_sink.lock().unwrap().visible);
}

#[tokio::test(start_paused = true)]
async fn test_headless_pipeline_from_json_lines() {
    let cfg = parse_yaml("track:\n  pause_ticks: 10\n").unwrap();
    let settings = cfg.panel(PanelKind::Track);
    assert_eq!(settings.pause_ticks, 10);

    let sink = MemorySink::new(128, 64);
    let state = sink.state();
    let controller = SurfaceController::new(
        Box::new(sink),
        Panel::Track(TrackComposer::new(Size::new(128, 64), settings.pause_ticks)),
        settings.change_policy,
        Timing::for_panel(PanelKind::Track),
    );
    let gateway = UpdateGateway::new(vec![controller.handle()]);
    let (stop_tx, stop_rx) = watch::channel(false);

    let input = "{\"type\":\"metadata\",\"player_name\":\"spotify\",\"title\":\"One\",\"artist\":\"Band\",\"duration_seconds\":100}\n\
                 {\"type\":\"volume\",\"percent\":20}\n";
    let dispatched = run_source(tokio::io::BufReader::new(input.as_bytes()), &gateway, stop_rx.clone())
        .await
        .unwrap();
    assert_eq!(dispatched, 2);

    let surface = tokio::spawn(controller.run(stop_rx));
    tokio::time::sleep(Duration::from_millis(450)).await;
    stop_tx.send(true).unwrap();
    surface.await.unwrap();

    let s = state.lock().unwrap();
    // frames at 0, 100, 200, 300 and 400ms
    assert_eq!(s.frames_shown, 5);
    assert_eq!(s.calls.first(), Some(&SinkCall::Init));
    assert_eq!(s.calls.last(), Some(&SinkCall::Hide));
    assert!(!s.visible);
}
