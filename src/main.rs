/*
 *  main.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
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

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use hifioled::assets::{AssetLoader, FileAssetLoader};
use hifioled::config::{self, Cli, Config, PanelSettings};
use hifioled::demo::write_demo;
use hifioled::display::components::{IdentityComposer, TrackComposer};
use hifioled::display::{DisplaySinkFactory, Panel, PanelKind, SurfaceController, Timing};
use hifioled::gateway::{open_source, run_source, UpdateGateway};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Sink plus composer for one panel, `None` when disabled or unusable
fn build_surface(settings: &PanelSettings) -> Option<SurfaceController> {
    if !settings.enabled {
        info!("{} panel disabled", settings.kind);
        return None;
    }

    let sink = match DisplaySinkFactory::create_from_config(&settings.display) {
        Ok(sink) => sink,
        Err(e) => {
            error!("{} panel unavailable: {}", settings.kind, e);
            return None;
        }
    };
    let size = sink.capabilities().size();

    let panel = match settings.kind {
        PanelKind::Track => Panel::Track(TrackComposer::new(size, settings.pause_ticks)),
        PanelKind::Identity => {
            let loader = settings
                .icons_dir
                .as_ref()
                .map(|dir| Arc::new(FileAssetLoader::new(dir)) as Arc<dyn AssetLoader>);
            Panel::Identity(IdentityComposer::new(size, settings.identity_mode, loader))
        }
    };

    let timing = Timing {
        idle_timeout: settings.idle_timeout,
        active_interval: settings.active_interval,
        idle_interval: settings.idle_interval,
    };
    Some(SurfaceController::new(sink, panel, settings.change_policy, timing))
}

async fn run(cfg: Config) -> Result<()> {
    let controllers: Vec<SurfaceController> = [PanelKind::Track, PanelKind::Identity]
        .into_iter()
        .filter_map(|kind| build_surface(&cfg.panel(kind)))
        .collect();
    if controllers.is_empty() {
        bail!("no usable display, nothing to do");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut gateway = UpdateGateway::default();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    for controller in controllers {
        gateway.add_surface(controller.handle());
        tasks.push(tokio::spawn(controller.run(stop_rx.clone())));
    }

    let input = cfg.input();
    let source_stop = stop_rx.clone();
    let source = tokio::spawn(async move {
        let reader = match open_source(&input).await {
            Ok(reader) => reader,
            Err(e) => {
                error!("Cannot open metadata source {}: {}", input, e);
                return;
            }
        };
        match run_source(reader, &gateway, source_stop).await {
            Ok(n) => info!("Metadata source finished after {} messages", n),
            Err(e) => error!("Metadata source failed: {}", e),
        }
    });

    signal_handler().await?;

    let _ = stop_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Panel task ended abnormally: {}", e);
        }
    }
    source.abort();
    info!("Shutdown complete");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli)?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let level = if cli.debug {
        "debug".to_string()
    } else {
        cfg.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("This is {}, now playing twice over", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if let Some(path) = cli.demo.as_ref() {
        let settings = cfg.panel(PanelKind::Track);
        let size = embedded_graphics::geometry::Size::new(
            settings.display.width.unwrap_or(128),
            settings.display.height.unwrap_or(64),
        );
        write_demo(path, &TrackComposer::new(size, settings.pause_ticks))
            .with_context(|| format!("writing demo to {}", path.display()))?;
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(cfg));
    // stdin reads sit on a blocking thread that never returns on its own
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}
