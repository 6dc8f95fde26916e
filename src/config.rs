use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::components::identity::IdentityMode;
use crate::display::surface::{ChangePolicy, PanelKind};
use crate::textable::DEFAULT_PAUSE_TICKS;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// now playing panel
    pub track: Option<PanelConfig>,
    /// player identity panel
    pub identity: Option<PanelConfig>,
    /// where metadata updates come from
    pub source: Option<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    pub enabled: Option<bool>,
    pub display: Option<DisplayConfig>,
    pub idle_timeout_secs: Option<u64>,
    pub active_interval_ms: Option<u64>,
    pub idle_interval_ms: Option<u64>,
    pub pause_ticks: Option<u64>,
    pub change_policy: Option<ChangePolicy>,
    pub identity_mode: Option<IdentityMode>,
    pub icons_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub brightness: Option<u8>,     // 0-255
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// "-" for stdin, otherwise a file or FIFO path
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // e.g. 0x3C (I2C addresses are 7-bit, stored in u8)
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    Ssd1309,
    /// headless, frames stay in memory
    Memory,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "hifioled", version, about = "Now playing and player identity on OLED panels")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Metadata input, "-" for stdin or a file/FIFO path
    #[arg(short = 'i', long)]
    pub input: Option<String>,
    /// Render into memory instead of opening the I2C bus
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// Identity panel rendering, icon or text
    #[arg(long, value_parser = ["icon", "text"])]
    pub identity_mode: Option<String>,
    /// Directory holding the player icons
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub icons_dir: Option<PathBuf>,
    /// Render the demo track to an animated GIF at FILE and exit
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub demo: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Where packaged player icons are installed
pub const DEFAULT_ICONS_DIR: &str = "/usr/share/hifioled/icons";

/// Effective per-panel settings after defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSettings {
    pub kind: PanelKind,
    pub enabled: bool,
    pub display: DisplayConfig,
    pub idle_timeout: Duration,
    pub active_interval: Duration,
    pub idle_interval: Duration,
    pub pause_ticks: u64,
    pub change_policy: ChangePolicy,
    pub identity_mode: IdentityMode,
    pub icons_dir: Option<PathBuf>,
}

fn default_display(kind: PanelKind) -> DisplayConfig {
    match kind {
        PanelKind::Track => DisplayConfig {
            driver: Some(DriverKind::Ssd1309),
            width: Some(128),
            height: Some(64),
            rotate_deg: None,
            brightness: None,
            bus: Some(BusConfig::I2c { bus: "/dev/i2c-1".to_string(), address: 0x3D }),
        },
        PanelKind::Identity => DisplayConfig {
            driver: Some(DriverKind::Ssd1306),
            width: Some(128),
            height: Some(32),
            rotate_deg: None,
            brightness: None,
            bus: Some(BusConfig::I2c { bus: "/dev/i2c-1".to_string(), address: 0x3C }),
        },
    }
}

impl Config {
    /// Panel settings with every gap filled from the reference device
    pub fn panel(&self, kind: PanelKind) -> PanelSettings {
        let src = match kind {
            PanelKind::Track => self.track.clone(),
            PanelKind::Identity => self.identity.clone(),
        }
        .unwrap_or_default();

        let mut display = default_display(kind);
        if let Some(d) = src.display {
            merge_display(&mut display, d);
        }

        let (active_ms, policy) = match kind {
            PanelKind::Track => (100, ChangePolicy::Content),
            PanelKind::Identity => (1000, ChangePolicy::EveryUpdate),
        };

        PanelSettings {
            kind,
            enabled: src.enabled.unwrap_or(true),
            display,
            idle_timeout: Duration::from_secs(src.idle_timeout_secs.unwrap_or(60 * 60)),
            active_interval: Duration::from_millis(src.active_interval_ms.unwrap_or(active_ms)),
            idle_interval: Duration::from_millis(src.idle_interval_ms.unwrap_or(5000)),
            pause_ticks: src.pause_ticks.unwrap_or(DEFAULT_PAUSE_TICKS),
            change_policy: src.change_policy.unwrap_or(policy),
            identity_mode: src.identity_mode.unwrap_or(IdentityMode::Icon),
            icons_dir: src.icons_dir.or_else(|| match kind {
                PanelKind::Identity => Some(PathBuf::from(DEFAULT_ICONS_DIR)),
                PanelKind::Track => None,
            }),
        }
    }

    pub fn input(&self) -> String {
        self.source
            .as_ref()
            .and_then(|s| s.input.clone())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Read YAML, layer CLI overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli)?;

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/hifioled/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/hifioled/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/hifioled.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["hifioled.yaml", "config.yaml", "config/hifioled.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.track, src.track) {
        (None, Some(p)) => dst.track = Some(p),
        (Some(d), Some(s)) => merge_panel(d, s),
        _ => {}
    }
    match (&mut dst.identity, src.identity) {
        (None, Some(p)) => dst.identity = Some(p),
        (Some(d), Some(s)) => merge_panel(d, s),
        _ => {}
    }
    if let Some(source) = src.source {
        if source.input.is_some() { dst.source = Some(source); }
    }
}

fn merge_panel(dst: &mut PanelConfig, src: PanelConfig) {
    if src.enabled.is_some()            { dst.enabled = src.enabled; }
    if src.idle_timeout_secs.is_some()  { dst.idle_timeout_secs = src.idle_timeout_secs; }
    if src.active_interval_ms.is_some() { dst.active_interval_ms = src.active_interval_ms; }
    if src.idle_interval_ms.is_some()   { dst.idle_interval_ms = src.idle_interval_ms; }
    if src.pause_ticks.is_some()        { dst.pause_ticks = src.pause_ticks; }
    if src.change_policy.is_some()      { dst.change_policy = src.change_policy; }
    if src.identity_mode.is_some()      { dst.identity_mode = src.identity_mode; }
    if src.icons_dir.is_some()          { dst.icons_dir = src.icons_dir; }
    match (&mut dst.display, src.display) {
        (None, Some(d)) => dst.display = Some(d),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()      { dst.driver = src.driver; }
    if src.width.is_some()       { dst.width = src.width; }
    if src.height.is_some()      { dst.height = src.height; }
    if src.rotate_deg.is_some()  { dst.rotate_deg = src.rotate_deg; }
    if src.brightness.is_some()  { dst.brightness = src.brightness; }
    if src.bus.is_some()         { dst.bus = src.bus; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) -> Result<(), ConfigError> {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if let Some(input) = cli.input.as_ref() {
        cfg.source = Some(SourceConfig { input: Some(input.clone()) });
    }

    let touches_identity = cli.identity_mode.is_some() || cli.icons_dir.is_some();
    if touches_identity && cfg.identity.is_none() {
        cfg.identity = Some(PanelConfig::default());
    }
    if let Some(identity) = cfg.identity.as_mut() {
        if let Some(mode) = cli.identity_mode.as_deref() {
            identity.identity_mode = Some(match mode {
                "text" => IdentityMode::Text,
                "icon" => IdentityMode::Icon,
                other => return Err(ConfigError::Validation(format!("unknown identity mode {}", other))),
            });
        }
        if cli.icons_dir.is_some() { identity.icons_dir = cli.icons_dir.clone(); }
    }

    if cli.headless {
        for panel in [&mut cfg.track, &mut cfg.identity] {
            let p = panel.get_or_insert_with(PanelConfig::default);
            p.display
                .get_or_insert_with(DisplayConfig::default)
                .driver = Some(DriverKind::Memory);
        }
    }
    Ok(())
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    for kind in [PanelKind::Track, PanelKind::Identity] {
        let panel = cfg.panel(kind);
        if !panel.enabled {
            continue;
        }
        let display = &panel.display;
        if let (Some(w), Some(h)) = (display.width, display.height) {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(format!("{} display width/height must be > 0", kind)));
            }
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation(format!("{} display rotate_deg must be 0|90|180|270", kind))),
            }
        }
        if panel.active_interval.is_zero() || panel.idle_interval.is_zero() {
            return Err(ConfigError::Validation(format!("{} intervals must be > 0", kind)));
        }
        let no_icons = panel.icons_dir.as_ref().is_none_or(|d| d.as_os_str().is_empty());
        if kind == PanelKind::Identity && panel.identity_mode == IdentityMode::Icon && no_icons {
            return Err(ConfigError::Validation(
                "identity panel in icon mode needs icons_dir (or use identity_mode: text)".into(),
            ));
        }
    }
    Ok(())
}
