//! [`RobotConfig`] – on-disk configuration with environment overrides.
//!
//! Read from `tactus.toml` in the working directory. A missing file means
//! defaults; a malformed file is a hard error surfaced before anything
//! starts. Environment variables override whatever the file said:
//!
//! | Key                     | Env override       | Default |
//! |-------------------------|--------------------|---------|
//! | `mode`                  | `TACTUS_MODE`      | `sim`   |
//! | `period_ms`             | `TACTUS_PERIOD_MS` | `20`    |
//! | `log_level`             | `TACTUS_LOG_LEVEL` | `info`  |
//! | `position_tolerance_m`  | –                  | `0.05`  |
//! | `heading_tolerance_rad` | –                  | `0.05`  |
//! | `settle_ms`             | –                  | `150`   |
//! | `elevator_stow_m`       | –                  | `0.05`  |
//! | `elevator_low_m`        | –                  | `0.3`   |
//! | `elevator_mid_m`        | –                  | `0.7`   |
//! | `elevator_high_m`       | –                  | `1.1`   |
//! | `elevator_tolerance_m`  | –                  | `0.02`  |
//! | `intake_collect_volts`  | –                  | `6.0`   |
//! | `intake_hold_volts`     | –                  | `1.5`   |
//! | `intake_eject_volts`    | –                  | `-8.0`  |
//! | `climber_climb_rad`     | –                  | `1.2`   |
//! | `climber_stow_rad`      | –                  | `0.0`   |

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tactus_types::{Mode, ScoreLevel, TactusError};

/// Default config file, relative to the working directory.
pub const DEFAULT_PATH: &str = "tactus.toml";

fn default_mode() -> Mode {
    Mode::Sim
}

fn default_period_ms() -> u64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_position_tolerance_m() -> f64 {
    0.05
}

fn default_heading_tolerance_rad() -> f64 {
    0.05
}

fn default_settle_ms() -> u64 {
    150
}

fn default_elevator_stow_m() -> f64 {
    0.05
}

fn default_elevator_low_m() -> f64 {
    0.3
}

fn default_elevator_mid_m() -> f64 {
    0.7
}

fn default_elevator_high_m() -> f64 {
    1.1
}

fn default_elevator_tolerance_m() -> f64 {
    0.02
}

fn default_intake_collect_volts() -> f64 {
    6.0
}

fn default_intake_hold_volts() -> f64 {
    1.5
}

fn default_intake_eject_volts() -> f64 {
    -8.0
}

fn default_climber_climb_rad() -> f64 {
    1.2
}

fn default_climber_stow_rad() -> f64 {
    0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Device backend the plant is built with.
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Control loop period in milliseconds.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Linear alignment tolerance in meters.
    #[serde(default = "default_position_tolerance_m")]
    pub position_tolerance_m: f64,
    /// Heading alignment tolerance in radians.
    #[serde(default = "default_heading_tolerance_rad")]
    pub heading_tolerance_rad: f64,
    /// How long alignment must hold before it counts, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Elevator travel height when stowed, in meters.
    #[serde(default = "default_elevator_stow_m")]
    pub elevator_stow_m: f64,
    /// Elevator height preset for the low scoring level, in meters.
    #[serde(default = "default_elevator_low_m")]
    pub elevator_low_m: f64,
    /// Elevator height preset for the mid scoring level, in meters.
    #[serde(default = "default_elevator_mid_m")]
    pub elevator_mid_m: f64,
    /// Elevator height preset for the high scoring level, in meters.
    #[serde(default = "default_elevator_high_m")]
    pub elevator_high_m: f64,
    /// How close the elevator must be to a preset to count, in meters.
    #[serde(default = "default_elevator_tolerance_m")]
    pub elevator_tolerance_m: f64,
    /// Intake voltage while collecting a game piece.
    #[serde(default = "default_intake_collect_volts")]
    pub intake_collect_volts: f64,
    /// Intake voltage while holding a game piece.
    #[serde(default = "default_intake_hold_volts")]
    pub intake_hold_volts: f64,
    /// Intake voltage while ejecting a game piece (negative runs outward).
    #[serde(default = "default_intake_eject_volts")]
    pub intake_eject_volts: f64,
    /// Climber pivot angle when deployed, in radians.
    #[serde(default = "default_climber_climb_rad")]
    pub climber_climb_rad: f64,
    /// Climber pivot angle when stowed, in radians.
    #[serde(default = "default_climber_stow_rad")]
    pub climber_stow_rad: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            mode: default_mode(),
            period_ms: default_period_ms(),
            log_level: default_log_level(),
            position_tolerance_m: default_position_tolerance_m(),
            heading_tolerance_rad: default_heading_tolerance_rad(),
            settle_ms: default_settle_ms(),
            elevator_stow_m: default_elevator_stow_m(),
            elevator_low_m: default_elevator_low_m(),
            elevator_mid_m: default_elevator_mid_m(),
            elevator_high_m: default_elevator_high_m(),
            elevator_tolerance_m: default_elevator_tolerance_m(),
            intake_collect_volts: default_intake_collect_volts(),
            intake_hold_volts: default_intake_hold_volts(),
            intake_eject_volts: default_intake_eject_volts(),
            climber_climb_rad: default_climber_climb_rad(),
            climber_stow_rad: default_climber_stow_rad(),
        }
    }
}

fn parse_mode(raw: &str) -> Option<Mode> {
    match raw.to_ascii_lowercase().as_str() {
        "sim" => Some(Mode::Sim),
        "offline" => Some(Mode::Offline),
        _ => None,
    }
}

impl RobotConfig {
    /// Load the default file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// [`TactusError::Config`] when the file exists but cannot be read or
    /// parsed. A missing file is not an error.
    pub fn load() -> Result<RobotConfig, TactusError> {
        let mut config = Self::load_from(Path::new(DEFAULT_PATH))?.unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path; `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// [`TactusError::Config`] on read or parse failure.
    pub fn load_from(path: &Path) -> Result<Option<RobotConfig>, TactusError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| TactusError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map(Some)
            .map_err(|e| TactusError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Write this config to `path` as TOML.
    ///
    /// # Errors
    ///
    /// [`TactusError::Config`] on serialization or write failure.
    pub fn save_to(&self, path: &Path) -> Result<(), TactusError> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| TactusError::Config(format!("serializing config: {e}")))?;
        fs::write(path, raw)
            .map_err(|e| TactusError::Config(format!("writing {}: {e}", path.display())))
    }

    /// Fold `TACTUS_*` environment variables over the loaded values.
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TACTUS_MODE")
            && let Some(mode) = parse_mode(&v)
        {
            self.mode = mode;
        }
        if let Ok(v) = std::env::var("TACTUS_PERIOD_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.period_ms = ms;
        }
        if let Ok(v) = std::env::var("TACTUS_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    /// Loop period as a [`Duration`].
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Alignment settle window as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Elevator height preset for `level`.
    pub fn level_height(&self, level: ScoreLevel) -> f64 {
        match level {
            ScoreLevel::Low => self.elevator_low_m,
            ScoreLevel::Mid => self.elevator_mid_m,
            ScoreLevel::High => self.elevator_high_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RobotConfig::default();
        assert_eq!(config.mode, Mode::Sim);
        assert_eq!(config.period(), Duration::from_millis(20));
        assert_eq!(config.settle(), Duration::from_millis(150));
        assert_eq!(config.log_level, "info");
        assert!(config.elevator_stow_m < config.elevator_low_m);
        assert!(config.elevator_low_m < config.elevator_mid_m);
        assert!(config.elevator_mid_m < config.elevator_high_m);
        assert_eq!(config.level_height(ScoreLevel::Mid), config.elevator_mid_m);
        assert!(config.intake_eject_volts < 0.0);
        assert!(config.climber_stow_rad < config.climber_climb_rad);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tactus.toml");
        assert_eq!(RobotConfig::load_from(&path).unwrap(), None);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tactus.toml");

        let config = RobotConfig {
            mode: Mode::Offline,
            period_ms: 10,
            log_level: "debug".to_string(),
            ..RobotConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = RobotConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tactus.toml");
        fs::write(&path, "mode = \"offline\"\n").unwrap();

        let loaded = RobotConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.mode, Mode::Offline);
        assert_eq!(loaded.period_ms, default_period_ms());
        assert_eq!(loaded.settle_ms, default_settle_ms());
        assert_eq!(loaded.intake_collect_volts, default_intake_collect_volts());
        assert_eq!(loaded.climber_climb_rad, default_climber_climb_rad());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tactus.toml");
        fs::write(&path, "period_ms = \"fast\"\n").unwrap();

        assert!(matches!(
            RobotConfig::load_from(&path),
            Err(TactusError::Config(_))
        ));
    }

    // One test owns the TACTUS_* variables so parallel tests never race on
    // process environment.
    #[test]
    fn env_overrides_beat_the_file_and_ignore_garbage() {
        let mut config = RobotConfig::default();

        // SAFETY: this is the only test in the binary touching these
        // variables; they are set and removed around the assertions.
        unsafe {
            std::env::set_var("TACTUS_MODE", "offline");
            std::env::set_var("TACTUS_PERIOD_MS", "50");
        }
        config.apply_env_overrides();
        assert_eq!(config.mode, Mode::Offline);
        assert_eq!(config.period_ms, 50);

        let mut fresh = RobotConfig::default();
        // SAFETY: same as above.
        unsafe {
            std::env::set_var("TACTUS_MODE", "replay");
            std::env::set_var("TACTUS_PERIOD_MS", "soon");
        }
        fresh.apply_env_overrides();
        assert_eq!(fresh.mode, default_mode());
        assert_eq!(fresh.period_ms, default_period_ms());

        // SAFETY: same as above.
        unsafe {
            std::env::remove_var("TACTUS_MODE");
            std::env::remove_var("TACTUS_PERIOD_MS");
        }
    }
}
