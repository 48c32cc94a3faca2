use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: i32,
    #[serde(default = "default_cols")]
    pub cols: i32,
}

#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: i32,
    #[serde(default = "default_window_height")]
    pub height: i32,
    #[serde(default = "default_window_title")]
    pub title: String,
    #[serde(default = "default_bg_r")]
    pub background_r: u8,
    #[serde(default = "default_bg_g")]
    pub background_g: u8,
    #[serde(default = "default_bg_b")]
    pub background_b: u8,
}

#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Chebyshev sensing radius of the roaming agent.
    #[serde(default = "default_sense_radius")]
    pub sense_radius: i32,
    /// Pause between roaming iterations, purely for watchability.
    #[serde(default = "default_step_delay_secs")]
    pub step_delay_secs: f32,
    #[serde(default)]
    pub capture_frames: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_gif_path")]
    pub gif_path: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_end_hold_secs")]
    pub end_hold_secs: f32,
    /// Capture stops past this many frames; 0 means unbounded.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_enable_session_log")]
    pub enable_session_log: bool,
    #[serde(default = "default_session_log_path")]
    pub session_log_path: String,
}

// Default values
fn default_rows() -> i32 { 20 }
fn default_cols() -> i32 { 20 }
fn default_window_width() -> i32 { 800 }
fn default_window_height() -> i32 { 800 }
fn default_window_title() -> String { "Pathlab - Grid Pathfinding Sandbox".to_string() }
fn default_bg_r() -> u8 { 255 }
fn default_bg_g() -> u8 { 255 }
fn default_bg_b() -> u8 { 255 }
fn default_sense_radius() -> i32 { 3 }
fn default_step_delay_secs() -> f32 { 0.1 }
fn default_gif_path() -> String { "output.gif".to_string() }
fn default_fps() -> u32 { 30 }
fn default_end_hold_secs() -> f32 { 1.5 }
fn default_max_frames() -> usize { 2000 }
fn default_enable_session_log() -> bool { true }
fn default_session_log_path() -> String { "session_log.json".to_string() }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
            title: default_window_title(),
            background_r: default_bg_r(),
            background_g: default_bg_g(),
            background_b: default_bg_b(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sense_radius: default_sense_radius(),
            step_delay_secs: default_step_delay_secs(),
            capture_frames: false,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            gif_path: default_gif_path(),
            fps: default_fps(),
            end_hold_secs: default_end_hold_secs(),
            max_frames: default_max_frames(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_session_log: default_enable_session_log(),
            session_log_path: default_session_log_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            window: WindowConfig::default(),
            simulation: SimulationConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Self {
        match fs::read_to_string("config.toml") {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    println!("Loaded configuration from config.toml");
                    config
                }
                Err(e) => {
                    eprintln!("Warning: Failed to parse config.toml: {}", e);
                    eprintln!("Using default configuration");
                    Config::default()
                }
            },
            Err(_) => {
                println!("No config.toml found, using default configuration");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.grid.rows, 20);
        assert_eq!(config.grid.cols, 20);
        assert_eq!(config.simulation.sense_radius, 3);
        assert!(!config.simulation.capture_frames);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.export.max_frames, 2000);
        assert!(config.logging.enable_session_log);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [grid]
            rows = 12

            [simulation]
            sense_radius = 1
            capture_frames = true
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.rows, 12);
        assert_eq!(config.grid.cols, 20);
        assert_eq!(config.simulation.sense_radius, 1);
        assert!(config.simulation.capture_frames);
        assert_eq!(config.window.width, 800);
    }
}
