//! Application configuration.
//!
//! Loads settings from config.json next to the executable at startup.
//! Provides the OCR command, data paths, and matching thresholds.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tesseract executable to invoke for text recognition.
    #[serde(default = "default_ocr_command")]
    pub ocr_command: String,
    /// Optional tessdata directory passed to the OCR command.
    #[serde(default)]
    pub tessdata_dir: Option<String>,
    /// Location corpus (zones, roads, and their static connections).
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
    /// File backing the discovered-link store.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Minimum fuzzy-match score for accepting a location name (0.0 to 1.0).
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_corpus_path() -> String {
    "corpus.json".to_string()
}

fn default_store_path() -> String {
    "links.json".to_string()
}

fn default_match_threshold() -> f64 {
    0.35
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr_command: default_ocr_command(),
            tessdata_dir: None,
            corpus_path: default_corpus_path(),
            store_path: default_store_path(),
            match_threshold: default_match_threshold(),
        }
    }
}

/// Loads configuration from config.json or returns defaults.
/// Looks for config.json in the same directory as the executable.
fn load_config() -> AppConfig {
    let config_path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("config.json")))
        .unwrap_or_else(|| Path::new("config.json").to_path_buf());

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config.json: {}. Using defaults.", e);
                }
            },
            Err(e) => {
                log::warn!("Failed to read config.json: {}. Using defaults.", e);
            }
        }
    } else {
        log::info!("config.json not found. Using default config.");
    }

    AppConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
