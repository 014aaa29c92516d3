use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use rust_embed::Embed;

#[derive(Embed, Debug)]
#[folder = ""]
#[include = "config.toml"]
pub struct Assets;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_entry_file")]
    pub default_entry_file: String,
    #[serde(default = "default_typing_silence_ms")]
    pub typing_silence_ms: u64,
    #[serde(default = "default_suggestion_debounce_ms")]
    pub suggestion_debounce_ms: u64,
    #[serde(default = "default_suggestion_min_chars")]
    pub suggestion_min_chars: usize,
    #[serde(default = "default_completion_url")]
    pub completion_url: String,
    #[serde(default = "default_file_api_url")]
    pub file_api_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_entry_file() -> String { "main.js".to_string() }
fn default_typing_silence_ms() -> u64 { 3000 }
fn default_suggestion_debounce_ms() -> u64 { 500 }
fn default_suggestion_min_chars() -> usize { 3 }
fn default_completion_url() -> String { "ws://127.0.0.1:8001/ws/ai/suggest".to_string() }
fn default_file_api_url() -> String { "http://localhost:3000".to_string() }
fn default_port() -> u16 { 3000 }

impl Default for Config {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize via defaults")
    }
}

impl Config {
    pub fn typing_silence(&self) -> Duration {
        Duration::from_millis(self.typing_silence_ms)
    }

    pub fn suggestion_debounce(&self) -> Duration {
        Duration::from_millis(self.suggestion_debounce_ms)
    }
}

/// Load the configuration, priority: $CODESHARE_HOME > ~/.codeshare > embedded.
pub fn get() -> Config {
    let toml_str = match std::env::var("CODESHARE_HOME") {
        Ok(home) => {
            let config_path = Path::new(&home).join("config.toml");
            match std::fs::read_to_string(config_path) {
                Ok(toml_str) => toml_str,
                Err(_) => read_assets_config().unwrap_or_default(),
            }
        }
        Err(_) => {
            if let Some(home) = dirs::home_dir() {
                let config_path = home.join(".codeshare").join("config.toml");
                match std::fs::read_to_string(config_path) {
                    Ok(toml_str) => toml_str,
                    Err(_) => read_assets_config().unwrap_or_default(),
                }
            } else {
                eprintln!("Couldn't find home directory");
                read_assets_config().unwrap_or_default()
            }
        }
    };

    toml::from_str(&toml_str).unwrap_or_else(|e| {
        eprintln!("Unable to parse config.toml ({}), using defaults", e);
        Config::default()
    })
}

pub fn read_assets_config() -> anyhow::Result<String> {
    let config = Assets::get("config.toml")
        .ok_or_else(|| anyhow::anyhow!("Missing embedded file: config.toml"))?;
    let config_str = std::str::from_utf8(&config.data)
        .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in config.toml: {}", e))?;
    Ok(config_str.to_string())
}
