// FILE: src/cli/config.rs

use crate::backends::Provider;
use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub output_directory: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub provider_priority: Option<Vec<String>>,
    pub hosted_endpoint: Option<String>,
    pub file_extension: Option<String>,
}

impl ConfigFile {
    pub fn providers(&self) -> Result<Vec<Provider>> {
        parse_providers(self.provider_priority.iter().flatten().map(String::as_str))
    }
}

pub fn parse_providers<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<Provider>> {
    names
        .map(|name| {
            Provider::from_name(name).ok_or_else(|| GeneratorError::InvalidFormat {
                message: format!("Unknown provider '{}'. Use anthropic, openai or gemini.", name),
            })
        })
        .collect()
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    log::info!("Loaded configuration from {}", config_path);
    let config_content = fs::read_to_string(config_path).map_err(|e| {
        GeneratorError::FileNotFound {
            path: format!("Config file {}: {}", config_path, e),
        }
    })?;
    parse(config_path, &config_content)
}

fn parse(config_path: &str, config_content: &str) -> Result<ConfigFile> {
    if config_path.ends_with(".json") {
        serde_json::from_str(config_content).map_err(|e| GeneratorError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })
    } else if config_path.ends_with(".toml") {
        toml::from_str(config_content).map_err(|e| GeneratorError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })
    } else {
        Err(GeneratorError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        })
    }
}
