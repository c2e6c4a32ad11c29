use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::drawing::session::DrawTool;

pub const DEFAULT_PERSISTENCE_KEY: &str = "aoi-features";

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted features.
    pub data_dir: PathBuf,
    pub persistence_key: String,
    pub draw_tools: Vec<DrawTool>,
    pub visible_by_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.push("aoi");
        Self {
            data_dir,
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
            draw_tools: DrawTool::all(),
            visible_by_default: true,
        }
    }
}

impl Config {
    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        if config.persistence_key.trim().is_empty() {
            return Err(anyhow!("persistence_key must not be empty"));
        }
        Ok(config)
    }

    /// Read the config file, or fall back to defaults when no path is given.
    pub fn load(filepath: Option<&Path>) -> anyhow::Result<Self> {
        let filepath = match filepath {
            Some(filepath) => filepath,
            None => return Ok(Self::default()),
        };
        if !filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", filepath));
        }
        let contents = read_to_string(filepath)?;
        Self::from_yaml(&contents).with_context(|| format!("Parsing config file {:?}", filepath))
    }
}
