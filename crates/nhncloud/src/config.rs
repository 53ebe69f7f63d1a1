use anyhow::{Context as AnyhowContext, Result};
use nhncloud_core::{fsutil, paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::output::OutputFormat;

/// Named set of defaults applied to every command.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
}

impl Context {
    pub fn new(region: Option<String>, output: Option<OutputFormat>) -> Self {
        Self { region, output }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub current_context: Option<String>,
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&paths::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fsutil::write_atomic(path, content.as_bytes(), None)?;
        Ok(())
    }

    pub fn get_current_context(&self) -> Option<(&String, &Context)> {
        self.current_context
            .as_ref()
            .and_then(|name| self.contexts.get(name).map(|ctx| (name, ctx)))
    }

    /// Region from the current context, if one is set.
    pub fn region(&self) -> Option<&str> {
        self.get_current_context()
            .and_then(|(_, ctx)| ctx.region.as_deref())
    }

    pub fn output(&self) -> Option<OutputFormat> {
        self.get_current_context().and_then(|(_, ctx)| ctx.output)
    }
}
