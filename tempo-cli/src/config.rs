use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tempo_core::{AvailabilityPattern, DateException, EngineConfig};

use crate::state::ensure_tempo_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub availability: AvailabilitySection,
    pub engine: EngineConfig,
    pub display: DisplaySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilitySection {
    /// Weekly windows, e.g. "mon-fri 09:00-17:00" or "sat 10:00-14:00".
    pub rules: Vec<String>,
    pub exceptions: Vec<DateException>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// IANA zone used to read `--now`-style inputs and print times.
    pub timezone: String,
}

impl Default for AvailabilitySection {
    fn default() -> Self {
        Self {
            rules: vec!["mon-fri 09:00-17:00".to_string()],
            exceptions: Vec::new(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
        }
    }
}

impl Config {
    pub fn pattern(&self) -> Result<AvailabilityPattern> {
        let mut pattern = AvailabilityPattern::from_rules(&self.availability.rules)
            .context("invalid [availability] rules")?;
        pattern.exceptions.extend(self.availability.exceptions.iter().copied());
        pattern.validate().context("invalid [availability] exceptions")?;
        Ok(pattern)
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        tempo_core::time::parse_tz(&self.display.timezone).context("invalid [display] timezone")
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tempo_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}
