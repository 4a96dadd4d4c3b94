use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempo_core::{Goal, Task};
use tracing::debug;

/// `$TEMPO_HOME`, or `~/.tempo`.
pub fn tempo_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TEMPO_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tempo"))
}

pub fn ensure_tempo_home() -> Result<PathBuf> {
    let dir = tempo_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// A goal and its task list, as exchanged with whatever generated the tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub goal: Goal,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

pub fn read_plan(path: &Path) -> Result<Plan> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let plan: Plan = serde_json::from_str(&s).with_context(|| format!("parse plan {}", path.display()))?;
    debug!(path = %path.display(), goal = %plan.goal.id, tasks = plan.tasks.len(), "plan loaded");
    Ok(plan)
}

pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
