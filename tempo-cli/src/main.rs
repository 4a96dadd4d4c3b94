use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tempo_core::time::{format_local, parse_instant};
use tempo_core::{task_hierarchy, working_minutes, working_units, Schedule, Scheduler};

mod calendar;
mod config;
mod logging;
mod state;

use crate::config::Config;
use crate::logging::LogLevel;
use crate::state::Plan;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TEMPO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "tempo", version, long_version = LONG_VERSION, about = "Turn a goal and its tasks into a dated plan")]
struct Cli {
    /// Log level (overrides TEMPO_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign due dates to every task of a plan
    Schedule {
        /// Plan file: {"goal": {...}, "tasks": [...]}
        #[arg(long)]
        plan: PathBuf,

        /// Current time (RFC 3339 or "YYYY-MM-DD HH:MM" local); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Write the scheduled plan back out as JSON
        #[arg(long)]
        out: Option<PathBuf>,

        /// Export the slots as an ICS calendar
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Print the full schedule as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Re-plan open tasks, keeping completed, cancelled and pinned ones
    Reschedule {
        #[arg(long)]
        plan: PathBuf,

        #[arg(long)]
        now: Option<String>,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Print the nested subtask tree
    Hierarchy {
        #[arg(long)]
        plan: PathBuf,
    },

    /// Count working days (and minutes) between two instants
    WorkingDays {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Manage ~/.tempo/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level)?;

    match cli.command {
        Command::Schedule {
            plan,
            now,
            out,
            ics,
            json,
        } => {
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let now = resolve_now(now.as_deref(), &cfg)?;
            let plan_data = state::read_plan(&plan)?;

            let scheduler = scheduler_from(&cfg)?;
            let schedule = scheduler
                .schedule(&plan_data.goal, &plan_data.tasks, now)
                .with_context(|| format!("scheduling {}", plan.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&schedule)?);
            } else {
                print_schedule(&schedule, tz);
            }

            if let Some(path) = ics {
                let title = if plan_data.goal.title.is_empty() {
                    String::new()
                } else {
                    format!("[{}] ", plan_data.goal.title)
                };
                let events = calendar::schedule_to_events(&schedule, &title);
                let text = calendar::events_to_ics(&events, now);
                std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
                eprintln!("Wrote {} events to {}", events.len(), path.display());
            }

            if let Some(path) = out {
                write_scheduled(&path, plan_data, schedule)?;
            }
        }

        Command::Reschedule {
            plan,
            now,
            out,
            json,
        } => {
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let now = resolve_now(now.as_deref(), &cfg)?;
            let plan_data = state::read_plan(&plan)?;

            let scheduler = scheduler_from(&cfg)?;
            let result = scheduler
                .reschedule(&plan_data.goal, &plan_data.tasks, now)
                .with_context(|| format!("rescheduling {}", plan.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if result.changes.is_empty() {
                    println!("No due dates changed.\n");
                } else {
                    println!("# Changes\n");
                    for c in &result.changes {
                        let before = c
                            .previous
                            .map(|d| format_local(d, tz))
                            .unwrap_or_else(|| "-".to_string());
                        println!("- {}: {} -> {}", c.task_id, before, format_local(c.current, tz));
                    }
                    println!();
                }
                print_schedule(&result.schedule, tz);
            }

            if let Some(path) = out {
                write_scheduled(&path, plan_data, result.schedule)?;
            }
        }

        Command::Hierarchy { plan } => {
            let cfg = config::load_config()?;
            let plan_data = state::read_plan(&plan)?;
            for e in task_hierarchy(&plan_data.tasks, cfg.engine.max_depth) {
                let label = if e.title.is_empty() { &e.task_id } else { &e.title };
                println!("{}- {} ({})", "  ".repeat(e.level), label, e.task_id);
            }
        }

        Command::WorkingDays { from, to } => {
            let cfg = config::load_config()?;
            let from = parse_instant(&from, &cfg.display.timezone)?;
            let to = parse_instant(&to, &cfg.display.timezone)?;
            let pattern = cfg.pattern()?;
            let days = working_units(from, to, &pattern, cfg.engine.boundary_policy);
            let minutes = working_minutes(from, to, &pattern);
            println!("{days} working days ({minutes} working minutes)");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}

fn resolve_now(arg: Option<&str>, cfg: &Config) -> Result<DateTime<Utc>> {
    match arg {
        Some(s) => parse_instant(s, &cfg.display.timezone).context("invalid --now"),
        None => Ok(Utc::now()),
    }
}

fn scheduler_from(cfg: &Config) -> Result<Scheduler> {
    Ok(Scheduler::new(cfg.pattern()?, cfg.engine)?)
}

fn write_scheduled(path: &Path, plan: Plan, schedule: Schedule) -> Result<()> {
    let updated = Plan {
        goal: plan.goal,
        tasks: schedule.tasks,
    };
    state::write_plan(path, &updated)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn print_schedule(schedule: &Schedule, tz: Tz) {
    println!(
        "# Schedule for {} ({} working days available)\n",
        schedule.goal_id, schedule.working_days_available
    );

    let mut rows: Vec<_> = schedule.tasks.iter().collect();
    rows.sort_by(|a, b| (a.due_date, a.scheduled_start, &a.id).cmp(&(b.due_date, b.scheduled_start, &b.id)));

    for t in rows {
        let due = t.due_date.map(|d| format_local(d, tz)).unwrap_or_else(|| "-".to_string());
        let slot = t
            .slot()
            .map(|(s, e)| format!("{} - {}", format_local(s, tz), e.with_timezone(&tz).format("%H:%M")))
            .unwrap_or_default();
        let score = t.scheduling_priority.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        let title = if t.title.is_empty() { t.id.as_str() } else { t.title.as_str() };
        println!("- [{due}] {title} | score={score} | {:?} | {slot}", t.status);
    }

    if !schedule.conflicts.is_empty() {
        println!("\n## Conflicts\n");
        for c in &schedule.conflicts {
            println!("- {:?} {}: {}", c.kind, c.task_id, c.description);
            if let Some(r) = &c.suggested_resolution {
                println!("    suggestion: {r:?}");
            }
        }
    }
}
