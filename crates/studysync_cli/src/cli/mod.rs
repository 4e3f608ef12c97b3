use clap::{Parser, Subcommand};
use studysync_core::config::ConfigOverrides;
use studysync_core::model::{Priority, TaskStatus, Theme};
use studysync_core::timer::TimerMode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: studysync add "Revise chapter 3" --subject Math --priority high
    Add {
        name: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        /// Calendar date, YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "pending")]
        status: TaskStatus,
    },
    /// List tasks, most recent first
    ///
    /// Example: studysync list --priority high --status pending
    List {
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Flip a task between pending and completed
    ///
    /// Example: studysync toggle 1760000000000
    Toggle {
        id: i64,
    },
    /// Delete a task
    ///
    /// Example: studysync delete 1760000000000
    Delete {
        id: i64,
    },
    /// Show totals, study hours and recent tasks
    Dashboard,
    /// Show the weekly chart, completion ratio and subject progress
    Progress,
    /// Run or inspect the pomodoro timer
    Timer {
        #[command(subcommand)]
        timer: TimerCommand,
    },
    /// Log in with an email address
    ///
    /// Example: studysync login ada@uni.edu secret
    Login {
        email: String,
        password: String,
    },
    /// Create a profile
    ///
    /// Example: studysync signup "Ada Lovelace" ada@uni.edu secret
    Signup {
        name: String,
        email: String,
        password: String,
    },
    /// Set the theme, or toggle it when no value is given
    ///
    /// Example: studysync theme dark
    Theme {
        theme: Option<Theme>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    /// Count down one interval in the foreground
    ///
    /// Example: studysync timer run --mode short
    Run {
        #[arg(long, default_value = "focus")]
        mode: TimerMode,
    },
    /// Show completed pomodoros and configured durations
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    FocusSeconds,
    ShortBreakSeconds,
    LongBreakSeconds,
    Notifications,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match (canonical_field.as_str(), remainder) {
        ("theme", None) => ConfigOverrideTarget::Theme,
        ("notifications", None) => ConfigOverrideTarget::Notifications,
        ("theme" | "notifications", Some(_)) => {
            return Err(format!("{canonical_field} override cannot have subfields"));
        }
        ("timer", Some(sub)) => match canonicalize_flag_name(sub).as_deref() {
            Some("focus" | "focus_seconds") => ConfigOverrideTarget::FocusSeconds,
            Some("short_break" | "short_break_seconds") => ConfigOverrideTarget::ShortBreakSeconds,
            Some("long_break" | "long_break_seconds") => ConfigOverrideTarget::LongBreakSeconds,
            _ => return Err(format!("unknown timer field '{sub}'")),
        },
        ("timer", None) => return Err("timer override requires a field name".to_string()),
        (other, _) => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds parsed overrides into the structure merged over the config file.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => {
                let theme = parsed
                    .value
                    .parse::<Theme>()
                    .map_err(|err| err.message().to_string())?;
                overrides.theme = Some(theme);
            }
            ConfigOverrideTarget::FocusSeconds => {
                overrides.timer.focus_seconds = Some(parse_seconds(&parsed.value)?);
            }
            ConfigOverrideTarget::ShortBreakSeconds => {
                overrides.timer.short_break_seconds = Some(parse_seconds(&parsed.value)?);
            }
            ConfigOverrideTarget::LongBreakSeconds => {
                overrides.timer.long_break_seconds = Some(parse_seconds(&parsed.value)?);
            }
            ConfigOverrideTarget::Notifications => {
                let enabled = match parsed.value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    other => return Err(format!("notifications must be on or off, got '{other}'")),
                };
                overrides.notifications = Some(enabled);
            }
        }
    }
    Ok(overrides)
}

fn parse_seconds(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(format!("duration must be a positive number of seconds, got '{value}'")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
