use crate::error::AppError;
use crate::model::Theme;
use crate::timer::TimerDurations;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "studysync";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "STUDYSYNC_CONFIG_PATH";

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        if self.accent.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.accent, text, self.reset)
        }
    }

    pub fn mutedize(&self, text: &str) -> String {
        if self.muted.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.muted, text, self.reset)
        }
    }
}

pub fn palette_for_theme(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        Theme::Light => Palette {
            accent: "",
            muted: "",
            reset: "",
        },
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default)]
    pub focus_seconds: Option<u32>,
    #[serde(default)]
    pub short_break_seconds: Option<u32>,
    #[serde(default)]
    pub long_break_seconds: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Forces the output palette regardless of the stored theme preference.
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: Option<bool>,
}

impl Config {
    pub fn durations(&self) -> TimerDurations {
        let defaults = TimerDurations::default();
        TimerDurations {
            focus: self.timer.focus_seconds.unwrap_or(defaults.focus),
            short_break: self.timer.short_break_seconds.unwrap_or(defaults.short_break),
            long_break: self.timer.long_break_seconds.unwrap_or(defaults.long_break),
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<Theme>,
    pub timer: TimerConfig,
    pub notifications: Option<bool>,
}

/// Per-user directory holding both the config file and the store.
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate_timer(&config.timer)
        .map_err(|message| AppError::invalid_data(format!("{}: {}", path.display(), message)))?;
    Ok(config)
}

fn validate_timer(timer: &TimerConfig) -> Result<(), String> {
    let fields = [
        ("timer.focus_seconds", timer.focus_seconds),
        ("timer.short_break_seconds", timer.short_break_seconds),
        ("timer.long_break_seconds", timer.long_break_seconds),
    ];
    for (name, value) in fields {
        if value == Some(0) {
            return Err(format!("{name} must be at least 1"));
        }
    }
    Ok(())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if overrides.theme.is_some() {
        merged.theme = overrides.theme;
    }
    if overrides.timer.focus_seconds.is_some() {
        merged.timer.focus_seconds = overrides.timer.focus_seconds;
    }
    if overrides.timer.short_break_seconds.is_some() {
        merged.timer.short_break_seconds = overrides.timer.short_break_seconds;
    }
    if overrides.timer.long_break_seconds.is_some() {
        merged.timer.long_break_seconds = overrides.timer.long_break_seconds;
    }
    if overrides.notifications.is_some() {
        merged.notifications = overrides.notifications;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, TimerConfig, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides, palette_for_theme,
    };
    use crate::model::Theme;
    use crate::timer::TimerDurations;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("studysync-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "theme": "dark",
            "timer": { "focus_seconds": 50 },
            "notifications": false
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.theme, Some(Theme::Dark));
        assert_eq!(loaded.durations().focus, 50);
        assert_eq!(loaded.durations().short_break, 300);
        assert!(!loaded.notifications_enabled());
    }

    #[test]
    fn load_config_rejects_zero_duration() {
        let path = temp_path("zero-config.json");
        fs::write(&path, r#"{ "timer": { "short_break_seconds": 0 } }"#).unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
        assert!(err.message().contains("short_break_seconds"));
    }

    #[test]
    fn default_config_uses_standard_durations() {
        assert_eq!(Config::default().durations(), TimerDurations::default());
        assert!(Config::default().notifications_enabled());
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            theme: Some(Theme::Light),
            timer: TimerConfig {
                focus_seconds: Some(1200),
                short_break_seconds: Some(240),
                long_break_seconds: None,
            },
            notifications: Some(true),
        };
        let overrides = ConfigOverrides {
            theme: Some(Theme::Dark),
            timer: TimerConfig {
                focus_seconds: Some(60),
                ..TimerConfig::default()
            },
            notifications: None,
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.theme, Some(Theme::Dark));
        assert_eq!(merged.timer.focus_seconds, Some(60));
        assert_eq!(merged.timer.short_break_seconds, Some(240));
        assert_eq!(merged.notifications, Some(true));
        assert_eq!(base.timer.focus_seconds, Some(1200));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            theme: Some(Theme::Dark),
            ..Config::default()
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn palette_for_theme_returns_palette() {
        let light = palette_for_theme(Theme::Light);
        assert!(light.accent.is_empty());
        assert_eq!(light.accentize("x"), "x");

        let dark = palette_for_theme(Theme::Dark);
        assert_eq!(dark.accent, "\x1b[38;5;208m");
        assert_eq!(dark.mutedize("x"), "\x1b[38;5;250mx\x1b[0m");
    }
}
