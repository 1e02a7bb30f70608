use crate::error::AppError;
use crate::model::WorkingDays;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "FLOW_CONFIG_PATH";

/// ANSI escapes used to highlight today and dim days without work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
}

const RESET: &str = "\x1b[0m";

/// Name, accent, muted. The first entry is the fallback.
static THEMES: [(&str, &str, &str); 3] = [
    ("plain", "", ""),
    ("ocean", "\x1b[36m", "\x1b[2m"),
    ("ember", "\x1b[33m", "\x1b[2m"),
];

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        paint(self.accent, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        paint(self.muted, text)
    }
}

fn paint(escape: &str, text: &str) -> String {
    if escape.is_empty() {
        text.to_string()
    } else {
        format!("{escape}{text}{RESET}")
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    let &(_, accent, muted) = theme
        .and_then(|name| THEMES.iter().find(|(known, ..)| *known == name))
        .unwrap_or(&THEMES[0]);
    Palette { accent, muted }
}

/// Lower-cased known theme name, or `None` for anything else.
pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_ascii_lowercase();
    THEMES
        .iter()
        .find(|(known, ..)| *known == name)
        .map(|(known, ..)| known.to_string())
}

/// Defaults applied when a new plan is created without explicit pace flags.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub working_days: Option<WorkingDays>,
    #[serde(default)]
    pub tasks_per_day: Option<u32>,
}

impl Config {
    pub fn working_days(&self) -> WorkingDays {
        self.working_days.unwrap_or_default()
    }

    pub fn tasks_per_day(&self) -> u32 {
        self.tasks_per_day.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub working_days: Option<WorkingDays>,
    pub tasks_per_day: Option<u32>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("focusflow")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("focusflow")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => {
            warn!(error = %err, "no config location, using defaults");
            ConfigLoad {
                config: Config::default(),
                error: Some(err),
            }
        }
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
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable config");
            ConfigLoad {
                config: Config::default(),
                error: Some(err),
            }
        }
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if let Some(name) = config.theme.take() {
        config.theme = canonical_theme_name(&name);
        if config.theme.is_none() {
            warn!(theme = %name, "unknown theme, using plain output");
        }
    }
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_ref()
        && let Some(normalized) = canonical_theme_name(theme)
    {
        merged.theme = Some(normalized);
    }
    if let Some(working_days) = overrides.working_days {
        merged.working_days = Some(working_days);
    }
    if let Some(tasks_per_day) = overrides.tasks_per_day {
        merged.tasks_per_day = Some(tasks_per_day);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, canonical_theme_name, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides, palette_for_theme,
    };
    use crate::model::WorkingDays;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("focusflow-{nanos}-{file_name}"))
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
        assert_eq!(result.error.unwrap().code(), "invalid_data");
    }

    #[test]
    fn load_config_rejects_empty_working_days() {
        let path = temp_path("empty-days.json");
        fs::write(&path, r#"{ "workingDays": [] }"#).unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert!(result.error.is_some());
        assert_eq!(result.config.working_days(), WorkingDays::default());
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "theme": " Ocean ",
            "workingDays": [0, 6],
            "tasksPerDay": 4
        });
        fs::write(&path, content.to_string()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.theme.as_deref(), Some("ocean"));
        assert_eq!(loaded.working_days().days(), vec![0, 6]);
        assert_eq!(loaded.tasks_per_day(), 4);
    }

    #[test]
    fn defaults_are_weekdays_and_one_task() {
        let config = Config::default();
        assert_eq!(config.working_days(), WorkingDays::default());
        assert_eq!(config.tasks_per_day(), 1);

        let zero = Config {
            tasks_per_day: Some(0),
            ..Config::default()
        };
        assert_eq!(zero.tasks_per_day(), 1);
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            theme: Some("plain".into()),
            working_days: None,
            tasks_per_day: Some(2),
        };
        let overrides = ConfigOverrides {
            theme: Some("Ember".into()),
            working_days: Some(WorkingDays::new([1, 3]).unwrap()),
            tasks_per_day: None,
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(base.theme.as_deref(), Some("plain"));
        assert_eq!(merged.theme.as_deref(), Some("ember"));
        assert_eq!(merged.working_days().days(), vec![1, 3]);
        assert_eq!(merged.tasks_per_day(), 2);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            theme: Some("ocean".into()),
            working_days: Some(WorkingDays::default()),
            tasks_per_day: Some(3),
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn canonical_theme_name_accepts_only_known_themes() {
        assert_eq!(canonical_theme_name(" OCEAN "), Some("ocean".into()));
        assert_eq!(canonical_theme_name("ember"), Some("ember".into()));
        assert_eq!(canonical_theme_name("dark"), None);
        assert_eq!(canonical_theme_name("  "), None);
    }

    #[test]
    fn load_config_drops_unknown_theme() {
        let path = temp_path("unknown-theme.json");
        fs::write(&path, r#"{ "theme": "solarized", "tasksPerDay": 2 }"#).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.theme, None);
        assert_eq!(loaded.tasks_per_day(), 2);
    }

    #[test]
    fn palette_for_theme_returns_palette() {
        assert!(palette_for_theme(Some("plain")).accent.is_empty());
        assert!(palette_for_theme(None).accent.is_empty());
        assert!(palette_for_theme(Some("unknown")).muted.is_empty());

        let ocean = palette_for_theme(Some("ocean"));
        assert_eq!(ocean.accentize("x"), "\x1b[36mx\x1b[0m");
        assert_eq!(ocean.mutedize("x"), "\x1b[2mx\x1b[0m");
        assert_eq!(palette_for_theme(Some("plain")).accentize("x"), "x");
    }
}
