use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "polydraw";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TOAST_DURATION_MS: u64 = 2_000;
const DEFAULT_FIT_PADDING_PX: u32 = 20;

const ENV_OVERRIDES: &[(&str, ConfigField)] = &[
    ("POLYDRAW_API_URL", ConfigField::ApiBaseUrl),
    ("POLYDRAW_BOUNDS_URL", ConfigField::BoundsUrl),
    ("POLYDRAW_TILES_URL", ConfigField::TilesUrl),
    ("POLYDRAW_BASEMAP_URL", ConfigField::BasemapUrl),
    ("POLYDRAW_COG_URL", ConfigField::CogUrl),
];

#[derive(Debug, Clone, Copy)]
enum ConfigField {
    ApiBaseUrl,
    BoundsUrl,
    TilesUrl,
    BasemapUrl,
    CogUrl,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub bounds_url: Option<String>,
    pub tiles_url: Option<String>,
    pub basemap_url: Option<String>,
    /// Cloud-optimized GeoTIFF shown as the imagery layer.
    pub cog_url: Option<String>,
    pub user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub toast_duration_ms: u64,
    pub fit_padding_px: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            bounds_url: None,
            tiles_url: None,
            basemap_url: None,
            cog_url: None,
            user_id: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
            fit_padding_px: DEFAULT_FIT_PADDING_PX,
        }
    }
}

impl AppConfig {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn apply_override(&mut self, field: ConfigField, value: String) {
        match field {
            ConfigField::ApiBaseUrl => self.api_base_url = value,
            ConfigField::BoundsUrl => self.bounds_url = Some(value),
            ConfigField::TilesUrl => self.tiles_url = Some(value),
            ConfigField::BasemapUrl => self.basemap_url = Some(value),
            ConfigField::CogUrl => self.cog_url = Some(value),
        }
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, field) in ENV_OVERRIDES {
            if let Some(value) = lookup(name).filter(|value| !value.is_empty()) {
                tracing::debug!(name, "config overridden from environment");
                self.apply_override(*field, value);
            }
        }
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    let mut config = load_app_config_with(xdg_config_home.as_deref(), home.as_deref());
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "polydraw",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/polydraw/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("polydraw", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/polydraw/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("polydraw", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn partial_config_file_keeps_defaults_for_missing_fields() {
        let root = std::env::temp_dir().join(format!("polydraw-config-{}", std::process::id()));
        let dir = root.join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(APP_CONFIG_FILE),
            r#"{"api_base_url":"http://shapes.local/api","toast_duration_ms":500}"#,
        )
        .unwrap();

        let config = load_app_config_with(Some(&root), None);
        std::fs::remove_dir_all(&root).unwrap();

        assert_eq!(config.api_base_url, "http://shapes.local/api");
        assert_eq!(config.toast_duration(), Duration::from_millis(500));
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.fit_padding_px, DEFAULT_FIT_PADDING_PX);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load_app_config_with(Some(Path::new("/nonexistent/polydraw-root")), None);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_overrides_replace_non_empty_values_only() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| match name {
            "POLYDRAW_API_URL" => Some("http://override/api".to_string()),
            "POLYDRAW_COG_URL" => Some("https://data/scene.tif".to_string()),
            "POLYDRAW_BOUNDS_URL" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.api_base_url, "http://override/api");
        assert_eq!(config.cog_url.as_deref(), Some("https://data/scene.tif"));
        assert_eq!(config.bounds_url, None);
    }
}
