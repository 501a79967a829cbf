use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tauri::{AppHandle, Manager};

use crate::theme::ThemeId;
use crate::{webview, DiscordRpcHandle};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub maximized: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            x: None,
            y: None,
            maximized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub window: WindowConfig,
    pub zoom_level: f64,
    pub notifications_enabled: bool,
    pub chat_enabled: bool,
    pub hide_ratings: bool,
    pub always_on_top: bool,
    pub hardware_acceleration: bool,
    pub sound_muted: bool,
    pub theme: ThemeId,
    pub discord_rpc_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            zoom_level: 0.0,
            notifications_enabled: true,
            chat_enabled: true,
            hide_ratings: false,
            always_on_top: false,
            hardware_acceleration: true,
            sound_muted: false,
            theme: ThemeId::Default,
            discord_rpc_enabled: true,
        }
    }
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub window: Option<WindowConfig>,
    pub zoom_level: Option<f64>,
    pub notifications_enabled: Option<bool>,
    pub chat_enabled: Option<bool>,
    pub hide_ratings: Option<bool>,
    pub always_on_top: Option<bool>,
    pub hardware_acceleration: Option<bool>,
    pub sound_muted: Option<bool>,
    pub theme: Option<ThemeId>,
    pub discord_rpc_enabled: Option<bool>,
}

/// Merge a patch into the settings. Invalid fields are logged and skipped;
/// the remaining fields are still applied.
pub fn apply_patch(settings: &mut AppSettings, patch: &SettingsPatch) {
    if let Some(window) = patch.window {
        if window.width > 0 && window.height > 0 {
            settings.window = window;
        } else {
            tracing::warn!("Invalid window settings received: {window:?}");
        }
    }

    if let Some(zoom_level) = patch.zoom_level {
        if zoom_level.is_finite() {
            settings.zoom_level = zoom_level;
        } else {
            tracing::warn!("Invalid zoom level received: {zoom_level}");
        }
    }

    if let Some(value) = patch.notifications_enabled {
        settings.notifications_enabled = value;
        tracing::info!("Notifications setting updated: {value}");
    }
    if let Some(value) = patch.chat_enabled {
        settings.chat_enabled = value;
        tracing::info!("Chat setting updated: {value}");
    }
    if let Some(value) = patch.hide_ratings {
        settings.hide_ratings = value;
        tracing::info!("Hide ratings setting updated: {value}");
    }
    if let Some(value) = patch.always_on_top {
        settings.always_on_top = value;
        tracing::info!("Always on top setting updated: {value}");
    }
    if let Some(value) = patch.hardware_acceleration {
        settings.hardware_acceleration = value;
        tracing::info!("Hardware acceleration setting updated: {value}");
    }
    if let Some(value) = patch.sound_muted {
        settings.sound_muted = value;
        tracing::info!("Sound muted setting updated: {value}");
    }
    if let Some(value) = patch.theme {
        settings.theme = value;
        tracing::info!("Theme setting updated: {value:?}");
    }
    if let Some(value) = patch.discord_rpc_enabled {
        settings.discord_rpc_enabled = value;
        tracing::info!("Discord RPC setting updated: {value}");
    }
}

fn settings_path(app: &AppHandle) -> Result<PathBuf, String> {
    let app_data = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to get app data directory: {}", e))?;

    fs::create_dir_all(&app_data)
        .map_err(|e| format!("Failed to create app data directory: {}", e))?;

    Ok(app_data.join(SETTINGS_FILE))
}

pub fn load_settings(app: &AppHandle) -> Result<AppSettings, String> {
    tracing::debug!("Loading settings");
    let path = settings_path(app)?;

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let contents =
        fs::read_to_string(&path).map_err(|e| format!("Failed to read settings file: {}", e))?;

    Ok(parse_settings(&contents))
}

/// Parse the settings file contents. A corrupt or hand-edited file must not
/// wedge every settings-backed command, so parse failures are logged and
/// replaced by defaults; the next save rewrites the file.
fn parse_settings(contents: &str) -> AppSettings {
    match serde_json::from_str(contents) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to parse settings, falling back to defaults: {e}");
            AppSettings::default()
        }
    }
}

pub fn save_settings(app: &AppHandle, settings: &AppSettings) -> Result<(), String> {
    tracing::debug!("Saving settings");
    let path = settings_path(app)?;

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(&path, contents).map_err(|e| format!("Failed to write settings file: {}", e))
}

/// Capture the main window's current geometry into the settings file.
/// Called on close; failures are logged by the caller.
pub fn persist_window_geometry(app: &AppHandle) -> Result<(), String> {
    let window = webview::chess_window(app)?;

    let size = window
        .inner_size()
        .map_err(|e| format!("Failed to read window size: {}", e))?;
    let position = window
        .outer_position()
        .map_err(|e| format!("Failed to read window position: {}", e))?;
    let maximized = window
        .is_maximized()
        .map_err(|e| format!("Failed to read maximized state: {}", e))?;

    let mut settings = load_settings(app)?;
    settings.window = WindowConfig {
        width: size.width,
        height: size.height,
        x: Some(position.x),
        y: Some(position.y),
        maximized,
    };
    save_settings(app, &settings)
}

#[tauri::command]
pub async fn get_settings(app: AppHandle) -> Result<AppSettings, String> {
    load_settings(&app)
}

#[tauri::command]
pub async fn update_settings(
    app: AppHandle,
    rpc: tauri::State<'_, DiscordRpcHandle>,
    patch: SettingsPatch,
) -> Result<AppSettings, String> {
    let mut settings = load_settings(&app)?;
    apply_patch(&mut settings, &patch);
    save_settings(&app, &settings)?;

    if patch.chat_enabled.is_some() || patch.hide_ratings.is_some() || patch.theme.is_some() {
        webview::apply_cosmetics(&app, &settings);
    }

    if let Some(always_on_top) = patch.always_on_top {
        if let Ok(window) = webview::chess_window(&app) {
            if let Err(e) = window.set_always_on_top(always_on_top) {
                tracing::error!("Failed to toggle always-on-top: {e}");
            }
        }
    }

    if let Some(enabled) = patch.discord_rpc_enabled {
        if enabled {
            rpc.initialize().await;
        } else {
            rpc.destroy().await;
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.window.width, 1280);
        assert_eq!(settings.window.height, 800);
        assert!(settings.chat_enabled);
        assert!(settings.notifications_enabled);
        assert!(!settings.hide_ratings);
        assert_eq!(settings.zoom_level, 0.0);
        assert_eq!(settings.theme, ThemeId::Default);
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_corrupt_settings_degrade_to_defaults() {
        assert_eq!(parse_settings("{ not json"), AppSettings::default());
        assert_eq!(parse_settings(""), AppSettings::default());
        assert_eq!(
            parse_settings(r#"{"zoom_level": "loud"}"#),
            AppSettings::default()
        );
    }

    #[test]
    fn test_round_trip() {
        let mut settings = AppSettings::default();
        settings.theme = ThemeId::Nebula;
        settings.window.x = Some(-4);
        settings.zoom_level = 0.5;

        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut settings = AppSettings::default();
        let patch = SettingsPatch {
            chat_enabled: Some(false),
            theme: Some(ThemeId::Dark),
            ..Default::default()
        };
        apply_patch(&mut settings, &patch);
        assert!(!settings.chat_enabled);
        assert_eq!(settings.theme, ThemeId::Dark);
        assert!(settings.notifications_enabled);
        assert_eq!(settings.window, WindowConfig::default());
    }

    #[test]
    fn test_invalid_window_patch_is_skipped() {
        let mut settings = AppSettings::default();
        let patch = SettingsPatch {
            window: Some(WindowConfig {
                width: 0,
                height: 600,
                x: None,
                y: None,
                maximized: false,
            }),
            sound_muted: Some(true),
            ..Default::default()
        };
        apply_patch(&mut settings, &patch);
        assert_eq!(settings.window, WindowConfig::default());
        assert!(settings.sound_muted);
    }

    #[test]
    fn test_non_finite_zoom_is_skipped() {
        let mut settings = AppSettings::default();
        let patch = SettingsPatch {
            zoom_level: Some(f64::NAN),
            ..Default::default()
        };
        apply_patch(&mut settings, &patch);
        assert_eq!(settings.zoom_level, 0.0);
    }
}
