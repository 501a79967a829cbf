//! The embedded chess.com window: creation, navigation policy, zoom, CSS
//! application and the read-only page probe used by the presence engine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tokio::sync::oneshot;
use url::Url;

use crate::presence::{PageSnapshot, ProbeError, ViewProbe};
use crate::settings::AppSettings;
use crate::{settings, theme, zoom};

/// Label of the window hosting chess.com.
pub const CHESS_WINDOW_LABEL: &str = "main";

const CHESS_URL: &str = "https://www.chess.com/";

/// How long a page probe may take before the tick degrades to browsing.
const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

#[cfg(target_os = "macos")]
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
#[cfg(target_os = "linux")]
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Hosts the app may navigate to inside the embedded view.
pub fn is_chess_dot_com_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            parsed.scheme() == "https" && (host == "www.chess.com" || host == "chess.com")
        }
        Err(_) => false,
    }
}

/// Protocols allowed to leave the app for the system browser.
pub fn is_allowed_external_url(url: &str) -> bool {
    matches!(
        Url::parse(url).map(|u| u.scheme().to_string()).as_deref(),
        Ok("https") | Ok("http") | Ok("mailto")
    )
}

pub fn open_external_url(url: &str) {
    if !is_allowed_external_url(url) {
        tracing::warn!("Blocked external URL with unsupported protocol: {url}");
        return;
    }
    if let Err(e) = open::that(url) {
        tracing::error!("Failed to open external URL: {e}");
    }
}

pub fn chess_window(app: &AppHandle) -> Result<WebviewWindow, String> {
    app.get_webview_window(CHESS_WINDOW_LABEL)
        .ok_or_else(|| "Chess webview is not available".to_string())
}

/// Create the main window from persisted geometry, clamped to the primary
/// monitor's work area.
pub fn create_chess_window(
    app: &AppHandle,
    app_settings: &AppSettings,
) -> Result<WebviewWindow, String> {
    let url = Url::parse(CHESS_URL).map_err(|e| format!("Invalid start URL: {}", e))?;
    let config = app_settings.window;

    let mut width = f64::from(config.width);
    let mut height = f64::from(config.height);
    let mut position = config.x.zip(config.y);

    if let Ok(Some(monitor)) = app.primary_monitor() {
        let screen = monitor.size();
        width = width.min(f64::from(screen.width));
        height = height.min(f64::from(screen.height));

        // Drop an off-screen saved position so the window recenters.
        if let Some((x, y)) = position {
            let off_x = x < 0 || x as u32 + width as u32 > screen.width;
            let off_y = y < 0 || y as u32 + height as u32 > screen.height;
            if off_x || off_y {
                position = None;
            }
        }
    }

    let mut builder = WebviewWindowBuilder::new(app, CHESS_WINDOW_LABEL, WebviewUrl::External(url))
        .title("Chess Desktop")
        .inner_size(width, height)
        .min_inner_size(800.0, 600.0)
        .maximized(config.maximized)
        .always_on_top(app_settings.always_on_top)
        .user_agent(USER_AGENT)
        .on_navigation(|url| {
            if is_chess_dot_com_url(url.as_str()) {
                true
            } else {
                tracing::info!("Redirecting external navigation to the system browser: {url}");
                open_external_url(url.as_str());
                false
            }
        });

    if let Some((x, y)) = position {
        builder = builder.position(f64::from(x), f64::from(y));
    }

    let window = builder
        .build()
        .map_err(|e| format!("Failed to create main window: {}", e))?;

    if window.set_zoom(zoom::zoom_scale(app_settings.zoom_level)).is_err() {
        tracing::warn!("Failed to restore zoom level");
    }

    Ok(window)
}

/// Re-apply every cosmetic toggle to the live page. Called after each page
/// load and whenever a cosmetic setting changes.
pub fn apply_cosmetics(app: &AppHandle, app_settings: &AppSettings) {
    let Ok(window) = chess_window(app) else {
        return;
    };

    let chat_css = if app_settings.chat_enabled {
        theme::build_show_css(theme::CHAT_SELECTOR)
    } else {
        theme::build_hide_css(theme::CHAT_SELECTOR)
    };
    inject_style(&window, theme::CHAT_STYLE_SLOT, &chat_css);

    let ratings_css = if app_settings.hide_ratings {
        theme::build_hide_css(theme::RATINGS_SELECTOR)
    } else {
        theme::build_show_css(theme::RATINGS_SELECTOR)
    };
    inject_style(&window, theme::RATINGS_STYLE_SLOT, &ratings_css);

    inject_style(
        &window,
        theme::THEME_STYLE_SLOT,
        &theme::build_theme_css(app_settings.theme),
    );
}

fn inject_style(window: &WebviewWindow, slot: &str, css: &str) {
    let script = theme::build_style_injection_script(slot, css);
    if let Err(e) = window.eval(&script) {
        tracing::error!("Failed to apply {slot} stylesheet: {e}");
    }
}

// Page probe plumbing. The probe script runs inside the page and reports
// back through the `report_page_probe` command; a oneshot bridges the
// response to the waiting tick.

pub struct PageProbeRegistry {
    pending: Mutex<Option<oneshot::Sender<PageSnapshot>>>,
}

impl PageProbeRegistry {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Arm a new pending probe, superseding any previous one.
    fn register(&self) -> oneshot::Receiver<PageSnapshot> {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);
        rx
    }

    fn cancel(&self) {
        self.pending.lock().unwrap().take();
    }

    pub fn fulfill(&self, snapshot: PageSnapshot) {
        if let Some(tx) = self.pending.lock().unwrap().take() {
            let _ = tx.send(snapshot);
        } else {
            tracing::debug!("Unsolicited page probe report dropped");
        }
    }
}

impl Default for PageProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[tauri::command]
pub fn report_page_probe(
    registry: tauri::State<'_, Arc<PageProbeRegistry>>,
    snapshot: PageSnapshot,
) {
    registry.fulfill(snapshot);
}

/// Read-only JS snapshot of the page. Selector misses leave fields empty;
/// the script never mutates the document.
fn probe_script() -> String {
    r#"(() => {
  try {
    const q = (sel) => document.querySelector(sel);
    const text = (sel) => {
      const el = q(sel);
      return el && el.textContent ? el.textContent.trim() : null;
    };
    let timeControlClass = null;
    const timeEl = q('[class*="game-time-"]');
    if (timeEl) {
      timeControlClass = Array.from(timeEl.classList).find((c) => c.indexOf('game-time-') === 0) || null;
    }
    const snapshot = {
      url: window.location.href,
      hasBoard: !!(q('wc-chess-board') || q('chess-board')),
      hasGameOverControls: !!(q('.game-over-buttons-component') || q('[data-cy="sidebar-rematch-button"]') || q('.game-over-review-button-component')),
      hasLiveGameControls: !!(q('.resign-button-component') || q('[data-cy="resign-button"]') || q('.draw-button-component') || q('[data-cy="draw-offer-button"]')),
      timeControlClass,
      opponentName: text('.board-layout-top .user-username-component') || text('.player-top .user-username-component'),
      opponentRating: text('.board-layout-top .user-rating-component') || text('.player-top .user-rating-component'),
    };
    window.__TAURI_INTERNALS__.invoke('report_page_probe', { snapshot });
  } catch (e) {}
})();"#
        .to_string()
}

/// `ViewProbe` backed by the Tauri webview window.
pub struct TauriViewProbe {
    window: WebviewWindow,
    registry: Arc<PageProbeRegistry>,
}

impl TauriViewProbe {
    pub fn new(window: WebviewWindow, registry: Arc<PageProbeRegistry>) -> Self {
        Self { window, registry }
    }
}

impl ViewProbe for TauriViewProbe {
    fn is_live(&self) -> bool {
        self.window
            .app_handle()
            .get_webview_window(self.window.label())
            .is_some()
    }

    async fn snapshot(&self) -> Result<PageSnapshot, ProbeError> {
        let url = self
            .window
            .url()
            .map_err(|_| ProbeError::ViewGone)?;

        let rx = self.registry.register();
        self.window
            .eval(&probe_script())
            .map_err(|e| ProbeError::Script(e.to_string()))?;

        let mut snapshot = match tokio::time::timeout(PROBE_TIMEOUT, rx).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(_)) => return Err(ProbeError::Superseded),
            Err(_) => {
                self.registry.cancel();
                return Err(ProbeError::Timeout);
            }
        };

        // The window handle is authoritative for the address.
        snapshot.url = url.to_string();
        Ok(snapshot)
    }
}

// Navigation and zoom commands, driven by the titlebar chrome.

#[tauri::command]
pub fn webview_go_back(app: AppHandle) -> Result<(), String> {
    let window = chess_window(&app)?;
    window
        .eval("window.history.back()")
        .map_err(|e| format!("Failed to navigate back: {}", e))
}

#[tauri::command]
pub fn webview_go_forward(app: AppHandle) -> Result<(), String> {
    let window = chess_window(&app)?;
    window
        .eval("window.history.forward()")
        .map_err(|e| format!("Failed to navigate forward: {}", e))
}

#[tauri::command]
pub fn webview_reload(app: AppHandle) -> Result<(), String> {
    let window = chess_window(&app)?;
    window
        .eval("window.location.reload()")
        .map_err(|e| format!("Failed to reload: {}", e))
}

#[tauri::command]
pub fn webview_get_url(app: AppHandle) -> Result<String, String> {
    let window = chess_window(&app)?;
    window
        .url()
        .map(|u| u.to_string())
        .map_err(|e| format!("Failed to read URL: {}", e))
}

#[tauri::command]
pub fn webview_zoom_in(app: AppHandle) -> Result<f64, String> {
    step_zoom(&app, 1)
}

#[tauri::command]
pub fn webview_zoom_out(app: AppHandle) -> Result<f64, String> {
    step_zoom(&app, -1)
}

#[tauri::command]
pub fn webview_zoom_reset(app: AppHandle) -> Result<f64, String> {
    set_zoom_level(&app, 0.0)
}

#[tauri::command]
pub fn webview_get_zoom(app: AppHandle) -> Result<f64, String> {
    settings::load_settings(&app).map(|s| s.zoom_level)
}

fn step_zoom(app: &AppHandle, delta: i32) -> Result<f64, String> {
    let current = settings::load_settings(app)?.zoom_level;
    set_zoom_level(app, zoom::stepped_zoom_level(current, delta))
}

fn set_zoom_level(app: &AppHandle, level: f64) -> Result<f64, String> {
    let window = chess_window(app)?;
    window
        .set_zoom(zoom::zoom_scale(level))
        .map_err(|e| format!("Failed to set zoom: {}", e))?;

    let mut app_settings = settings::load_settings(app)?;
    app_settings.zoom_level = level;
    settings::save_settings(app, &app_settings)?;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chess_url_allow_list() {
        assert!(is_chess_dot_com_url("https://www.chess.com/play"));
        assert!(is_chess_dot_com_url("https://chess.com/"));
        assert!(!is_chess_dot_com_url("http://www.chess.com/"));
        assert!(!is_chess_dot_com_url("https://evil.chess.com.attacker.example/"));
        assert!(!is_chess_dot_com_url("https://lichess.org/"));
        assert!(!is_chess_dot_com_url("not a url"));
    }

    #[test]
    fn test_external_protocol_allow_list() {
        assert!(is_allowed_external_url("https://example.com"));
        assert!(is_allowed_external_url("http://example.com"));
        assert!(is_allowed_external_url("mailto:someone@example.com"));
        assert!(!is_allowed_external_url("file:///etc/passwd"));
        assert!(!is_allowed_external_url("javascript:alert(1)"));
        assert!(!is_allowed_external_url("nonsense"));
    }

    #[test]
    fn test_probe_script_reports_through_the_command() {
        let script = probe_script();
        assert!(script.contains("report_page_probe"));
        assert!(script.contains("game-time-"));
        assert!(script.contains("hasBoard"));
        assert!(script.contains("hasGameOverControls"));
        assert!(script.contains("hasLiveGameControls"));
    }

    #[test]
    fn test_registry_supersedes_older_probe() {
        let registry = PageProbeRegistry::new();
        let mut first = registry.register();
        let mut second = registry.register();

        registry.fulfill(PageSnapshot {
            url: "https://www.chess.com/puzzles".to_string(),
            ..Default::default()
        });

        assert!(first.try_recv().is_err());
        assert_eq!(
            second.try_recv().unwrap().url,
            "https://www.chess.com/puzzles"
        );
    }

    #[test]
    fn test_unsolicited_report_is_dropped() {
        let registry = PageProbeRegistry::new();
        registry.fulfill(PageSnapshot::default());
        registry.cancel();
    }
}
