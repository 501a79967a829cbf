pub mod discord;
mod logging;
pub mod presence;
pub mod settings;
pub mod theme;
pub mod webview;
pub mod zoom;

use std::sync::Arc;

use tauri::webview::PageLoadEvent;
use tauri::Manager;

use discord::{
    clear_discord_activity, destroy_discord_rpc, initialize_discord_rpc, set_discord_activity,
    DiscordConnector,
};
use presence::PresenceManager;
use settings::{get_settings, update_settings};
use webview::{
    report_page_probe, webview_get_url, webview_get_zoom, webview_go_back, webview_go_forward,
    webview_reload, webview_zoom_in, webview_zoom_out, webview_zoom_reset, PageProbeRegistry,
    TauriViewProbe,
};

/// Bundle identifier, mirrored in `tauri.conf.json`. Names the per-user
/// data directory that holds settings and logs.
pub const APP_IDENTIFIER: &str = "app.chessdesktop";

/// The process-wide presence engine, shared between commands and setup.
pub type DiscordRpcHandle = Arc<PresenceManager<TauriViewProbe, DiscordConnector>>;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _log_guard = logging::init_logging();

    let probe_registry = Arc::new(PageProbeRegistry::new());
    let rpc: DiscordRpcHandle = Arc::new(PresenceManager::new(DiscordConnector));

    let setup_registry = Arc::clone(&probe_registry);
    let setup_rpc = Arc::clone(&rpc);

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .manage(probe_registry)
        .manage(rpc)
        .invoke_handler(tauri::generate_handler![
            get_settings,
            update_settings,
            initialize_discord_rpc,
            destroy_discord_rpc,
            set_discord_activity,
            clear_discord_activity,
            report_page_probe,
            webview_go_back,
            webview_go_forward,
            webview_reload,
            webview_get_url,
            webview_zoom_in,
            webview_zoom_out,
            webview_zoom_reset,
            webview_get_zoom,
        ])
        .on_page_load(|webview, payload| {
            if matches!(payload.event(), PageLoadEvent::Finished) {
                let app = webview.app_handle();
                match settings::load_settings(app) {
                    Ok(app_settings) => webview::apply_cosmetics(app, &app_settings),
                    Err(e) => tracing::error!("Failed to load settings on page load: {e}"),
                }
            }
        })
        .setup(move |app| {
            let app_settings = settings::load_settings(app.handle()).unwrap_or_else(|e| {
                tracing::error!("Failed to load settings, falling back to defaults: {e}");
                settings::AppSettings::default()
            });

            let window = webview::create_chess_window(app.handle(), &app_settings)?;

            let close_handle = app.handle().clone();
            window.on_window_event(move |event| {
                if let tauri::WindowEvent::CloseRequested { .. } = event {
                    if let Err(e) = settings::persist_window_geometry(&close_handle) {
                        tracing::warn!("Failed to persist window geometry: {e}");
                    }
                }
            });

            setup_rpc.set_view(Some(Arc::new(TauriViewProbe::new(window, setup_registry))));

            if app_settings.discord_rpc_enabled {
                let rpc = Arc::clone(&setup_rpc);
                tauri::async_runtime::spawn(async move {
                    rpc.initialize().await;
                });
            }

            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
