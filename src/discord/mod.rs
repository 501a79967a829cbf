mod client;

pub use client::{DiscordClient, DiscordConnector};

use crate::DiscordRpcHandle;

#[tauri::command]
pub async fn initialize_discord_rpc(
    rpc: tauri::State<'_, DiscordRpcHandle>,
) -> Result<(), String> {
    rpc.initialize().await;
    Ok(())
}

#[tauri::command]
pub async fn destroy_discord_rpc(rpc: tauri::State<'_, DiscordRpcHandle>) -> Result<(), String> {
    rpc.destroy().await;
    Ok(())
}

#[tauri::command]
pub async fn set_discord_activity(rpc: tauri::State<'_, DiscordRpcHandle>) -> Result<(), String> {
    rpc.set_activity().await;
    Ok(())
}

#[tauri::command]
pub async fn clear_discord_activity(
    rpc: tauri::State<'_, DiscordRpcHandle>,
) -> Result<(), String> {
    rpc.clear_activity().await;
    Ok(())
}
