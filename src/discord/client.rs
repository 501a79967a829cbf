//! Discord Rich Presence client built on discord-sdk

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use discord_sdk::{
    activity::{ActivityBuilder, Assets, Button},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};

use crate::presence::{PresenceClient, PresenceConnector, PresenceError, PresencePayload};

/// Discord Application ID for Chess Desktop
const DISCORD_APP_ID: i64 = 1458615395249291305;

/// Timeout for waiting for the Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens connections to the local Discord client.
pub struct DiscordConnector;

/// One live Discord connection. The `connected` flag tracks the user-state
/// wheel so pushes stop as soon as Discord reports a disconnect.
pub struct DiscordClient {
    discord: Discord,
    connected: Arc<AtomicBool>,
}

impl PresenceConnector for DiscordConnector {
    type Client = DiscordClient;

    async fn login(&self) -> Result<DiscordClient, PresenceError> {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = Discord::new(DISCORD_APP_ID, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| PresenceError::Connection(format!("{e:?}")))?;

        tracing::info!("Discord connecting...");

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                return Err(PresenceError::Connection(
                    "Discord connection closed".to_string(),
                ));
            }
            match &*user_spoke.0.borrow() {
                UserState::Connected(user) => Ok(user.clone()),
                UserState::Disconnected(err) => {
                    Err(PresenceError::Connection(format!("{err:?}")))
                }
            }
        })
        .await;

        let user = match handshake {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                discord.disconnect().await;
                return Err(e);
            }
            Err(_) => {
                discord.disconnect().await;
                return Err(PresenceError::HandshakeTimeout);
            }
        };

        tracing::info!(
            "Discord Rich Presence connected as {}#{}",
            user.username,
            user.discriminator.unwrap_or(0)
        );

        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while user_spoke.0.changed().await.is_ok() {
                let is_up = matches!(&*user_spoke.0.borrow(), UserState::Connected(_));
                flag.store(is_up, Ordering::SeqCst);
                if !is_up {
                    tracing::info!("Discord RPC disconnected");
                }
            }
        });

        Ok(DiscordClient { discord, connected })
    }
}

impl PresenceClient for DiscordClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_activity(&self, payload: &PresencePayload) -> Result<(), PresenceError> {
        let started_at = UNIX_EPOCH + Duration::from_millis(payload.started_at.max(0) as u64);

        let mut activity = ActivityBuilder::new()
            .state(payload.state.clone())
            .assets(Assets::default().large(payload.large_image_key, Some(payload.large_image_text)))
            .button(Button {
                label: payload.button_label.to_string(),
                url: payload.button_url.to_string(),
            })
            .start_timestamp(started_at);

        if let Some(details) = &payload.details {
            activity = activity.details(details.clone());
        }

        self.discord
            .update_activity(activity)
            .await
            .map(|_| ())
            .map_err(|e| PresenceError::Update(format!("{e:?}")))
    }

    async fn clear_activity(&self) -> Result<(), PresenceError> {
        self.discord
            .clear_activity()
            .await
            .map(|_| ())
            .map_err(|e| PresenceError::Update(format!("{e:?}")))
    }

    async fn shutdown(self) {
        self.discord.disconnect().await;
    }
}
