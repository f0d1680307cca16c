//! Client-side configuration, populated once at startup from the server's
//! `/get_config` endpoint. Every response field is optional; absent fields
//! keep the zero-valued defaults.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::ChatClient;
use crate::role::Role;

/// Dialog settings. Immutable after load, except that the round limit may be
/// overridden per turn by the live user input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatConfig {
    pub model: String,
    pub history_length: usize,
    pub temperature: f32,
    pub default_rounds: u32,
}

/// Model name bound to each conversational role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleModels {
    pub ai_left: String,
    pub ai_right: String,
}

impl RoleModels {
    pub fn model_for(&self, role: Role) -> &str {
        match role {
            Role::AiLeft => &self.ai_left,
            Role::AiRight => &self.ai_right,
        }
    }
}

// -- /get_config wire types -------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub chat_config: Option<ServerChatConfig>,
    #[serde(default)]
    pub role_models: Option<ServerRoleModels>,
}

#[derive(Debug, Deserialize)]
pub struct ServerChatConfig {
    #[serde(default)]
    pub history_length: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub default_rounds: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ServerRoleModels {
    #[serde(default)]
    pub ai_left: Option<String>,
    #[serde(default)]
    pub ai_right: Option<String>,
}

impl ServerConfig {
    /// Overwrite only the fields the server actually sent.
    pub fn apply_to(&self, config: &mut ChatConfig, roles: &mut RoleModels) {
        if let Some(model) = &self.default_model {
            config.model = model.clone();
        }
        if let Some(chat) = &self.chat_config {
            if let Some(history_length) = chat.history_length {
                config.history_length = history_length;
            }
            if let Some(temperature) = chat.temperature {
                config.temperature = temperature;
            }
            if let Some(default_rounds) = chat.default_rounds {
                config.default_rounds = default_rounds;
            }
        }
        if let Some(models) = &self.role_models {
            if let Some(ai_left) = &models.ai_left {
                roles.ai_left = ai_left.clone();
            }
            if let Some(ai_right) = &models.ai_right {
                roles.ai_right = ai_right.clone();
            }
        }
    }
}

/// Fetch server defaults once at startup. Failure is logged and ignored:
/// the zero-valued defaults stay in place and the client runs anyway.
pub async fn load_server_config(
    client: &ChatClient,
    config: &mut ChatConfig,
    roles: &mut RoleModels,
) {
    match client.fetch_config().await {
        Ok(server_config) => {
            server_config.apply_to(config, roles);
            debug!(
                model = %config.model,
                history_length = config.history_length,
                default_rounds = config.default_rounds,
                "loaded server configuration"
            );
        }
        Err(err) => {
            warn!("failed to fetch server configuration, keeping defaults: {}", err);
        }
    }
}
