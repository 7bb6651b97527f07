use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rejection message cannot be empty")]
    MissingRejectionMessage,
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Administrator-configured gating policy, as persisted by the host.
///
/// Field names keep the host's PascalCase settings schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Block direct messages.
    #[serde(rename = "RejectDMs", default)]
    pub reject_dms: bool,
    /// Block private group messages.
    #[serde(rename = "RejectGroupChats", default)]
    pub reject_group_chats: bool,
    /// Text shown to blocked senders.
    #[serde(rename = "RejectionMessage", default)]
    pub rejection_message: String,
    /// Reserved field, not consulted by any hook logic.
    #[serde(rename = "AllowedDomains", default)]
    pub allowed_domains: String,
}

impl Configuration {
    /// Decode a configuration from the host-persisted settings blob.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Normalize loaded values. Idempotent.
    pub fn process(&mut self) {
        self.rejection_message = self.rejection_message.trim().to_string();
    }

    /// Check that the policy is internally consistent: a reject flag
    /// requires a non-empty rejection message.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.reject_dms || self.reject_group_chats) && self.rejection_message.is_empty() {
            return Err(ConfigError::MissingRejectionMessage);
        }
        Ok(())
    }
}

/// Holder for the currently active configuration.
///
/// Replacement is wholesale via an atomic pointer swap, so concurrent
/// readers always see a fully-formed snapshot and never a torn value.
/// Starts from the default (all-off) policy until the first successful load.
pub struct ConfigStore {
    current: ArcSwap<Configuration>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Configuration::default()),
        }
    }

    /// Snapshot of the active, already-validated configuration.
    pub fn get(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Atomically replace the active configuration.
    pub fn set(&self, config: Configuration) {
        self.current.store(Arc::new(config));
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
