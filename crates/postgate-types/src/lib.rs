use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ──────────────────── Channel Types ────────────────────

/// Kind of channel a post belongs to, using the host's single-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelType {
    /// Public channel, open to the whole team ("O").
    Open,
    /// Private channel, invitation only ("P").
    Private,
    /// Two-party direct message ("D").
    Direct,
    /// Private multi-party group message ("G").
    Group,
    /// Any channel kind this plugin does not classify.
    Unknown,
}

impl From<String> for ChannelType {
    fn from(code: String) -> Self {
        match code.as_str() {
            "O" => ChannelType::Open,
            "P" => ChannelType::Private,
            "D" => ChannelType::Direct,
            "G" => ChannelType::Group,
            _ => ChannelType::Unknown,
        }
    }
}

impl From<ChannelType> for String {
    fn from(ty: ChannelType) -> Self {
        match ty {
            ChannelType::Open => "O".into(),
            ChannelType::Private => "P".into(),
            ChannelType::Direct => "D".into(),
            ChannelType::Group => "G".into(),
            ChannelType::Unknown => String::new(),
        }
    }
}

/// A channel as reported by the host's channel lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Unique channel ID.
    pub id: String,
    /// Channel kind.
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// URL-safe channel name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Human-readable channel name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

// ──────────────────── Post Types ────────────────────

/// A message post as delivered to the message hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique post ID.
    pub id: String,
    /// Channel the post was sent to.
    pub channel_id: String,
    /// Author's user ID.
    pub user_id: String,
    /// Message text content.
    pub message: String,
    /// Post timestamp (unix millis).
    #[serde(default)]
    pub create_at: i64,
    /// Platform-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, serde_json::Value>,
}

/// A transient notice delivered to a single user, not persisted in channel
/// history for anyone else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralPost {
    /// Channel the notice appears in.
    pub channel_id: String,
    /// Notice text content.
    pub message: String,
}
