//! NDJSON JSON-RPC 2.0 protocol between the chat host and the plugin.
//!
//! One JSON object per line in each direction.
//!
//! # Host → Plugin (Requests)
//!
//! | Method                    | Params       | Description                  |
//! |---------------------------|--------------|------------------------------|
//! | `on_activate`             | `{}`         | Plugin activated             |
//! | `on_configuration_change` | `{}`         | Admin edited plugin settings |
//! | `message_will_be_posted`  | `{ post }`   | Gate an incoming post        |
//! | `shutdown`                | `{}`         | Terminate the plugin         |
//!
//! # Plugin → Host (Requests)
//!
//! | Method                      | Params               | Description                |
//! |-----------------------------|----------------------|----------------------------|
//! | `load_plugin_configuration` | `{}`                 | Fetch persisted settings   |
//! | `get_channel`               | `{ channel_id }`     | Channel lookup             |
//! | `send_ephemeral_post`       | `{ user_id, post }`  | One-recipient notice       |
//!
//! # Plugin → Host (Notifications, no `id`)
//!
//! | Method | Params                 | Description    |
//! |--------|------------------------|----------------|
//! | `log`  | `{ level, message }`   | Log forwarding |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use postgate_types::{EphemeralPost, Post};

/// JSON-RPC 2.0 request / notification.
///
/// When `id` is `Some`, this is a request expecting a response.
/// When `id` is `None`, this is a one-way notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ──────────────────── Standard error codes ────────────────────

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ──────────────────── Hook params / results ────────────────────

/// Params for the `message_will_be_posted` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWillBePostedParams {
    pub post: Post,
}

/// Result of the `message_will_be_posted` request.
///
/// A non-empty `rejection_reason` signals the host to drop the post.
/// `post` carries a replacement post when the plugin rewrites one; this
/// plugin never does, so it is always `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWillBePostedResult {
    #[serde(default)]
    pub post: Option<Post>,
    #[serde(default)]
    pub rejection_reason: String,
}

// ──────────────────── Host capability params ────────────────────

/// Params for the `get_channel` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetChannelParams {
    pub channel_id: String,
}

/// Params for the `send_ephemeral_post` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEphemeralPostParams {
    pub user_id: String,
    pub post: EphemeralPost,
}

/// Params for the `log` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogNotification {
    pub level: String,
    pub message: String,
}

// ──────────────────── Helpers ────────────────────

impl JsonRpcMessage {
    /// Create a request (has an `id`, expects a response).
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no `id`, one-way).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: None,
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<u64>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}
