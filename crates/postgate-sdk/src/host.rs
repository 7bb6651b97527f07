//! Host capabilities the plugin consumes, and their JSON-RPC client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use postgate_types::{Channel, EphemeralPost};

use crate::protocol::{JsonRpcMessage, JsonRpcResponse};

/// Default timeout for RPC calls into the host.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("host RPC error [{code}]: {message}")]
    Rpc { code: i64, message: String },
    #[error("host call '{method}' timed out")]
    Timeout { method: String },
    #[error("host connection closed")]
    ConnectionClosed,
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Capabilities the host exposes to the plugin.
///
/// Kept narrow so tests can substitute a fake.
#[async_trait::async_trait]
pub trait HostApi: Send + Sync {
    /// Fetch the host-persisted settings blob for this plugin.
    async fn load_plugin_configuration(&self) -> Result<Value, HostError>;

    /// Look up a channel by ID.
    async fn get_channel(&self, channel_id: &str) -> Result<Channel, HostError>;

    /// Deliver a transient notice visible only to one user.
    async fn send_ephemeral_post(
        &self,
        user_id: &str,
        post: EphemeralPost,
    ) -> Result<(), HostError>;

    /// Forward an error line to the host's log. Fire and forget.
    fn log_error(&self, message: &str);
}

/// [`HostApi`] implementation speaking JSON-RPC to the host over the
/// plugin's stdio transport.
///
/// Outbound lines are funneled through the runtime's writer channel; the
/// runtime's reader routes host responses back via [`RpcHost::complete`].
pub struct RpcHost {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>,
    out_tx: mpsc::UnboundedSender<String>,
    timeout: Duration,
}

impl RpcHost {
    pub fn new(out_tx: mpsc::UnboundedSender<String>) -> Self {
        Self::with_timeout(out_tx, RPC_TIMEOUT)
    }

    pub fn with_timeout(out_tx: mpsc::UnboundedSender<String>, timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            out_tx,
            timeout,
        }
    }

    /// Route a host response to the call awaiting it.
    pub fn complete(&self, response: JsonRpcResponse) {
        let Some(id) = response.id else {
            return;
        };
        let tx = self.pending.lock().expect("pending map poisoned").remove(&id);
        match tx {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => warn!(%id, "Response for unknown or timed-out request ID"),
        }
    }

    /// Send an RPC request to the host and wait for its response.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcMessage::request(id, method, params);
        let line = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map poisoned")
            .insert(id, tx);

        if self.out_tx.send(line).is_err() {
            self.pending
                .lock()
                .expect("pending map poisoned")
                .remove(&id);
            return Err(HostError::ConnectionClosed);
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(HostError::ConnectionClosed),
            Err(_) => {
                self.pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(&id);
                return Err(HostError::Timeout {
                    method: method.to_string(),
                });
            }
        };

        if let Some(err) = response.error {
            return Err(HostError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Send a one-way notification to the host.
    fn notify(&self, method: &str, params: Option<Value>) {
        let notif = JsonRpcMessage::notification(method, params);
        match serde_json::to_string(&notif) {
            Ok(line) => {
                let _ = self.out_tx.send(line);
            }
            Err(e) => warn!("Failed to encode '{method}' notification: {e}"),
        }
    }
}

#[async_trait::async_trait]
impl HostApi for RpcHost {
    async fn load_plugin_configuration(&self) -> Result<Value, HostError> {
        self.call("load_plugin_configuration", None).await
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, HostError> {
        let params = serde_json::to_value(crate::protocol::GetChannelParams {
            channel_id: channel_id.to_string(),
        })?;
        let result = self.call("get_channel", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn send_ephemeral_post(
        &self,
        user_id: &str,
        post: EphemeralPost,
    ) -> Result<(), HostError> {
        let params = serde_json::to_value(crate::protocol::SendEphemeralPostParams {
            user_id: user_id.to_string(),
            post,
        })?;
        self.call("send_ephemeral_post", Some(params)).await?;
        Ok(())
    }

    fn log_error(&self, message: &str) {
        let params = serde_json::to_value(crate::protocol::LogNotification {
            level: "error".into(),
            message: message.to_string(),
        })
        .ok();
        self.notify("log", params);
    }
}
