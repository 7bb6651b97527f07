//! Plugin main loop: reads host traffic from stdin, writes plugin traffic
//! to stdout, one JSON object per line.
//!
//! Inbound lines are either hook invocations (they carry a `method`) or the
//! host's responses to this plugin's own capability calls. Hook invocations
//! are dispatched on spawned tasks so the reader keeps draining while a
//! handler awaits a host response; a single writer task owns stdout so
//! outbound lines never interleave.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hooks::PluginHooks;
use crate::host::{HostApi, RpcHost};
use crate::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, INTERNAL_ERROR, JsonRpcError, JsonRpcMessage,
    JsonRpcResponse, METHOD_NOT_FOUND, MessageWillBePostedParams, MessageWillBePostedResult,
    PARSE_ERROR,
};

/// How long to wait for in-flight writes to drain on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the plugin main loop over stdin/stdout.
///
/// The builder receives the host capability handle and returns the plugin's
/// hook implementation. Blocks until stdin closes or the host sends
/// `shutdown`.
///
/// Tracing must be routed to stderr; stdout belongs to the protocol.
pub async fn run_plugin<P, F>(build: F) -> anyhow::Result<()>
where
    P: PluginHooks,
    F: FnOnce(Arc<dyn HostApi>) -> P,
{
    serve(tokio::io::stdin(), tokio::io::stdout(), build).await
}

/// [`run_plugin`] over arbitrary streams. Exposed so tests can drive the
/// runtime through an in-memory duplex.
pub async fn serve<R, W, P, F>(reader: R, writer: W, build: F) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    P: PluginHooks,
    F: FnOnce(Arc<dyn HostApi>) -> P,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let host = Arc::new(RpcHost::new(out_tx.clone()));
    let hooks = Arc::new(build(host.clone()));

    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                send_response(
                    &out_tx,
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}")),
                );
                continue;
            }
        };

        // Hook invocations carry a method; everything else is a host
        // response to one of this plugin's capability calls.
        if value.get("method").is_some() {
            let msg: JsonRpcMessage = match serde_json::from_value(value) {
                Ok(m) => m,
                Err(e) => {
                    send_response(
                        &out_tx,
                        JsonRpcResponse::error(
                            None,
                            INVALID_REQUEST,
                            format!("Invalid request: {e}"),
                        ),
                    );
                    continue;
                }
            };

            if msg.method == "shutdown" {
                if let Some(id) = msg.id {
                    send_response(&out_tx, JsonRpcResponse::success(id, Value::Null));
                }
                break;
            }

            let hooks = hooks.clone();
            let out_tx = out_tx.clone();
            tokio::spawn(async move {
                let id = msg.id;
                let method = msg.method.clone();
                let result = dispatch(hooks.as_ref(), msg).await;

                let Some(id) = id else {
                    // A hook sent as a notification gets no reply
                    if let Err(e) = result {
                        warn!(%method, code = e.code, "Hook notification failed: {}", e.message);
                    }
                    return;
                };

                let response = match result {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(error) => JsonRpcResponse {
                        jsonrpc: "2.0".into(),
                        id: Some(id),
                        result: None,
                        error: Some(error),
                    },
                };
                send_response(&out_tx, response);
            });
        } else {
            match serde_json::from_value::<JsonRpcResponse>(value) {
                Ok(response) => host.complete(response),
                Err(e) => warn!("Unparseable host line: {e}: {line}"),
            }
        }
    }

    debug!("Host stream ended, shutting down");

    // Release our writer handles so the writer task drains and exits.
    drop(out_tx);
    drop(hooks);
    drop(host);
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, writer_task).await;

    Ok(())
}

fn send_response(out_tx: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(line) => {
            let _ = out_tx.send(line);
        }
        Err(e) => warn!("Failed to encode response: {e}"),
    }
}

async fn dispatch<P: PluginHooks>(
    hooks: &P,
    msg: JsonRpcMessage,
) -> Result<Value, JsonRpcError> {
    match msg.method.as_str() {
        "on_activate" => {
            hooks.on_activate().await.map_err(internal_error)?;
            Ok(Value::Null)
        }
        "on_configuration_change" => {
            hooks.on_configuration_change().await.map_err(internal_error)?;
            Ok(Value::Null)
        }
        "message_will_be_posted" => {
            let params: MessageWillBePostedParams = decode_params(msg.params)?;
            let decision = hooks.message_will_be_posted(params.post).await;
            serde_json::to_value(MessageWillBePostedResult::from(decision))
                .map_err(|e| internal_error(anyhow::Error::from(e)))
        }
        other => Err(JsonRpcError {
            code: METHOD_NOT_FOUND,
            message: format!("Unknown method: {other}"),
            data: None,
        }),
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError {
        code: INVALID_PARAMS,
        message: "Missing params".into(),
        data: None,
    })?;
    serde_json::from_value(params).map_err(|e| JsonRpcError {
        code: INVALID_PARAMS,
        message: format!("Invalid params: {e}"),
        data: None,
    })
}

fn internal_error(e: anyhow::Error) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message: e.to_string(),
        data: None,
    }
}
