//! postgate-sdk: plugin-side binding to the team-chat host.
//!
//! A plugin is a standalone process the host launches and drives over
//! stdin/stdout using NDJSON JSON-RPC 2.0. The host invokes lifecycle hooks
//! (`on_activate`, `on_configuration_change`, `message_will_be_posted`) as
//! requests; the plugin calls host capabilities (`get_channel`,
//! `send_ephemeral_post`, `load_plugin_configuration`, `log`) back over the
//! same pipe.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use postgate_sdk::{HostApi, PluginHooks, PostDecision, run_plugin};
//! use postgate_types::Post;
//! use std::sync::Arc;
//!
//! struct MyPlugin { host: Arc<dyn HostApi> }
//!
//! #[async_trait::async_trait]
//! impl PluginHooks for MyPlugin {
//!     async fn on_activate(&self) -> anyhow::Result<()> { Ok(()) }
//!     async fn on_configuration_change(&self) -> anyhow::Result<()> { Ok(()) }
//!     async fn message_will_be_posted(&self, _post: Post) -> PostDecision {
//!         PostDecision::Allow
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_plugin(|host| MyPlugin { host }).await
//! }
//! ```

pub mod hooks;
pub mod host;
pub mod protocol;
pub mod runtime;

pub use hooks::{PluginHooks, PostDecision};
pub use host::{HostApi, HostError};
pub use runtime::{run_plugin, serve};
