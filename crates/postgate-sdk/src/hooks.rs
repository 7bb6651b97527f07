//! Lifecycle hooks the plugin implements and the host invokes.

use postgate_types::Post;

use crate::protocol::MessageWillBePostedResult;

/// Outcome of gating a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostDecision {
    /// Let the post through unchanged.
    Allow,
    /// Drop the post; the reason is shown to the author by the host.
    Reject(String),
}

impl PostDecision {
    /// The rejection reason as it goes on the wire: empty means allow.
    pub fn rejection_reason(&self) -> &str {
        match self {
            PostDecision::Allow => "",
            PostDecision::Reject(reason) => reason,
        }
    }
}

impl From<PostDecision> for MessageWillBePostedResult {
    fn from(decision: PostDecision) -> Self {
        MessageWillBePostedResult {
            post: None,
            rejection_reason: decision.rejection_reason().to_string(),
        }
    }
}

/// Trait for plugin implementations.
///
/// The host drives these callbacks: `on_activate` once at startup,
/// `on_configuration_change` whenever an admin edits the plugin settings,
/// and `message_will_be_posted` for every incoming post. The message hook
/// may be invoked concurrently for simultaneous posts.
#[async_trait::async_trait]
pub trait PluginHooks: Send + Sync + 'static {
    /// Called once when the host activates the plugin. An error here
    /// fails activation.
    async fn on_activate(&self) -> anyhow::Result<()>;

    /// Called when the plugin's settings change. On error the host keeps
    /// the prior settings in its UI; the plugin keeps its prior config.
    async fn on_configuration_change(&self) -> anyhow::Result<()>;

    /// Called for each post before the host persists it.
    async fn message_will_be_posted(&self, post: Post) -> PostDecision;
}
