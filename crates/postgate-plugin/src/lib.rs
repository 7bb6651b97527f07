//! The message gate: rejects direct-message and group-chat posts per the
//! administrator-configured policy, replying with an ephemeral notice.

use std::sync::Arc;

use tracing::{debug, warn};

use postgate_config::{ConfigStore, Configuration};
use postgate_sdk::{HostApi, PluginHooks, PostDecision};
use postgate_types::{ChannelType, EphemeralPost, Post};

/// The gate plugin. Holds the host capability handle and the active
/// configuration; both live for the plugin process's lifetime.
pub struct GatePlugin {
    host: Arc<dyn HostApi>,
    config: ConfigStore,
}

impl GatePlugin {
    pub fn new(host: Arc<dyn HostApi>) -> Self {
        Self {
            host,
            config: ConfigStore::new(),
        }
    }

    /// Fetch, normalize, validate, and swap in the plugin settings.
    ///
    /// On any failure the error is logged through the host and the prior
    /// configuration stays active.
    async fn reload_configuration(&self) -> anyhow::Result<()> {
        let value = match self.host.load_plugin_configuration().await {
            Ok(value) => value,
            Err(e) => {
                self.host
                    .log_error(&format!("Error in LoadPluginConfiguration: {e}"));
                return Err(e.into());
            }
        };

        let mut configuration = match Configuration::from_value(value) {
            Ok(configuration) => configuration,
            Err(e) => {
                self.host
                    .log_error(&format!("Error in ProcessConfiguration: {e}"));
                return Err(e.into());
            }
        };

        configuration.process();

        if let Err(e) = configuration.validate() {
            self.host
                .log_error(&format!("Error in Validating Configuration: {e}"));
            return Err(e.into());
        }

        debug!(
            reject_dms = configuration.reject_dms,
            reject_group_chats = configuration.reject_group_chats,
            "Configuration applied"
        );
        self.config.set(configuration);
        Ok(())
    }
}

#[async_trait::async_trait]
impl PluginHooks for GatePlugin {
    async fn on_activate(&self) -> anyhow::Result<()> {
        self.reload_configuration().await
    }

    async fn on_configuration_change(&self) -> anyhow::Result<()> {
        self.reload_configuration().await
    }

    async fn message_will_be_posted(&self, post: Post) -> PostDecision {
        let conf = self.config.get();

        let channel = match self.host.get_channel(&post.channel_id).await {
            Ok(channel) => channel,
            Err(e) => {
                // Fail open: a lookup failure must not block all traffic
                self.host.log_error(&format!(
                    "Failed to get channel for post: {} and channel_id: {}. Error: {e}",
                    post.id, post.channel_id
                ));
                return PostDecision::Allow;
            }
        };

        let rejected = match channel.channel_type {
            ChannelType::Direct => conf.reject_dms,
            ChannelType::Group => conf.reject_group_chats,
            _ => false,
        };

        if !rejected {
            return PostDecision::Allow;
        }

        let notice = EphemeralPost {
            channel_id: post.channel_id.clone(),
            message: conf.rejection_message.clone(),
        };
        if let Err(e) = self.host.send_ephemeral_post(&post.user_id, notice).await {
            // The rejection stands even if the notice fails to deliver
            warn!(post_id = %post.id, "Failed to send rejection notice: {e}");
        }

        debug!(
            post_id = %post.id,
            channel_id = %post.channel_id,
            channel_type = ?channel.channel_type,
            "Post rejected by policy"
        );
        PostDecision::Reject(conf.rejection_message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use postgate_sdk::HostError;
    use postgate_types::Channel;

    /// Recording fake for the host capabilities.
    struct FakeHost {
        configuration: Mutex<serde_json::Value>,
        channels: Mutex<HashMap<String, Channel>>,
        fail_channel_lookup: Mutex<bool>,
        fail_ephemeral_send: Mutex<bool>,
        ephemeral_posts: Mutex<Vec<(String, EphemeralPost)>>,
        logged_errors: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn new() -> Self {
            Self {
                configuration: Mutex::new(serde_json::json!({})),
                channels: Mutex::new(HashMap::new()),
                fail_channel_lookup: Mutex::new(false),
                fail_ephemeral_send: Mutex::new(false),
                ephemeral_posts: Mutex::new(Vec::new()),
                logged_errors: Mutex::new(Vec::new()),
            }
        }

        fn set_configuration(&self, value: serde_json::Value) {
            *self.configuration.lock().unwrap() = value;
        }

        fn add_channel(&self, id: &str, channel_type: ChannelType) {
            self.channels.lock().unwrap().insert(
                id.to_string(),
                Channel {
                    id: id.to_string(),
                    channel_type,
                    name: String::new(),
                    display_name: String::new(),
                },
            );
        }
    }

    #[async_trait::async_trait]
    impl HostApi for FakeHost {
        async fn load_plugin_configuration(&self) -> Result<serde_json::Value, HostError> {
            Ok(self.configuration.lock().unwrap().clone())
        }

        async fn get_channel(&self, channel_id: &str) -> Result<Channel, HostError> {
            if *self.fail_channel_lookup.lock().unwrap() {
                return Err(HostError::Rpc {
                    code: -32603,
                    message: "channel lookup failed".into(),
                });
            }
            self.channels
                .lock()
                .unwrap()
                .get(channel_id)
                .cloned()
                .ok_or(HostError::Rpc {
                    code: -32603,
                    message: "channel not found".into(),
                })
        }

        async fn send_ephemeral_post(
            &self,
            user_id: &str,
            post: EphemeralPost,
        ) -> Result<(), HostError> {
            if *self.fail_ephemeral_send.lock().unwrap() {
                return Err(HostError::Rpc {
                    code: -32603,
                    message: "send failed".into(),
                });
            }
            self.ephemeral_posts
                .lock()
                .unwrap()
                .push((user_id.to_string(), post));
            Ok(())
        }

        fn log_error(&self, message: &str) {
            self.logged_errors.lock().unwrap().push(message.to_string());
        }
    }

    fn plugin_with(config: serde_json::Value) -> (GatePlugin, Arc<FakeHost>) {
        let host = Arc::new(FakeHost::new());
        host.set_configuration(config);
        let plugin = GatePlugin::new(host.clone());
        (plugin, host)
    }

    fn post_in(channel_id: &str) -> Post {
        Post {
            id: "p1".into(),
            channel_id: channel_id.into(),
            user_id: "u1".into(),
            message: "hello".into(),
            create_at: 0,
            props: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_activation_loads_and_trims_configuration() {
        let (plugin, _host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "  No DMs please  ",
        }));

        plugin.on_activate().await.unwrap();

        let active = plugin.config.get();
        assert!(active.reject_dms);
        assert_eq!(active.rejection_message, "No DMs please");
    }

    #[tokio::test]
    async fn test_invalid_change_keeps_prior_configuration() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "Blocked",
        }));
        plugin.on_activate().await.unwrap();

        // Reject flag without a message fails validation
        host.set_configuration(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "   ",
        }));
        assert!(plugin.on_configuration_change().await.is_err());

        let active = plugin.config.get();
        assert!(active.reject_dms);
        assert_eq!(active.rejection_message, "Blocked");
        assert_eq!(host.logged_errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_load_leaves_gate_permissive() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "",
        }));
        host.add_channel("dm", ChannelType::Direct);

        assert!(plugin.on_activate().await.is_err());

        // Zero-value config is in effect: nothing is rejected
        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Allow);
    }

    #[tokio::test]
    async fn test_dm_rejected_with_ephemeral_notice() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "Blocked",
        }));
        host.add_channel("dm", ChannelType::Direct);
        plugin.on_activate().await.unwrap();

        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Reject("Blocked".into()));

        let sent = host.ephemeral_posts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (user_id, notice) = &sent[0];
        assert_eq!(user_id, "u1");
        assert_eq!(notice.channel_id, "dm");
        assert_eq!(notice.message, "Blocked");
    }

    #[tokio::test]
    async fn test_group_rejected_only_when_flagged() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectGroupChats": true,
            "RejectionMessage": "No group chatter",
        }));
        host.add_channel("grp", ChannelType::Group);
        host.add_channel("dm", ChannelType::Direct);
        plugin.on_activate().await.unwrap();

        let decision = plugin.message_will_be_posted(post_in("grp")).await;
        assert_eq!(decision, PostDecision::Reject("No group chatter".into()));

        // DMs pass: only the group flag is set
        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Allow);
    }

    #[tokio::test]
    async fn test_public_channel_passes_untouched() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectGroupChats": true,
            "RejectionMessage": "Blocked",
        }));
        host.add_channel("town-square", ChannelType::Open);
        host.add_channel("backroom", ChannelType::Private);
        plugin.on_activate().await.unwrap();

        for channel in ["town-square", "backroom"] {
            let decision = plugin.message_will_be_posted(post_in(channel)).await;
            assert_eq!(decision, PostDecision::Allow);
        }
        assert!(host.ephemeral_posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_channel_type_passes() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectGroupChats": true,
            "RejectionMessage": "Blocked",
        }));
        host.add_channel("odd", ChannelType::Unknown);
        plugin.on_activate().await.unwrap();

        let decision = plugin.message_will_be_posted(post_in("odd")).await;
        assert_eq!(decision, PostDecision::Allow);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_open_and_logs_once() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "Blocked",
        }));
        plugin.on_activate().await.unwrap();
        *host.fail_channel_lookup.lock().unwrap() = true;

        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Allow);
        assert!(host.ephemeral_posts.lock().unwrap().is_empty());

        let logged = host.logged_errors.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("Failed to get channel"));
    }

    #[tokio::test]
    async fn test_rejection_stands_when_notice_fails() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "Blocked",
        }));
        host.add_channel("dm", ChannelType::Direct);
        plugin.on_activate().await.unwrap();
        *host.fail_ephemeral_send.lock().unwrap() = true;

        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Reject("Blocked".into()));
    }

    #[tokio::test]
    async fn test_policy_change_takes_effect_for_next_post() {
        let (plugin, host) = plugin_with(serde_json::json!({
            "RejectDMs": true,
            "RejectionMessage": "Blocked",
        }));
        host.add_channel("dm", ChannelType::Direct);
        plugin.on_activate().await.unwrap();

        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert!(matches!(decision, PostDecision::Reject(_)));

        host.set_configuration(serde_json::json!({
            "RejectDMs": false,
            "RejectionMessage": "Blocked",
        }));
        plugin.on_configuration_change().await.unwrap();

        let decision = plugin.message_will_be_posted(post_in("dm")).await;
        assert_eq!(decision, PostDecision::Allow);
    }
}
