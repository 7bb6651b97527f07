use postgate_plugin::GatePlugin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the host protocol; all diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    postgate_sdk::run_plugin(GatePlugin::new).await
}
