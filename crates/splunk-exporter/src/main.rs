//! Splunk health exporter binary.

use anyhow::Context as _;
use clap::Parser;
use splunk_exporter::{Config, Credentials, Exporter, SplunkClient};
use splunk_metrics::GlobalRegistry;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, Parser)]
#[command(name = "splunk-exporter", version, about = "Prometheus exporter for Splunk server health")]
struct Cli {
    /// Path to the TOML config file. Defaults to `<binary name>.toml` in the working directory.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
    /// Path to a PEM-encoded root certificate to trust for the Splunk API, in addition
    /// to the built-in roots.
    #[arg(short = 'x', long = "local-cert")]
    local_cert: Option<PathBuf>,
}

fn default_config_path() -> PathBuf {
    let binary_name = env::args_os()
        .next()
        .and_then(|arg| Path::new(&arg).file_stem().map(ToOwned::to_owned))
        .unwrap_or_else(|| env!("CARGO_BIN_NAME").into());
    let mut path = PathBuf::from(binary_name);
    path.set_extension("toml");
    path
}

fn build_http_client(config: &Config, local_cert: Option<&Path>) -> anyhow::Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().danger_accept_invalid_certs(config.insecure_skip_verify);
    if config.insecure_skip_verify {
        tracing::warn!("TLS certificate verification for the Splunk API is disabled");
    }

    if let Some(path) = local_cert {
        let pem = fs::read(path)
            .with_context(|| format!("cannot read local certificate `{}`", path.display()))?;
        let certificate = reqwest::Certificate::from_pem(&pem)
            .with_context(|| format!("cannot parse local certificate `{}`", path.display()))?;
        builder = builder.add_root_certificate(certificate);
        tracing::info!(path = %path.display(), "Added local root certificate");
    }
    if let Some(timeout) = config.upstream_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().context("cannot build HTTP client")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("splunk_exporter=info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::from_file(&config_path)
        .with_context(|| format!("failed loading config from `{}`", config_path.display()))?;
    tracing::info!(path = %config_path.display(), ?config, "Loaded config");

    let http_client = build_http_client(&config, cli.local_cert.as_deref())?;
    let client = SplunkClient::new(
        http_client,
        config.splunk_url.clone(),
        Credentials::new(&config.username, &config.password),
    );

    let (stop_sender, mut stop_receiver) = watch::channel(());
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        stop_sender.send_replace(());
    });

    let exporter = Exporter::new(client, Arc::clone(GlobalRegistry::global()))
        .context("failed registering exporter metrics")?
        .with_paths(&config.metrics_path, &config.scrape_path)
        .with_failed_scrape_timing(config.observe_failed_scrapes)
        .with_graceful_shutdown(async move {
            stop_receiver.changed().await.ok();
        });
    let server = exporter
        .bind(config.listen_address)
        .await
        .with_context(|| format!("failed binding to `{}`", config.listen_address))?;
    println!("local_addr={}", server.local_addr());
    // ^ Print the local server address so that it's discoverable if the 0th port was specified

    server.start().await.context("exporter server failed")
}
