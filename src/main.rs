use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tracing::{error, info, warn};

use text_generator::api::auth::ApiKeys;
use text_generator::config::DEFAULT_CONFIG_FILE;
use text_generator::model::candle::CandleModelLoader;
use text_generator::model::ModelSlot;
use text_generator::telemetry::init_telemetry;
use text_generator::{build_router, AppState, Config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// PEM certificate, serves HTTPS together with --tls-key
    #[arg(long, env, requires = "tls_key")]
    tls_cert: Option<String>,

    /// PEM private key, serves HTTPS together with --tls-cert
    #[arg(long, env, requires = "tls_cert")]
    tls_key: Option<String>,

    /// OTLP collector endpoint for traces and metrics
    #[arg(long, env)]
    otlp_endpoint: Option<String>,

    /// Keep logging to the console when exporting to OTLP
    #[arg(long, env)]
    console: bool,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();
    init_telemetry(&args.otlp_endpoint, args.console)?;

    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(&mut args.opt_config),
        Err(err) => {
            if args.config_file == DEFAULT_CONFIG_FILE {
                Config::from(&mut args.opt_config)
            } else {
                bail!(
                    "Failed to read configuration file {} with error: {}",
                    args.config_file,
                    err
                );
            }
        }
    };

    let api_keys = ApiKeys::new(config.api_keys.clone());
    if api_keys.is_empty() {
        warn!("No API keys configured, every protected endpoint will answer 401");
    }

    let loader = Arc::new(CandleModelLoader::new(config.model_settings()));
    let model = ModelSlot::initialize(loader)
        .await
        .context("Failed to load the model")?;

    let router = build_router(AppState {
        model: Arc::new(model),
        api_keys: Arc::new(api_keys),
        max_tokens_limit: config.max_tokens_limit,
        redact_errors: config.redact_errors,
    });

    let addr: SocketAddr = format!("{}:{}", config.address, config.port)
        .parse()
        .context("Invalid listen address")?;
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match (&args.tls_cert, &args.tls_key) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("Failed to load TLS certificate")?;
            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        }
        _ => {
            info!("Listening on http://{}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutting down...");
            handle.graceful_shutdown(Some(Duration::from_secs(30)));
        }
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
