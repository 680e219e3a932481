//! Catalog gateway server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use catalog_core::ApiVersion;
use catalog_server::network::{ApiTokenResolver, IdentityResolver, TlsConfig};
use catalog_server::{
    register_builtins, ActionRegistry, AppState, Dispatcher, GatewayConfig, NetworkConfig,
    NetworkModule,
};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "catalog-gateway", version, about = "Action API gateway for a data catalog")]
struct Args {
    /// Address to bind
    #[arg(long, env = "CATALOG_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "CATALOG_PORT", default_value_t = 5000)]
    port: u16,

    /// Public base URL, used in `help` links
    #[arg(long, env = "CATALOG_SITE_URL", default_value = "http://localhost:5000")]
    site_url: String,

    #[arg(long, env = "CATALOG_SITE_TITLE", default_value = "Data Catalog")]
    site_title: String,

    /// Path prefix of the API routes
    #[arg(long, env = "CATALOG_API_PREFIX", default_value = "/api")]
    api_prefix: String,

    /// Locales served by the i18n route
    #[arg(long, env = "CATALOG_LOCALES", value_delimiter = ',', default_value = "en")]
    locales: Vec<String>,

    /// Directory holding `<lang>.js` translation files
    #[arg(long, env = "CATALOG_I18N_DIR", default_value = "i18n")]
    i18n_dir: PathBuf,

    /// API tokens as `token=user` pairs, comma separated
    #[arg(long, env = "CATALOG_API_TOKENS", default_value = "", hide_env_values = true)]
    api_tokens: String,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "CATALOG_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CATALOG_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    #[arg(long, env = "CATALOG_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "CATALOG_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    #[arg(long, env = "CATALOG_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let gateway = Arc::new(GatewayConfig {
        site_url: args.site_url,
        site_title: args.site_title,
        api_prefix: args.api_prefix,
        default_api_version: ApiVersion::V3,
        max_api_version: ApiVersion::V3,
        locales: args.locales,
        i18n_dir: args.i18n_dir,
    });
    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        tls: args
            .tls_cert
            .zip(args.tls_key)
            .map(|(cert_path, key_path)| TlsConfig { cert_path, key_path }),
        cors_origins: args.cors_origins,
        request_timeout: Duration::from_secs(args.request_timeout),
        ..NetworkConfig::default()
    };

    let tokens = ApiTokenResolver::parse(&args.api_tokens).context("invalid CATALOG_API_TOKENS")?;
    info!(tokens = tokens.len(), "API tokens loaded");
    let identity: Arc<dyn IdentityResolver> = Arc::new(tokens);

    let registry = Arc::new(ActionRegistry::new());
    register_builtins(&registry, &gateway);
    info!(actions = ?registry.names(), "actions registered");

    let dispatcher = Arc::new(Dispatcher::new(registry, gateway));
    let mut module = NetworkModule::new(AppState::new(dispatcher, network, identity));
    let port = module.start().await?;
    info!(port, "catalog gateway listening");

    module
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await
}
