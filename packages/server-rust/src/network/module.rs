//! Network module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    action_handler, health_handler, liveness_handler, readiness_handler, root_handler, util,
    translations_handler, versioned_action_handler, versioned_root_handler,
    versioned_translations_handler, AppState, AUTOCOMPLETE_ROUTES,
};
use super::lifecycle::Lifecycle;
use super::middleware::build_http_layers;

/// Assembles the router: API routes under the configured prefix, health
/// checks at the root, and the transport middleware around everything.
///
/// Routes (`<p>` is the API prefix):
/// - `GET <p>`, `GET <p>/`, `GET <p>/{ver}`: API version
/// - `GET|POST <p>/action/{name}`, `<p>/{ver}/action/{name}`: action calls
/// - `GET <p>/util/...`, `<p>/{ver}/util/...`: autocomplete pass-throughs
/// - `GET <p>/i18n/{lang}`, `<p>/{ver}/i18n/{lang}`: translations
/// - `GET /health`, `/health/live`, `/health/ready`
pub fn build_router(state: AppState) -> Router {
    let prefix = state.gateway.api_prefix.trim_end_matches('/').to_string();
    let layers = build_http_layers(&state.network);

    let mut router = Router::new()
        .route(&format!("{prefix}/"), get(root_handler))
        .route(&format!("{prefix}/{{ver}}"), get(versioned_root_handler))
        .route(
            &format!("{prefix}/action/{{name}}"),
            get(action_handler).post(action_handler),
        )
        .route(
            &format!("{prefix}/{{ver}}/action/{{name}}"),
            get(versioned_action_handler).post(versioned_action_handler),
        )
        .route(&format!("{prefix}/i18n/{{lang}}"), get(translations_handler))
        .route(
            &format!("{prefix}/{{ver}}/i18n/{{lang}}"),
            get(versioned_translations_handler),
        );
    if !prefix.is_empty() {
        router = router.route(&prefix, get(root_handler));
    }

    for route in &AUTOCOMPLETE_ROUTES {
        router = router
            .route(
                &format!("{prefix}/util/{}", route.path),
                get(
                    move |State(state): State<AppState>,
                          method: Method,
                          uri: Uri,
                          headers: HeaderMap| async move {
                        util::autocomplete(route, state, method, uri, headers).await
                    },
                ),
            )
            .route(
                &format!("{prefix}/{{ver}}/util/{}", route.path),
                get(
                    move |State(state): State<AppState>,
                          Path(ver): Path<String>,
                          method: Method,
                          uri: Uri,
                          headers: HeaderMap| async move {
                        util::versioned_autocomplete(route, state, ver, method, uri, headers).await
                    },
                ),
            );
    }

    router
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(layers)
        .with_state(state)
}

/// Manages the HTTP server lifecycle.
///
/// 1. `new()`: holds the shared state
/// 2. `start()`: binds the TCP listener to the configured address
/// 3. `serve()`: accepts connections until shutdown is signalled
pub struct NetworkModule {
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            listener: None,
        }
    }

    /// Shared lifecycle, for health state and in-flight tracking.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.state.lifecycle)
    }

    #[must_use]
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Binds the TCP listener and returns the bound port, which differs from
    /// the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let config = &self.state.network;
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then waits for in-flight
    /// action calls to finish (bounded by the drain timeout).
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, if TLS material
    /// cannot be loaded, or on a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let network = Arc::clone(&self.state.network);
        let lifecycle = Arc::clone(&self.state.lifecycle);
        let router = build_router(self.state);

        lifecycle.set_ready();

        if let Some(tls) = &network.tls {
            serve_tls(listener, router, tls, shutdown).await?;
        } else {
            info!("Serving plain HTTP connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await?;
        }

        drain(&lifecycle, &network).await;
        Ok(())
    }
}

/// Serves TLS connections with `axum-server` and rustls, reusing the bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain(lifecycle: &Lifecycle, network: &NetworkConfig) {
    lifecycle.begin_drain();
    if lifecycle.wait_for_drain(network.drain_timeout).await {
        info!("All in-flight calls finished");
    } else {
        warn!(
            in_flight = lifecycle.in_flight_count(),
            "Drain timeout expired with calls still running"
        );
    }
}
