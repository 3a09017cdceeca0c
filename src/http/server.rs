//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire middleware (request id, tracing, timeout)
//! - Dispatch the token path and everything under the prefix to the forwarder
//! - Swap in a rebuilt runtime when the config file changes
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id_of, UuidRequestId};
use crate::observability::metrics;
use crate::proxy::{BuildError, Forwarder};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request needs, rebuilt as a unit on config reload.
#[derive(Debug)]
pub struct ProxyRuntime {
    pub config: ProxyConfig,
    pub forwarder: Forwarder,
}

impl ProxyRuntime {
    pub fn build(config: ProxyConfig) -> Result<Self, BuildError> {
        let forwarder = Forwarder::from_config(&config)?;
        Ok(Self { config, forwarder })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ProxyRuntime>>,
}

/// HTTP server for the portal proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(ProxyRuntime::build(config)?)),
        };
        let router = Self::build_router(request_timeout, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires. New configurations arriving
    /// on `config_updates` replace the runtime for subsequent requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        {
            let runtime = self.state.inner.load();
            tracing::info!(
                address = %addr,
                prefix = %runtime.config.proxy.prefix,
                upstream = %runtime.config.upstream.base_url,
                "HTTP server starting"
            );
        }

        let inner = self.state.inner.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let upstream = config.upstream.base_url.clone();
                match ProxyRuntime::build(config) {
                    Ok(runtime) => {
                        inner.store(Arc::new(runtime));
                        tracing::info!(upstream = %upstream, "Proxy runtime reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reload failed, keeping current runtime");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Relays the token fragment or forwards the request under the prefix.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let runtime = state.inner.load_full();
    let request_id = request_id_of(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let result = if method == Method::GET && path == runtime.forwarder.token_path() {
        runtime.forwarder.relay_token(request.headers()).await
    } else {
        runtime.forwarder.forward(request).await
    };

    let response = match result {
        Ok(relayed) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = relayed.status.as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Relayed upstream response"
            );
            relayed.into_response()
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(request_id = %request_id, method = %method, path = %path, error = %e, "Upstream failure");
            } else {
                tracing::warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Request rejected");
            }
            metrics::record_error(e.tag());
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
