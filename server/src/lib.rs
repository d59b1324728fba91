//! # streamgate-server
//!
//! The StreamGate gateway: HTTP routes for the schema registry, record
//! publishing and subscription management, plus a `/ws` endpoint that
//! receives filtered upstream events.
//!
//! [`GatewayServerHandle`] runs the router on a listener and stops it
//! gracefully on [`GatewayServerHandle::shutdown`].

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

pub use config::{Backend, Cli, GatewayConfig};
pub use error::{ApiError, ApiResult};
pub use pipeline::PublishPipeline;
pub use routes::router;
pub use state::AppState;

pub struct GatewayServerHandle {
    local_addr: SocketAddr,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<()>>,
}

impl GatewayServerHandle {
    /// Bind `listen` and start serving. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn spawn(listen: SocketAddr, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(listen)
            .await
            .with_context(|| format!("binding gateway listener on {listen}"))?;
        let local_addr = listener.local_addr().context("reading bound address")?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let app = router(state.clone());
        let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let join = tokio::spawn(async move {
            server
                .await
                .map_err(|err| anyhow::anyhow!("gateway transport failed: {err}"))
        });
        info!(addr = %local_addr, "gateway listening");

        Ok(Self {
            local_addr,
            state,
            shutdown: Some(shutdown_tx),
            join,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Cancel every upstream subscription, then stop accepting requests and
    /// wait for in-flight ones.
    pub async fn shutdown(mut self) -> Result<()> {
        self.state.subscriptions.cancel_all();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.join.await.context("awaiting gateway shutdown")?
    }
}
