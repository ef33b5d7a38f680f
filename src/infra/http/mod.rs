pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use std::future::IntoFuture;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::ServerSettings;
use crate::infra::error::InfraError;

/// Bind the listener and serve `router` until a shutdown signal arrives.
///
/// In-flight requests get `server.graceful_shutdown` to finish; the server
/// stops waiting for them after that.
pub async fn serve(settings: &ServerSettings, router: Router) -> Result<(), InfraError> {
    let listener = TcpListener::bind(settings.addr).await?;
    info!(
        target = "bookapi::http",
        addr = %settings.addr,
        "listening"
    );

    let signalled = Arc::new(Notify::new());
    let trigger = signalled.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(target = "bookapi::http", "shutdown signal received");
            trigger.notify_one();
        })
        .into_future();

    let grace = settings.graceful_shutdown;
    let deadline = async move {
        signalled.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result?,
        () = deadline => {
            warn!(
                target = "bookapi::http",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
