//! Listener lifecycle.
//!
//! Every proxied endpoint and the optional self-metrics endpoint run as
//! independent axum servers in one runtime. All sockets are bound before any
//! server starts, so a bind failure aborts startup without partial service.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use promsieve_core::error::{Result, SieveError};

use crate::app_state::AppState;
use crate::reduce::spawn_sweeper;
use crate::router::{build_ops_router, build_proxy_router};

async fn bind(name: &str, addr: std::net::SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| SieveError::Internal(format!("bind {addr} for {name} failed: {e}")))
}

/// Run all listeners until `shutdown` resolves or a server fails.
pub async fn serve<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let mut bound: Vec<(String, TcpListener, Router)> = Vec::new();
    for ep in state.endpoints() {
        let listener = bind(ep.name(), ep.listen()).await?;
        bound.push((ep.name().to_string(), listener, build_proxy_router(ep.clone())));
    }
    if let Some((addr, path)) = state.metrics_listen() {
        let listener = bind("self-metrics", *addr).await?;
        bound.push((
            format!("{addr}{path} (self-metrics)"),
            listener,
            build_ops_router(state.clone(), path),
        ));
    }

    let sweepers: Vec<_> = state
        .endpoints()
        .iter()
        .map(|ep| {
            spawn_sweeper(
                ep.name().to_string(),
                ep.store(),
                state.staleness(),
                state.sweep_interval(),
            )
        })
        .collect();

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut servers = JoinSet::new();
    for (name, listener, app) in bound {
        let mut stop = stop_rx.clone();
        tracing::info!(listener = %name, "listening");
        servers.spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.changed().await;
                })
                .await;
            (name, res)
        });
    }

    let mut outcome = Ok(());
    tokio::select! {
        _ = shutdown => {
            tracing::info!("shutdown requested");
        }
        Some(joined) = servers.join_next() => {
            outcome = match joined {
                Ok((name, Ok(()))) => Err(SieveError::Internal(format!("listener {name} stopped unexpectedly"))),
                Ok((name, Err(e))) => Err(SieveError::Internal(format!("listener {name} failed: {e}"))),
                Err(e) => Err(SieveError::Internal(format!("listener task failed: {e}"))),
            };
        }
    }

    let _ = stop_tx.send(true);
    while let Some(joined) = servers.join_next().await {
        if let Ok((name, Err(e))) = joined {
            tracing::warn!(listener = %name, error = %e, "listener exited with error during shutdown");
        }
    }
    for s in sweepers {
        s.abort();
    }
    tracing::info!("all listeners stopped");
    outcome
}
