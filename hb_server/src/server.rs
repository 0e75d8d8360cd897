//! Process wiring: one table actor, two listeners.

use house_blackjack::{TableActor, TableHandle};
use std::{future::Future, io, net::SocketAddr};
use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

use crate::{
    api::{self, AppState},
    config::ServerConfig,
    tcp,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// A bound but not yet serving blackjack server.
#[derive(Debug)]
pub struct BlackjackServer {
    config: ServerConfig,
    table: TableHandle,
    actor: JoinHandle<()>,
    tcp_listener: TcpListener,
    ws_listener: TcpListener,
    tcp_addr: SocketAddr,
    ws_addr: SocketAddr,
}

impl BlackjackServer {
    /// Bind both listeners and start the table actor.
    ///
    /// A bind failure is the only startup error.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let tcp_listener = bind(config.tcp_bind).await?;
        let ws_listener = bind(config.ws_bind).await?;
        let tcp_addr = tcp_listener.local_addr().map_err(ServerError::LocalAddr)?;
        let ws_addr = ws_listener.local_addr().map_err(ServerError::LocalAddr)?;

        let (actor, table) = TableActor::new(config.table.clone());
        let actor = tokio::spawn(actor.run());

        Ok(Self {
            config,
            table,
            actor,
            tcp_listener,
            ws_listener,
            tcp_addr,
            ws_addr,
        })
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn table(&self) -> TableHandle {
        self.table.clone()
    }

    /// Serve both transports until `shutdown` resolves, then say goodbye to
    /// every session and stop.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            table,
            actor,
            tcp_listener,
            ws_listener,
            tcp_addr,
            ws_addr,
        } = self;

        info!("Blackjack server listening: tcp://{tcp_addr} ws://{ws_addr}");

        let tcp_task = tokio::spawn(tcp::serve(tcp_listener, table.clone(), config.table.clone()));

        let app = api::create_router(AppState::new(table.clone(), config.table));
        let ws_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(ws_listener, app).await {
                error!("WebSocket listener failed: {err}");
            }
        });

        shutdown.await;
        info!("Shutting down");

        if table.shutdown().await.is_err() {
            error!("Table actor was already stopped");
        }
        tcp_task.abort();
        ws_task.abort();
        let _ = actor.await;
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}
