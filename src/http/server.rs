//! Server handle construction and the serve/shutdown lifecycle.
//!
//! # Responsibilities
//! - Resolve configuration into a bound (optionally TLS-wrapped) listener
//! - Resolve the authentication plugin and compose the middleware chain
//! - Run the accept loop, one task per connection
//! - Convert cancellation into a bounded graceful drain
//! - Report the terminal outcome on the caller's channel exactly once
//!
//! # Lifecycle
//! ```text
//! Idle (constructed) → Serving (accept loop) → ShuttingDown (drain, bounded)
//!     → Terminated (outcome sent, handle consumed)
//! ```
//! Exactly one of two paths terminates a serve call: a fatal accept error, or
//! cancellation followed by the drain. Each path produces one outcome value,
//! and the single send site delivers it.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::auth::AuthRegistry;
use crate::config::{CorsConfig, HttpConfig};
use crate::error::ServerError;
use crate::http::middleware;
use crate::net::{listener, tls};

/// A constructed, bound server: the handle returned to the caller.
///
/// Construction binds the listener, loads TLS material, and resolves the
/// authentication plugin — all failures surface here, never at serve time.
/// The handle is consumed by [`HttpServer::serve`] and is not restartable.
pub struct HttpServer {
    name: String,
    listener: std::net::TcpListener,
    bound_addr: SocketAddr,
    tls_acceptor: Option<TlsAcceptor>,
    router: Router,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("name", &self.name)
            .field("listener", &self.listener)
            .field("bound_addr", &self.bound_addr)
            .field("tls_acceptor", &self.tls_acceptor.is_some())
            .field("router", &self.router)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl HttpServer {
    /// Build a server for `name` around the caller-supplied `router`.
    pub fn new(
        name: &str,
        router: Router,
        config: &HttpConfig,
        cors: &CorsConfig,
        registry: &AuthRegistry,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let authenticator = registry.resolve(&config.auth.auth_type, &config.auth.plugin)?;

        let tls_acceptor = if config.tls.enabled {
            Some(TlsAcceptor::from(tls::build_server_config(&config.tls)?))
        } else {
            None
        };

        let (listener, bound_addr) = listener::bind(&config.address, config.port)?;
        let router = middleware::compose(router, authenticator, cors, config.request_timeout());

        info!(
            server = name,
            address = %bound_addr,
            tls = config.tls.enabled,
            client_auth = config.tls.client_auth,
            "server constructed"
        );

        Ok(Self {
            name: name.to_string(),
            listener,
            bound_addr,
            tls_acceptor,
            router,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// The address the listener is bound to, including any OS-assigned port.
    pub fn addr(&self) -> SocketAddr {
        self.bound_addr
    }

    /// Serve until `shutdown` fires or the listener fails, then report the
    /// terminal outcome on `outcome`.
    ///
    /// The outcome channel receives exactly one value per call: `Ok(())` when
    /// a cancelled server drained cleanly within the shutdown timeout, and an
    /// error when the listener failed or the drain exceeded its bound. A
    /// dropped shutdown coordinator counts as cancellation.
    pub async fn serve(
        self,
        shutdown: broadcast::Receiver<()>,
        outcome: oneshot::Sender<Result<(), ServerError>>,
    ) {
        let name = self.name.clone();
        let result = self.run(shutdown).await;
        match &result {
            Ok(()) => info!(server = %name, "terminated cleanly"),
            Err(err) => error!(server = %name, error = %err, "terminated"),
        }
        if outcome.send(result).is_err() {
            debug!(server = %name, "terminal outcome dropped: receiver gone");
        }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::from_std(self.listener)?;
        let cancel = CancellationToken::new();
        let mut connections: JoinSet<()> = JoinSet::new();

        info!(server = %self.name, address = %self.bound_addr, "serving");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let service = TowerToHyperService::new(self.router.clone());
                            let tls = self.tls_acceptor.clone();
                            let conn_cancel = cancel.clone();
                            connections.spawn(async move {
                                handle_connection(stream, peer, tls, service, conn_cancel).await;
                            });
                        }
                        Err(err) => {
                            // Fatal: the serve loop has ended, there is nothing
                            // to drain. Dropping the JoinSet aborts in-flight
                            // connection tasks.
                            error!(server = %self.name, error = %err, "accept failed");
                            return Err(ServerError::Listener(err));
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!(
            server = %self.name,
            active_connections = connections.len(),
            timeout = ?self.shutdown_timeout,
            "shutting down"
        );
        drop(listener);
        cancel.cancel();

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                connections.abort_all();
                Err(ServerError::ShutdownTimeout {
                    timeout: self.shutdown_timeout,
                })
            }
        }
    }
}

/// Serve one accepted connection, performing the TLS handshake first when the
/// server is TLS-wrapped. Handshake failures reject that connection only.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    tls: Option<TlsAcceptor>,
    service: TowerToHyperService<Router>,
    cancel: CancellationToken,
) {
    match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => drive_connection(tls_stream, peer, service, cancel).await,
            Err(err) => debug!(%peer, error = %err, "TLS handshake failed"),
        },
        None => drive_connection(stream, peer, service, cancel).await,
    }
}

/// Drive one HTTP/1.1-or-2 connection to completion, honoring the drain
/// signal: on cancellation the connection stops accepting new requests and
/// finishes in-flight ones.
async fn drive_connection<I>(
    io: I,
    peer: SocketAddr,
    service: TowerToHyperService<Router>,
    cancel: CancellationToken,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(err) = result {
                debug!(%peer, error = %err, "connection closed with error");
            }
        }
        _ = cancel.cancelled() => {
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.as_mut().await {
                debug!(%peer, error = %err, "connection errored during drain");
            }
        }
    }
}
