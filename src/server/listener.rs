use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep, timeout_at};
use tokio_rustls::TlsAcceptor;
use tracing::{Instrument, info, info_span, warn};

use crate::config::Config;
use crate::gemini::connection::Connection;
use crate::gemini::error::{ConnectionError, TransportError};
use crate::server::tls::load_tls_acceptor;

/// Pause after a failed `accept`, so a persistent error such as fd
/// exhaustion does not spin the loop.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Loads TLS material, binds the configured address and serves forever.
/// Failures here are fatal to the process.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let acceptor = load_tls_acceptor(&cfg.tls).context("Unable to load TLS certificate")?;
    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("Unable to listen on {}", cfg.bind_addr))?;

    run_with(listener, acceptor, cfg).await
}

/// Accept loop over an already bound listener. One task per connection,
/// no admission limit; a semaphore or worker pool belongs here, not in
/// the connection.
pub async fn run_with(listener: TcpListener, acceptor: TlsAcceptor, cfg: Arc<Config>) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "There was an error accepting the connection");
                sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        let deadline = Instant::now() + cfg.deadline();
        let acceptor = acceptor.clone();
        let cfg = Arc::clone(&cfg);

        tokio::spawn(
            async move {
                if let Err(e) = handle(socket, acceptor, cfg, deadline).await {
                    warn!(error = %e, "There was an error handling the connection");
                }
            }
            .instrument(info_span!("conn", %peer)),
        );
    }
}

async fn handle(
    socket: TcpStream,
    acceptor: TlsAcceptor,
    cfg: Arc<Config>,
    deadline: Instant,
) -> Result<(), ConnectionError> {
    if let Ok(local) = socket.local_addr() {
        info!(%local, "Handling connection");
    }

    let stream = match timeout_at(deadline, acceptor.accept(socket)).await {
        Ok(res) => res.map_err(TransportError::Io)?,
        Err(_) => return Err(TransportError::Timeout.into()),
    };

    Connection::new(stream, cfg, deadline).run().await
}
