/// TCP listener and per-connection request loop
use crate::config::DaemonConfig;
use crate::errors::{ServerError, ServerResult};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use swank_core::{Encoding, Evaluator, SwankCodec, SwankProtocol};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Accepts SLIME connections and serves each one with its own dispatcher.
///
/// Connections are independent: a slow evaluation delays only the
/// connection that asked for it. The evaluator is the one shared piece and
/// is internally synchronised.
pub struct SwankServer {
    listener: TcpListener,
    evaluator: Arc<dyn Evaluator>,
    encoding: Encoding,
    read_timeout: Option<Duration>,
}

impl SwankServer {
    /// Bind the configured address, advertise the chosen port in the port
    /// file if one is configured, and return the ready-to-run server.
    pub async fn bind(
        config: &DaemonConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> ServerResult<SwankServer> {
        config.validate()?;

        let listener = TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
        let local = listener.local_addr()?;
        info!("swank server listening on {local}");

        if let Some(path) = &config.server.port_file {
            write_port_file(path, local.port())?;
            info!("advertised port {} in {}", local.port(), path.display());
        }

        let read_timeout = match config.server.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(SwankServer {
            listener,
            evaluator,
            encoding: config.encoding(),
            read_timeout,
        })
    }

    /// Address the server actually listens on.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub async fn run(self) -> ServerResult<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!("client connected from {peer}");

            let evaluator = Arc::clone(&self.evaluator);
            let encoding = self.encoding;
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                match serve_connection(stream, evaluator, encoding, read_timeout).await {
                    Ok(()) => info!("client {peer} disconnected"),
                    Err(err) => warn!("connection from {peer} closed: {err}"),
                }
            });
        }
    }
}

/// One connection: push the indentation-update frame, then answer requests
/// until the peer goes away or a read times out. Dispatch runs on the
/// blocking pool because evaluation may take arbitrarily long.
async fn serve_connection(
    stream: TcpStream,
    evaluator: Arc<dyn Evaluator>,
    encoding: Encoding,
    read_timeout: Option<Duration>,
) -> ServerResult<()> {
    let local_addr = stream.local_addr().ok();

    let mut framed = Framed::new(stream, SwankCodec::new(encoding));
    let mut protocol = SwankProtocol::new(evaluator);
    if let Some(addr) = local_addr {
        protocol.set_local_addr(addr);
    }

    framed.send(SwankProtocol::indentation_update()).await?;

    loop {
        let frame = match read_timeout {
            Some(limit) => match timeout(limit, framed.next()).await {
                Ok(frame) => frame,
                Err(_) => {
                    info!("read timed out, closing connection");
                    return Ok(());
                }
            },
            None => framed.next().await,
        };

        let payload = match frame {
            None => return Ok(()),
            Some(payload) => payload?,
        };
        debug!("recv {payload:?}");

        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = protocol.dispatch(&payload);
            (protocol, outcome)
        })
        .await
        .map_err(|e| ServerError::Connection(format!("dispatch task failed: {e}")))?;
        protocol = returned;

        debug!("send {:?}", outcome.payload());
        framed.send(outcome.payload().to_string()).await?;

        if outcome.is_final() {
            return Ok(());
        }
    }
}

/// The port file is how a client discovers a kernel-assigned port: the
/// decimal port number in ASCII, nothing else.
fn write_port_file(path: &Path, port: u16) -> ServerResult<()> {
    std::fs::write(path, port.to_string())
        .map_err(|e| ServerError::Config(format!("failed to write port file: {e}")))
}
