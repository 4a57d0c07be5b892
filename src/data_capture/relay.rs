//! Single-session capture relay.
//!
//! A [`CaptureRelay`] accepts exactly one inbound connection, opens exactly
//! one outbound connection to the target and copies bytes between them until
//! either side closes, a leg fails, or the shutdown future resolves. There is
//! no reconnection and no retry.
//!
//! The loop is single-threaded: one `select!` waits for either socket to be
//! readable, for shutdown, or for the poll interval to elapse. After a read
//! completes, the bytes are written to the opposite socket and then recorded
//! before the loop waits again, so the chunk index follows real forwarding
//! order across both directions.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use log::{debug, error, info, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::configuration::types::{Endpoint, RelayConfig};
use crate::error_handling::types::CaptureError;
use crate::storage::types::SessionSummary;

use super::recorder::SessionRecorder;
use super::types::{CloseReason, Direction, RelayState};

pub struct CaptureRelay {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    target: Endpoint,
    config: RelayConfig,
    state: RelayState,
}

impl CaptureRelay {
    /// Binds the listen address. The relay starts in `Listening`.
    pub async fn bind(
        listen: &Endpoint,
        target: Endpoint,
        config: RelayConfig,
    ) -> Result<Self, CaptureError> {
        let listener = TcpListener::bind((listen.host.as_str(), listen.port))
            .await
            .map_err(CaptureError::Bind)?;
        let local_addr = listener.local_addr().map_err(CaptureError::Bind)?;
        info!("listening on {}", local_addr);
        info!("forwarding to {}", target);
        Ok(Self {
            listener: Some(listener),
            local_addr,
            target,
            config,
            state: RelayState::Listening,
        })
    }

    /// Address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Runs the session to completion and writes its summary.
    ///
    /// Returns the summary when the session ends by EOF on either side or by
    /// `shutdown`. Transport and persistence faults are returned as errors
    /// after the summary has been written with status `error`.
    pub async fn run<F>(
        &mut self,
        mut recorder: SessionRecorder,
        shutdown: F,
    ) -> Result<SessionSummary, CaptureError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let outcome = self.drive(&mut recorder, shutdown.as_mut()).await;

        let (reason, failure) = match outcome {
            Ok(reason) => (reason, None),
            Err(e) => {
                error!("[{}] capture failed: {}", recorder.session_id(), e);
                (CloseReason::Error, Some(e))
            }
        };
        self.transition(RelayState::Closed(reason));

        let summary = recorder.finalize(reason, failure.as_ref().map(|e| e.to_string()));
        match (failure, summary) {
            (Some(e), _) => Err(e),
            (None, Ok(summary)) => Ok(summary),
            (None, Err(e)) => Err(CaptureError::StorageError(e)),
        }
    }

    async fn drive<F>(
        &mut self,
        recorder: &mut SessionRecorder,
        mut shutdown: Pin<&mut F>,
    ) -> Result<CloseReason, CaptureError>
    where
        F: Future<Output = ()>,
    {
        let Some(listener) = self.listener.take() else {
            return Err(CaptureError::Accept(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "relay already ran its single session",
            )));
        };

        info!("[{}] waiting for one client connection...", recorder.session_id());
        let (client, peer) = tokio::select! {
            accepted = listener.accept() => accepted.map_err(CaptureError::Accept)?,
            _ = &mut shutdown => {
                info!("[{}] interrupted while listening", recorder.session_id());
                return Ok(CloseReason::Interrupted);
            }
        };
        info!("[{}] client connected: {}", recorder.session_id(), peer);
        // one session per relay: stop accepting as soon as the client is in
        drop(listener);

        let connect = TcpStream::connect((self.target.host.as_str(), self.target.port));
        let server = tokio::select! {
            connected = tokio::time::timeout(self.config.connect_timeout(), connect) => match connected {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(CaptureError::Connect(e)),
                Err(_) => return Err(CaptureError::ConnectTimeout { target: self.target.to_string() }),
            },
            _ = &mut shutdown => {
                info!("[{}] interrupted while connecting to target", recorder.session_id());
                return Ok(CloseReason::Interrupted);
            }
        };
        info!("[{}] target connected: {}", recorder.session_id(), self.target);
        self.transition(RelayState::Connected);

        self.relay(client, server, recorder, shutdown).await
    }

    async fn relay<F>(
        &mut self,
        mut client: TcpStream,
        mut server: TcpStream,
        recorder: &mut SessionRecorder,
        mut shutdown: Pin<&mut F>,
    ) -> Result<CloseReason, CaptureError>
    where
        F: Future<Output = ()>,
    {
        self.transition(RelayState::Relaying);
        let poll_interval = self.config.poll_interval();
        let mut client_buf = vec![0u8; self.config.buffer_size];
        let mut server_buf = vec![0u8; self.config.buffer_size];

        loop {
            // Both reads are cancel safe: the one that loses the race has not consumed any bytes.
            let (direction, read) = tokio::select! {
                _ = &mut shutdown => {
                    info!("[{}] interrupted", recorder.session_id());
                    return Ok(CloseReason::Interrupted);
                }
                read = client.read(&mut client_buf) => (Direction::ClientToServer, read),
                read = server.read(&mut server_buf) => (Direction::ServerToClient, read),
                _ = tokio::time::sleep(poll_interval) => {
                    trace!("[{}] poll timeout, no readable socket", recorder.session_id());
                    continue;
                }
            };

            let n = read.map_err(|source| CaptureError::TcpStreamError { direction, source })?;
            if n == 0 {
                debug!("[{}] {} EOF", recorder.session_id(), direction);
                return Ok(direction.eof_reason());
            }

            let (payload, dest) = match direction {
                Direction::ClientToServer => (&client_buf[..n], &mut server),
                Direction::ServerToClient => (&server_buf[..n], &mut client),
            };
            dest.write_all(payload)
                .await
                .map_err(|source| CaptureError::TcpStreamError { direction, source })?;
            recorder.record_chunk(direction, payload)?;
        }
    }

    fn transition(&mut self, next: RelayState) {
        debug!("relay state {} -> {}", self.state, next);
        self.state = next;
    }
}
