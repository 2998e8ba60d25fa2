use crate::pricing;
use crate::state::AppState;
use crate::wire::{self, REQUEST_LEN};
use portable_atomic::Ordering;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// One task per connection. The task exclusively owns the socket and its
/// buffers for its lifetime. Requests on a connection are strictly
/// sequential: decode → compute → persist → write, and the next read
/// never starts before the current response has been written.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<AppState>,
}

impl Session {
    pub fn new(stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) -> Self {
        Self {
            stream,
            peer,
            state,
        }
    }

    pub async fn run(mut self) {
        self.state
            .counters
            .sessions_opened
            .fetch_add(1, Ordering::Relaxed);
        tracing::debug!(peer = %self.peer, "session opened");

        let mut frame = [0u8; REQUEST_LEN];
        loop {
            if let Err(e) = self.read_request(&mut frame).await {
                match e.kind() {
                    std::io::ErrorKind::UnexpectedEof => {
                        tracing::debug!(peer = %self.peer, "connection closed by peer");
                    }
                    std::io::ErrorKind::TimedOut => {
                        tracing::info!(peer = %self.peer, "idle session timed out");
                    }
                    _ => {
                        self.state
                            .counters
                            .read_failures
                            .fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(peer = %self.peer, error = %e, "request read failed");
                    }
                }
                break;
            }

            // read_request delivered a full frame, so the codec's length
            // check cannot trip here; it guards direct callers.
            let request = match wire::decode_request(&frame) {
                Ok(r) => r,
                Err(e) => {
                    self.state
                        .counters
                        .read_failures
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(peer = %self.peer, error = %e, "request decode failed");
                    break;
                }
            };

            // Out-of-domain inputs produce a legitimate-looking zero
            // quote; log them so operators can tell the two apart.
            if !request.in_domain() {
                tracing::warn!(
                    peer = %self.peer,
                    spot = request.spot,
                    strike = request.strike,
                    volatility = request.volatility,
                    maturity = request.maturity,
                    "out-of-domain request answered with zero quote"
                );
            }

            let quote = pricing::evaluate(&request);

            // Best-effort persistence, resolved before the response goes
            // out so the outcome can be logged; failure never alters the
            // response.
            match self.state.store.record(request, quote).await {
                Ok(input_id) => {
                    tracing::debug!(
                        peer = %self.peer,
                        input_id = %input_id,
                        method = %request.method(),
                        price = quote.price,
                        "quote recorded"
                    );
                }
                Err(e) => {
                    self.state
                        .counters
                        .persist_failures
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(peer = %self.peer, error = %e, "quote persistence failed");
                }
            }

            let response = wire::encode_response(&quote);
            if let Err(e) = self.stream.write_all(&response).await {
                tracing::warn!(peer = %self.peer, error = %e, "response write failed");
                break;
            }

            self.state
                .counters
                .requests_served
                .fetch_add(1, Ordering::Relaxed);
        }

        self.state
            .counters
            .sessions_closed
            .fetch_add(1, Ordering::Relaxed);
        tracing::debug!(peer = %self.peer, "session closed");
    }

    /// Suspend until a full request frame is available. With an idle
    /// timeout configured, a silent peer is cut off instead of holding
    /// the session forever (deviation from the legacy block-forever
    /// behavior; IDLE_TIMEOUT_SECS=0 restores it).
    async fn read_request(&mut self, frame: &mut [u8; REQUEST_LEN]) -> std::io::Result<()> {
        let idle_secs = self.state.cfg.idle_timeout_secs;
        if idle_secs == 0 {
            self.stream.read_exact(frame).await.map(|_| ())
        } else {
            match tokio::time::timeout(
                Duration::from_secs(idle_secs),
                self.stream.read_exact(frame),
            )
            .await
            {
                Ok(result) => result.map(|_| ()),
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "no request received within idle timeout",
                )),
            }
        }
    }
}
