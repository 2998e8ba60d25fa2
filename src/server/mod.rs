pub mod session;

use crate::state::AppState;
use session::Session;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Accept loop. One spawned task per connection; sessions are fully
/// independent, so a failed accept or a bad connection never affects the
/// others.
pub async fn run_listener(listener: TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    Session::new(stream, peer, state).run().await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}
