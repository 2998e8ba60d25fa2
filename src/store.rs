use crate::db::QuoteRow;
use crate::errors::{PricerError, PricerResult};
use crate::pricing::{QuoteRequest, QuoteResult};
use tokio::sync::{mpsc, oneshot};

/// Commands for the quote writer task (bounded channel).
#[derive(Debug)]
pub enum DbCommand {
    RecordQuote {
        request: QuoteRequest,
        quote: QuoteResult,
        reply: oneshot::Sender<PricerResult<String>>,
    },
    RecentQuotes {
        limit: usize,
        reply: oneshot::Sender<PricerResult<Vec<QuoteRow>>>,
    },
}

/// Session-facing handle to the persistence layer. Cloned per session;
/// all SQL still runs on the single writer task behind the channel.
#[derive(Clone)]
pub struct QuoteStore {
    tx: mpsc::Sender<DbCommand>,
}

impl QuoteStore {
    pub fn new(tx: mpsc::Sender<DbCommand>) -> Self {
        Self { tx }
    }

    /// Record one computed quote and return the input row's id. The
    /// caller awaits the writer's verdict so it can log the outcome
    /// before writing the response; failure here must never change the
    /// response itself.
    pub async fn record(
        &self,
        request: QuoteRequest,
        quote: QuoteResult,
    ) -> PricerResult<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DbCommand::RecordQuote {
                request,
                quote,
                reply,
            })
            .await
            .map_err(|_| PricerError::ChannelClosed("quote writer".into()))?;
        rx.await
            .map_err(|_| PricerError::ChannelClosed("quote writer reply".into()))?
    }

    pub async fn recent(&self, limit: usize) -> PricerResult<Vec<QuoteRow>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DbCommand::RecentQuotes { limit, reply })
            .await
            .map_err(|_| PricerError::ChannelClosed("quote writer".into()))?;
        rx.await
            .map_err(|_| PricerError::ChannelClosed("quote writer reply".into()))?
    }
}
