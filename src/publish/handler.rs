//! The publish pipeline: decode → id → push → metrics.

use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use thiserror::Error;

use crate::idgen::{GenerationError, IdGenerator};
use crate::observability::{recorder, Metrics};
use crate::publish::request::{DecodeError, PublishRequest};
use crate::queue::{QueueStore, StoreError, WatchedQueueSet};

/// Why a publish attempt failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("id generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("push to channel {channel} failed: {source}")]
    Store {
        channel: String,
        #[source]
        source: StoreError,
    },
}

impl PublishError {
    fn label(&self) -> &'static str {
        match self {
            PublishError::Decode(_) => "decode_error",
            PublishError::Generation(_) => "generation_error",
            PublishError::Store { .. } => "store_error",
        }
    }
}

/// Result of one publish call as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Ok,
    InternalError,
}

/// A successfully pushed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub uid: u64,
    pub channel: String,
    pub queue_length: i64,
}

pub struct Publisher {
    ids: Arc<IdGenerator>,
    store: Arc<dyn QueueStore>,
    metrics: Arc<Metrics>,
    /// Present only when queue watching is enabled.
    watched: Option<Arc<WatchedQueueSet>>,
}

impl Publisher {
    pub fn new(ids: Arc<IdGenerator>, store: Arc<dyn QueueStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            ids,
            store,
            metrics,
            watched: None,
        }
    }

    /// Record every published channel into `watched`.
    pub fn with_watched(mut self, watched: Arc<WatchedQueueSet>) -> Self {
        self.watched = Some(watched);
        self
    }

    /// Run the pipeline and collapse the result into an outcome.
    pub async fn handle(&self, raw: &[u8]) -> PublishOutcome {
        match self.publish(raw).await {
            Ok(_) => PublishOutcome::Ok,
            Err(_) => PublishOutcome::InternalError,
        }
    }

    /// Run the pipeline for one request body.
    ///
    /// Every call counts as one put attempt; every failure counts as one error.
    pub async fn publish(&self, raw: &[u8]) -> Result<Published, PublishError> {
        self.metrics.incr_put();

        let result = self.try_publish(raw).await;
        self.record(&result, raw.len());
        result
    }

    /// Count a request whose body could not be read at all.
    pub fn reject(&self, error: DecodeError) -> PublishOutcome {
        self.metrics.incr_put();
        self.record(&Err(error.into()), 0);
        PublishOutcome::InternalError
    }

    fn record(&self, result: &Result<Published, PublishError>, payload_size: usize) {
        match result {
            Ok(published) => {
                self.metrics.incr_success();
                recorder::record_publish("ok");
                tracing::info!(
                    uid = published.uid,
                    channel = %published.channel,
                    payload_size,
                    "Published message successfully"
                );
            }
            Err(e) => {
                self.metrics.incr_error();
                recorder::record_publish(e.label());
                match e {
                    PublishError::Decode(_) => {
                        tracing::error!(error = %e, "Error while JSON decoding the API request")
                    }
                    PublishError::Generation(_) => {
                        tracing::error!(error = %e, "Id generation failed")
                    }
                    PublishError::Store { .. } => {
                        tracing::error!(error = %e, "Couldn't publish message")
                    }
                }
            }
        }
    }

    async fn try_publish(&self, raw: &[u8]) -> Result<Published, PublishError> {
        let request = PublishRequest::decode(raw)?;
        let uid = self.ids.next_id().await?;
        let payload = request.payload_text();

        tracing::info!(
            uid,
            channel = %request.channel,
            payload_size = payload.len(),
            "Publishing message"
        );
        tracing::debug!(uid, payload = %payload, "Message payload");

        let started = Instant::now();
        let queue_length = self
            .store
            .push(&request.channel, payload)
            .await
            .map_err(|source| PublishError::Store {
                channel: request.channel.clone(),
                source,
            })?;
        recorder::record_push_duration(started.elapsed());

        if let Some(watched) = &self.watched {
            if watched.touch(&request.channel, Utc::now()) {
                tracing::debug!(channel = %request.channel, "Channel added to LLEN watcher");
            }
        }

        Ok(Published {
            uid,
            channel: request.channel,
            queue_length,
        })
    }
}
