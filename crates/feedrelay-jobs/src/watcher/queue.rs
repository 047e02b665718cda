//! SQS delivery emitter

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use feedrelay_common::{FeedError, Result};
use tracing::debug;

use crate::core::DeliveryEmitter;

/// Emits notifications as plain-text SQS messages, one message per item
#[derive(Clone)]
pub struct SqsEmitter {
    client: Client,
    queue_url: String,
}

impl SqsEmitter {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl DeliveryEmitter for SqsEmitter {
    async fn emit(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message)
            .send()
            .await
            .map_err(|e| FeedError::queue(DisplayErrorContext(e)))?;

        debug!(message_id = ?response.message_id(), "Queued notification");
        Ok(())
    }
}
