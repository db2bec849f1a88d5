//! services/readerbot/src/adapters/log_publisher.rs
//!
//! A publisher that only writes the message to the log. Used for local runs
//! and whenever no platform credentials are configured.

use async_trait::async_trait;
use readerbot_core::{PortResult, PublishAck, Publisher};
use tracing::info;

#[derive(Clone, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, text: &str) -> PortResult<PublishAck> {
        info!("{}", text);
        Ok(PublishAck::default())
    }
}
