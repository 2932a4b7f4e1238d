//! Outbound notifications.
//!
//! - `payload`: the wire model and identifier generation
//! - `transport`: the external delivery seam and its HTTP implementation
//! - `dispatcher`: payload assembly plus one best-effort delivery attempt
//! - `worker`: optional background thread that delivers off the frame loop
//!
//! Delivery is at most one attempt per episode. A dropped notification is
//! logged and never retried.

pub mod dispatcher;
pub mod payload;
pub mod transport;
pub mod worker;

use std::time::Duration;

pub use dispatcher::{DeliveryReceipt, Dispatcher};
pub use payload::{
    format_timestamp, DetectionPayload, IdGenerator, LocationPayload, Notification,
    ALPHANUMERIC, DEFAULT_ID_LENGTH,
};
pub use transport::{
    HttpTransport, NotificationTransport, TransportResponse, DEFAULT_NOTIFY_TIMEOUT,
};
pub use worker::{DeliveryWorker, EpisodeJob, WorkerStats, DEFAULT_QUEUE_CAPACITY};

/// Why a delivery attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("endpoint returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}
