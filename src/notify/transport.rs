use serde_json::Value;
use std::io;
use std::time::Duration;

use super::DeliveryError;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Status and body returned by the endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// External delivery seam.
///
/// One call is one network attempt. Implementations must bound the call with
/// a timeout and report it as `DeliveryError::Timeout`.
pub trait NotificationTransport: Send + Sync {
    /// Human-readable destination, used in logs.
    fn endpoint(&self) -> &str;

    /// Deliver one JSON payload. Any HTTP status is an `Ok` response; only
    /// failures to get a response are errors.
    fn post(&self, payload: &Value) -> Result<TransportResponse, DeliveryError>;
}

/// Bearer-token JSON POST over HTTP(S).
pub struct HttpTransport {
    url: String,
    api_key: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            timeout,
            agent,
        }
    }
}

impl NotificationTransport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn post(&self, payload: &Value) -> Result<TransportResponse, DeliveryError> {
        let body = serde_json::to_vec(payload)?;
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_bytes(&body);

        match result {
            Ok(response) => Ok(read_response(response)),
            Err(ureq::Error::Status(_, response)) => Ok(read_response(response)),
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    Err(DeliveryError::Timeout(self.timeout))
                } else {
                    Err(DeliveryError::Transport(transport.to_string()))
                }
            }
        }
    }
}

fn read_response(response: ureq::Response) -> TransportResponse {
    let status = response.status();
    let body = response.into_string().unwrap_or_default();
    TransportResponse {
        status,
        body: truncate(&body, MAX_ERROR_BODY_CHARS),
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
