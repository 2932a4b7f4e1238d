use chrono::{DateTime, TimeZone};

use super::payload::{IdGenerator, Notification};
use super::transport::NotificationTransport;
use super::DeliveryError;
use crate::detect::Detection;
use crate::location::Coordinates;
use crate::roi::RoiRect;

/// Proof of a successful delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
    pub status: u16,
}

/// Builds notifications and hands them to the transport, one attempt each.
pub struct Dispatcher {
    transport: Box<dyn NotificationTransport>,
    ids: IdGenerator,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn NotificationTransport>, ids: IdGenerator) -> Self {
        Self { transport, ids }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Assemble a notification with a fresh id and a millisecond timestamp.
    pub fn build_payload<Tz: TimeZone>(
        &self,
        detection: &Detection,
        roi: RoiRect,
        camera_id: &str,
        location: Option<Coordinates>,
        now: &DateTime<Tz>,
    ) -> Notification
    where
        Tz::Offset: std::fmt::Display,
    {
        Notification::build(
            self.ids.generate(),
            detection,
            roi,
            camera_id,
            location,
            now,
        )
    }

    /// Serialize and deliver once. Failures are logged and returned, never retried.
    pub fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt, DeliveryError> {
        let outcome = serde_json::to_value(notification)
            .map_err(DeliveryError::from)
            .and_then(|payload| self.transport.post(&payload))
            .and_then(|response| {
                if response.is_success() {
                    Ok(DeliveryReceipt {
                        id: notification.id.clone(),
                        status: response.status,
                    })
                } else {
                    Err(DeliveryError::Rejected {
                        status: response.status,
                        body: response.body,
                    })
                }
            });

        match &outcome {
            Ok(receipt) => log::info!(
                "notification {} delivered to {} (status {}): {} conf={:.2} bbox={:?} coords={:?}",
                receipt.id,
                self.endpoint(),
                receipt.status,
                notification.detection.object,
                notification.detection.confidence,
                notification.detection.bbox,
                notification.location.coordinates
            ),
            Err(DeliveryError::Rejected { status, body }) => log::error!(
                "notification {} rejected by {}: status {}, body: {}",
                notification.id,
                self.endpoint(),
                status,
                body
            ),
            Err(e) => log::error!(
                "notification {} to {} failed: {}",
                notification.id,
                self.endpoint(),
                e
            ),
        }
        outcome
    }

    /// `true` only when the endpoint accepted the notification.
    pub fn send(&self, notification: &Notification) -> bool {
        self.deliver(notification).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;
    use crate::notify::transport::TransportResponse;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone)]
    enum Reply {
        Status(u16, &'static str),
        Timeout,
        Refused,
    }

    #[derive(Clone)]
    struct RecordingTransport {
        reply: Reply,
        posted: Arc<Mutex<Vec<Value>>>,
    }

    impl RecordingTransport {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                posted: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl NotificationTransport for RecordingTransport {
        fn endpoint(&self) -> &str {
            "test://notifications"
        }

        fn post(&self, payload: &Value) -> Result<TransportResponse, DeliveryError> {
            self.posted.lock().unwrap().push(payload.clone());
            match &self.reply {
                Reply::Status(status, body) => Ok(TransportResponse {
                    status: *status,
                    body: body.to_string(),
                }),
                Reply::Timeout => Err(DeliveryError::Timeout(Duration::from_secs(5))),
                Reply::Refused => Err(DeliveryError::Transport("connection refused".into())),
            }
        }
    }

    fn notification(dispatcher: &Dispatcher) -> Notification {
        let detection = Detection::new("person", 0.85, BBox::new(100, 150, 200, 250));
        let roi = RoiRect {
            x: 50,
            y: 50,
            width: 300,
            height: 300,
        };
        dispatcher.build_payload(
            &detection,
            roi,
            "camera_1",
            Some(Coordinates::new(40.7128, -74.006)),
            &chrono::Local::now(),
        )
    }

    #[test]
    fn build_payload_assigns_fresh_ids() {
        let transport = RecordingTransport::new(Reply::Status(200, ""));
        let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
        let a = notification(&dispatcher);
        let b = notification(&dispatcher);
        assert_eq!(a.id.len(), 16);
        assert_ne!(a.id, b.id);
        assert_eq!(a.location.coordinates, Some([40.7128, -74.006]));
        assert_eq!(a.location.roi, [50, 50, 300, 300]);
    }

    #[test]
    fn send_posts_payload_once() {
        let transport = RecordingTransport::new(Reply::Status(200, "ok"));
        let posted = transport.posted.clone();
        let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
        let n = notification(&dispatcher);

        let receipt = dispatcher.deliver(&n).unwrap();
        assert_eq!(receipt.id, n.id);
        assert_eq!(receipt.status, 200);

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["id"], Value::String(n.id.clone()));
        assert_eq!(posted[0]["detection"]["object"], "person");
    }

    #[test]
    fn failures_return_false_without_retry() {
        for reply in [
            Reply::Status(500, "boom"),
            Reply::Status(401, "bad token"),
            Reply::Timeout,
            Reply::Refused,
        ] {
            let transport = RecordingTransport::new(reply);
            let posted = transport.posted.clone();
            let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
            let n = notification(&dispatcher);
            assert!(!dispatcher.send(&n));
            assert_eq!(posted.lock().unwrap().len(), 1);
        }
    }

    #[test]
    fn rejection_carries_status_and_body() {
        let transport = RecordingTransport::new(Reply::Status(503, "maintenance"));
        let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
        let n = notification(&dispatcher);
        match dispatcher.deliver(&n) {
            Err(DeliveryError::Rejected { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
