use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use super::dispatcher::Dispatcher;
use crate::detect::Detection;
use crate::location::LocationCache;
use crate::roi::RoiRect;

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Everything needed to notify about one started episode.
#[derive(Clone, Debug)]
pub struct EpisodeJob {
    pub detection: Detection,
    pub roi: RoiRect,
    pub camera_id: String,
    pub detected_at: DateTime<Local>,
}

#[derive(Debug, Default)]
struct WorkerCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Delivery counters at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Background thread that resolves location and delivers notifications, so a
/// slow endpoint never stalls the frame loop.
///
/// The queue is bounded; a full queue drops the episode.
pub struct DeliveryWorker {
    sender: Option<SyncSender<EpisodeJob>>,
    join: Option<JoinHandle<()>>,
    counters: Arc<WorkerCounters>,
}

impl DeliveryWorker {
    pub fn spawn(dispatcher: Dispatcher, location: Arc<LocationCache>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<EpisodeJob>(capacity.max(1));
        let counters = Arc::new(WorkerCounters::default());
        let thread_counters = counters.clone();
        let join = std::thread::spawn(move || {
            for job in receiver {
                let coordinates = location.get(Instant::now());
                let notification = dispatcher.build_payload(
                    &job.detection,
                    job.roi,
                    &job.camera_id,
                    coordinates,
                    &job.detected_at,
                );
                if dispatcher.send(&notification) {
                    thread_counters.delivered.fetch_add(1, Ordering::Relaxed);
                } else {
                    thread_counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            log::debug!("delivery worker drained, exiting");
        });
        Self {
            sender: Some(sender),
            join: Some(join),
            counters,
        }
    }

    /// Queue a job without blocking. Returns `false` when it was dropped.
    pub fn submit(&self, job: EpisodeJob) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                log::warn!(
                    "delivery queue full; dropping {} episode on {}",
                    job.detection.label,
                    job.camera_id
                );
                false
            }
            Err(TrySendError::Disconnected(job)) => {
                log::error!(
                    "delivery worker gone; dropping {} episode on {}",
                    job.detection.label,
                    job.camera_id
                );
                false
            }
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, let queued jobs finish, and join the thread.
    pub fn stop(mut self) -> Result<WorkerStats> {
        self.sender.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("delivery worker thread panicked"))?;
        }
        Ok(self.stats())
    }
}

impl Drop for DeliveryWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;
    use crate::location::{Coordinates, GeoProvider};
    use crate::notify::transport::{NotificationTransport, TransportResponse};
    use crate::notify::{DeliveryError, IdGenerator};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedProvider;

    impl GeoProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn locate(&self) -> anyhow::Result<Coordinates> {
            Ok(Coordinates::new(1.5, 2.5))
        }
    }

    struct CollectingTransport {
        status: u16,
        posted: Arc<Mutex<Vec<Value>>>,
    }

    impl NotificationTransport for CollectingTransport {
        fn endpoint(&self) -> &str {
            "test://collect"
        }

        fn post(&self, payload: &Value) -> Result<TransportResponse, DeliveryError> {
            self.posted.lock().unwrap().push(payload.clone());
            Ok(TransportResponse {
                status: self.status,
                body: String::new(),
            })
        }
    }

    fn job(label: &str) -> EpisodeJob {
        EpisodeJob {
            detection: Detection::new(label, 0.9, BBox::new(1, 2, 3, 4)),
            roi: RoiRect {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
            },
            camera_id: "camera_1".into(),
            detected_at: Local::now(),
        }
    }

    fn worker(status: u16) -> (DeliveryWorker, Arc<Mutex<Vec<Value>>>) {
        let posted = Arc::new(Mutex::new(Vec::new()));
        let transport = CollectingTransport {
            status,
            posted: posted.clone(),
        };
        let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::default());
        let location = Arc::new(LocationCache::new(
            Box::new(FixedProvider),
            Duration::from_secs(60),
        ));
        (DeliveryWorker::spawn(dispatcher, location, 8), posted)
    }

    #[test]
    fn worker_delivers_queued_jobs_before_stopping() {
        let (worker, posted) = worker(200);
        assert!(worker.submit(job("person")));
        assert!(worker.submit(job("dog")));
        let stats = worker.stop().unwrap();
        assert_eq!(stats, WorkerStats { delivered: 2, failed: 0 });

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0]["location"]["coordinates"][0], 1.5);
        assert_eq!(posted[1]["detection"]["object"], "dog");
    }

    #[test]
    fn worker_counts_failures() {
        let (worker, _posted) = worker(500);
        assert!(worker.submit(job("person")));
        let stats = worker.stop().unwrap();
        assert_eq!(stats, WorkerStats { delivered: 0, failed: 1 });
    }
}
