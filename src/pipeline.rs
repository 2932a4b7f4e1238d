//! Per-frame orchestration.
//!
//! Frame -> ROI clip -> detector -> label filter -> episode detector ->
//! (on a rising edge) location lookup + notification.
//!
//! Every transient failure is absorbed here: a frame that cannot be analyzed
//! is skipped and the next one is processed normally.

use anyhow::{anyhow, Result};
use chrono::Local;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use crate::detect::{Detection, LabelFilter, SharedDetector};
use crate::episode::EpisodeDetector;
use crate::frame::Frame;
use crate::location::LocationCache;
use crate::notify::{DeliveryWorker, Dispatcher, EpisodeJob, WorkerStats};
use crate::roi::{RoiManager, RoiRect};

/// How started episodes are turned into notifications.
pub enum Delivery {
    /// Location lookup and delivery run on the frame loop.
    Inline(Dispatcher),
    /// Jobs are queued to a background worker.
    Background(DeliveryWorker),
}

impl Delivery {
    /// Stop the background worker, if any, after it drains its queue.
    pub fn shutdown(self) -> Result<Option<WorkerStats>> {
        match self {
            Delivery::Inline(_) => Ok(None),
            Delivery::Background(worker) => worker.stop().map(Some),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No ROI is set; the detector did not run and episode state was reset.
    NoRoi,
    /// The ROI lies outside this frame; handled like `NoRoi` for this frame
    /// only. The stored ROI is kept.
    EmptyClip,
    /// The detector failed on this frame; skipped, state untouched.
    DetectorFailed,
    RoiActive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Delivered { id: String },
    Failed { id: String, reason: String },
    Queued,
    Dropped,
}

/// One episode that started on this frame.
#[derive(Clone, Debug)]
pub struct StartedEpisode {
    /// Highest-confidence detection of the label, in frame coordinates.
    pub detection: Detection,
    pub outcome: EpisodeOutcome,
}

/// What happened to one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub sequence: u64,
    pub state: PipelineState,
    pub roi: Option<RoiRect>,
    /// Accepted detections in frame coordinates, for rendering.
    pub detections: Vec<Detection>,
    pub episodes: Vec<StartedEpisode>,
}

impl FrameReport {
    fn skipped(sequence: u64, state: PipelineState, roi: Option<RoiRect>) -> Self {
        Self {
            sequence,
            state,
            roi,
            detections: Vec::new(),
            episodes: Vec::new(),
        }
    }
}

pub struct FramePipeline {
    roi: Arc<RoiManager>,
    detector: SharedDetector,
    filter: LabelFilter,
    episodes: EpisodeDetector,
    location: Arc<LocationCache>,
    delivery: Delivery,
    camera_id: String,
}

impl FramePipeline {
    pub fn new(
        roi: Arc<RoiManager>,
        detector: SharedDetector,
        filter: LabelFilter,
        location: Arc<LocationCache>,
        delivery: Delivery,
        camera_id: impl Into<String>,
    ) -> Self {
        let episodes = EpisodeDetector::new(filter.labels().clone());
        Self {
            roi,
            detector,
            filter,
            episodes,
            location,
            delivery,
            camera_id: camera_id.into(),
        }
    }

    pub fn location(&self) -> &LocationCache {
        &self.location
    }

    /// Labels currently inside an open episode.
    pub fn open_episodes(&self) -> &BTreeSet<String> {
        self.episodes.last_labels()
    }

    pub fn process(&mut self, frame: &Frame) -> FrameReport {
        let sequence = frame.sequence;
        let Some(roi) = self.roi.current() else {
            self.episodes.reset();
            return FrameReport::skipped(sequence, PipelineState::NoRoi, None);
        };

        let Some(region) = frame.clip(roi) else {
            log::debug!(
                "frame {}: roi {} outside {}x{} frame, skipping",
                sequence,
                roi,
                frame.width,
                frame.height
            );
            self.episodes.reset();
            return FrameReport::skipped(sequence, PipelineState::EmptyClip, Some(roi));
        };
        let origin = region.rect();

        let raw = match self.detector.lock() {
            Ok(mut detector) => detector.detect(&region),
            Err(_) => Err(anyhow!("detector lock poisoned")),
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("frame {}: detector failed: {:#}", sequence, e);
                return FrameReport::skipped(sequence, PipelineState::DetectorFailed, Some(roi));
            }
        };

        let detections: Vec<Detection> = self
            .filter
            .apply(raw)
            .into_iter()
            .map(|mut detection| {
                detection.bbox = detection.bbox.offset(origin.x, origin.y);
                detection
            })
            .collect();
        let labels: BTreeSet<String> = detections.iter().map(|d| d.label.clone()).collect();
        let started = self.episodes.observe(labels);

        let mut episodes = Vec::with_capacity(started.len());
        for label in &started {
            let Some(best) = strongest(&detections, label) else {
                continue;
            };
            log::info!(
                "episode started on {}: {} conf={:.2} bbox={:?}",
                self.camera_id,
                best.label,
                best.confidence,
                best.bbox.to_array()
            );
            let outcome = self.notify(best.clone(), roi);
            episodes.push(StartedEpisode {
                detection: best.clone(),
                outcome,
            });
        }

        FrameReport {
            sequence,
            state: PipelineState::RoiActive,
            roi: Some(roi),
            detections,
            episodes,
        }
    }

    fn notify(&self, detection: Detection, roi: RoiRect) -> EpisodeOutcome {
        match &self.delivery {
            Delivery::Inline(dispatcher) => {
                let coordinates = self.location.get(Instant::now());
                let notification = dispatcher.build_payload(
                    &detection,
                    roi,
                    &self.camera_id,
                    coordinates,
                    &Local::now(),
                );
                match dispatcher.deliver(&notification) {
                    Ok(receipt) => EpisodeOutcome::Delivered { id: receipt.id },
                    Err(e) => EpisodeOutcome::Failed {
                        id: notification.id,
                        reason: e.to_string(),
                    },
                }
            }
            Delivery::Background(worker) => {
                let job = EpisodeJob {
                    detection,
                    roi,
                    camera_id: self.camera_id.clone(),
                    detected_at: Local::now(),
                };
                if worker.submit(job) {
                    EpisodeOutcome::Queued
                } else {
                    EpisodeOutcome::Dropped
                }
            }
        }
    }

    /// Tear down, stopping the background worker if one is running.
    pub fn shutdown(self) -> Result<Option<WorkerStats>> {
        self.delivery.shutdown()
    }
}

fn strongest<'a>(detections: &'a [Detection], label: &str) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|d| d.label == label)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
