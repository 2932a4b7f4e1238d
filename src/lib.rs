//! ROI Watch
//!
//! Watches a video stream, restricts analysis to a user-selected region of
//! interest, and sends exactly one notification each time a target object
//! class appears inside that region.
//!
//! # Architecture
//!
//! One frame loop drives everything:
//!
//! 1. **ROI**: the input surface edits the region through `RoiManager`; the
//!    loop takes one snapshot per frame.
//! 2. **Detection**: the frame is clipped to the ROI and handed to an
//!    `ObjectDetector`; results are gated by `LabelFilter`.
//! 3. **Episodes**: `EpisodeDetector` turns per-frame label sets into rising
//!    edges, so an object that stays in view notifies once.
//! 4. **Notification**: each started episode is enriched with a cached,
//!    best-effort location and delivered once over HTTP.
//!
//! # Module Structure
//!
//! - `roi`: ROI lifecycle and drag validation
//! - `frame`: RGB frames and clipped `FrameRegion` views
//! - `detect`: detector trait, label filter, backend registry
//! - `episode`: rising-edge filter
//! - `location`: TTL location cache and geolocation providers
//! - `notify`: payload, transport, dispatcher, background worker
//! - `pipeline`: per-frame orchestration
//! - `ingest`: frame sources
//! - `control`: text commands for the ROI
//! - `config`: file + environment configuration

pub mod config;
pub mod control;
pub mod detect;
pub mod episode;
pub mod frame;
pub mod ingest;
pub mod location;
pub mod notify;
pub mod pipeline;
pub mod roi;

pub use config::{AppConfig, CameraSettings};
pub use control::{ControlFlow, RoiCommand};
pub use detect::{BBox, BackendRegistry, Detection, LabelFilter, ObjectDetector, SharedDetector};
pub use episode::EpisodeDetector;
pub use frame::{Frame, FrameRegion};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use location::{Coordinates, GeoProvider, LocationCache};
pub use notify::{DeliveryError, Dispatcher, HttpTransport, Notification, NotificationTransport};
pub use pipeline::{Delivery, EpisodeOutcome, FramePipeline, FrameReport, PipelineState};
pub use roi::{Point, RoiManager, RoiRect};
