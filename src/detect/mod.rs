mod backend;
pub mod backends;
mod filter;
mod registry;
mod result;

pub use backend::ObjectDetector;
pub use backends::StubDetector;
pub use filter::{LabelFilter, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_LABEL};
pub use registry::{BackendRegistry, SharedDetector};
pub use result::{BBox, Detection};
