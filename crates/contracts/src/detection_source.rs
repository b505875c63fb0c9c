//! DetectionSource trait - detector adapter abstraction
//!
//! The write side of the detection store. Camera and microphone adapters live
//! outside this workspace; they only need to implement this trait to be driven
//! by the ingestion registry.

use std::sync::Arc;

use crate::{DetectionReport, SensorKind};

/// Detection report callback.
///
/// Sources call it from their own thread at their own cadence.
pub type DetectionCallback = Arc<dyn Fn(DetectionReport) + Send + Sync>;

/// Detection source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn DetectionSource> = open_camera_adapter();
/// source.listen(Arc::new(move |report| store.apply(&report)));
/// // ...
/// source.stop();
/// ```
pub trait DetectionSource: Send + Sync {
    /// Source identifier (used for logging/metrics)
    fn source_id(&self) -> &str;

    /// Kind of detector behind this source
    fn sensor_kind(&self) -> SensorKind;

    /// Start producing reports into `callback`.
    ///
    /// Repeated calls while already listening are no-ops.
    fn listen(&self, callback: DetectionCallback);

    /// Stop producing reports.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
