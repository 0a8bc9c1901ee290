//! Handling of pictures delivered by the camera.

use super::pipeline::PicturePipeline;
use super::queue::CaptureRequestQueue;
use super::request::{CaptureId, CaptureRequest};
use crate::errors::CaptureError;
use crate::events::{CameraEvent, EventEmitter};
use bytes::Bytes;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Pairs each delivered picture with the oldest pending request and runs
/// the decode/save pipeline for it off the camera thread.
pub struct CaptureCompletion {
    queue: Arc<CaptureRequestQueue>,
    pipeline: Arc<dyn PicturePipeline>,
    emitter: Arc<dyn EventEmitter>,
    handle: Handle,
}

impl CaptureCompletion {
    pub fn new(
        queue: Arc<CaptureRequestQueue>,
        pipeline: Arc<dyn PicturePipeline>,
        emitter: Arc<dyn EventEmitter>,
        handle: Handle,
    ) -> Self {
        Self {
            queue,
            pipeline,
            emitter,
            handle,
        }
    }

    pub fn queue(&self) -> &Arc<CaptureRequestQueue> {
        &self.queue
    }

    /// Resolve the oldest request with this picture.
    ///
    /// Fast-mode requests are resolved with no payload before the pipeline
    /// starts; the pipeline still runs for its file output.
    pub fn on_picture_ready(&self, raw: Bytes, device_orientation: i32) -> Result<CaptureId, CaptureError> {
        let CaptureRequest {
            id,
            options,
            destination,
            resolver,
        } = self.queue.pop_oldest()?;

        self.emitter.emit(CameraEvent::PictureTaken);

        let resolver = if options.fast_mode {
            resolver.resolve(Ok(None));
            None
        } else {
            Some(resolver)
        };

        let pipeline = Arc::clone(&self.pipeline);
        let emitter = Arc::clone(&self.emitter);
        self.handle.spawn_blocking(move || {
            let outcome = pipeline.process(&raw, device_orientation, &options, &destination);
            let (result, error) = match &outcome {
                Ok(result) => (Some(result.clone()), None),
                Err(e) => {
                    log::warn!("capture {} failed in pipeline: {}", id, e);
                    (None, Some(e.to_string()))
                }
            };
            if let Some(resolver) = resolver {
                resolver.resolve(outcome.map(Some));
            }
            emitter.emit(CameraEvent::PictureSaved { id, result, error });
        });

        Ok(id)
    }
}
