//! Still capture: request correlation and the decode/save pipeline.
//!
//! Pictures are assumed to arrive in the order they were requested. The
//! queue never reorders; a picture with nothing pending is an error.

mod completion;
mod pipeline;
mod queue;
mod request;

pub use completion::CaptureCompletion;
pub use pipeline::{JpegFilePipeline, PicturePipeline};
pub use queue::CaptureRequestQueue;
pub use request::{
    CaptureId, CaptureOptions, CaptureOutcome, CaptureRequest, CaptureResolver, PendingCapture, PictureResult,
};
