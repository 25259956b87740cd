//! Camera capture producer.
//!
//! A real device (the V4L2 backend) delivers frames from a background
//! thread into a mutex-guarded "latest frame" slot, independent of how
//! fast the presenter drains it: the presenter always reads the most
//! recent frame and a slow renderer never blocks the capture source.
//! A `dummy-*` synthetic generator has no background thread at all —
//! it computes its next frame in the reader's own thread, once per
//! call, used for development and testing without a camera attached.

pub mod dummy;
pub mod frame;
pub mod handle;
pub mod v4l2;

pub use frame::Frame;
pub use handle::{CameraSource, CaptureHandle};

/// Errors from opening or running a capture source.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera device path contains an interior NUL byte")]
    InvalidDevicePath,
    #[error("failed to open camera device: {0}")]
    OpenDevice(#[source] std::io::Error),
    #[error("VIDIOC_QUERYCAP failed: {0}")]
    QueryCap(#[source] std::io::Error),
    #[error("VIDIOC_S_FMT failed: {0}")]
    SetFormat(#[source] std::io::Error),
    #[error("VIDIOC_REQBUFS failed: {0}")]
    RequestBuffers(#[source] std::io::Error),
    #[error("VIDIOC_QUERYBUF failed: {0}")]
    QueryBuffer(#[source] std::io::Error),
    #[error("VIDIOC_QBUF failed: {0}")]
    QueueBuffer(#[source] std::io::Error),
    #[error("VIDIOC_DQBUF failed: {0}")]
    DequeueBuffer(#[source] std::io::Error),
    #[error("failed to mmap capture buffer: {0}")]
    Mmap(#[source] std::io::Error),
    #[error("VIDIOC_STREAMON failed: {0}")]
    StreamOn(#[source] std::io::Error),
}
