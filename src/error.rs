//! Error types for texture import and update operations.
//!
//! Capability gaps (the driver lacking an optional import extension) are
//! deliberately *not* part of this taxonomy: the optional import paths
//! report them as `Ok(None)` so callers can fall back to another path
//! without treating the buffer as broken.

use drm_fourcc::DrmFourcc;
use thiserror::Error;

/// Errors reported by the texture import and update entry points.
#[derive(Error, Debug)]
pub enum GlesError {
    /// The pixel format has no entry in the format table
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(DrmFourcc),

    /// The row stride is misaligned or too small for the given width
    #[error("invalid stride {stride} (bytes-per-pixel {bpp}, width {width})")]
    InvalidStride { stride: u32, bpp: u32, width: u32 },

    /// A write was attempted on a texture that cannot be written to
    /// (external target, or backed by an imported driver image)
    #[error("cannot write pixels to immutable texture")]
    ImmutableTexture,

    /// The driver reported a shared-buffer format this renderer cannot
    /// classify; indicates a driver/client contract violation
    #[error("invalid or unsupported buffer format {0:#x}")]
    InvalidBufferFormat(u32),

    /// Driver-level image creation failed
    #[error("failed to create driver image: {0}")]
    ImportFailed(String),

    /// GPU resource allocation failed
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
}
