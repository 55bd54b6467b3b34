//! GLES2/EGL texture import for compositing display servers.
//!
//! This crate turns opaque client-supplied pixel buffers into
//! GPU-resident textures a compositor can sample: raw CPU memory,
//! legacy shared buffer handles, and zero-copy kernel buffers all end
//! up as the same [`GlesTexture`].
//!
//! # Overview
//!
//! - [`GlesRenderer`] owns the three import entry points.
//! - [`GlesTexture`] owns the resulting GPU resources and releases them
//!   on drop.
//! - [`Driver`] is the seam to the EGL/GLES stack; [`EglDriver`] is the
//!   production binding (Linux).
//! - [`ContextGuard`] is the save/activate/restore protocol for the
//!   shared rendering context; every GPU-touching operation runs inside
//!   one.
//! - [`gles_format_from_drm`] maps DRM fourccs to native upload
//!   parameters.
//!
//! # Context discipline
//!
//! The rendering context is shared with the embedding application. No
//! operation in this crate leaves it altered on return, success or
//! failure; callers in turn must serialize operations per texture and
//! per context themselves.

pub mod context;
pub mod dmabuf;
pub mod driver;
pub mod error;
pub mod format;
pub mod renderer;
pub mod texture;

#[cfg(target_os = "linux")]
pub mod egl;

// Re-export primary types at crate root for convenience.
pub use context::{ContextGuard, DebugScope};
pub use dmabuf::{DmabufAttributes, DmabufFlags, DmabufPlane, DMABUF_MAX_PLANES};
pub use driver::{
    Capabilities, DmabufImage, Driver, DriverError, DriverImage, SavedContext, SharedBufferImage,
    SharedBufferRef, WriteRegion,
};
pub use error::GlesError;
pub use format::{gles_format_from_drm, supported_formats, GlesPixelFormat};
pub use renderer::GlesRenderer;
pub use texture::{GlesTexture, TextureAttributes, TextureTarget};

#[cfg(target_os = "linux")]
pub use egl::EglDriver;
