//! The driver seam: everything the renderer consumes from the EGL/GLES
//! stack, expressed as a trait so the import logic is independent of a
//! live GPU.
//!
//! The production binding is [`EglDriver`](crate::egl::EglDriver); tests
//! substitute a bookkeeping stub. All methods take `&self`: the renderer
//! is single-threaded per context and performs no internal locking.

use std::ffi::c_void;

use gl::types::GLuint;
use thiserror::Error;

use crate::dmabuf::DmabufAttributes;
use crate::format::GlesPixelFormat;
use crate::texture::TextureTarget;

bitflags::bitflags! {
    /// Optional driver features, probed once at driver creation.
    ///
    /// The renderer evaluates these *before* attempting the corresponding
    /// import path; a missing flag is a capability gap (`Ok(None)` from
    /// the entry point), never an error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// `glEGLImageTargetTexture2DOES` is available, so driver images
        /// can be bound to a sampler.
        const EXTERNAL_SAMPLING = 1 << 0;
        /// Zero-copy import of multi-plane kernel buffers.
        const DMABUF_IMPORT = 1 << 1;
        /// Legacy client shared-buffer import.
        const SHARED_BUFFER_IMPORT = 1 << 2;
    }
}

/// The caller's rendering context as captured by
/// [`Driver::save_context`]. Raw handles; null means "nothing current".
#[derive(Debug)]
pub struct SavedContext {
    pub display: *mut c_void,
    pub draw_surface: *mut c_void,
    pub read_surface: *mut c_void,
    pub context: *mut c_void,
}

/// An owned driver-level shareable image handle.
///
/// Not `Clone`: each imported texture owns its image exclusively, and
/// [`Driver::destroy_image`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct DriverImage(pub *mut c_void);

/// Opaque reference to a client-visible shared buffer resource.
#[derive(Debug, Clone, Copy)]
pub struct SharedBufferRef(pub *mut c_void);

/// Discovered properties of an image created from a shared buffer.
/// Format, dimensions, and orientation come from the driver, not the
/// caller.
#[derive(Debug)]
pub struct SharedBufferImage {
    pub image: DriverImage,
    /// Raw EGL texture format token ([`TEXTURE_RGB`], [`TEXTURE_RGBA`],
    /// [`TEXTURE_EXTERNAL_WL`], or something the renderer will reject).
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub inverted_y: bool,
}

/// An image created from a zero-copy buffer descriptor.
#[derive(Debug)]
pub struct DmabufImage {
    pub image: DriverImage,
    /// Whether the driver restricts sampling to the external-only target.
    pub external_only: bool,
}

/// Sub-rectangle upload parameters for [`Driver::tex_sub_image_2d`].
/// `row_length` is in pixels (stride divided by bytes-per-pixel).
#[derive(Debug, Clone, Copy)]
pub struct WriteRegion {
    pub row_length: u32,
    pub width: u32,
    pub height: u32,
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
}

/// Failure reported by the driver for a single operation. Classification
/// into the public error taxonomy happens at the import entry points.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

// EGL texture format tokens reported for shared-buffer images.
pub const TEXTURE_RGB: u32 = 0x305D;
pub const TEXTURE_RGBA: u32 = 0x305E;
pub const TEXTURE_EXTERNAL_WL: u32 = 0x31DA;

/// The EGL/GLES driver surface consumed by the renderer.
///
/// Context protocol: every texture/image operation below (other than the
/// context accessor itself) must only be called while this driver's own
/// context is current, i.e. between [`save_context`](Self::save_context)
/// + [`make_current`](Self::make_current) and
/// [`restore_context`](Self::restore_context). The renderer enforces
/// this with a scoped guard.
pub trait Driver {
    fn capabilities(&self) -> Capabilities;

    /// Capture whatever context the caller currently has bound. Performs
    /// no GPU work and must never block.
    fn save_context(&self) -> SavedContext;
    /// Activate this driver's own context.
    fn make_current(&self);
    /// Re-bind the captured caller context.
    fn restore_context(&self, saved: SavedContext);

    /// Push a named marker for driver-level diagnostics. No-op when the
    /// driver lacks marker support.
    fn push_debug(&self, label: &str);
    fn pop_debug(&self);

    /// Allocate a fresh texture name.
    fn gen_texture(&self) -> Result<GLuint, DriverError>;
    /// Release a texture name. Name 0 is tolerated as a no-op.
    fn delete_texture(&self, tex: GLuint);
    /// Full upload into a newly allocated 2D texture: clamp-to-edge
    /// wrapping, row-length-aware transfer reading `row_length` pixels
    /// per source row.
    fn tex_image_2d(
        &self,
        tex: GLuint,
        fmt: &GlesPixelFormat,
        width: u32,
        height: u32,
        row_length: u32,
        data: &[u8],
    );
    /// Sub-rectangle upload with independent source and destination
    /// offsets.
    fn tex_sub_image_2d(&self, tex: GLuint, fmt: &GlesPixelFormat, region: &WriteRegion, data: &[u8]);
    /// Bind a driver image to `tex` for sampling via `target`.
    fn bind_image(&self, tex: GLuint, target: TextureTarget, image: &DriverImage);

    /// Materialize a shareable image from a client buffer resource,
    /// discovering format, size, and orientation.
    fn create_image_from_shared_buffer(
        &self,
        buffer: SharedBufferRef,
    ) -> Result<SharedBufferImage, DriverError>;
    /// Materialize a shareable image directly from a zero-copy buffer
    /// descriptor. May block on driver-internal synchronization.
    fn create_image_from_dmabuf(
        &self,
        attributes: &DmabufAttributes,
    ) -> Result<DmabufImage, DriverError>;
    fn destroy_image(&self, image: DriverImage);
}
