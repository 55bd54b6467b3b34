//! The owned GPU texture resource.
//!
//! A [`GlesTexture`] unites a GL texture name, its sampling target,
//! dimensions, format metadata, and orientation flag. It owns up to two
//! independent GPU handles (the texture name and, for imported
//! textures, a driver image); both are released exactly once when the
//! texture drops, under the context guard.

use std::rc::Rc;

use drm_fourcc::DrmFourcc;
use gl::types::{GLenum, GLuint};
use tracing::error;

use crate::context::{ContextGuard, DebugScope};
use crate::driver::{Driver, DriverImage, WriteRegion};
use crate::error::GlesError;
use crate::format::{gles_format_from_drm, GlesPixelFormat};

/// `GL_TEXTURE_EXTERNAL_OES`; not generated into the `gl` crate's core
/// bindings.
pub const TEXTURE_EXTERNAL_OES: GLenum = 0x8D65;

/// The sampler type a texture must be bound with. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// Ordinary 2D sampling.
    TwoD,
    /// Restricted to the external-image sampler.
    External,
}

impl TextureTarget {
    pub fn gl_target(self) -> GLenum {
        match self {
            TextureTarget::TwoD => gl::TEXTURE_2D,
            TextureTarget::External => TEXTURE_EXTERNAL_OES,
        }
    }
}

/// Read-only snapshot of a texture's native handles for the drawing
/// path. Taking it performs no GPU calls and needs no context.
#[derive(Debug, Clone, Copy)]
pub struct TextureAttributes {
    pub target: TextureTarget,
    pub tex: GLuint,
    pub inverted_y: bool,
    pub has_alpha: bool,
}

/// A GPU-resident texture created by exactly one import path.
pub struct GlesTexture {
    pub(crate) driver: Rc<dyn Driver>,
    pub(crate) tex: GLuint,
    pub(crate) target: TextureTarget,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Originating pixel format for writable textures; `None` for
    /// imported textures, which can never be written to.
    pub(crate) drm_format: Option<DrmFourcc>,
    pub(crate) has_alpha: bool,
    pub(crate) inverted_y: bool,
    /// Backing driver image, present only for imported textures.
    pub(crate) image: Option<DriverImage>,
}

impl GlesTexture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Whether the compositor may skip blending for this texture.
    pub fn is_opaque(&self) -> bool {
        !self.has_alpha
    }

    pub fn attribs(&self) -> TextureAttributes {
        TextureAttributes {
            target: self.target,
            tex: self.tex,
            inverted_y: self.inverted_y,
            has_alpha: self.has_alpha,
        }
    }

    /// Re-upload a sub-rectangle from `data` into this texture, with
    /// independent source (`src_x`, `src_y`) and destination (`dst_x`,
    /// `dst_y`) offsets, honoring `stride` for padded source rows.
    ///
    /// Only textures created by the pixel upload path accept writes;
    /// anything backed by an imported driver image is immutable.
    #[allow(clippy::too_many_arguments)]
    pub fn write_pixels(
        &mut self,
        stride: u32,
        width: u32,
        height: u32,
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        data: &[u8],
    ) -> Result<(), GlesError> {
        if self.target != TextureTarget::TwoD || self.image.is_some() {
            error!("cannot write pixels to immutable texture");
            return Err(GlesError::ImmutableTexture);
        }
        let Some(drm_format) = self.drm_format else {
            error!("cannot write pixels to immutable texture");
            return Err(GlesError::ImmutableTexture);
        };
        // The format resolved at creation time; the table is static.
        let fmt = gles_format_from_drm(drm_format)
            .ok_or(GlesError::UnsupportedFormat(drm_format))?;
        check_stride(fmt, stride, width)?;

        let _ctx = ContextGuard::new(&*self.driver);
        let _debug = DebugScope::new(&*self.driver, "write_pixels");

        self.driver.tex_sub_image_2d(
            self.tex,
            fmt,
            &WriteRegion {
                row_length: stride / fmt.bpp,
                width,
                height,
                src_x,
                src_y,
                dst_x,
                dst_y,
            },
            data,
        );

        Ok(())
    }
}

impl Drop for GlesTexture {
    fn drop(&mut self) {
        let _ctx = ContextGuard::new(&*self.driver);
        let _debug = DebugScope::new(&*self.driver, "texture_destroy");

        if self.tex != 0 {
            self.driver.delete_texture(self.tex);
            self.tex = 0;
        }
        if let Some(image) = self.image.take() {
            self.driver.destroy_image(image);
        }
    }
}

impl std::fmt::Debug for GlesTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlesTexture")
            .field("tex", &self.tex)
            .field("target", &self.target)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("drm_format", &self.drm_format)
            .field("has_alpha", &self.has_alpha)
            .field("inverted_y", &self.inverted_y)
            .field("imported", &self.image.is_some())
            .finish()
    }
}

/// Reject strides that are misaligned or too small for the row width.
pub(crate) fn check_stride(
    fmt: &GlesPixelFormat,
    stride: u32,
    width: u32,
) -> Result<(), GlesError> {
    if stride % fmt.bpp != 0 {
        error!(
            "invalid stride {} (incompatible with {} bytes-per-pixel)",
            stride, fmt.bpp
        );
        return Err(GlesError::InvalidStride {
            stride,
            bpp: fmt.bpp,
            width,
        });
    }
    // A width large enough to overflow the packed row size can never
    // have a valid stride either.
    let packed = width.checked_mul(fmt.bpp);
    if packed.map_or(true, |packed| stride < packed) {
        error!(
            "invalid stride {} (too small for {} bytes-per-pixel and width {})",
            stride, fmt.bpp, width
        );
        return Err(GlesError::InvalidStride {
            stride,
            bpp: fmt.bpp,
            width,
        });
    }
    Ok(())
}
